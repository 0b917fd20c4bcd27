// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    middleware::i18n::Locale,
    models::auth::CurrentUser,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    fn slug() -> &'static str;
}

/// 2. O Extractor (Guardião). Depende do `auth_guard` ter rodado antes.
pub struct RequirePermission<T>(pub PhantomData<T>);

// 3. A permissão vem do papel no token (sem consulta ao banco).
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = Locale::from_headers(&parts.headers);

        // A. Extrai Usuário
        let user = parts
            .extensions
            .get::<CurrentUser>()
            .ok_or_else(|| AppError::InvalidToken.to_api_error(&locale))?;

        // B. Verifica o papel
        let required_perm = T::slug();
        if !user.role.has_permission(required_perm) {
            tracing::warn!(user_id = %user.id, role = ?user.role, required_perm, "⛔ Permissão negada");
            return Err(AppError::Forbidden(required_perm).to_api_error(&locale));
        }

        Ok(RequirePermission(PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermInventoryRead;
impl PermissionDef for PermInventoryRead {
    fn slug() -> &'static str { "inventory:read" }
}

pub struct PermInventoryWrite;
impl PermissionDef for PermInventoryWrite {
    fn slug() -> &'static str { "inventory:write" }
}

pub struct PermClinicalWrite;
impl PermissionDef for PermClinicalWrite {
    fn slug() -> &'static str { "clinical:write" }
}
