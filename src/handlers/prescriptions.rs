// src/handlers/prescriptions.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    common::error::ApiError,
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermClinicalWrite, RequirePermission},
    },
    models::clinical::{PrescriptionCompletion, PrescriptionDetail},
};

// POST /api/prescriptions/{id}/complete
#[utoipa::path(
    post,
    path = "/api/prescriptions/{id}/complete",
    tag = "Prescriptions",
    responses(
        (status = 200, description = "Receita dispensada: uma saída por linha", body = PrescriptionCompletion),
        (status = 404, description = "Receita não encontrada"),
        (status = 409, description = "Estoque insuficiente, receita já concluída ou cancelada")
    ),
    params(("id" = Uuid, Path, description = "ID da Receita")),
    security(("api_jwt" = []))
)]
pub async fn complete_prescription(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermClinicalWrite>,
    Path(prescription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let completion = app_state
        .dispensing_service
        .complete_prescription(&app_state.db_pool, prescription_id, user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(completion)))
}

// POST /api/prescriptions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/prescriptions/{id}/cancel",
    tag = "Prescriptions",
    responses(
        (status = 200, description = "Receita cancelada", body = PrescriptionDetail),
        (status = 409, description = "Receita já concluída ou cancelada")
    ),
    params(("id" = Uuid, Path, description = "ID da Receita")),
    security(("api_jwt" = []))
)]
pub async fn cancel_prescription(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermClinicalWrite>,
    Path(prescription_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .dispensing_service
        .cancel_prescription(&app_state.db_pool, prescription_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(detail)))
}
