// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Papéis emitidos pelo serviço de autenticação (claim "role").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Veterinarian,
    Receptionist,
}

impl Role {
    pub fn has_permission(self, slug: &str) -> bool {
        match self {
            Role::Admin | Role::Veterinarian => true,
            Role::Receptionist => slug == "inventory:read",
        }
    }
}

/// O "ator" de toda movimentação e atualização clínica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receptionist_can_only_read_inventory() {
        assert!(Role::Receptionist.has_permission("inventory:read"));
        assert!(!Role::Receptionist.has_permission("inventory:write"));
        assert!(!Role::Receptionist.has_permission("clinical:write"));
    }

    #[test]
    fn veterinarian_and_admin_have_every_permission() {
        for role in [Role::Admin, Role::Veterinarian] {
            assert!(role.has_permission("inventory:write"));
            assert!(role.has_permission("clinical:write"));
        }
    }

    #[test]
    fn role_uses_screaming_case_on_the_wire() {
        let role: Role = serde_json::from_str("\"VETERINARIAN\"").unwrap();
        assert_eq!(role, Role::Veterinarian);
    }
}
