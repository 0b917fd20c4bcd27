// src/services/auth.rs
//
// O login acontece em outro serviço; aqui só validamos (e, para testes e
// ferramentas internas, emitimos) o JWT com o papel do usuário.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::auth::{Claims, CurrentUser, Role},
};

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
}

impl AuthService {
    pub fn new(jwt_secret: String) -> Self {
        Self { jwt_secret }
    }

    pub fn validate_token(&self, token: &str) -> Result<CurrentUser, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &validation,
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(CurrentUser {
            id: token_data.claims.sub,
            role: token_data.claims.role,
        })
    }

    pub fn issue_token(&self, user_id: Uuid, role: Role, ttl: Duration) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user_id,
            role,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_round_trips_user_and_role() {
        let service = AuthService::new("segredo-de-teste".into());
        let user_id = Uuid::new_v4();

        let token = service
            .issue_token(user_id, Role::Veterinarian, Duration::hours(1))
            .unwrap();
        let user = service.validate_token(&token).unwrap();

        assert_eq!(user.id, user_id);
        assert_eq!(user.role, Role::Veterinarian);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let issuer = AuthService::new("outro-segredo".into());
        let token = issuer
            .issue_token(Uuid::new_v4(), Role::Admin, Duration::hours(1))
            .unwrap();

        let service = AuthService::new("segredo-de-teste".into());
        assert!(matches!(service.validate_token(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = AuthService::new("segredo-de-teste".into());
        let token = service
            .issue_token(Uuid::new_v4(), Role::Receptionist, Duration::hours(-2))
            .unwrap();

        assert!(matches!(service.validate_token(&token), Err(AppError::InvalidToken)));
    }
}
