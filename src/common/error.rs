// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::common::i18n::{translate, MessageKey};
use crate::middleware::i18n::Locale;

// O erro de domínio: repositórios e serviços só conhecem este tipo.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Estoque insuficiente do medicamento {medication_id}: pedido {requested}, disponível {available}")]
    InsufficientStock {
        medication_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Movimentação inválida: {0}")]
    InvalidMovement(String),

    #[error("{entity} {id} não encontrado")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("{entity} {id} já foi concluído")]
    AlreadyCompleted { entity: &'static str, id: Uuid },

    #[error("{entity} {id} está em estado {status} e não aceita esta operação")]
    InvalidTransition {
        entity: &'static str,
        id: Uuid,
        status: String,
    },

    #[error("Conflito: {0}")]
    Conflict(String),

    #[error("Token inválido")]
    InvalidToken,

    #[error("Permissão '{0}' necessária")]
    Forbidden(&'static str),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

/// Resposta de erro já pronta para o cliente (status + mensagem traduzida).
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    /// Erros esperados da regra de negócio (não são falhas do sistema).
    pub fn is_business_rule(&self) -> bool {
        !matches!(
            self,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_)
        )
    }

    /// SQLSTATE 40P01: o Postgres abortou a transação para desfazer um deadlock.
    pub fn is_deadlock(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::Database(db_err)) => {
                db_err.code().as_deref() == Some("40P01")
            }
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidMovement(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::InsufficientStock { .. }
            | AppError::AlreadyCompleted { .. }
            | AppError::InvalidTransition { .. }
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) | AppError::JwtError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn message_key(&self) -> MessageKey {
        match self {
            AppError::ValidationError(_) => MessageKey::Validation,
            AppError::InsufficientStock { .. } => MessageKey::InsufficientStock,
            AppError::InvalidMovement(_) => MessageKey::InvalidMovement,
            AppError::NotFound { .. } => MessageKey::NotFound,
            AppError::AlreadyCompleted { .. } => MessageKey::AlreadyCompleted,
            AppError::InvalidTransition { .. } => MessageKey::InvalidTransition,
            AppError::Conflict(_) => MessageKey::Conflict,
            AppError::InvalidToken => MessageKey::InvalidToken,
            AppError::Forbidden(_) => MessageKey::Forbidden,
            _ => MessageKey::Internal,
        }
    }

    // Detalhes estruturados para o frontend montar uma mensagem específica.
    // Nunca inclui o texto de erros internos.
    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InsufficientStock {
                medication_id,
                requested,
                available,
            } => Some(json!({
                "medicationId": medication_id,
                "requested": requested,
                "available": available,
            })),
            AppError::InvalidMovement(reason) => Some(json!({ "reason": reason })),
            AppError::NotFound { entity, id } | AppError::AlreadyCompleted { entity, id } => {
                Some(json!({ "entity": entity, "id": id }))
            }
            AppError::InvalidTransition { entity, id, status } => {
                Some(json!({ "entity": entity, "id": id, "status": status }))
            }
            AppError::Conflict(reason) => Some(json!({ "reason": reason })),
            AppError::Forbidden(permission) => Some(json!({ "permission": permission })),
            _ => None,
        }
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {}", self);
        }

        ApiError {
            status,
            error: translate(&locale.0, self.message_key()).to_string(),
            details: self.details(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

// Usado quando não há Locale disponível (ex: middleware).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

/// Loga a falha de uma operação orquestrada com contexto (operação + alvo).
pub fn log_operation_failure(operation: &'static str, target_id: Uuid, err: &AppError) {
    if err.is_business_rule() {
        tracing::warn!(operation, %target_id, "⚠️ Operação rejeitada: {}", err);
    } else {
        tracing::error!(operation, %target_id, "🔥 Falha inesperada: {}", err);
    }
}

/// Erro de validação de um único campo (para regras verificadas fora do `validator`).
pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> AppError {
    let mut error = validator::ValidationError::new(code);
    error.message = Some(message.into());
    let mut errors = validator::ValidationErrors::new();
    errors.add(field, error);
    AppError::ValidationError(errors)
}

/// Converte violação de unicidade em `Conflict`, mantendo os demais erros.
pub(crate) fn map_unique_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::Conflict(message());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::{ValidationError, ValidationErrors};

    fn locale(lang: &str) -> Locale {
        Locale(lang.to_string())
    }

    #[test]
    fn insufficient_stock_is_conflict_with_medication_details() {
        let medication_id = Uuid::new_v4();
        let err = AppError::InsufficientStock {
            medication_id,
            requested: 8,
            available: 5,
        };

        let api = err.to_api_error(&locale("en"));

        assert_eq!(api.status, StatusCode::CONFLICT);
        let details = api.details.expect("details");
        assert_eq!(details["medicationId"], json!(medication_id));
        assert_eq!(details["requested"], json!(8));
        assert_eq!(details["available"], json!(5));
    }

    #[test]
    fn validation_errors_list_offending_fields() {
        let mut errors = ValidationErrors::new();
        let mut err = ValidationError::new("blank");
        err.message = Some("Diagnosis is required.".into());
        errors.add("diagnosis", err);

        let api = AppError::ValidationError(errors).to_api_error(&locale("en"));

        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details.unwrap()["diagnosis"], json!(["Diagnosis is required."]));
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AppError::InternalServerError(anyhow::anyhow!("connection reset by peer"));

        let api = err.to_api_error(&locale("en"));

        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(api.details.is_none());
        assert!(!api.error.contains("connection reset"));
    }

    #[test]
    fn messages_follow_the_requested_language() {
        let err = AppError::NotFound {
            entity: "prescription",
            id: Uuid::nil(),
        };

        let en = err.to_api_error(&locale("en")).error;
        let es = err.to_api_error(&locale("es")).error;

        assert_ne!(en, es);
        assert_eq!(err.to_api_error(&locale("es")).status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn business_rule_classification() {
        assert!(AppError::InvalidMovement("zero".into()).is_business_rule());
        assert!(!AppError::DatabaseError(sqlx::Error::RowNotFound).is_business_rule());
    }

    #[derive(Debug)]
    struct PgCode(&'static str);

    impl std::fmt::Display for PgCode {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "postgres error {}", self.0)
        }
    }

    impl std::error::Error for PgCode {}

    impl sqlx::error::DatabaseError for PgCode {
        fn message(&self) -> &str {
            "deadlock detected"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(self.0.into())
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    #[test]
    fn only_sqlstate_40p01_is_a_deadlock() {
        let deadlock = AppError::DatabaseError(sqlx::Error::Database(Box::new(PgCode("40P01"))));
        let overflow = AppError::DatabaseError(sqlx::Error::Database(Box::new(PgCode("22003"))));

        assert!(deadlock.is_deadlock());
        assert!(!overflow.is_deadlock());
        assert!(!AppError::DatabaseError(sqlx::Error::RowNotFound).is_deadlock());
        assert!(!AppError::InvalidMovement("zero".into()).is_deadlock());
    }
}
