// src/common/i18n.rs

// Catálogo de mensagens de erro por idioma. Idioma desconhecido cai no inglês.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    Validation,
    InsufficientStock,
    InvalidMovement,
    NotFound,
    AlreadyCompleted,
    InvalidTransition,
    Conflict,
    InvalidToken,
    Forbidden,
    Internal,
}

pub fn translate(lang: &str, key: MessageKey) -> &'static str {
    match lang {
        "es" => spanish(key),
        "pt" => portuguese(key),
        _ => english(key),
    }
}

fn english(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Validation => "One or more fields are invalid.",
        MessageKey::InsufficientStock => "Insufficient stock for the requested medication.",
        MessageKey::InvalidMovement => "Invalid inventory movement.",
        MessageKey::NotFound => "The requested resource was not found.",
        MessageKey::AlreadyCompleted => "This record has already been completed.",
        MessageKey::InvalidTransition => "The record's current state does not allow this operation.",
        MessageKey::Conflict => "The record conflicts with existing data.",
        MessageKey::InvalidToken => "Invalid or missing authentication token.",
        MessageKey::Forbidden => "You do not have permission to perform this action.",
        MessageKey::Internal => "An unexpected error occurred.",
    }
}

fn spanish(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Validation => "Uno o más campos son inválidos.",
        MessageKey::InsufficientStock => "No hay suficiente stock del medicamento solicitado.",
        MessageKey::InvalidMovement => "Movimiento de inventario inválido.",
        MessageKey::NotFound => "El recurso solicitado no existe.",
        MessageKey::AlreadyCompleted => "El registro ya fue completado anteriormente.",
        MessageKey::InvalidTransition => "El estado actual del registro no permite esta operación.",
        MessageKey::Conflict => "El registro entra en conflicto con datos existentes.",
        MessageKey::InvalidToken => "Token de autenticación inválido o ausente.",
        MessageKey::Forbidden => "No tiene permiso para realizar esta acción.",
        MessageKey::Internal => "Ocurrió un error inesperado.",
    }
}

fn portuguese(key: MessageKey) -> &'static str {
    match key {
        MessageKey::Validation => "Um ou mais campos são inválidos.",
        MessageKey::InsufficientStock => "Estoque insuficiente do medicamento solicitado.",
        MessageKey::InvalidMovement => "Movimentação de estoque inválida.",
        MessageKey::NotFound => "O recurso solicitado não foi encontrado.",
        MessageKey::AlreadyCompleted => "Este registro já foi concluído.",
        MessageKey::InvalidTransition => "O estado atual do registro não permite esta operação.",
        MessageKey::Conflict => "O registro conflita com dados existentes.",
        MessageKey::InvalidToken => "Token de autenticação inválido ou ausente.",
        MessageKey::Forbidden => "Você não tem permissão para realizar esta ação.",
        MessageKey::Internal => "Ocorreu um erro inesperado.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_language_falls_back_to_english() {
        assert_eq!(
            translate("de", MessageKey::InsufficientStock),
            translate("en", MessageKey::InsufficientStock)
        );
    }

    #[test]
    fn spanish_and_portuguese_are_available() {
        assert_eq!(translate("es", MessageKey::NotFound), "El recurso solicitado no existe.");
        assert_eq!(translate("pt", MessageKey::NotFound), "O recurso solicitado não foi encontrado.");
    }
}
