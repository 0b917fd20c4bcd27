// src/common/validation.rs

use rust_decimal::Decimal;
use validator::ValidationError;

// Validadores customizados usados pelos payloads (`#[validate(custom(...))]`).

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("O campo não pode ficar em branco.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_not_negative(val: &Decimal) -> Result<(), ValidationError> {
    if val.is_sign_negative() {
        let mut err = ValidationError::new("range");
        err.add_param("min".into(), &0.0);
        err.message = Some("O valor não pode ser negativo.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("O valor deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

pub fn validate_max(val: &Decimal, max: Decimal) -> Result<(), ValidationError> {
    if *val > max {
        let mut err = ValidationError::new("range");
        err.add_param("max".into(), &max.to_string());
        err.message = Some(format!("O valor não pode passar de {max}.").into());
        return Err(err);
    }
    Ok(())
}

// Limites clínicos; também cabem nas colunas NUMERIC(4,1) e NUMERIC(6,2).
pub fn max_temperature() -> Decimal {
    Decimal::new(500, 1) // 50.0 °C
}

pub fn max_weight() -> Decimal {
    Decimal::new(200000, 2) // 2000.00 kg
}

pub fn validate_temperature(val: &Decimal) -> Result<(), ValidationError> {
    validate_positive(val)?;
    validate_max(val, max_temperature())
}

pub fn validate_weight(val: &Decimal) -> Result<(), ValidationError> {
    validate_positive(val)?;
    validate_max(val, max_weight())
}
