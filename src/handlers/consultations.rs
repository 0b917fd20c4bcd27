// src/handlers/consultations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_not_blank, validate_temperature, validate_weight},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermClinicalWrite, PermInventoryRead, RequirePermission},
    },
    models::clinical::{ClinicalFields, CompletedConsultation, NewPrescriptionLine, PrescriptionDetail},
};

// =============================================================================
//  1. COMPLETAR CONSULTA
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteConsultationPayload {
    // Ausente no JSON vira "" e cai na validação (400), não no 422 do extrator.
    #[serde(default)]
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Otitis externa")]
    pub diagnosis: String,

    pub observations: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,

    #[validate(custom(function = "validate_temperature"))]
    #[schema(example = "38.5")]
    pub temperature: Option<Decimal>,

    #[validate(custom(function = "validate_weight"))]
    #[schema(example = "12.40")]
    pub weight: Option<Decimal>,
}

impl From<CompleteConsultationPayload> for ClinicalFields {
    fn from(payload: CompleteConsultationPayload) -> Self {
        ClinicalFields {
            diagnosis: payload.diagnosis.trim().to_string(),
            observations: payload.observations,
            symptoms: payload.symptoms,
            treatment: payload.treatment,
            temperature: payload.temperature,
            weight: payload.weight,
        }
    }
}

#[utoipa::path(
    patch,
    path = "/api/consultations/{id}/complete",
    tag = "Consultations",
    request_body = CompleteConsultationPayload,
    responses(
        (status = 200, description = "Consulta concluída e histórico atualizado", body = CompletedConsultation),
        (status = 400, description = "Diagnóstico ausente ou leitura fora do limite"),
        (status = 404, description = "Consulta não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da Consulta")),
    security(("api_jwt" = []))
)]
pub async fn complete_consultation(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermClinicalWrite>,
    Path(consultation_id): Path<Uuid>,
    Json(payload): Json<CompleteConsultationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let completed = app_state
        .dispensing_service
        .complete_consultation(&app_state.db_pool, consultation_id, payload.into(), user.0.id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(completed)))
}

// =============================================================================
//  2. REGISTRAR MEDICAMENTOS (gera a receita)
// =============================================================================

fn default_text() -> String {
    "N/A".to_string()
}

fn default_quantity() -> i32 {
    1
}

// Serialize: o `nested` do validator guarda o valor como parâmetro do erro.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionLinePayload {
    pub medication_id: Uuid,

    #[serde(default = "default_text")]
    #[schema(example = "1 comprimido")]
    pub dosage: String,

    #[serde(default = "default_text")]
    #[schema(example = "cada 12 horas")]
    pub frequency: String,

    #[serde(default = "default_text")]
    #[schema(example = "7 días")]
    pub duration: String,

    #[serde(default = "default_quantity")]
    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 14)]
    pub quantity: i32,

    #[serde(default)]
    pub instructions: String,
}

impl From<PrescriptionLinePayload> for NewPrescriptionLine {
    fn from(line: PrescriptionLinePayload) -> Self {
        NewPrescriptionLine {
            medication_id: line.medication_id,
            dosage: line.dosage,
            frequency: line.frequency,
            duration: line.duration,
            quantity: line.quantity,
            instructions: line.instructions,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPrescriptionPayload {
    #[validate(length(min = 1, message = "Informe ao menos um medicamento."), nested)]
    pub lines: Vec<PrescriptionLinePayload>,

    pub observations: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/consultations/{id}/prescriptions",
    tag = "Consultations",
    request_body = RegisterPrescriptionPayload,
    responses(
        (status = 201, description = "Receita criada", body = PrescriptionDetail),
        (status = 404, description = "Consulta ou medicamento não encontrado")
    ),
    params(("id" = Uuid, Path, description = "ID da Consulta")),
    security(("api_jwt" = []))
)]
pub async fn register_prescription(
    State(app_state): State<AppState>,
    locale: Locale,
    _user: AuthenticatedUser,
    _guard: RequirePermission<PermClinicalWrite>,
    Path(consultation_id): Path<Uuid>,
    Json(payload): Json<RegisterPrescriptionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let lines = payload.lines.into_iter().map(NewPrescriptionLine::from).collect();

    let detail = app_state
        .dispensing_service
        .register_prescription(&app_state.db_pool, consultation_id, lines, payload.observations)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

#[utoipa::path(
    get,
    path = "/api/consultations/{id}/prescription",
    tag = "Consultations",
    responses(
        (status = 200, description = "Última receita da consulta", body = PrescriptionDetail),
        (status = 404, description = "Consulta sem receita")
    ),
    params(("id" = Uuid, Path, description = "ID da Consulta")),
    security(("api_jwt" = []))
)]
pub async fn get_consultation_prescription(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(consultation_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = app_state
        .dispensing_service
        .consultation_prescription(&app_state.db_pool, consultation_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(detail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_diagnosis_fails_validation() {
        let payload: CompleteConsultationPayload =
            serde_json::from_value(json!({ "observations": "Sin fiebre" })).unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("diagnosis"));
    }

    #[test]
    fn line_defaults_match_the_clinic_forms() {
        let payload: RegisterPrescriptionPayload = serde_json::from_value(json!({
            "lines": [{ "medicationId": Uuid::new_v4() }]
        }))
        .unwrap();

        let line = &payload.lines[0];
        assert_eq!(line.dosage, "N/A");
        assert_eq!(line.frequency, "N/A");
        assert_eq!(line.duration, "N/A");
        assert_eq!(line.quantity, 1);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn empty_prescription_is_rejected() {
        let payload: RegisterPrescriptionPayload =
            serde_json::from_value(json!({ "lines": [] })).unwrap();

        assert!(payload.validate().is_err());
    }

    #[test]
    fn negative_weight_is_rejected() {
        let payload: CompleteConsultationPayload = serde_json::from_value(json!({
            "diagnosis": "Control anual",
            "weight": -1.0
        }))
        .unwrap();

        assert!(payload.validate().unwrap_err().field_errors().contains_key("weight"));
    }

    #[test]
    fn out_of_range_readings_name_the_field() {
        let payload: CompleteConsultationPayload = serde_json::from_value(json!({
            "diagnosis": "Control anual",
            "temperature": 1000.0,
            "weight": 10000.0
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("temperature"));
        assert!(fields.contains_key("weight"));
    }

    #[test]
    fn zero_quantity_inside_a_line_fails_nested_validation() {
        let payload: RegisterPrescriptionPayload = serde_json::from_value(json!({
            "lines": [{ "medicationId": Uuid::new_v4(), "quantity": 0 }]
        }))
        .unwrap();

        let errors = payload.validate().unwrap_err();
        assert!(errors.errors().contains_key("lines"));
    }
}
