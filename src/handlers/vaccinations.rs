// src/handlers/vaccinations.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermClinicalWrite, RequirePermission},
    },
    models::clinical::{VaccinationInput, VaccinationOutcome},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_dates"))]
pub struct ApplyVaccinationPayload {
    pub pet_id: Uuid,
    pub vaccine_id: Uuid,
    /// Veterinário que aplicou. Padrão: o usuário autenticado.
    pub practitioner_id: Option<Uuid>,
    /// Lote de onde sai a dose (escolhido pelo veterinário).
    pub lot_id: Uuid,
    /// Padrão: hoje.
    pub applied_on: Option<NaiveDate>,
    /// Padrão: aplicação + intervalo de revacinação da vacina.
    pub next_due_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

fn validate_dates(payload: &ApplyVaccinationPayload) -> Result<(), ValidationError> {
    if let (Some(applied), Some(next)) = (payload.applied_on, payload.next_due_on) {
        if next <= applied {
            let mut err = ValidationError::new("nextDueOn");
            err.message = Some("A próxima dose deve ser posterior à aplicação.".into());
            return Err(err);
        }
    }
    Ok(())
}

impl ApplyVaccinationPayload {
    fn into_input(self, today: NaiveDate) -> VaccinationInput {
        VaccinationInput {
            pet_id: self.pet_id,
            vaccine_id: self.vaccine_id,
            practitioner_id: self.practitioner_id,
            lot_id: self.lot_id,
            applied_on: self.applied_on.unwrap_or(today),
            next_due_on: self.next_due_on,
            notes: self.notes,
        }
    }
}

// POST /api/vaccinations
#[utoipa::path(
    post,
    path = "/api/vaccinations",
    tag = "Vaccinations",
    request_body = ApplyVaccinationPayload,
    responses(
        (status = 201, description = "Vacina aplicada e dose baixada do lote", body = VaccinationOutcome),
        (status = 404, description = "Pet, vacina ou lote não encontrado"),
        (status = 409, description = "Lote sem saldo")
    ),
    security(("api_jwt" = []))
)]
pub async fn apply_vaccination(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermClinicalWrite>,
    Json(payload): Json<ApplyVaccinationPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let outcome = app_state
        .dispensing_service
        .apply_vaccination(
            &app_state.db_pool,
            payload.into_input(Utc::now().date_naive()),
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(extra: serde_json::Value) -> ApplyVaccinationPayload {
        let mut base = json!({
            "petId": Uuid::new_v4(),
            "vaccineId": Uuid::new_v4(),
            "lotId": Uuid::new_v4(),
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn application_date_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let input = payload(json!({})).into_input(today);

        assert_eq!(input.applied_on, today);
        assert_eq!(input.next_due_on, None);
        assert_eq!(input.practitioner_id, None);
    }

    #[test]
    fn explicit_practitioner_is_kept() {
        let vet = Uuid::new_v4();
        let input = payload(json!({ "practitionerId": vet }))
            .into_input(NaiveDate::from_ymd_opt(2025, 5, 10).unwrap());

        assert_eq!(input.practitioner_id, Some(vet));
    }

    #[test]
    fn next_dose_before_application_is_invalid() {
        let p = payload(json!({ "appliedOn": "2025-05-10", "nextDueOn": "2025-05-01" }));
        assert!(p.validate().is_err());

        let p = payload(json!({ "appliedOn": "2025-05-10", "nextDueOn": "2026-05-10" }));
        assert!(p.validate().is_ok());
    }
}
