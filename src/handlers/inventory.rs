// src/handlers/inventory.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::{
        error::{ApiError, AppError},
        validation::{validate_not_blank, validate_not_negative},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{PermInventoryRead, PermInventoryWrite, RequirePermission},
    },
    models::inventory::{
        EntryInput, EntryOutcome, ExitInput, LotSpec, Movement, NewLot, StockAvailability,
    },
    services::lot_ledger::Adjustment,
};

// =============================================================================
//  1. ENTRADA (registrar_entrada)
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEntryPayload {
    /// Lote já cadastrado. Se ausente, os campos do lote novo são obrigatórios.
    pub lot_id: Option<Uuid>,

    #[validate(length(min = 1, max = 50, message = "O número do lote deve ter entre 1 e 50 caracteres."))]
    #[schema(example = "L-2025-001")]
    pub lot_number: Option<String>,

    pub expiration_date: Option<NaiveDate>,

    pub supplier_id: Option<Uuid>,

    #[validate(custom(function = "validate_not_negative"))]
    #[schema(example = "1200.00")]
    pub purchase_price: Option<Decimal>,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 50)]
    pub quantity: i32,

    pub reason: Option<String>,

    #[validate(length(max = 100))]
    pub reference_document: Option<String>,
}

impl RegisterEntryPayload {
    // Lote existente OU dados completos de um lote novo.
    fn lot_spec(&self) -> Result<LotSpec, (&'static str, ValidationError)> {
        if let Some(lot_id) = self.lot_id {
            return Ok(LotSpec::Existing(lot_id));
        }

        let missing = |field: &'static str| {
            let mut err = ValidationError::new("required");
            err.message = Some("Obrigatório quando 'lotId' não é informado.".into());
            (field, err)
        };

        Ok(LotSpec::New(NewLot {
            lot_number: self.lot_number.clone().ok_or_else(|| missing("lotNumber"))?,
            expiration_date: self.expiration_date.ok_or_else(|| missing("expirationDate"))?,
            supplier_id: self.supplier_id.ok_or_else(|| missing("supplierId"))?,
            purchase_price: self.purchase_price.ok_or_else(|| missing("purchasePrice"))?,
        }))
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/medications/{id}/entries",
    tag = "Inventory",
    request_body = RegisterEntryPayload,
    responses(
        (status = 201, description = "Entrada registrada", body = EntryOutcome),
        (status = 400, description = "Payload inválido"),
        (status = 404, description = "Medicamento ou lote não encontrado"),
        (status = 409, description = "Número de lote duplicado")
    ),
    params(("id" = Uuid, Path, description = "ID do Medicamento")),
    security(("api_jwt" = []))
)]
pub async fn register_entry(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(medication_id): Path<Uuid>,
    Json(payload): Json<RegisterEntryPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let lot = payload.lot_spec().map_err(|(field, e)| {
        let mut errors = validator::ValidationErrors::new();
        errors.add(field, e);
        AppError::ValidationError(errors).to_api_error(&locale)
    })?;

    let outcome = app_state
        .inventory_service
        .register_entry(
            &app_state.db_pool,
            medication_id,
            EntryInput {
                lot,
                quantity: payload.quantity,
                reason: payload.reason,
                reference_document: payload.reference_document,
            },
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

// =============================================================================
//  2. SAÍDA MANUAL
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterExitPayload {
    /// Sem lote, o sistema escolhe o que vence primeiro (FEFO).
    pub lot_id: Option<Uuid>,

    #[validate(range(min = 1, message = "A quantidade deve ser maior que zero."))]
    #[schema(example = 8)]
    pub quantity: i32,

    pub reason: Option<String>,

    #[validate(length(max = 100))]
    pub reference_document: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/inventory/medications/{id}/exits",
    tag = "Inventory",
    request_body = RegisterExitPayload,
    responses(
        (status = 201, description = "Saída registrada", body = Vec<Movement>),
        (status = 409, description = "Estoque insuficiente")
    ),
    params(("id" = Uuid, Path, description = "ID do Medicamento")),
    security(("api_jwt" = []))
)]
pub async fn register_exit(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(medication_id): Path<Uuid>,
    Json(payload): Json<RegisterExitPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let movements = app_state
        .inventory_service
        .register_exit(
            &app_state.db_pool,
            medication_id,
            ExitInput {
                lot_id: payload.lot_id,
                quantity: payload.quantity,
                reason: payload.reason,
                reference_document: payload.reference_document,
            },
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(movements)))
}

// =============================================================================
//  3. AJUSTE
// =============================================================================

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentMode {
    Set,
    Offset,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAdjustmentPayload {
    #[schema(example = "OFFSET")]
    pub mode: AdjustmentMode,

    #[schema(example = -2)]
    pub value: i32,

    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Conteo físico")]
    pub reason: String,
}

impl RegisterAdjustmentPayload {
    fn adjustment(&self) -> Adjustment {
        match self.mode {
            AdjustmentMode::Set => Adjustment::Set(self.value),
            AdjustmentMode::Offset => Adjustment::Offset(self.value),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/inventory/lots/{id}/adjustments",
    tag = "Inventory",
    request_body = RegisterAdjustmentPayload,
    responses(
        (status = 201, description = "Ajuste registrado", body = Movement),
        (status = 400, description = "Ajuste inválido")
    ),
    params(("id" = Uuid, Path, description = "ID do Lote")),
    security(("api_jwt" = []))
)]
pub async fn register_adjustment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    _guard: RequirePermission<PermInventoryWrite>,
    Path(lot_id): Path<Uuid>,
    Json(payload): Json<RegisterAdjustmentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let movement = app_state
        .inventory_service
        .register_adjustment(
            &app_state.db_pool,
            lot_id,
            payload.adjustment(),
            &payload.reason,
            user.0.id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(movement)))
}

// =============================================================================
//  4. CONSULTAS
// =============================================================================

#[utoipa::path(
    get,
    path = "/api/inventory/medications/{id}/stock",
    tag = "Inventory",
    responses((status = 200, description = "Saldo por lote (FEFO)", body = StockAvailability)),
    params(("id" = Uuid, Path, description = "ID do Medicamento")),
    security(("api_jwt" = []))
)]
pub async fn get_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(medication_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let availability = app_state
        .inventory_service
        .stock_availability(&app_state.db_pool, medication_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(availability)))
}

#[utoipa::path(
    get,
    path = "/api/inventory/lots/{id}/movements",
    tag = "Inventory",
    responses((status = 200, description = "Movimentações do lote (mais recentes primeiro)", body = Vec<Movement>)),
    params(("id" = Uuid, Path, description = "ID do Lote")),
    security(("api_jwt" = []))
)]
pub async fn get_lot_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(lot_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .inventory_service
        .lot_movements(&app_state.db_pool, lot_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(movements)))
}
