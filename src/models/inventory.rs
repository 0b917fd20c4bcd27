// src/models/inventory.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// --- 1. Medicamentos (catálogo) ---
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Uuid,
    pub supplier_id: Uuid,
    #[schema(example = "Amoxicilina 250mg")]
    pub name: String,
    pub description: Option<String>,
    pub presentation: String,
    #[schema(example = "1200.00")]
    pub purchase_price: Decimal,
    #[schema(example = "2500.00")]
    pub sale_price: Decimal,
    #[schema(example = 10)]
    pub minimum_stock: i32,
    pub requires_prescription: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 2. Lotes ---
// A quantidade só muda através do livro-razão (LotLedger).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub supplier_id: Uuid,
    #[schema(example = "L-2025-001")]
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub intake_date: NaiveDate,
    #[schema(example = 50)]
    pub quantity: i32,
    pub purchase_price: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- 3. Movimentações ---
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "movement_kind", rename_all = "SCREAMING_SNAKE_CASE")] // Banco
#[serde(rename_all = "SCREAMING_SNAKE_CASE")] // JSON
pub enum MovementKind {
    Entry,
    Exit,
    Adjustment,
}

/// Registro imutável de uma variação de estoque.
/// Para ADJUSTMENT, `quantity` guarda o deslocamento com sinal efetivamente aplicado.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub kind: MovementKind,
    pub quantity: i32,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Uuid,
    pub reference_document: Option<String>,
    pub reason: String,
    pub affects_stock: bool,
}

// Dados de um lote novo (a quantidade sempre nasce em zero).
#[derive(Debug, Clone)]
pub struct NewLot {
    pub lot_number: String,
    pub expiration_date: NaiveDate,
    pub supplier_id: Uuid,
    pub purchase_price: Decimal,
}

/// Saldo disponível de um medicamento, lote a lote (FEFO).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockAvailability {
    pub medication: Medication,
    pub total_stock: i64,
    pub lots: Vec<Lot>,
    pub low_stock: bool,
}

/// Resultado de uma entrada de estoque.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryOutcome {
    pub lot: Lot,
    pub movement: Movement,
}

// --- 4. Entradas de serviço ---

/// Lote alvo de uma entrada: um já cadastrado ou um novo.
#[derive(Debug, Clone)]
pub enum LotSpec {
    Existing(Uuid),
    New(NewLot),
}

#[derive(Debug, Clone)]
pub struct EntryInput {
    pub lot: LotSpec,
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference_document: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExitInput {
    /// Sem lote, o seletor FEFO decide.
    pub lot_id: Option<Uuid>,
    pub quantity: i32,
    pub reason: Option<String>,
    pub reference_document: Option<String>,
}
