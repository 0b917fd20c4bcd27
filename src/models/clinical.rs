// src/models/clinical.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::inventory::Movement;

// --- Enums ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "consultation_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "consultation_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsultationKind {
    Routine,
    Emergency,
    FollowUp,
}

impl ConsultationKind {
    /// Rótulo usado na entrada do histórico médico.
    pub fn history_label(self) -> &'static str {
        match self {
            ConsultationKind::Routine => "Routine check-up",
            ConsultationKind::Emergency => "Emergency",
            ConsultationKind::FollowUp => "Follow-up",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "prescription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
}

impl PrescriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PrescriptionStatus::Active => "ACTIVE",
            PrescriptionStatus::Completed => "COMPLETED",
            PrescriptionStatus::Cancelled => "CANCELLED",
        }
    }
}

// --- Referências ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vaccine {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub is_mandatory: bool,
    /// Intervalo de revacinação em dias.
    pub revaccination_interval: i32,
    pub created_at: DateTime<Utc>,
}

// --- Consultas e histórico ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub practitioner_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub kind: ConsultationKind,
    pub status: ConsultationStatus,
    pub reason: String,
    pub diagnosis: Option<String>,
    pub observations: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    #[schema(example = "38.5")]
    pub temperature: Option<Decimal>,
    #[schema(example = "12.40")]
    pub weight: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cabeçalho do histórico médico (um por pet).
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub practitioner_id: Option<Uuid>,
    pub opened_on: NaiveDate,
    pub observations: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entrada detalhada do histórico; `linked_consultation_id` é a chave de idempotência.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub history_id: Uuid,
    pub linked_consultation_id: Uuid,
    pub practitioner_id: Uuid,
    pub consultation_type: String,
    pub entry_date: NaiveDate,
    pub reason: String,
    pub diagnosis: String,
    pub observations: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub temperature: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeightLog {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub weight: Decimal,
    pub recorded_on: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Campos clínicos informados ao concluir uma consulta.
#[derive(Debug, Clone, Default)]
pub struct ClinicalFields {
    pub diagnosis: String,
    pub observations: Option<String>,
    pub symptoms: Option<String>,
    pub treatment: Option<String>,
    pub temperature: Option<Decimal>,
    pub weight: Option<Decimal>,
}

/// Valores gravados na entrada do histórico (espelho da consulta concluída).
#[derive(Debug, Clone)]
pub struct HistoryEntryFields {
    pub practitioner_id: Uuid,
    pub consultation_type: String,
    pub entry_date: NaiveDate,
    pub reason: String,
    pub clinical: ClinicalFields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryWriteKind {
    Created,
    Updated,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletedConsultation {
    pub consultation: Consultation,
    pub history_entry: HistoryEntry,
    pub history_write: HistoryWriteKind,
    pub weight_log: Option<WeightLog>,
}

// --- Receitas ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub practitioner_id: Uuid,
    pub consultation_id: Option<Uuid>,
    pub emission_date: NaiveDate,
    pub expiration_date: NaiveDate,
    pub observations: Option<String>,
    pub status: PrescriptionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionLine {
    pub id: Uuid,
    pub prescription_id: Uuid,
    pub medication_id: Uuid,
    pub position: i32,
    #[schema(example = "1 comprimido")]
    pub dosage: String,
    #[schema(example = "cada 12 horas")]
    pub frequency: String,
    #[schema(example = "7 días")]
    pub duration: String,
    #[schema(example = 14)]
    pub quantity: i32,
    pub instructions: String,
}

#[derive(Debug, Clone)]
pub struct NewPrescriptionLine {
    pub medication_id: Uuid,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub quantity: i32,
    pub instructions: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDetail {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub lines: Vec<PrescriptionLine>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionCompletion {
    pub prescription: Prescription,
    pub movements: Vec<Movement>,
}

// --- Vacinação ---

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub vaccine_id: Uuid,
    pub practitioner_id: Uuid,
    pub lot_id: Uuid,
    pub applied_on: NaiveDate,
    pub next_due_on: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVaccination {
    pub pet_id: Uuid,
    pub vaccine_id: Uuid,
    pub practitioner_id: Uuid,
    pub lot_id: Uuid,
    pub applied_on: NaiveDate,
    pub next_due_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Dados informados na aplicação. Sem veterinário, vale o usuário autenticado.
#[derive(Debug, Clone)]
pub struct VaccinationInput {
    pub pet_id: Uuid,
    pub vaccine_id: Uuid,
    pub practitioner_id: Option<Uuid>,
    pub lot_id: Uuid,
    pub applied_on: NaiveDate,
    pub next_due_on: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VaccinationOutcome {
    pub vaccination: VaccinationRecord,
    pub movement: Movement,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_label_follows_consultation_kind() {
        assert_eq!(ConsultationKind::Routine.history_label(), "Routine check-up");
        assert_eq!(ConsultationKind::Emergency.history_label(), "Emergency");
        assert_eq!(ConsultationKind::FollowUp.history_label(), "Follow-up");
    }

    #[test]
    fn prescription_status_serializes_in_screaming_case() {
        let json = serde_json::to_string(&PrescriptionStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        assert_eq!(PrescriptionStatus::Cancelled.as_str(), "CANCELLED");
    }
}
