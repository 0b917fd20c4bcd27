// src/db/clinical_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::clinical::{
        ClinicalFields, Consultation, HistoryEntry, HistoryEntryFields, MedicalHistory,
        NewPrescriptionLine, NewVaccination, Pet, Prescription, PrescriptionLine,
        PrescriptionStatus, VaccinationRecord, Vaccine, WeightLog,
    },
};

#[derive(Clone)]
pub struct ClinicalRepository {
    pool: PgPool,
}

impl ClinicalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  REFERÊNCIAS (somente leitura)
    // =========================================================================

    pub async fn find_pet<'e, E>(&self, executor: E, pet_id: Uuid) -> Result<Option<Pet>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let pet = sqlx::query_as::<_, Pet>("SELECT * FROM pets WHERE id = $1")
            .bind(pet_id)
            .fetch_optional(executor)
            .await?;
        Ok(pet)
    }

    pub async fn find_vaccine<'e, E>(
        &self,
        executor: E,
        vaccine_id: Uuid,
    ) -> Result<Option<Vaccine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let vaccine = sqlx::query_as::<_, Vaccine>("SELECT * FROM vaccines WHERE id = $1")
            .bind(vaccine_id)
            .fetch_optional(executor)
            .await?;
        Ok(vaccine)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn find_consultation<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
    ) -> Result<Option<Consultation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consultation =
            sqlx::query_as::<_, Consultation>("SELECT * FROM consultations WHERE id = $1")
                .bind(consultation_id)
                .fetch_optional(executor)
                .await?;
        Ok(consultation)
    }

    // Serializa conclusões concorrentes da mesma consulta.
    pub async fn lock_consultation<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
    ) -> Result<Option<Consultation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let consultation = sqlx::query_as::<_, Consultation>(
            "SELECT * FROM consultations WHERE id = $1 FOR UPDATE",
        )
        .bind(consultation_id)
        .fetch_optional(executor)
        .await?;
        Ok(consultation)
    }

    pub async fn complete_consultation<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
        fields: &ClinicalFields,
    ) -> Result<Consultation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Temperatura e peso só sobrescrevem se vierem no payload (COALESCE).
        let consultation = sqlx::query_as::<_, Consultation>(
            r#"
            UPDATE consultations
            SET status = 'COMPLETED',
                diagnosis = $2,
                observations = $3,
                symptoms = $4,
                treatment = $5,
                temperature = COALESCE($6, temperature),
                weight = COALESCE($7, weight),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(consultation_id)
        .bind(&fields.diagnosis)
        .bind(fields.observations.as_deref())
        .bind(fields.symptoms.as_deref())
        .bind(fields.treatment.as_deref())
        .bind(fields.temperature)
        .bind(fields.weight)
        .fetch_one(executor)
        .await?;
        Ok(consultation)
    }

    // =========================================================================
    //  HISTÓRICO MÉDICO
    // =========================================================================

    /// "UPSERT" do cabeçalho: um histórico por pet.
    /// O veterinário só é definido na criação.
    pub async fn upsert_medical_history<'e, E>(
        &self,
        executor: E,
        pet_id: Uuid,
        practitioner_id: Uuid,
    ) -> Result<MedicalHistory, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let history = sqlx::query_as::<_, MedicalHistory>(
            r#"
            INSERT INTO medical_histories (pet_id, practitioner_id)
            VALUES ($1, $2)
            ON CONFLICT (pet_id)
            DO UPDATE SET pet_id = EXCLUDED.pet_id
            RETURNING *
            "#,
        )
        .bind(pet_id)
        .bind(practitioner_id)
        .fetch_one(executor)
        .await?;
        Ok(history)
    }

    pub async fn find_history_entry_by_consultation<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
    ) -> Result<Option<HistoryEntry>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, HistoryEntry>(
            "SELECT * FROM history_entries WHERE linked_consultation_id = $1",
        )
        .bind(consultation_id)
        .fetch_optional(executor)
        .await?;
        Ok(entry)
    }

    pub async fn insert_history_entry<'e, E>(
        &self,
        executor: E,
        history_id: Uuid,
        consultation_id: Uuid,
        fields: &HistoryEntryFields,
    ) -> Result<HistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, HistoryEntry>(
            r#"
            INSERT INTO history_entries (
                history_id, linked_consultation_id, practitioner_id, consultation_type,
                entry_date, reason, diagnosis, observations, symptoms, treatment,
                temperature, weight
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(history_id)
        .bind(consultation_id)
        .bind(fields.practitioner_id)
        .bind(&fields.consultation_type)
        .bind(fields.entry_date)
        .bind(&fields.reason)
        .bind(&fields.clinical.diagnosis)
        .bind(fields.clinical.observations.as_deref())
        .bind(fields.clinical.symptoms.as_deref())
        .bind(fields.clinical.treatment.as_deref())
        .bind(fields.clinical.temperature)
        .bind(fields.clinical.weight)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    pub async fn update_history_entry<'e, E>(
        &self,
        executor: E,
        entry_id: Uuid,
        fields: &HistoryEntryFields,
    ) -> Result<HistoryEntry, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let entry = sqlx::query_as::<_, HistoryEntry>(
            r#"
            UPDATE history_entries
            SET practitioner_id = $2,
                consultation_type = $3,
                entry_date = $4,
                reason = $5,
                diagnosis = $6,
                observations = $7,
                symptoms = $8,
                treatment = $9,
                temperature = COALESCE($10, temperature),
                weight = COALESCE($11, weight),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(entry_id)
        .bind(fields.practitioner_id)
        .bind(&fields.consultation_type)
        .bind(fields.entry_date)
        .bind(&fields.reason)
        .bind(&fields.clinical.diagnosis)
        .bind(fields.clinical.observations.as_deref())
        .bind(fields.clinical.symptoms.as_deref())
        .bind(fields.clinical.treatment.as_deref())
        .bind(fields.clinical.temperature)
        .bind(fields.clinical.weight)
        .fetch_one(executor)
        .await?;
        Ok(entry)
    }

    pub async fn insert_weight_log<'e, E>(
        &self,
        executor: E,
        pet_id: Uuid,
        weight: Decimal,
        recorded_on: NaiveDate,
        notes: Option<&str>,
    ) -> Result<WeightLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let log = sqlx::query_as::<_, WeightLog>(
            r#"
            INSERT INTO weight_logs (pet_id, weight, recorded_on, notes)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(pet_id)
        .bind(weight)
        .bind(recorded_on)
        .bind(notes)
        .fetch_one(executor)
        .await?;
        Ok(log)
    }

    // =========================================================================
    //  RECEITAS
    // =========================================================================

    pub async fn create_prescription<'e, E>(
        &self,
        executor: E,
        consultation: &Consultation,
        emission_date: NaiveDate,
        expiration_date: NaiveDate,
        observations: &str,
    ) -> Result<Prescription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prescription = sqlx::query_as::<_, Prescription>(
            r#"
            INSERT INTO prescriptions (
                pet_id, practitioner_id, consultation_id, emission_date,
                expiration_date, observations, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'ACTIVE')
            RETURNING *
            "#,
        )
        .bind(consultation.pet_id)
        .bind(consultation.practitioner_id)
        .bind(consultation.id)
        .bind(emission_date)
        .bind(expiration_date)
        .bind(observations)
        .fetch_one(executor)
        .await?;
        Ok(prescription)
    }

    pub async fn add_prescription_line<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
        position: i32,
        line: &NewPrescriptionLine,
    ) -> Result<PrescriptionLine, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let line = sqlx::query_as::<_, PrescriptionLine>(
            r#"
            INSERT INTO prescription_lines (
                prescription_id, medication_id, position, dosage,
                frequency, duration, quantity, instructions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(prescription_id)
        .bind(line.medication_id)
        .bind(position)
        .bind(&line.dosage)
        .bind(&line.frequency)
        .bind(&line.duration)
        .bind(line.quantity)
        .bind(&line.instructions)
        .fetch_one(executor)
        .await?;
        Ok(line)
    }

    pub async fn lock_prescription<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
    ) -> Result<Option<Prescription>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prescription = sqlx::query_as::<_, Prescription>(
            "SELECT * FROM prescriptions WHERE id = $1 FOR UPDATE",
        )
        .bind(prescription_id)
        .fetch_optional(executor)
        .await?;
        Ok(prescription)
    }

    /// Linhas na ordem de inserção.
    pub async fn list_prescription_lines<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
    ) -> Result<Vec<PrescriptionLine>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lines = sqlx::query_as::<_, PrescriptionLine>(
            r#"
            SELECT * FROM prescription_lines
            WHERE prescription_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(prescription_id)
        .fetch_all(executor)
        .await?;
        Ok(lines)
    }

    pub async fn set_prescription_status<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
        status: PrescriptionStatus,
    ) -> Result<Prescription, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prescription = sqlx::query_as::<_, Prescription>(
            r#"
            UPDATE prescriptions
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(prescription_id)
        .bind(status)
        .fetch_one(executor)
        .await?;
        Ok(prescription)
    }

    /// Receita mais recente gerada a partir da consulta.
    pub async fn latest_prescription_for_consultation(
        &self,
        consultation_id: Uuid,
    ) -> Result<Option<Prescription>, AppError> {
        let prescription = sqlx::query_as::<_, Prescription>(
            r#"
            SELECT * FROM prescriptions
            WHERE consultation_id = $1
            ORDER BY emission_date DESC, created_at DESC
            LIMIT 1
            "#,
        )
        .bind(consultation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(prescription)
    }

    // =========================================================================
    //  VACINAÇÃO
    // =========================================================================

    pub async fn insert_vaccination<'e, E>(
        &self,
        executor: E,
        vaccination: &NewVaccination,
    ) -> Result<VaccinationRecord, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, VaccinationRecord>(
            r#"
            INSERT INTO vaccinations (
                pet_id, vaccine_id, practitioner_id, lot_id,
                applied_on, next_due_on, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(vaccination.pet_id)
        .bind(vaccination.vaccine_id)
        .bind(vaccination.practitioner_id)
        .bind(vaccination.lot_id)
        .bind(vaccination.applied_on)
        .bind(vaccination.next_due_on)
        .bind(vaccination.notes.as_deref())
        .fetch_one(executor)
        .await?;
        Ok(record)
    }
}
