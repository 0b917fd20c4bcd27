// src/services/dispensing_service.rs
//
// Operações clínicas que mexem no estoque. Cada método público é uma única
// transação: ou tudo é gravado, ou nada.

use chrono::{Days, NaiveDate, Utc};
use sqlx::{Acquire, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        error::{field_error, log_operation_failure, AppError},
        validation::{validate_temperature, validate_weight},
    },
    db::{ClinicalRepository, InventoryRepository},
    models::{
        clinical::{
            ClinicalFields, CompletedConsultation, ConsultationStatus, HistoryEntryFields,
            HistoryWriteKind, NewPrescriptionLine, NewVaccination, PrescriptionCompletion,
            PrescriptionDetail, PrescriptionStatus, VaccinationInput, VaccinationOutcome,
        },
        inventory::Movement,
    },
    services::{
        lot_selector::LotSelector,
        movement_recorder::{MovementRecorder, NewMovement, StockChange},
    },
};

// --- Regras puras ---

/// Ramo explícito do "upsert" da entrada de histórico, decidido pela chave da consulta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryEntryWrite {
    Create { history_id: Uuid },
    Update { entry_id: Uuid },
}

pub fn plan_history_write(existing_entry_id: Option<Uuid>, history_id: Uuid) -> HistoryEntryWrite {
    match existing_entry_id {
        Some(entry_id) => HistoryEntryWrite::Update { entry_id },
        None => HistoryEntryWrite::Create { history_id },
    }
}

/// Só receitas ACTIVE podem ser concluídas.
pub fn ensure_completable(prescription_id: Uuid, status: PrescriptionStatus) -> Result<(), AppError> {
    match status {
        PrescriptionStatus::Active => Ok(()),
        PrescriptionStatus::Completed => Err(AppError::AlreadyCompleted {
            entity: "prescription",
            id: prescription_id,
        }),
        PrescriptionStatus::Cancelled => Err(AppError::InvalidTransition {
            entity: "prescription",
            id: prescription_id,
            status: status.as_str().to_string(),
        }),
    }
}

/// COMPLETED e CANCELLED são terminais.
pub fn ensure_cancellable(prescription_id: Uuid, status: PrescriptionStatus) -> Result<(), AppError> {
    match status {
        PrescriptionStatus::Active => Ok(()),
        other => Err(AppError::InvalidTransition {
            entity: "prescription",
            id: prescription_id,
            status: other.as_str().to_string(),
        }),
    }
}

pub fn validate_clinical_fields(fields: &ClinicalFields) -> Result<(), AppError> {
    if fields.diagnosis.trim().is_empty() {
        return Err(field_error("diagnosis", "required", "Diagnosis is required."));
    }

    // Leituras fora do limite viram 400, não estouro de coluna no banco.
    let mut errors = validator::ValidationErrors::new();
    if let Some(Err(e)) = fields.temperature.as_ref().map(validate_temperature) {
        errors.add("temperature", e);
    }
    if let Some(Err(e)) = fields.weight.as_ref().map(validate_weight) {
        errors.add("weight", e);
    }
    if !errors.is_empty() {
        return Err(AppError::ValidationError(errors));
    }
    Ok(())
}

pub fn validate_prescription_lines(lines: &[NewPrescriptionLine]) -> Result<(), AppError> {
    if lines.is_empty() {
        return Err(field_error("lines", "required", "At least one medication line is required."));
    }
    if lines.iter().any(|line| line.quantity <= 0) {
        return Err(field_error("quantity", "range", "Quantity must be greater than zero."));
    }
    Ok(())
}

/// Próxima dose: aplicação + intervalo de revacinação (sem intervalo, sem data).
pub fn next_due_date(applied_on: NaiveDate, revaccination_interval: i32) -> Option<NaiveDate> {
    let days = u64::try_from(revaccination_interval).ok().filter(|d| *d > 0)?;
    applied_on.checked_add_days(Days::new(days))
}

#[derive(Clone)]
pub struct DispensingService {
    inventory_repo: InventoryRepository,
    clinical_repo: ClinicalRepository,
    recorder: MovementRecorder,
    selector: LotSelector,
    prescription_validity_days: u32,
}

impl DispensingService {
    pub fn new(
        inventory_repo: InventoryRepository,
        clinical_repo: ClinicalRepository,
        recorder: MovementRecorder,
        selector: LotSelector,
        prescription_validity_days: u32,
    ) -> Self {
        Self {
            inventory_repo,
            clinical_repo,
            recorder,
            selector,
            prescription_validity_days,
        }
    }

    // =========================================================================
    //  COMPLETAR RECEITA (completar_receta / marcar_completada)
    // =========================================================================

    /// Receitas com vários medicamentos podem travar lotes em ordens opostas.
    /// O Postgres aborta uma delas (40P01); essa é repetida uma única vez.
    pub async fn complete_prescription<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
        actor_id: Uuid,
    ) -> Result<PrescriptionCompletion, AppError>
    where
        E: Acquire<'e, Database = Postgres> + Copy,
    {
        let mut result = self
            .complete_prescription_tx(executor, prescription_id, actor_id)
            .await;
        if matches!(&result, Err(e) if e.is_deadlock()) {
            tracing::warn!(operation = "complete_prescription", %prescription_id, "🔁 Deadlock detectado, repetindo");
            result = self
                .complete_prescription_tx(executor, prescription_id, actor_id)
                .await;
        }
        match &result {
            Ok(completion) => tracing::info!(
                operation = "complete_prescription",
                %prescription_id,
                %actor_id,
                movements = completion.movements.len(),
                "💊 Receita dispensada"
            ),
            Err(e) => log_operation_failure("complete_prescription", prescription_id, e),
        }
        result
    }

    async fn complete_prescription_tx<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
        actor_id: Uuid,
    ) -> Result<PrescriptionCompletion, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // 1. Trava a receita (conclusões concorrentes esperam aqui)
        let prescription = self
            .clinical_repo
            .lock_prescription(&mut *tx, prescription_id)
            .await?
            .ok_or(AppError::NotFound { entity: "prescription", id: prescription_id })?;

        ensure_completable(prescription_id, prescription.status)?;

        // 2. Uma saída por linha, na ordem de inserção. Qualquer erro derruba a transação.
        let lines = self
            .clinical_repo
            .list_prescription_lines(&mut *tx, prescription_id)
            .await?;

        let reason = format!("Prescription {prescription_id}");
        let reference = prescription_id.to_string();
        let mut movements: Vec<Movement> = Vec::with_capacity(lines.len());

        for line in &lines {
            let allocations = self
                .selector
                .select(&mut *tx, line.medication_id, line.quantity)
                .await?;

            for allocation in allocations {
                let recorded = self
                    .recorder
                    .record(
                        &mut *tx,
                        NewMovement {
                            medication_id: line.medication_id,
                            lot_id: Some(allocation.lot_id),
                            change: StockChange::Exit(allocation.quantity),
                            actor_id,
                            reason: &reason,
                            reference_document: Some(reference.as_str()),
                            affects_stock: true,
                        },
                    )
                    .await?;
                movements.push(recorded.movement);
            }
        }

        // 3. Só depois de todas as linhas
        let prescription = self
            .clinical_repo
            .set_prescription_status(&mut *tx, prescription_id, PrescriptionStatus::Completed)
            .await?;

        tx.commit().await?;
        Ok(PrescriptionCompletion {
            prescription,
            movements,
        })
    }

    pub async fn cancel_prescription<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
    ) -> Result<PrescriptionDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let result = self.cancel_prescription_tx(executor, prescription_id).await;

        match &result {
            Ok(_) => tracing::info!(operation = "cancel_prescription", %prescription_id, "Receita cancelada"),
            Err(e) => log_operation_failure("cancel_prescription", prescription_id, e),
        }
        result
    }

    async fn cancel_prescription_tx<'e, E>(
        &self,
        executor: E,
        prescription_id: Uuid,
    ) -> Result<PrescriptionDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let prescription = self
            .clinical_repo
            .lock_prescription(&mut *tx, prescription_id)
            .await?
            .ok_or(AppError::NotFound { entity: "prescription", id: prescription_id })?;

        ensure_cancellable(prescription_id, prescription.status)?;

        let prescription = self
            .clinical_repo
            .set_prescription_status(&mut *tx, prescription_id, PrescriptionStatus::Cancelled)
            .await?;
        let lines = self
            .clinical_repo
            .list_prescription_lines(&mut *tx, prescription_id)
            .await?;

        tx.commit().await?;
        Ok(PrescriptionDetail { prescription, lines })
    }

    // =========================================================================
    //  COMPLETAR CONSULTA (completar_consulta)
    // =========================================================================

    pub async fn complete_consultation<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
        fields: ClinicalFields,
        actor_id: Uuid,
    ) -> Result<CompletedConsultation, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let result = self
            .complete_consultation_tx(executor, consultation_id, fields)
            .await;
        match &result {
            Ok(done) => tracing::info!(
                operation = "complete_consultation",
                %consultation_id,
                %actor_id,
                history_entry_id = %done.history_entry.id,
                history_write = ?done.history_write,
                "🩺 Consulta concluída"
            ),
            Err(e) => log_operation_failure("complete_consultation", consultation_id, e),
        }
        result
    }

    async fn complete_consultation_tx<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
        fields: ClinicalFields,
    ) -> Result<CompletedConsultation, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_clinical_fields(&fields)?;

        let mut tx = executor.begin().await?;

        // 1. Trava a consulta: duas conclusões simultâneas não duplicam o histórico.
        let current = self
            .clinical_repo
            .lock_consultation(&mut *tx, consultation_id)
            .await?
            .ok_or(AppError::NotFound { entity: "consultation", id: consultation_id })?;

        if current.status == ConsultationStatus::Cancelled {
            return Err(AppError::InvalidTransition {
                entity: "consultation",
                id: consultation_id,
                status: "CANCELLED".to_string(),
            });
        }

        // 2. Campos clínicos + status
        let consultation = self
            .clinical_repo
            .complete_consultation(&mut *tx, consultation_id, &fields)
            .await?;

        // 3. Cabeçalho do histórico (um por pet)
        let history = self
            .clinical_repo
            .upsert_medical_history(&mut *tx, consultation.pet_id, consultation.practitioner_id)
            .await?;

        // 4. Entrada do histórico, chaveada pela consulta
        let existing = self
            .clinical_repo
            .find_history_entry_by_consultation(&mut *tx, consultation_id)
            .await?;

        // A entrada é datada pela conclusão, não pelo agendamento.
        let completed_on = Utc::now().date_naive();
        let entry_fields = HistoryEntryFields {
            practitioner_id: consultation.practitioner_id,
            consultation_type: consultation.kind.history_label().to_string(),
            entry_date: completed_on,
            reason: consultation.reason.clone(),
            clinical: fields.clone(),
        };

        let (history_entry, history_write) = match plan_history_write(existing.map(|e| e.id), history.id) {
            HistoryEntryWrite::Create { history_id } => {
                let entry = self
                    .clinical_repo
                    .insert_history_entry(&mut *tx, history_id, consultation_id, &entry_fields)
                    .await?;
                (entry, HistoryWriteKind::Created)
            }
            HistoryEntryWrite::Update { entry_id } => {
                let entry = self
                    .clinical_repo
                    .update_history_entry(&mut *tx, entry_id, &entry_fields)
                    .await?;
                (entry, HistoryWriteKind::Updated)
            }
        };

        // 5. Peso (opcional)
        let weight_log = match fields.weight {
            Some(weight) => {
                let notes = format!("Consultation {consultation_id}");
                Some(
                    self.clinical_repo
                        .insert_weight_log(
                            &mut *tx,
                            consultation.pet_id,
                            weight,
                            completed_on,
                            Some(notes.as_str()),
                        )
                        .await?,
                )
            }
            None => None,
        };

        tx.commit().await?;
        Ok(CompletedConsultation {
            consultation,
            history_entry,
            history_write,
            weight_log,
        })
    }

    // =========================================================================
    //  REGISTRAR MEDICAMENTOS (registrar_medicamentos)
    // =========================================================================

    pub async fn register_prescription<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
        lines: Vec<NewPrescriptionLine>,
        observations: Option<String>,
    ) -> Result<PrescriptionDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let result = self
            .register_prescription_tx(executor, consultation_id, lines, observations)
            .await;
        match &result {
            Ok(detail) => tracing::info!(
                operation = "register_prescription",
                %consultation_id,
                prescription_id = %detail.prescription.id,
                lines = detail.lines.len(),
                "📝 Receita registrada"
            ),
            Err(e) => log_operation_failure("register_prescription", consultation_id, e),
        }
        result
    }

    async fn register_prescription_tx<'e, E>(
        &self,
        executor: E,
        consultation_id: Uuid,
        lines: Vec<NewPrescriptionLine>,
        observations: Option<String>,
    ) -> Result<PrescriptionDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        validate_prescription_lines(&lines)?;

        let mut tx = executor.begin().await?;

        let consultation = self
            .clinical_repo
            .find_consultation(&mut *tx, consultation_id)
            .await?
            .ok_or(AppError::NotFound { entity: "consultation", id: consultation_id })?;

        if consultation.status == ConsultationStatus::Cancelled {
            return Err(AppError::InvalidTransition {
                entity: "consultation",
                id: consultation_id,
                status: "CANCELLED".to_string(),
            });
        }

        for line in &lines {
            self.inventory_repo
                .find_medication(&mut *tx, line.medication_id)
                .await?
                .ok_or(AppError::NotFound { entity: "medication", id: line.medication_id })?;
        }

        let emission_date = Utc::now().date_naive();
        let expiration_date = emission_date
            .checked_add_days(Days::new(u64::from(self.prescription_validity_days)))
            .ok_or_else(|| anyhow::anyhow!("prescription expiration date out of range"))?;
        let observations = observations
            .unwrap_or_else(|| format!("Prescription generated from consultation {consultation_id}"));

        let prescription = self
            .clinical_repo
            .create_prescription(&mut *tx, &consultation, emission_date, expiration_date, &observations)
            .await?;

        let mut saved = Vec::with_capacity(lines.len());
        for (position, line) in (0_i32..).zip(lines.iter()) {
            saved.push(
                self.clinical_repo
                    .add_prescription_line(&mut *tx, prescription.id, position, line)
                    .await?,
            );
        }

        tx.commit().await?;
        Ok(PrescriptionDetail {
            prescription,
            lines: saved,
        })
    }

    /// Última receita gerada a partir da consulta, com as linhas.
    pub async fn consultation_prescription(
        &self,
        pool: &PgPool,
        consultation_id: Uuid,
    ) -> Result<PrescriptionDetail, AppError> {
        self.clinical_repo
            .find_consultation(pool, consultation_id)
            .await?
            .ok_or(AppError::NotFound { entity: "consultation", id: consultation_id })?;

        let prescription = self
            .clinical_repo
            .latest_prescription_for_consultation(consultation_id)
            .await?
            .ok_or(AppError::NotFound { entity: "prescription", id: consultation_id })?;

        let lines = self
            .clinical_repo
            .list_prescription_lines(pool, prescription.id)
            .await?;

        Ok(PrescriptionDetail { prescription, lines })
    }

    // =========================================================================
    //  VACINAÇÃO
    // =========================================================================

    pub async fn apply_vaccination<'e, E>(
        &self,
        executor: E,
        input: VaccinationInput,
        actor_id: Uuid,
    ) -> Result<VaccinationOutcome, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let pet_id = input.pet_id;
        let result = self.apply_vaccination_tx(executor, input, actor_id).await;
        match &result {
            Ok(outcome) => tracing::info!(
                operation = "apply_vaccination",
                %pet_id,
                vaccination_id = %outcome.vaccination.id,
                lot_id = %outcome.vaccination.lot_id,
                "💉 Vacina aplicada"
            ),
            Err(e) => log_operation_failure("apply_vaccination", pet_id, e),
        }
        result
    }

    async fn apply_vaccination_tx<'e, E>(
        &self,
        executor: E,
        input: VaccinationInput,
        actor_id: Uuid,
    ) -> Result<VaccinationOutcome, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let pet = self
            .clinical_repo
            .find_pet(&mut *tx, input.pet_id)
            .await?
            .ok_or(AppError::NotFound { entity: "pet", id: input.pet_id })?;

        let vaccine = self
            .clinical_repo
            .find_vaccine(&mut *tx, input.vaccine_id)
            .await?
            .ok_or(AppError::NotFound { entity: "vaccine", id: input.vaccine_id })?;

        // O lote é escolhido pelo chamador (sem FEFO aqui).
        let lot = self
            .inventory_repo
            .find_lot(&mut *tx, input.lot_id)
            .await?
            .ok_or(AppError::NotFound { entity: "lot", id: input.lot_id })?;

        let next_due_on = input
            .next_due_on
            .or_else(|| next_due_date(input.applied_on, vaccine.revaccination_interval));

        let vaccination = self
            .clinical_repo
            .insert_vaccination(
                &mut *tx,
                &NewVaccination {
                    pet_id: pet.id,
                    vaccine_id: vaccine.id,
                    practitioner_id: input.practitioner_id.unwrap_or(actor_id),
                    lot_id: lot.id,
                    applied_on: input.applied_on,
                    next_due_on,
                    notes: input.notes,
                },
            )
            .await?;

        // Uma dose por aplicação
        let reason = format!("Vaccination {} for pet {}", vaccine.name, pet.name);
        let reference = vaccination.id.to_string();
        let recorded = self
            .recorder
            .record(
                &mut *tx,
                NewMovement {
                    medication_id: lot.medication_id,
                    lot_id: Some(lot.id),
                    change: StockChange::Exit(1),
                    actor_id,
                    reason: &reason,
                    reference_document: Some(reference.as_str()),
                    affects_stock: true,
                },
            )
            .await?;

        tx.commit().await?;
        Ok(VaccinationOutcome {
            vaccination,
            movement: recorded.movement,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn line(quantity: i32) -> NewPrescriptionLine {
        NewPrescriptionLine {
            medication_id: Uuid::new_v4(),
            dosage: "1 comprimido".into(),
            frequency: "cada 12 horas".into(),
            duration: "7 días".into(),
            quantity,
            instructions: String::new(),
        }
    }

    #[test]
    fn existing_entry_is_updated_not_duplicated() {
        let history_id = Uuid::new_v4();
        let entry_id = Uuid::new_v4();

        assert_eq!(
            plan_history_write(None, history_id),
            HistoryEntryWrite::Create { history_id }
        );
        assert_eq!(
            plan_history_write(Some(entry_id), history_id),
            HistoryEntryWrite::Update { entry_id }
        );
    }

    #[test]
    fn only_active_prescriptions_complete() {
        let id = Uuid::new_v4();

        assert!(ensure_completable(id, PrescriptionStatus::Active).is_ok());
        assert!(matches!(
            ensure_completable(id, PrescriptionStatus::Completed),
            Err(AppError::AlreadyCompleted { entity: "prescription", .. })
        ));
        assert!(matches!(
            ensure_completable(id, PrescriptionStatus::Cancelled),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn terminal_prescriptions_cannot_be_cancelled() {
        let id = Uuid::new_v4();

        assert!(ensure_cancellable(id, PrescriptionStatus::Active).is_ok());
        for status in [PrescriptionStatus::Completed, PrescriptionStatus::Cancelled] {
            match ensure_cancellable(id, status) {
                Err(AppError::InvalidTransition { status: s, .. }) => assert_eq!(s, status.as_str()),
                other => panic!("unexpected: {other:?}"),
            }
        }
    }

    #[test]
    fn blank_diagnosis_is_a_validation_error() {
        let fields = ClinicalFields {
            diagnosis: "   ".into(),
            ..Default::default()
        };

        match validate_clinical_fields(&fields) {
            Err(AppError::ValidationError(errors)) => {
                assert!(errors.field_errors().contains_key("diagnosis"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn overflowing_readings_are_validation_errors() {
        let fields = ClinicalFields {
            diagnosis: "Control anual".into(),
            temperature: Some(Decimal::new(10000, 1)),
            weight: Some(Decimal::new(100000, 1)),
            ..Default::default()
        };

        match validate_clinical_fields(&fields) {
            Err(AppError::ValidationError(errors)) => {
                let fields = errors.field_errors();
                assert!(fields.contains_key("temperature"));
                assert!(fields.contains_key("weight"));
            }
            other => panic!("unexpected: {other:?}"),
        }

        let normal = ClinicalFields {
            diagnosis: "Control anual".into(),
            temperature: Some(Decimal::new(385, 1)),
            weight: Some(Decimal::new(1240, 2)),
            ..Default::default()
        };
        assert!(validate_clinical_fields(&normal).is_ok());
    }

    #[test]
    fn prescription_needs_lines_with_positive_quantity() {
        assert!(validate_prescription_lines(&[]).is_err());
        assert!(validate_prescription_lines(&[line(2), line(0)]).is_err());
        assert!(validate_prescription_lines(&[line(1), line(14)]).is_ok());
    }

    #[test]
    fn next_due_date_uses_revaccination_interval() {
        let applied = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();

        assert_eq!(
            next_due_date(applied, 365),
            NaiveDate::from_ymd_opt(2026, 3, 1)
        );
        assert_eq!(next_due_date(applied, 0), None);
        assert_eq!(next_due_date(applied, -10), None);
    }
}
