// src/services/inventory_service.rs

use sqlx::{Acquire, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{log_operation_failure, AppError},
    db::InventoryRepository,
    models::inventory::{
        EntryInput, EntryOutcome, ExitInput, Lot, LotSpec, Medication, Movement, StockAvailability,
    },
    services::{
        lot_ledger::Adjustment,
        lot_selector::{LotAllocation, LotSelector},
        movement_recorder::{MovementRecorder, NewMovement, StockChange},
    },
};

const DEFAULT_ENTRY_REASON: &str = "Inventory entry";
const DEFAULT_EXIT_REASON: &str = "Manual exit";

/// Monta o resumo de estoque: lotes com saldo (FEFO), total e alerta de mínimo.
pub fn summarize_stock(medication: Medication, lots: Vec<Lot>) -> StockAvailability {
    let total_stock: i64 = lots.iter().map(|lot| i64::from(lot.quantity)).sum();
    let low_stock = total_stock <= i64::from(medication.minimum_stock);
    StockAvailability {
        medication,
        total_stock,
        lots,
        low_stock,
    }
}

#[derive(Clone)]
pub struct InventoryService {
    inventory_repo: InventoryRepository,
    recorder: MovementRecorder,
    selector: LotSelector,
}

impl InventoryService {
    pub fn new(
        inventory_repo: InventoryRepository,
        recorder: MovementRecorder,
        selector: LotSelector,
    ) -> Self {
        Self {
            inventory_repo,
            recorder,
            selector,
        }
    }

    // --- ENTRADA (registrar_entrada) ---
    pub async fn register_entry<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
        input: EntryInput,
        actor_id: Uuid,
    ) -> Result<EntryOutcome, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let result = self.register_entry_tx(executor, medication_id, input, actor_id).await;
        match &result {
            Ok(outcome) => tracing::info!(
                operation = "register_entry",
                %medication_id,
                lot_id = %outcome.lot.id,
                quantity = outcome.movement.quantity,
                "📦 Entrada registrada"
            ),
            Err(e) => log_operation_failure("register_entry", medication_id, e),
        }
        result
    }

    async fn register_entry_tx<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
        input: EntryInput,
        actor_id: Uuid,
    ) -> Result<EntryOutcome, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        // Falha rápido antes de criar um lote.
        if input.quantity <= 0 {
            return Err(AppError::InvalidMovement(format!(
                "entry quantity must be positive, got {}",
                input.quantity
            )));
        }

        let mut tx = executor.begin().await?;

        self.inventory_repo
            .find_medication(&mut *tx, medication_id)
            .await?
            .ok_or(AppError::NotFound { entity: "medication", id: medication_id })?;

        // 1. Resolve o lote (existente deve ser do mesmo medicamento)
        let lot_id = match &input.lot {
            LotSpec::Existing(lot_id) => {
                self.inventory_repo
                    .lock_lot(&mut *tx, medication_id, *lot_id)
                    .await?
                    .ok_or(AppError::NotFound { entity: "lot", id: *lot_id })?
                    .id
            }
            LotSpec::New(new_lot) => {
                self.inventory_repo
                    .create_lot(&mut *tx, medication_id, new_lot)
                    .await?
                    .id
            }
        };

        // 2. Movimentação + saldo
        let recorded = self
            .recorder
            .record(
                &mut *tx,
                NewMovement {
                    medication_id,
                    lot_id: Some(lot_id),
                    change: StockChange::Entry(input.quantity),
                    actor_id,
                    reason: input.reason.as_deref().unwrap_or(DEFAULT_ENTRY_REASON),
                    reference_document: input.reference_document.as_deref(),
                    affects_stock: true,
                },
            )
            .await?;

        let lot = recorded
            .lot
            .ok_or_else(|| anyhow::anyhow!("entry on lot {lot_id} did not return the lot"))?;

        tx.commit().await?;
        Ok(EntryOutcome {
            lot,
            movement: recorded.movement,
        })
    }

    // --- SAÍDA MANUAL ---
    pub async fn register_exit<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
        input: ExitInput,
        actor_id: Uuid,
    ) -> Result<Vec<Movement>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let result = self.register_exit_tx(executor, medication_id, input, actor_id).await;
        match &result {
            Ok(movements) => tracing::info!(
                operation = "register_exit",
                %medication_id,
                movements = movements.len(),
                "📤 Saída registrada"
            ),
            Err(e) => log_operation_failure("register_exit", medication_id, e),
        }
        result
    }

    async fn register_exit_tx<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
        input: ExitInput,
        actor_id: Uuid,
    ) -> Result<Vec<Movement>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        self.inventory_repo
            .find_medication(&mut *tx, medication_id)
            .await?
            .ok_or(AppError::NotFound { entity: "medication", id: medication_id })?;

        let allocations = match input.lot_id {
            Some(lot_id) => vec![LotAllocation {
                lot_id,
                quantity: input.quantity,
            }],
            None => {
                self.selector
                    .select(&mut *tx, medication_id, input.quantity)
                    .await?
            }
        };

        let reason = input.reason.as_deref().unwrap_or(DEFAULT_EXIT_REASON);
        let mut movements = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            let recorded = self
                .recorder
                .record(
                    &mut *tx,
                    NewMovement {
                        medication_id,
                        lot_id: Some(allocation.lot_id),
                        change: StockChange::Exit(allocation.quantity),
                        actor_id,
                        reason,
                        reference_document: input.reference_document.as_deref(),
                        affects_stock: true,
                    },
                )
                .await?;
            movements.push(recorded.movement);
        }

        tx.commit().await?;
        Ok(movements)
    }

    // --- AJUSTE (correção manual) ---
    pub async fn register_adjustment<'e, E>(
        &self,
        executor: E,
        lot_id: Uuid,
        adjustment: Adjustment,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Movement, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let result = self
            .register_adjustment_tx(executor, lot_id, adjustment, reason, actor_id)
            .await;
        match &result {
            Ok(movement) => tracing::info!(
                operation = "register_adjustment",
                %lot_id,
                applied = movement.quantity,
                "🛠️ Ajuste registrado"
            ),
            Err(e) => log_operation_failure("register_adjustment", lot_id, e),
        }
        result
    }

    async fn register_adjustment_tx<'e, E>(
        &self,
        executor: E,
        lot_id: Uuid,
        adjustment: Adjustment,
        reason: &str,
        actor_id: Uuid,
    ) -> Result<Movement, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        if reason.trim().is_empty() {
            return Err(AppError::InvalidMovement("adjustment reason is required".into()));
        }

        let mut tx = executor.begin().await?;

        let lot = self
            .inventory_repo
            .find_lot(&mut *tx, lot_id)
            .await?
            .ok_or(AppError::NotFound { entity: "lot", id: lot_id })?;

        let recorded = self
            .recorder
            .record(
                &mut *tx,
                NewMovement {
                    medication_id: lot.medication_id,
                    lot_id: Some(lot_id),
                    change: StockChange::Adjustment(adjustment),
                    actor_id,
                    reason,
                    reference_document: None,
                    affects_stock: true,
                },
            )
            .await?;

        tx.commit().await?;
        Ok(recorded.movement)
    }

    // --- CONSULTAS (somente leitura) ---

    pub async fn stock_availability(
        &self,
        pool: &PgPool,
        medication_id: Uuid,
    ) -> Result<StockAvailability, AppError> {
        let medication = self
            .inventory_repo
            .find_medication(pool, medication_id)
            .await?
            .ok_or(AppError::NotFound { entity: "medication", id: medication_id })?;

        let lots = self.inventory_repo.list_available_lots(pool, medication_id).await?;
        Ok(summarize_stock(medication, lots))
    }

    pub async fn lot_movements(&self, pool: &PgPool, lot_id: Uuid) -> Result<Vec<Movement>, AppError> {
        self.inventory_repo
            .find_lot(pool, lot_id)
            .await?
            .ok_or(AppError::NotFound { entity: "lot", id: lot_id })?;

        self.inventory_repo.list_lot_movements(lot_id).await
    }
}
