// src/services/movement_recorder.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{InventoryRepository, MovementInsert},
    models::inventory::{Lot, Movement, MovementKind},
    services::lot_ledger::{Adjustment, LedgerChange, LotLedger},
};

/// Tipo + quantidade de uma movimentação.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    Entry(i32),
    Exit(i32),
    Adjustment(Adjustment),
}

impl StockChange {
    pub fn kind(self) -> MovementKind {
        match self {
            StockChange::Entry(_) => MovementKind::Entry,
            StockChange::Exit(_) => MovementKind::Exit,
            StockChange::Adjustment(_) => MovementKind::Adjustment,
        }
    }

    fn ledger_change(self) -> LedgerChange {
        match self {
            StockChange::Entry(q) => LedgerChange::Delta(q),
            StockChange::Exit(q) => LedgerChange::Delta(-q),
            StockChange::Adjustment(adjustment) => LedgerChange::Adjust(adjustment),
        }
    }

    // Quantidade gravada quando o saldo não é alterado.
    fn recorded_quantity(self) -> i32 {
        match self {
            StockChange::Entry(q) | StockChange::Exit(q) => q,
            StockChange::Adjustment(Adjustment::Set(v)) | StockChange::Adjustment(Adjustment::Offset(v)) => v,
        }
    }
}

/// Checagens que não dependem do saldo.
pub fn validate_change(change: StockChange) -> Result<(), AppError> {
    match change {
        StockChange::Entry(q) | StockChange::Exit(q) if q <= 0 => Err(AppError::InvalidMovement(
            format!("{:?} quantity must be positive, got {q}", change.kind()),
        )),
        StockChange::Adjustment(Adjustment::Set(v)) if v < 0 => Err(AppError::InvalidMovement(
            format!("adjusted quantity cannot be negative ({v})"),
        )),
        StockChange::Adjustment(Adjustment::Offset(0)) => {
            Err(AppError::InvalidMovement("adjustment offset cannot be zero".into()))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub medication_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub change: StockChange,
    pub actor_id: Uuid,
    pub reason: &'a str,
    pub reference_document: Option<&'a str>,
    pub affects_stock: bool,
}

#[derive(Debug, Clone)]
pub struct RecordedMovement {
    pub movement: Movement,
    /// Lote já com o novo saldo (quando a movimentação afetou estoque).
    pub lot: Option<Lot>,
}

#[derive(Clone)]
pub struct MovementRecorder {
    repo: InventoryRepository,
    ledger: LotLedger,
}

impl MovementRecorder {
    pub fn new(repo: InventoryRepository, ledger: LotLedger) -> Self {
        Self { repo, ledger }
    }

    /// Aplica o efeito no saldo (se houver) e grava a movimentação, na mesma conexão/transação.
    pub async fn record(
        &self,
        conn: &mut PgConnection,
        new: NewMovement<'_>,
    ) -> Result<RecordedMovement, AppError> {
        validate_change(new.change)?;

        let (quantity, lot) = match (new.affects_stock, new.lot_id) {
            (true, Some(lot_id)) => {
                let outcome = self
                    .ledger
                    .apply(&mut *conn, new.medication_id, lot_id, new.change.ledger_change())
                    .await?;
                let quantity = match new.change {
                    StockChange::Adjustment(_) => outcome.applied_delta(),
                    other => other.recorded_quantity(),
                };
                (quantity, Some(outcome.lot))
            }
            _ => (new.change.recorded_quantity(), None),
        };

        let movement = self
            .repo
            .insert_movement(
                &mut *conn,
                &MovementInsert {
                    medication_id: new.medication_id,
                    lot_id: new.lot_id,
                    kind: new.change.kind(),
                    quantity,
                    actor_id: new.actor_id,
                    reference_document: new.reference_document,
                    reason: new.reason,
                    affects_stock: new.affects_stock,
                },
            )
            .await?;

        Ok(RecordedMovement { movement, lot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_and_exit_need_positive_quantity() {
        for change in [StockChange::Entry(0), StockChange::Exit(-3)] {
            assert!(matches!(validate_change(change), Err(AppError::InvalidMovement(_))));
        }
        assert!(validate_change(StockChange::Entry(1)).is_ok());
        assert!(validate_change(StockChange::Exit(50)).is_ok());
    }

    #[test]
    fn adjustments_accept_negative_offsets() {
        assert!(validate_change(StockChange::Adjustment(Adjustment::Offset(-5))).is_ok());
        assert!(validate_change(StockChange::Adjustment(Adjustment::Set(0))).is_ok());
        assert!(validate_change(StockChange::Adjustment(Adjustment::Offset(0))).is_err());
        assert!(validate_change(StockChange::Adjustment(Adjustment::Set(-2))).is_err());
    }

    #[test]
    fn exit_becomes_negative_ledger_delta() {
        assert_eq!(StockChange::Exit(8).ledger_change(), LedgerChange::Delta(-8));
        assert_eq!(StockChange::Entry(50).ledger_change(), LedgerChange::Delta(50));
        assert_eq!(StockChange::Exit(8).kind(), MovementKind::Exit);
    }
}
