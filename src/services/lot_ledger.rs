// src/services/lot_ledger.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::InventoryRepository,
    models::inventory::Lot,
};

/// Correção manual de saldo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Define o saldo diretamente.
    Set(i32),
    /// Soma (ou subtrai) um deslocamento ao saldo atual.
    Offset(i32),
}

/// Variação aplicada ao saldo de um lote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerChange {
    /// Entrada (+) ou saída (-). Saída nunca pode deixar o lote negativo.
    Delta(i32),
    /// Ajuste: ignora a checagem de estoque insuficiente.
    Adjust(Adjustment),
}

#[derive(Debug, Clone)]
pub struct LedgerOutcome {
    pub previous_quantity: i32,
    pub lot: Lot,
}

impl LedgerOutcome {
    /// Deslocamento efetivamente aplicado (com sinal).
    pub fn applied_delta(&self) -> i32 {
        self.lot.quantity - self.previous_quantity
    }
}

/// Calcula o novo saldo de um lote. Função pura: não toca no banco.
pub fn next_quantity(medication_id: Uuid, current: i32, change: LedgerChange) -> Result<i32, AppError> {
    match change {
        LedgerChange::Delta(delta) => {
            let next = current
                .checked_add(delta)
                .ok_or_else(|| AppError::InvalidMovement("quantity overflow".into()))?;
            if next < 0 {
                return Err(AppError::InsufficientStock {
                    medication_id,
                    requested: delta.saturating_neg(),
                    available: current,
                });
            }
            Ok(next)
        }
        LedgerChange::Adjust(Adjustment::Set(value)) => {
            if value < 0 {
                return Err(AppError::InvalidMovement(format!(
                    "adjusted quantity cannot be negative ({value})"
                )));
            }
            Ok(value)
        }
        LedgerChange::Adjust(Adjustment::Offset(offset)) => {
            if offset == 0 {
                return Err(AppError::InvalidMovement("adjustment offset cannot be zero".into()));
            }
            let next = current
                .checked_add(offset)
                .ok_or_else(|| AppError::InvalidMovement("quantity overflow".into()))?;
            if next < 0 {
                return Err(AppError::InvalidMovement(format!(
                    "adjustment would leave the lot at {next}"
                )));
            }
            Ok(next)
        }
    }
}

/// Saldo por lote. Toda leitura-checagem-escrita acontece sob `FOR UPDATE`.
#[derive(Clone)]
pub struct LotLedger {
    repo: InventoryRepository,
}

impl LotLedger {
    pub fn new(repo: InventoryRepository) -> Self {
        Self { repo }
    }

    pub async fn quantity_on_hand(&self, conn: &mut PgConnection, lot_id: Uuid) -> Result<i32, AppError> {
        let lot = self
            .repo
            .find_lot(&mut *conn, lot_id)
            .await?
            .ok_or(AppError::NotFound { entity: "lot", id: lot_id })?;
        Ok(lot.quantity)
    }

    /// Trava o lote, calcula o novo saldo e grava. O efeito só é visível após o commit do chamador.
    pub async fn apply(
        &self,
        conn: &mut PgConnection,
        medication_id: Uuid,
        lot_id: Uuid,
        change: LedgerChange,
    ) -> Result<LedgerOutcome, AppError> {
        let lot = self
            .repo
            .lock_lot(&mut *conn, medication_id, lot_id)
            .await?
            .ok_or(AppError::NotFound { entity: "lot", id: lot_id })?;

        let previous_quantity = lot.quantity;
        let next = next_quantity(medication_id, previous_quantity, change)?;

        let lot = self.repo.set_lot_quantity(&mut *conn, lot_id, next).await?;

        tracing::debug!(%lot_id, previous_quantity, quantity = next, "Saldo do lote atualizado");
        Ok(LedgerOutcome { previous_quantity, lot })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn med() -> Uuid {
        Uuid::nil()
    }

    #[test]
    fn entry_adds_to_quantity() {
        assert_eq!(next_quantity(med(), 0, LedgerChange::Delta(50)).unwrap(), 50);
    }

    #[test]
    fn exit_down_to_zero_is_allowed() {
        assert_eq!(next_quantity(med(), 8, LedgerChange::Delta(-8)).unwrap(), 0);
    }

    #[test]
    fn overdrawing_exit_is_insufficient_stock() {
        let err = next_quantity(med(), 5, LedgerChange::Delta(-8)).unwrap_err();
        match err {
            AppError::InsufficientStock { requested, available, .. } => {
                assert_eq!(requested, 8);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn set_adjustment_ignores_current_quantity() {
        let change = LedgerChange::Adjust(Adjustment::Set(3));
        assert_eq!(next_quantity(med(), 40, change).unwrap(), 3);
        assert_eq!(next_quantity(med(), 0, LedgerChange::Adjust(Adjustment::Set(0))).unwrap(), 0);
    }

    #[test]
    fn negative_offset_bypasses_stock_check_but_not_zero_floor() {
        let change = LedgerChange::Adjust(Adjustment::Offset(-4));
        assert_eq!(next_quantity(med(), 4, change).unwrap(), 0);

        let err = next_quantity(med(), 3, change).unwrap_err();
        assert!(matches!(err, AppError::InvalidMovement(_)));
    }

    #[test]
    fn invalid_adjustments_are_rejected() {
        assert!(matches!(
            next_quantity(med(), 10, LedgerChange::Adjust(Adjustment::Set(-1))),
            Err(AppError::InvalidMovement(_))
        ));
        assert!(matches!(
            next_quantity(med(), 10, LedgerChange::Adjust(Adjustment::Offset(0))),
            Err(AppError::InvalidMovement(_))
        ));
    }

    #[test]
    fn overflow_is_an_invalid_movement() {
        let err = next_quantity(med(), i32::MAX, LedgerChange::Delta(1)).unwrap_err();
        assert!(matches!(err, AppError::InvalidMovement(_)));
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Entry(i32),
        Exit(i32),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![(1..200i32).prop_map(Op::Entry), (1..200i32).prop_map(Op::Exit)]
    }

    proptest! {
        // Saldo final = entradas - saídas aplicadas; saídas rejeitadas não mudam nada.
        #[test]
        fn final_quantity_is_entries_minus_applied_exits(ops in prop::collection::vec(op(), 0..60)) {
            let mut quantity = 0;
            let mut entries = 0;
            let mut applied_exits = 0;

            for op in ops {
                match op {
                    Op::Entry(q) => {
                        quantity = next_quantity(med(), quantity, LedgerChange::Delta(q)).unwrap();
                        entries += q;
                    }
                    Op::Exit(q) => match next_quantity(med(), quantity, LedgerChange::Delta(-q)) {
                        Ok(next) => {
                            quantity = next;
                            applied_exits += q;
                        }
                        Err(AppError::InsufficientStock { available, .. }) => {
                            prop_assert_eq!(available, quantity);
                        }
                        Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                    },
                }
                prop_assert!(quantity >= 0);
            }

            prop_assert_eq!(quantity, entries - applied_exits);
        }
    }
}
