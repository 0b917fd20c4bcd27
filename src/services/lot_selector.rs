// src/services/lot_selector.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{common::error::AppError, db::InventoryRepository, models::inventory::Lot};

/// Quanto tirar de qual lote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotAllocation {
    pub lot_id: Uuid,
    pub quantity: i32,
}

/// FEFO de lote único: entre os lotes que cobrem sozinhos a quantidade,
/// o de validade mais próxima (empate pelo id). Não divide entre lotes.
pub fn choose_lot(medication_id: Uuid, lots: &[Lot], required: i32) -> Result<LotAllocation, AppError> {
    if required <= 0 {
        return Err(AppError::InvalidMovement(format!(
            "required quantity must be positive, got {required}"
        )));
    }

    lots.iter()
        .filter(|lot| lot.medication_id == medication_id && lot.quantity >= required)
        .min_by_key(|lot| (lot.expiration_date, lot.id))
        .map(|lot| LotAllocation {
            lot_id: lot.id,
            quantity: required,
        })
        .ok_or_else(|| AppError::InsufficientStock {
            medication_id,
            requested: required,
            // Maior saldo de um único lote
            available: lots
                .iter()
                .filter(|lot| lot.medication_id == medication_id)
                .map(|lot| lot.quantity.max(0))
                .max()
                .unwrap_or(0),
        })
}

#[derive(Clone)]
pub struct LotSelector {
    repo: InventoryRepository,
}

impl LotSelector {
    pub fn new(repo: InventoryRepository) -> Self {
        Self { repo }
    }

    /// Trava os lotes com saldo (ordem FEFO) e escolhe de onde deduzir.
    pub async fn select(
        &self,
        conn: &mut PgConnection,
        medication_id: Uuid,
        required: i32,
    ) -> Result<Vec<LotAllocation>, AppError> {
        let lots = self.repo.lock_available_lots(&mut *conn, medication_id).await?;
        let allocation = choose_lot(medication_id, &lots, required)?;
        Ok(vec![allocation])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn medication() -> Uuid {
        Uuid::from_u128(7)
    }

    fn lot(id: u128, quantity: i32, expiration: NaiveDate) -> Lot {
        Lot {
            id: Uuid::from_u128(id),
            medication_id: medication(),
            supplier_id: Uuid::nil(),
            lot_number: format!("L-{id}"),
            expiration_date: expiration,
            intake_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            quantity,
            purchase_price: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn picks_soonest_expiring_lot_that_covers_the_line() {
        let lots = vec![lot(1, 10, date(2025, 1, 1)), lot(2, 5, date(2025, 6, 1))];

        let chosen = choose_lot(medication(), &lots, 8).unwrap();

        assert_eq!(chosen.lot_id, Uuid::from_u128(1));
        assert_eq!(chosen.quantity, 8);
    }

    #[test]
    fn no_single_lot_covering_is_insufficient_stock() {
        // Depois da primeira dispensação: A ficou com 2, B com 5.
        let lots = vec![lot(1, 2, date(2025, 1, 1)), lot(2, 5, date(2025, 6, 1))];

        let err = choose_lot(medication(), &lots, 8).unwrap_err();

        match err {
            AppError::InsufficientStock { medication_id, requested, available } => {
                assert_eq!(medication_id, medication());
                assert_eq!(requested, 8);
                assert_eq!(available, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn skips_earlier_lot_that_is_too_small() {
        let lots = vec![lot(1, 3, date(2025, 1, 1)), lot(2, 20, date(2025, 3, 1))];
        assert_eq!(choose_lot(medication(), &lots, 4).unwrap().lot_id, Uuid::from_u128(2));
    }

    #[test]
    fn empty_lots_and_bad_quantity() {
        assert!(matches!(
            choose_lot(medication(), &[], 1),
            Err(AppError::InsufficientStock { available: 0, .. })
        ));
        assert!(matches!(
            choose_lot(medication(), &[lot(1, 10, date(2025, 1, 1))], 0),
            Err(AppError::InvalidMovement(_))
        ));
    }

    proptest! {
        #[test]
        fn choice_is_earliest_expiring_sufficient_lot(
            specs in prop::collection::vec((0..30i32, 0..400i64), 1..12),
            required in 1..30i32,
        ) {
            let base = date(2025, 1, 1);
            let lots: Vec<Lot> = specs
                .iter()
                .enumerate()
                .map(|(i, (qty, days))| lot(i as u128 + 1, *qty, base + chrono::Duration::days(*days)))
                .collect();

            match choose_lot(medication(), &lots, required) {
                Ok(chosen) => {
                    let picked = lots.iter().find(|l| l.id == chosen.lot_id).unwrap();
                    prop_assert!(picked.quantity >= required);
                    for other in lots.iter().filter(|l| l.quantity >= required) {
                        prop_assert!(picked.expiration_date <= other.expiration_date);
                    }
                }
                Err(AppError::InsufficientStock { .. }) => {
                    prop_assert!(lots.iter().all(|l| l.quantity < required));
                }
                Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
            }
        }
    }
}
