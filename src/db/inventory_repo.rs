// src/db/inventory_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::inventory::{Lot, Medication, Movement, MovementKind, NewLot},
};

/// Linha a ser gravada no livro-razão de movimentações.
#[derive(Debug, Clone)]
pub struct MovementInsert<'a> {
    pub medication_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub kind: MovementKind,
    pub quantity: i32,
    pub actor_id: Uuid,
    pub reference_document: Option<&'a str>,
    pub reason: &'a str,
    pub affects_stock: bool,
}

#[derive(Clone)]
pub struct InventoryRepository {
    pool: PgPool,
}

impl InventoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Leituras
    // ---

    pub async fn find_medication<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
    ) -> Result<Option<Medication>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let medication = sqlx::query_as::<_, Medication>("SELECT * FROM medications WHERE id = $1")
            .bind(medication_id)
            .fetch_optional(executor)
            .await?;
        Ok(medication)
    }

    pub async fn find_lot<'e, E>(&self, executor: E, lot_id: Uuid) -> Result<Option<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>("SELECT * FROM lots WHERE id = $1")
            .bind(lot_id)
            .fetch_optional(executor)
            .await?;
        Ok(lot)
    }

    /// Lotes com saldo, do que vence primeiro ao que vence por último (sem lock).
    pub async fn list_available_lots<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
    ) -> Result<Vec<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, Lot>(
            r#"
            SELECT * FROM lots
            WHERE medication_id = $1 AND quantity > 0
            ORDER BY expiration_date ASC, id ASC
            "#,
        )
        .bind(medication_id)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    // Histórico é só leitura: usa a pool principal.
    pub async fn list_lot_movements(&self, lot_id: Uuid) -> Result<Vec<Movement>, AppError> {
        let movements = sqlx::query_as::<_, Movement>(
            r#"
            SELECT * FROM movements
            WHERE lot_id = $1
            ORDER BY occurred_at DESC, id DESC
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    // ---
    // Locks (SELECT ... FOR UPDATE) - só fazem sentido dentro de uma transação
    // ---

    /// Trava a linha do lote. Retorna None se o lote não existe ou é de outro medicamento.
    pub async fn lock_lot<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
        lot_id: Uuid,
    ) -> Result<Option<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(
            "SELECT * FROM lots WHERE id = $1 AND medication_id = $2 FOR UPDATE",
        )
        .bind(lot_id)
        .bind(medication_id)
        .fetch_optional(executor)
        .await?;
        Ok(lot)
    }

    /// Trava todos os lotes com saldo do medicamento, na ordem FEFO.
    /// A ordem fixa (validade, id) evita deadlock entre dispensações concorrentes.
    pub async fn lock_available_lots<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
    ) -> Result<Vec<Lot>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lots = sqlx::query_as::<_, Lot>(
            r#"
            SELECT * FROM lots
            WHERE medication_id = $1 AND quantity > 0
            ORDER BY expiration_date ASC, id ASC
            FOR UPDATE
            "#,
        )
        .bind(medication_id)
        .fetch_all(executor)
        .await?;
        Ok(lots)
    }

    // ---
    // Escritas (transacionais)
    // ---

    /// Cria um lote com quantidade zero; o saldo entra depois via movimentação.
    pub async fn create_lot<'e, E>(
        &self,
        executor: E,
        medication_id: Uuid,
        new_lot: &NewLot,
    ) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Lot>(
            r#"
            INSERT INTO lots (medication_id, supplier_id, lot_number, expiration_date, intake_date, quantity, purchase_price)
            VALUES ($1, $2, $3, $4, CURRENT_DATE, 0, $5)
            RETURNING *
            "#,
        )
        .bind(medication_id)
        .bind(new_lot.supplier_id)
        .bind(&new_lot.lot_number)
        .bind(new_lot.expiration_date)
        .bind(new_lot.purchase_price)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            map_unique_violation(e, || {
                format!(
                    "lot number '{}' already exists for medication {}",
                    new_lot.lot_number, medication_id
                )
            })
        })
    }

    pub async fn set_lot_quantity<'e, E>(
        &self,
        executor: E,
        lot_id: Uuid,
        quantity: i32,
    ) -> Result<Lot, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lot = sqlx::query_as::<_, Lot>(
            r#"
            UPDATE lots
            SET quantity = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(lot_id)
        .bind(quantity)
        .fetch_one(executor)
        .await?;
        Ok(lot)
    }

    /// Grava uma movimentação. Não existe UPDATE/DELETE para esta tabela.
    pub async fn insert_movement<'e, E>(
        &self,
        executor: E,
        movement: &MovementInsert<'_>,
    ) -> Result<Movement, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let movement = sqlx::query_as::<_, Movement>(
            r#"
            INSERT INTO movements (
                medication_id, lot_id, kind, quantity, occurred_at,
                actor_id, reference_document, reason, affects_stock
            )
            VALUES ($1, $2, $3, $4, clock_timestamp(), $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(movement.medication_id)
        .bind(movement.lot_id)
        .bind(movement.kind)
        .bind(movement.quantity)
        .bind(movement.actor_id)
        .bind(movement.reference_document)
        .bind(movement.reason)
        .bind(movement.affects_stock)
        .fetch_one(executor)
        .await?;
        Ok(movement)
    }
}
