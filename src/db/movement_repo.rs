// src/db/movement_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, Postgres};

use crate::{
    common::{
        db_utils::{clock_parts, live},
        error::AppError,
    },
    models::{
        movement::{NewEntry, NewMovement},
        stage::{MovementStatus, Stage},
    },
};

/// Inventory pointer and the movement/time/entry chain.
#[derive(Clone, Default)]
pub struct MovementRepository;

impl MovementRepository {
    pub fn new() -> Self {
        Self
    }

    // ---
    // Inventory pointer
    // ---

    pub async fn lock_inventory<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "SELECT i.id FROM inventories i WHERE i.fabric_id = $1 AND {} ORDER BY i.id DESC LIMIT 1 FOR UPDATE",
            live("i")
        );

        let id = sqlx::query_scalar::<_, i64>(&query)
            .bind(fabric_id)
            .fetch_optional(executor)
            .await?;

        Ok(id)
    }

    pub async fn create_inventory<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inventories (fabric_id, stage, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id
            "#,
        )
        .bind(fabric_id)
        .bind(stage.as_str())
        .bind(at)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_write(e, "inventory"))
    }

    pub async fn update_inventory_stage<'e, E>(
        &self,
        executor: E,
        inventory_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("UPDATE inventories SET stage = $1, updated_at = $2 WHERE id = $3")
            .bind(stage.as_str())
            .bind(at)
            .bind(inventory_id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn find_movement_type_id<'e, E>(
        &self,
        executor: E,
        name: &str,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM movement_types WHERE name = $1 ORDER BY id ASC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(executor)
        .await?;

        Ok(id)
    }

    // ---
    // Movements
    // ---

    pub async fn find_starting<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
    ) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "SELECT m.id FROM inventory_movements m WHERE m.fabric_id = $1 AND m.status = $2 AND {} ORDER BY m.id DESC LIMIT 1",
            live("m")
        );

        let id = sqlx::query_scalar::<_, i64>(&query)
            .bind(fabric_id)
            .bind(MovementStatus::Starting.as_str())
            .fetch_optional(executor)
            .await?;

        Ok(id)
    }

    pub async fn finish_starting<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        at: NaiveDateTime,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE inventory_movements
            SET status = $1, updated_at = $2
            WHERE fabric_id = $3 AND status = $4 AND deleted_at IS NULL
            "#,
        )
        .bind(MovementStatus::Finished.as_str())
        .bind(at)
        .bind(fabric_id)
        .bind(MovementStatus::Starting.as_str())
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_movement<'e, E>(
        &self,
        executor: E,
        movement: &NewMovement<'_>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO inventory_movements (
                datetime, inventory_id, movement_type_id, fabric_id,
                remarks, status, actor_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $1, $1)
            RETURNING id
            "#,
        )
        .bind(movement.at)
        .bind(movement.inventory_id)
        .bind(movement.movement_type_id)
        .bind(movement.fabric_id)
        .bind(movement.remarks)
        .bind(MovementStatus::Starting.as_str())
        .bind(movement.actor_id)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_write(e, "inventory movement"))
    }

    // ---
    // Movement times
    // ---

    pub async fn create_time<'e, E>(
        &self,
        executor: E,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (date, time) = clock_parts(at);
        sqlx::query(
            r#"
            INSERT INTO inventory_movement_times (
                inventory_movement_id, start_date, start_time, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $4)
            "#,
        )
        .bind(movement_id)
        .bind(date)
        .bind(time)
        .bind(at)
        .execute(executor)
        .await
        .map_err(|e| AppError::from_write(e, "inventory movement time"))?;

        Ok(())
    }

    pub async fn close_time<'e, E>(
        &self,
        executor: E,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let (date, time) = clock_parts(at);
        sqlx::query(
            r#"
            UPDATE inventory_movement_times
            SET finish_date = $1, finish_time = $2, updated_at = $3
            WHERE inventory_movement_id = $4 AND deleted_at IS NULL
            "#,
        )
        .bind(date)
        .bind(time)
        .bind(at)
        .bind(movement_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    // ---
    // Entries
    // ---

    pub async fn create_entry<'e, E>(&self, executor: E, entry: &NewEntry<'_>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO inventory_entries (
                inventory_movement_id, type, from_stage, to_stage, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $5)
            "#,
        )
        .bind(entry.movement_id)
        .bind(entry.entry_type.as_str())
        .bind(entry.from_stage)
        .bind(entry.to_stage.as_str())
        .bind(entry.at)
        .execute(executor)
        .await
        .map_err(|e| AppError::from_write(e, "inventory entry"))?;

        Ok(())
    }
}
