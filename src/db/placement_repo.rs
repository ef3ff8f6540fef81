// src/db/placement_repo.rs

use chrono::NaiveDateTime;
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::{db_utils::live, error::AppError},
    models::{
        fabric::{PlacementKind, PlacementRef},
        movement::{NewPlacementLog, PlacementLog},
    },
};

/// Blocks/racks reference data, the per-stage placement logs and the rack
/// relocation log.
#[derive(Clone)]
pub struct PlacementRepository {
    pool: PgPool,
}

impl PlacementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Reference data
    // ---

    pub async fn list(&self, kind: PlacementKind) -> Result<Vec<PlacementRef>, AppError> {
        let query = format!(
            "SELECT p.id, p.name FROM {} p WHERE {} ORDER BY p.name ASC",
            kind.table(),
            live("p")
        );

        let rows = sqlx::query_as::<_, PlacementRef>(&query)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn find_rack_by_name(&self, name: &str) -> Result<Option<PlacementRef>, AppError> {
        let query = format!(
            "SELECT p.id, p.name FROM {} p WHERE p.name = $1 AND {} LIMIT 1",
            PlacementKind::Rack.table(),
            live("p")
        );

        let rack = sqlx::query_as::<_, PlacementRef>(&query)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(rack)
    }

    pub async fn exists<'e, E>(
        &self,
        executor: E,
        kind: PlacementKind,
        id: i64,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "SELECT EXISTS (SELECT 1 FROM {} p WHERE p.id = $1 AND {})",
            kind.table(),
            live("p")
        );

        let found = sqlx::query_scalar::<_, bool>(&query)
            .bind(id)
            .fetch_one(executor)
            .await?;

        Ok(found)
    }

    // ---
    // Placement logs
    // ---

    pub async fn create_log<'e, E>(
        &self,
        executor: E,
        log: &NewPlacementLog,
        actor_id: i64,
        at: NaiveDateTime,
    ) -> Result<PlacementLog, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let logged = match log {
            NewPlacementLog::Storage {
                fabric_id,
                block_id,
                rack_id,
            } => {
                let id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO fabric_storages (fabric_id, block_id, rack_id, actor_id, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $5, $5)
                    RETURNING id
                    "#,
                )
                .bind(fabric_id)
                .bind(block_id)
                .bind(rack_id)
                .bind(actor_id)
                .bind(at)
                .fetch_one(executor)
                .await
                .map_err(|e| AppError::from_write(e, "fabric storage log"))?;
                PlacementLog::Storage(id)
            }
            NewPlacementLog::Relaxation {
                fabric_id,
                relaxation_block_id,
                relaxation_rack_id,
                finish_date,
            } => {
                let id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO fabric_relaxations (
                        fabric_id, relaxation_block_id, relaxation_rack_id, finish_date,
                        actor_id, created_at, updated_at
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $6)
                    RETURNING id
                    "#,
                )
                .bind(fabric_id)
                .bind(relaxation_block_id)
                .bind(relaxation_rack_id)
                .bind(finish_date)
                .bind(actor_id)
                .bind(at)
                .fetch_one(executor)
                .await
                .map_err(|e| AppError::from_write(e, "fabric relaxation log"))?;
                PlacementLog::Relaxation(id)
            }
            NewPlacementLog::Control { fabric_id, result } => {
                let id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO fabric_controls (fabric_id, result, actor_id, created_at, updated_at)
                    VALUES ($1, $2, $3, $4, $4)
                    RETURNING id
                    "#,
                )
                .bind(fabric_id)
                .bind(result.as_str())
                .bind(actor_id)
                .bind(at)
                .fetch_one(executor)
                .await
                .map_err(|e| AppError::from_write(e, "fabric control log"))?;
                PlacementLog::Control(id)
            }
        };

        Ok(logged)
    }

    pub async fn link_log<'e, E>(
        &self,
        executor: E,
        log: PlacementLog,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "UPDATE {} SET inventory_movement_id = $1, updated_at = $2 WHERE id = $3",
            log.table()
        );

        sqlx::query(&query)
            .bind(movement_id)
            .bind(at)
            .bind(log.id())
            .execute(executor)
            .await?;

        Ok(())
    }

    // ---
    // Rack relocation log
    // ---

    pub async fn archive_relocations<'e, E>(
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
            UPDATE fabric_rack_relocations
            SET is_archived = 1, updated_at = $1
            WHERE fabric_id = $2 AND is_archived IS NULL AND deleted_at IS NULL
            "#,
        )
        .bind(at)
        .bind(fabric_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn create_relocation<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        current_rack_id: i64,
        new_rack_id: i64,
        actor_id: i64,
        at: NaiveDateTime,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO fabric_rack_relocations (
                fabric_id, current_rack_id, new_rack_id, actor_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $5)
            RETURNING id
            "#,
        )
        .bind(fabric_id)
        .bind(current_rack_id)
        .bind(new_rack_id)
        .bind(actor_id)
        .bind(at)
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::from_write(e, "fabric rack relocation log"))
    }
}
