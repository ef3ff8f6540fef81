// src/db/fabric_repo.rs

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{Executor, PgPool, Postgres};

use crate::{
    common::{db_utils::live, error::AppError},
    models::{
        fabric::{FabricInventory, RackFabric},
        stage::QcResult,
    },
};

// Columns of `Fabric`, with buyer/style resolved through the incoming order.
const FABRIC_COLUMNS: &str = r#"
    f.id, f.code,
    COALESCE(f.color, '') AS color,
    COALESCE(f.lot, '') AS lot,
    COALESCE(f.roll, '') AS roll,
    COALESCE(f.weight, '') AS weight,
    f.width,
    COALESCE(f.yard, '') AS yard,
    f.rack_id, f.block_id, f.relaxation_rack_id, f.relaxation_block_id,
    f.finish_date, f.qc_result, f.status,
    COALESCE(b.name, '-') AS buyer,
    COALESCE(o.style, '-') AS style
"#;

const FABRIC_JOINS: &str = r#"
    FROM fabrics f
    LEFT JOIN fabric_incomings fi ON f.fabric_incoming_id = fi.id
    LEFT JOIN orders o ON fi.order_id = o.id
    LEFT JOIN buyers b ON o.buyer_id = b.id
"#;

#[derive(Clone)]
pub struct FabricRepository {
    pool: PgPool,
}

impl FabricRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Reads
    // ---

    pub async fn find_by_code(&self, code: &str) -> Result<Option<FabricInventory>, AppError> {
        self.find_by_code_with_inventory(&self.pool, code).await
    }

    /// Locks the live fabric row until the surrounding transaction ends, so
    /// concurrent transitions of the same roll run one after the other.
    ///
    /// Only the lock is taken here. Under READ COMMITTED a statement that
    /// waited for the lock still reads joined rows from its starting
    /// snapshot, so the inventory stage must be read by a later statement.
    pub async fn lock_by_code<'e, E>(&self, executor: E, code: &str) -> Result<Option<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "SELECT f.id FROM fabrics f WHERE f.code = $1 AND {} ORDER BY f.id ASC LIMIT 1 FOR UPDATE",
            live("f")
        );

        let id = sqlx::query_scalar::<_, i64>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await?;

        Ok(id)
    }

    /// Fabric joined with its live inventory row.
    pub async fn find_by_code_with_inventory<'e, E>(
        &self,
        executor: E,
        code: &str,
    ) -> Result<Option<FabricInventory>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            r#"
            SELECT {FABRIC_COLUMNS}, i.id AS inventory_id, i.stage AS stage
            {FABRIC_JOINS}
            LEFT JOIN inventories i ON i.fabric_id = f.id AND {inventory_live}
            WHERE f.code = $1 AND {fabric_live}
            ORDER BY f.id ASC, i.id DESC
            LIMIT 1
            "#,
            inventory_live = live("i"),
            fabric_live = live("f"),
        );

        let fabric = sqlx::query_as::<_, FabricInventory>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await?;

        Ok(fabric)
    }

    pub async fn list_on_rack(&self, rack_id: i64) -> Result<Vec<RackFabric>, AppError> {
        let query = format!(
            r#"
            SELECT {FABRIC_COLUMNS}, blk.name AS block_name
            {FABRIC_JOINS}
            LEFT JOIN m_blocks blk ON f.block_id = blk.id AND {block_live}
            WHERE f.rack_id = $1 AND {fabric_live}
            ORDER BY f.id ASC
            "#,
            block_live = live("blk"),
            fabric_live = live("f"),
        );

        let fabrics = sqlx::query_as::<_, RackFabric>(&query)
            .bind(rack_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(fabrics)
    }

    /// Ids of the live fabrics on a rack, locked in ascending id order.
    pub async fn lock_ids_on_rack<'e, E>(
        &self,
        executor: E,
        rack_id: i64,
    ) -> Result<Vec<i64>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let query = format!(
            "SELECT f.id FROM fabrics f WHERE f.rack_id = $1 AND {} ORDER BY f.id ASC FOR UPDATE",
            live("f")
        );

        let ids = sqlx::query_scalar::<_, i64>(&query)
            .bind(rack_id)
            .fetch_all(executor)
            .await?;

        Ok(ids)
    }

    // ---
    // Writes (always inside the caller's transaction)
    // ---

    pub async fn update_storage<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        block_id: i64,
        rack_id: i64,
        yard: &str,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE fabrics
            SET block_id = $1, rack_id = $2, yard = $3, updated_at = $4
            WHERE id = $5 AND deleted_at IS NULL
            "#,
        )
        .bind(block_id)
        .bind(rack_id)
        .bind(yard)
        .bind(at)
        .bind(fabric_id)
        .execute(executor)
        .await
        .map_err(|e| AppError::from_write(e, "fabric storage placement"))?;

        Ok(())
    }

    pub async fn update_relaxation<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        relaxation_block_id: i64,
        relaxation_rack_id: i64,
        finish_date: NaiveDate,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE fabrics
            SET relaxation_block_id = $1, relaxation_rack_id = $2, finish_date = $3, updated_at = $4
            WHERE id = $5 AND deleted_at IS NULL
            "#,
        )
        .bind(relaxation_block_id)
        .bind(relaxation_rack_id)
        .bind(finish_date)
        .bind(at)
        .bind(fabric_id)
        .execute(executor)
        .await
        .map_err(|e| AppError::from_write(e, "fabric relaxation placement"))?;

        Ok(())
    }

    pub async fn update_qc_result<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        result: QcResult,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE fabrics SET qc_result = $1, updated_at = $2 WHERE id = $3 AND deleted_at IS NULL",
        )
        .bind(result.as_str())
        .bind(at)
        .bind(fabric_id)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn update_rack<'e, E>(
        &self,
        executor: E,
        fabric_id: i64,
        rack_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            "UPDATE fabrics SET rack_id = $1, updated_at = $2 WHERE id = $3 AND deleted_at IS NULL",
        )
        .bind(rack_id)
        .bind(at)
        .bind(fabric_id)
        .execute(executor)
        .await
        .map_err(|e| AppError::from_write(e, "fabric rack relocation"))?;

        Ok(())
    }
}
