// src/db/pg_store.rs

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Postgres, Transaction};

use crate::{
    common::error::AppError,
    db::{
        store::{UserStore, WarehouseStore, WarehouseTx},
        FabricRepository, MovementRepository, PlacementRepository, UserRepository,
    },
    models::{
        auth::User,
        fabric::{FabricInventory, PlacementKind, PlacementRef, RackFabric},
        movement::{NewEntry, NewMovement, NewPlacementLog, PlacementLog},
        stage::{QcResult, Stage},
    },
};

/// Postgres-backed gateway. Cheap to clone; every clone shares the pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    fabrics: FabricRepository,
    movements: MovementRepository,
    placements: PlacementRepository,
    users: UserRepository,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            fabrics: FabricRepository::new(pool.clone()),
            movements: MovementRepository::new(),
            placements: PlacementRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl WarehouseStore for PgStore {
    async fn find_fabric_by_code(&self, code: &str) -> Result<Option<FabricInventory>, AppError> {
        self.fabrics.find_by_code(code).await
    }

    async fn find_rack_by_name(&self, name: &str) -> Result<Option<PlacementRef>, AppError> {
        self.placements.find_rack_by_name(name).await
    }

    async fn fabrics_on_rack(&self, rack_id: i64) -> Result<Vec<RackFabric>, AppError> {
        self.fabrics.list_on_rack(rack_id).await
    }

    async fn list_placements(&self, kind: PlacementKind) -> Result<Vec<PlacementRef>, AppError> {
        self.placements.list(kind).await
    }

    async fn begin(&self) -> Result<Box<dyn WarehouseTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction {
            tx,
            fabrics: self.fabrics.clone(),
            movements: self.movements.clone(),
            placements: self.placements.clone(),
        }))
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.users.find_by_email(email).await
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        self.users.find_by_id(id).await
    }
}

/// An open Postgres transaction. sqlx rolls it back when dropped uncommitted.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
    fabrics: FabricRepository,
    movements: MovementRepository,
    placements: PlacementRepository,
}

#[async_trait]
impl WarehouseTx for PgTransaction {
    async fn placement_exists(&mut self, kind: PlacementKind, id: i64) -> Result<bool, AppError> {
        self.placements.exists(&mut *self.tx, kind, id).await
    }

    async fn lock_fabric_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<FabricInventory>, AppError> {
        // 1. Lock first, in its own statement
        if self.fabrics.lock_by_code(&mut *self.tx, code).await?.is_none() {
            return Ok(None);
        }

        // 2. Fresh snapshot, taken after any concurrent holder committed
        self.fabrics
            .find_by_code_with_inventory(&mut *self.tx, code)
            .await
    }

    async fn store_fabric(
        &mut self,
        fabric_id: i64,
        block_id: i64,
        rack_id: i64,
        yard: &str,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.fabrics
            .update_storage(&mut *self.tx, fabric_id, block_id, rack_id, yard, at)
            .await
    }

    async fn relax_fabric(
        &mut self,
        fabric_id: i64,
        relaxation_block_id: i64,
        relaxation_rack_id: i64,
        finish_date: NaiveDate,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.fabrics
            .update_relaxation(
                &mut *self.tx,
                fabric_id,
                relaxation_block_id,
                relaxation_rack_id,
                finish_date,
                at,
            )
            .await
    }

    async fn set_qc_result(
        &mut self,
        fabric_id: i64,
        result: QcResult,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.fabrics
            .update_qc_result(&mut *self.tx, fabric_id, result, at)
            .await
    }

    async fn insert_placement_log(
        &mut self,
        log: &NewPlacementLog,
        actor_id: i64,
        at: NaiveDateTime,
    ) -> Result<PlacementLog, AppError> {
        self.placements
            .create_log(&mut *self.tx, log, actor_id, at)
            .await
    }

    async fn link_placement_log(
        &mut self,
        log: PlacementLog,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.placements
            .link_log(&mut *self.tx, log, movement_id, at)
            .await
    }

    async fn lock_inventory(&mut self, fabric_id: i64) -> Result<Option<i64>, AppError> {
        self.movements.lock_inventory(&mut *self.tx, fabric_id).await
    }

    async fn insert_inventory(
        &mut self,
        fabric_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<i64, AppError> {
        self.movements
            .create_inventory(&mut *self.tx, fabric_id, stage, at)
            .await
    }

    async fn movement_type_id(&mut self, name: &str) -> Result<Option<i64>, AppError> {
        self.movements
            .find_movement_type_id(&mut *self.tx, name)
            .await
    }

    async fn starting_movement(&mut self, fabric_id: i64) -> Result<Option<i64>, AppError> {
        self.movements.find_starting(&mut *self.tx, fabric_id).await
    }

    async fn finish_starting_movements(
        &mut self,
        fabric_id: i64,
        at: NaiveDateTime,
    ) -> Result<u64, AppError> {
        self.movements
            .finish_starting(&mut *self.tx, fabric_id, at)
            .await
    }

    async fn close_movement_time(
        &mut self,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.movements
            .close_time(&mut *self.tx, movement_id, at)
            .await
    }

    async fn insert_movement(&mut self, movement: &NewMovement<'_>) -> Result<i64, AppError> {
        self.movements
            .create_movement(&mut *self.tx, movement)
            .await
    }

    async fn insert_movement_time(
        &mut self,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.movements
            .create_time(&mut *self.tx, movement_id, at)
            .await
    }

    async fn insert_entry(&mut self, entry: &NewEntry<'_>) -> Result<(), AppError> {
        self.movements.create_entry(&mut *self.tx, entry).await
    }

    async fn update_inventory_stage(
        &mut self,
        inventory_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.movements
            .update_inventory_stage(&mut *self.tx, inventory_id, stage, at)
            .await
    }

    async fn lock_fabric_ids_on_rack(&mut self, rack_id: i64) -> Result<Vec<i64>, AppError> {
        self.fabrics.lock_ids_on_rack(&mut *self.tx, rack_id).await
    }

    async fn set_fabric_rack(
        &mut self,
        fabric_id: i64,
        rack_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        self.fabrics
            .update_rack(&mut *self.tx, fabric_id, rack_id, at)
            .await
    }

    async fn archive_relocations(
        &mut self,
        fabric_id: i64,
        at: NaiveDateTime,
    ) -> Result<u64, AppError> {
        self.placements
            .archive_relocations(&mut *self.tx, fabric_id, at)
            .await
    }

    async fn insert_relocation(
        &mut self,
        fabric_id: i64,
        current_rack_id: i64,
        new_rack_id: i64,
        actor_id: i64,
        at: NaiveDateTime,
    ) -> Result<i64, AppError> {
        self.placements
            .create_relocation(
                &mut *self.tx,
                fabric_id,
                current_rack_id,
                new_rack_id,
                actor_id,
                at,
            )
            .await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}
