// src/db/store.rs

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    common::error::AppError,
    models::{
        auth::User,
        fabric::{FabricInventory, PlacementKind, PlacementRef, RackFabric},
        movement::{NewEntry, NewMovement, NewPlacementLog, PlacementLog},
        stage::{QcResult, Stage},
    },
};

/// Persistence gateway for the checkpoint workflow.
///
/// Reads here run outside any transaction. Everything that writes goes
/// through [`WarehouseStore::begin`].
#[async_trait]
pub trait WarehouseStore: Send + Sync {
    async fn find_fabric_by_code(&self, code: &str) -> Result<Option<FabricInventory>, AppError>;

    async fn find_rack_by_name(&self, name: &str) -> Result<Option<PlacementRef>, AppError>;

    /// Live fabrics whose `rack_id` is `rack_id`, ordered by id.
    async fn fabrics_on_rack(&self, rack_id: i64) -> Result<Vec<RackFabric>, AppError>;

    async fn list_placements(&self, kind: PlacementKind) -> Result<Vec<PlacementRef>, AppError>;

    async fn begin(&self) -> Result<Box<dyn WarehouseTx>, AppError>;
}

/// One open transaction.
///
/// Dropping it without [`WarehouseTx::commit`] rolls every write back, which
/// is also what happens when the request future is cancelled.
#[async_trait]
pub trait WarehouseTx: Send {
    async fn placement_exists(&mut self, kind: PlacementKind, id: i64) -> Result<bool, AppError>;

    // --- fabric rows ---

    /// Fabric + inventory pointer, with the fabric row locked until commit.
    /// The stage returned is the one committed before the lock was granted.
    async fn lock_fabric_by_code(&mut self, code: &str)
        -> Result<Option<FabricInventory>, AppError>;

    async fn store_fabric(
        &mut self,
        fabric_id: i64,
        block_id: i64,
        rack_id: i64,
        yard: &str,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    async fn relax_fabric(
        &mut self,
        fabric_id: i64,
        relaxation_block_id: i64,
        relaxation_rack_id: i64,
        finish_date: NaiveDate,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    async fn set_qc_result(
        &mut self,
        fabric_id: i64,
        result: QcResult,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    // --- placement logs ---

    async fn insert_placement_log(
        &mut self,
        log: &NewPlacementLog,
        actor_id: i64,
        at: NaiveDateTime,
    ) -> Result<PlacementLog, AppError>;

    async fn link_placement_log(
        &mut self,
        log: PlacementLog,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    // --- movement state machine ---

    /// Live inventory id of the fabric, row-locked.
    async fn lock_inventory(&mut self, fabric_id: i64) -> Result<Option<i64>, AppError>;

    async fn insert_inventory(
        &mut self,
        fabric_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<i64, AppError>;

    async fn movement_type_id(&mut self, name: &str) -> Result<Option<i64>, AppError>;

    async fn starting_movement(&mut self, fabric_id: i64) -> Result<Option<i64>, AppError>;

    /// Marks every `starting` movement of the fabric `finished`.
    async fn finish_starting_movements(
        &mut self,
        fabric_id: i64,
        at: NaiveDateTime,
    ) -> Result<u64, AppError>;

    async fn close_movement_time(
        &mut self,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    async fn insert_movement(&mut self, movement: &NewMovement<'_>) -> Result<i64, AppError>;

    async fn insert_movement_time(
        &mut self,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    async fn insert_entry(&mut self, entry: &NewEntry<'_>) -> Result<(), AppError>;

    async fn update_inventory_stage(
        &mut self,
        inventory_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    // --- rack relocation ---

    /// Ids of the live fabrics on the rack, ascending, row-locked.
    async fn lock_fabric_ids_on_rack(&mut self, rack_id: i64) -> Result<Vec<i64>, AppError>;

    async fn set_fabric_rack(
        &mut self,
        fabric_id: i64,
        rack_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError>;

    async fn archive_relocations(&mut self, fabric_id: i64, at: NaiveDateTime)
        -> Result<u64, AppError>;

    async fn insert_relocation(
        &mut self,
        fabric_id: i64,
        current_rack_id: i64,
        new_rack_id: i64,
        actor_id: i64,
        at: NaiveDateTime,
    ) -> Result<i64, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
}
