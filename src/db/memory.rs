// src/db/memory.rs

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    common::{db_utils::clock_parts, error::AppError},
    db::store::{UserStore, WarehouseStore, WarehouseTx},
    models::{
        auth::User,
        fabric::{Fabric, FabricInventory, PlacementKind, PlacementRef, RackFabric},
        movement::{NewEntry, NewMovement, NewPlacementLog, PlacementLog},
        stage::{EntryType, MovementStatus, QcResult, Stage},
    },
};

// ---
// Rows
// ---

#[derive(Debug, Clone, PartialEq)]
pub struct FabricRow {
    pub fabric: Fabric,
    pub updated_at: Option<NaiveDateTime>,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryRow {
    pub id: i64,
    pub fabric_id: i64,
    pub stage: String,
    pub updated_at: NaiveDateTime,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementRow {
    pub id: i64,
    pub fabric_id: i64,
    pub inventory_id: i64,
    pub movement_type_id: i64,
    pub datetime: NaiveDateTime,
    pub remarks: String,
    pub status: MovementStatus,
    pub actor_id: i64,
    pub updated_at: NaiveDateTime,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovementTimeRow {
    pub id: i64,
    pub movement_id: i64,
    pub start_date: NaiveDate,
    pub start_time: NaiveTime,
    pub finish_date: Option<NaiveDate>,
    pub finish_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow {
    pub id: i64,
    pub movement_id: i64,
    pub entry_type: EntryType,
    pub from_stage: String,
    pub to_stage: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageRow {
    pub id: i64,
    pub fabric_id: i64,
    pub block_id: i64,
    pub rack_id: i64,
    pub movement_id: Option<i64>,
    pub actor_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationRow {
    pub id: i64,
    pub fabric_id: i64,
    pub relaxation_block_id: i64,
    pub relaxation_rack_id: i64,
    pub finish_date: NaiveDate,
    pub movement_id: Option<i64>,
    pub actor_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlRow {
    pub id: i64,
    pub fabric_id: i64,
    pub result: QcResult,
    pub movement_id: Option<i64>,
    pub actor_id: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelocationRow {
    pub id: i64,
    pub fabric_id: i64,
    pub current_rack_id: i64,
    pub new_rack_id: i64,
    pub is_archived: Option<i16>,
    pub actor_id: i64,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRow {
    pub id: i64,
    pub name: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user: User,
    pub deleted: bool,
}

/// Every table the checkpoint workflow touches, held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WarehouseState {
    pub fabrics: Vec<FabricRow>,
    pub inventories: Vec<InventoryRow>,
    pub movement_types: Vec<PlacementRow>,
    pub movements: Vec<MovementRow>,
    pub movement_times: Vec<MovementTimeRow>,
    pub entries: Vec<EntryRow>,
    pub storages: Vec<StorageRow>,
    pub relaxations: Vec<RelaxationRow>,
    pub controls: Vec<ControlRow>,
    pub relocations: Vec<RelocationRow>,
    pub blocks: Vec<PlacementRow>,
    pub racks: Vec<PlacementRow>,
    pub relaxation_blocks: Vec<PlacementRow>,
    pub relaxation_racks: Vec<PlacementRow>,
    pub users: Vec<UserRow>,
}

fn next_id(len: usize) -> i64 {
    len as i64 + 1
}

fn add_placement(rows: &mut Vec<PlacementRow>, name: &str) -> i64 {
    let id = next_id(rows.len());
    rows.push(PlacementRow {
        id,
        name: name.to_string(),
        deleted: false,
    });
    id
}

impl WarehouseState {
    // ---
    // Seeding
    // ---

    pub fn add_block(&mut self, name: &str) -> i64 {
        add_placement(&mut self.blocks, name)
    }

    pub fn add_rack(&mut self, name: &str) -> i64 {
        add_placement(&mut self.racks, name)
    }

    pub fn add_relaxation_block(&mut self, name: &str) -> i64 {
        add_placement(&mut self.relaxation_blocks, name)
    }

    pub fn add_relaxation_rack(&mut self, name: &str) -> i64 {
        add_placement(&mut self.relaxation_racks, name)
    }

    /// Registers one movement type per stage, in overview order.
    pub fn register_movement_types(&mut self) {
        for stage in Stage::OVERVIEW {
            add_placement(&mut self.movement_types, stage.as_str());
        }
    }

    /// A fresh roll with no placement and no inventory row.
    pub fn add_fabric(&mut self, code: &str, yard: &str, weight: &str) -> i64 {
        let id = next_id(self.fabrics.len());
        self.fabrics.push(FabricRow {
            fabric: Fabric {
                id,
                code: code.to_string(),
                color: String::new(),
                lot: String::new(),
                roll: String::new(),
                weight: weight.to_string(),
                width: None,
                yard: yard.to_string(),
                rack_id: None,
                block_id: None,
                relaxation_rack_id: None,
                relaxation_block_id: None,
                finish_date: None,
                qc_result: None,
                status: None,
                buyer: "-".to_string(),
                style: "-".to_string(),
            },
            updated_at: None,
            deleted: false,
        });
        id
    }

    pub fn add_user(&mut self, name: &str, email: &str, password_hash: &str) -> i64 {
        let id = next_id(self.users.len());
        self.users.push(UserRow {
            user: User {
                id,
                name: name.to_string(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
            },
            deleted: false,
        });
        id
    }

    // ---
    // Lookups
    // ---

    pub fn fabric(&self, code: &str) -> Option<&Fabric> {
        self.fabrics
            .iter()
            .find(|row| !row.deleted && row.fabric.code == code)
            .map(|row| &row.fabric)
    }

    pub fn fabric_mut(&mut self, code: &str) -> Option<&mut Fabric> {
        self.fabrics
            .iter_mut()
            .find(|row| !row.deleted && row.fabric.code == code)
            .map(|row| &mut row.fabric)
    }

    pub fn live_inventory(&self, fabric_id: i64) -> Option<&InventoryRow> {
        self.inventories
            .iter()
            .filter(|row| !row.deleted && row.fabric_id == fabric_id)
            .max_by_key(|row| row.id)
    }

    /// Live movements of the fabric, oldest first.
    pub fn movements_of(&self, fabric_id: i64) -> Vec<&MovementRow> {
        self.movements
            .iter()
            .filter(|row| !row.deleted && row.fabric_id == fabric_id)
            .collect()
    }

    pub fn time_of(&self, movement_id: i64) -> Option<&MovementTimeRow> {
        self.movement_times
            .iter()
            .find(|row| row.movement_id == movement_id)
    }

    pub fn entries_of(&self, movement_id: i64) -> Vec<&EntryRow> {
        self.entries
            .iter()
            .filter(|row| row.movement_id == movement_id)
            .collect()
    }

    fn placement_rows(&self, kind: PlacementKind) -> &[PlacementRow] {
        match kind {
            PlacementKind::Block => &self.blocks,
            PlacementKind::Rack => &self.racks,
            PlacementKind::RelaxationBlock => &self.relaxation_blocks,
            PlacementKind::RelaxationRack => &self.relaxation_racks,
        }
    }

    fn fabric_with_inventory(&self, code: &str) -> Option<FabricInventory> {
        let fabric = self.fabric(code)?.clone();
        let inventory = self.live_inventory(fabric.id);
        Some(FabricInventory {
            inventory_id: inventory.map(|row| row.id),
            stage: inventory.map(|row| row.stage.clone()),
            fabric,
        })
    }

    fn fabric_row_mut(&mut self, fabric_id: i64) -> Option<&mut FabricRow> {
        self.fabrics
            .iter_mut()
            .find(|row| !row.deleted && row.fabric.id == fabric_id)
    }
}

// ---
// Store
// ---

const NO_FAULT: usize = usize::MAX;

/// In-process store with the transactional behaviour of [`super::PgStore`].
///
/// One async mutex guards the whole state, so transactions run one at a
/// time. A transaction works on a copy and publishes it on commit.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<WarehouseState>>,
    fault: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(WarehouseState::default())
    }
}

impl MemoryStore {
    pub fn new(state: WarehouseState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            fault: Arc::new(AtomicUsize::new(NO_FAULT)),
        }
    }

    pub async fn snapshot(&self) -> WarehouseState {
        self.state.lock().await.clone()
    }

    /// Makes the write numbered `step` (zero based, counted from now across
    /// transactions) fail with an internal error. The fault fires once.
    pub fn fail_on(&self, step: usize) {
        self.fault.store(step, Ordering::SeqCst);
    }

    pub fn clear_fault(&self) {
        self.fault.store(NO_FAULT, Ordering::SeqCst);
    }
}

#[async_trait]
impl WarehouseStore for MemoryStore {
    async fn find_fabric_by_code(&self, code: &str) -> Result<Option<FabricInventory>, AppError> {
        Ok(self.state.lock().await.fabric_with_inventory(code))
    }

    async fn find_rack_by_name(&self, name: &str) -> Result<Option<PlacementRef>, AppError> {
        let state = self.state.lock().await;
        let rack = state
            .racks
            .iter()
            .find(|row| !row.deleted && row.name == name)
            .map(|row| PlacementRef {
                id: row.id,
                name: row.name.clone(),
            });
        Ok(rack)
    }

    async fn fabrics_on_rack(&self, rack_id: i64) -> Result<Vec<RackFabric>, AppError> {
        let state = self.state.lock().await;
        let mut fabrics: Vec<RackFabric> = state
            .fabrics
            .iter()
            .filter(|row| !row.deleted && row.fabric.rack_id == Some(rack_id))
            .map(|row| RackFabric {
                block_name: row.fabric.block_id.and_then(|block_id| {
                    state
                        .blocks
                        .iter()
                        .find(|b| !b.deleted && b.id == block_id)
                        .map(|b| b.name.clone())
                }),
                fabric: row.fabric.clone(),
            })
            .collect();
        fabrics.sort_by_key(|row| row.fabric.id);
        Ok(fabrics)
    }

    async fn list_placements(&self, kind: PlacementKind) -> Result<Vec<PlacementRef>, AppError> {
        let state = self.state.lock().await;
        let mut rows: Vec<PlacementRef> = state
            .placement_rows(kind)
            .iter()
            .filter(|row| !row.deleted)
            .map(|row| PlacementRef {
                id: row.id,
                name: row.name.clone(),
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn begin(&self) -> Result<Box<dyn WarehouseTx>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            work,
            fault: self.fault.clone(),
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|row| !row.deleted && row.user.email == email)
            .map(|row| row.user.clone()))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .find(|row| !row.deleted && row.user.id == id)
            .map(|row| row.user.clone()))
    }
}

// ---
// Transaction
// ---

pub struct MemoryTx {
    guard: OwnedMutexGuard<WarehouseState>,
    work: WarehouseState,
    fault: Arc<AtomicUsize>,
}

impl MemoryTx {
    /// Counts one write against the injected fault, if any.
    fn write(&mut self, what: &str) -> Result<&mut WarehouseState, AppError> {
        let left = self.fault.load(Ordering::SeqCst);
        if left != NO_FAULT {
            if left == 0 {
                self.fault.store(NO_FAULT, Ordering::SeqCst);
                return Err(AppError::InternalServerError(anyhow::anyhow!(
                    "injected fault while writing {what}"
                )));
            }
            self.fault.store(left - 1, Ordering::SeqCst);
        }
        Ok(&mut self.work)
    }

    fn missing(what: &str, id: i64) -> AppError {
        AppError::InternalServerError(anyhow::anyhow!("{what} {id} does not exist"))
    }
}

#[async_trait]
impl WarehouseTx for MemoryTx {
    async fn placement_exists(&mut self, kind: PlacementKind, id: i64) -> Result<bool, AppError> {
        Ok(self
            .work
            .placement_rows(kind)
            .iter()
            .any(|row| !row.deleted && row.id == id))
    }

    async fn lock_fabric_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<FabricInventory>, AppError> {
        Ok(self.work.fabric_with_inventory(code))
    }

    async fn store_fabric(
        &mut self,
        fabric_id: i64,
        block_id: i64,
        rack_id: i64,
        yard: &str,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let state = self.write("fabric storage placement")?;
        let row = state
            .fabric_row_mut(fabric_id)
            .ok_or_else(|| Self::missing("fabric", fabric_id))?;
        row.fabric.block_id = Some(block_id);
        row.fabric.rack_id = Some(rack_id);
        row.fabric.yard = yard.to_string();
        row.updated_at = Some(at);
        Ok(())
    }

    async fn relax_fabric(
        &mut self,
        fabric_id: i64,
        relaxation_block_id: i64,
        relaxation_rack_id: i64,
        finish_date: NaiveDate,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let state = self.write("fabric relaxation placement")?;
        let row = state
            .fabric_row_mut(fabric_id)
            .ok_or_else(|| Self::missing("fabric", fabric_id))?;
        row.fabric.relaxation_block_id = Some(relaxation_block_id);
        row.fabric.relaxation_rack_id = Some(relaxation_rack_id);
        row.fabric.finish_date = Some(finish_date);
        row.updated_at = Some(at);
        Ok(())
    }

    async fn set_qc_result(
        &mut self,
        fabric_id: i64,
        result: QcResult,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let state = self.write("fabric qc result")?;
        let row = state
            .fabric_row_mut(fabric_id)
            .ok_or_else(|| Self::missing("fabric", fabric_id))?;
        row.fabric.qc_result = Some(result.as_str().to_string());
        row.updated_at = Some(at);
        Ok(())
    }

    async fn insert_placement_log(
        &mut self,
        log: &NewPlacementLog,
        actor_id: i64,
        _at: NaiveDateTime,
    ) -> Result<PlacementLog, AppError> {
        let state = self.write("placement log")?;
        let logged = match *log {
            NewPlacementLog::Storage {
                fabric_id,
                block_id,
                rack_id,
            } => {
                let id = next_id(state.storages.len());
                state.storages.push(StorageRow {
                    id,
                    fabric_id,
                    block_id,
                    rack_id,
                    movement_id: None,
                    actor_id,
                });
                PlacementLog::Storage(id)
            }
            NewPlacementLog::Relaxation {
                fabric_id,
                relaxation_block_id,
                relaxation_rack_id,
                finish_date,
            } => {
                let id = next_id(state.relaxations.len());
                state.relaxations.push(RelaxationRow {
                    id,
                    fabric_id,
                    relaxation_block_id,
                    relaxation_rack_id,
                    finish_date,
                    movement_id: None,
                    actor_id,
                });
                PlacementLog::Relaxation(id)
            }
            NewPlacementLog::Control { fabric_id, result } => {
                let id = next_id(state.controls.len());
                state.controls.push(ControlRow {
                    id,
                    fabric_id,
                    result,
                    movement_id: None,
                    actor_id,
                });
                PlacementLog::Control(id)
            }
        };
        Ok(logged)
    }

    async fn link_placement_log(
        &mut self,
        log: PlacementLog,
        movement_id: i64,
        _at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let state = self.write(log.table())?;
        let slot = match log {
            PlacementLog::Storage(id) => state
                .storages
                .iter_mut()
                .find(|row| row.id == id)
                .map(|row| &mut row.movement_id),
            PlacementLog::Relaxation(id) => state
                .relaxations
                .iter_mut()
                .find(|row| row.id == id)
                .map(|row| &mut row.movement_id),
            PlacementLog::Control(id) => state
                .controls
                .iter_mut()
                .find(|row| row.id == id)
                .map(|row| &mut row.movement_id),
        };
        let slot = slot.ok_or_else(|| Self::missing(log.table(), log.id()))?;
        *slot = Some(movement_id);
        Ok(())
    }

    async fn lock_inventory(&mut self, fabric_id: i64) -> Result<Option<i64>, AppError> {
        Ok(self.work.live_inventory(fabric_id).map(|row| row.id))
    }

    async fn insert_inventory(
        &mut self,
        fabric_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<i64, AppError> {
        let state = self.write("inventory")?;
        let id = next_id(state.inventories.len());
        state.inventories.push(InventoryRow {
            id,
            fabric_id,
            stage: stage.as_str().to_string(),
            updated_at: at,
            deleted: false,
        });
        Ok(id)
    }

    async fn movement_type_id(&mut self, name: &str) -> Result<Option<i64>, AppError> {
        Ok(self
            .work
            .movement_types
            .iter()
            .filter(|row| row.name == name)
            .map(|row| row.id)
            .min())
    }

    async fn starting_movement(&mut self, fabric_id: i64) -> Result<Option<i64>, AppError> {
        Ok(self
            .work
            .movements
            .iter()
            .filter(|row| {
                !row.deleted && row.fabric_id == fabric_id && row.status == MovementStatus::Starting
            })
            .map(|row| row.id)
            .max())
    }

    async fn finish_starting_movements(
        &mut self,
        fabric_id: i64,
        at: NaiveDateTime,
    ) -> Result<u64, AppError> {
        let state = self.write("inventory movement status")?;
        let mut finished = 0;
        for row in state.movements.iter_mut().filter(|row| {
            !row.deleted && row.fabric_id == fabric_id && row.status == MovementStatus::Starting
        }) {
            row.status = MovementStatus::Finished;
            row.updated_at = at;
            finished += 1;
        }
        Ok(finished)
    }

    async fn close_movement_time(
        &mut self,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let (date, time) = clock_parts(at);
        let state = self.write("inventory movement time")?;
        for row in state
            .movement_times
            .iter_mut()
            .filter(|row| row.movement_id == movement_id)
        {
            row.finish_date = Some(date);
            row.finish_time = Some(time);
        }
        Ok(())
    }

    async fn insert_movement(&mut self, movement: &NewMovement<'_>) -> Result<i64, AppError> {
        let state = self.write("inventory movement")?;
        let id = next_id(state.movements.len());
        state.movements.push(MovementRow {
            id,
            fabric_id: movement.fabric_id,
            inventory_id: movement.inventory_id,
            movement_type_id: movement.movement_type_id,
            datetime: movement.at,
            remarks: movement.remarks.to_string(),
            status: MovementStatus::Starting,
            actor_id: movement.actor_id,
            updated_at: movement.at,
            deleted: false,
        });
        Ok(id)
    }

    async fn insert_movement_time(
        &mut self,
        movement_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let (start_date, start_time) = clock_parts(at);
        let state = self.write("inventory movement time")?;
        let id = next_id(state.movement_times.len());
        state.movement_times.push(MovementTimeRow {
            id,
            movement_id,
            start_date,
            start_time,
            finish_date: None,
            finish_time: None,
        });
        Ok(())
    }

    async fn insert_entry(&mut self, entry: &NewEntry<'_>) -> Result<(), AppError> {
        let state = self.write("inventory entry")?;
        let id = next_id(state.entries.len());
        state.entries.push(EntryRow {
            id,
            movement_id: entry.movement_id,
            entry_type: entry.entry_type,
            from_stage: entry.from_stage.to_string(),
            to_stage: entry.to_stage.as_str().to_string(),
        });
        Ok(())
    }

    async fn update_inventory_stage(
        &mut self,
        inventory_id: i64,
        stage: Stage,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let state = self.write("inventory stage")?;
        let row = state
            .inventories
            .iter_mut()
            .find(|row| row.id == inventory_id)
            .ok_or_else(|| Self::missing("inventory", inventory_id))?;
        row.stage = stage.as_str().to_string();
        row.updated_at = at;
        Ok(())
    }

    async fn lock_fabric_ids_on_rack(&mut self, rack_id: i64) -> Result<Vec<i64>, AppError> {
        let mut ids: Vec<i64> = self
            .work
            .fabrics
            .iter()
            .filter(|row| !row.deleted && row.fabric.rack_id == Some(rack_id))
            .map(|row| row.fabric.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn set_fabric_rack(
        &mut self,
        fabric_id: i64,
        rack_id: i64,
        at: NaiveDateTime,
    ) -> Result<(), AppError> {
        let state = self.write("fabric rack relocation")?;
        let row = state
            .fabric_row_mut(fabric_id)
            .ok_or_else(|| Self::missing("fabric", fabric_id))?;
        row.fabric.rack_id = Some(rack_id);
        row.updated_at = Some(at);
        Ok(())
    }

    async fn archive_relocations(
        &mut self,
        fabric_id: i64,
        _at: NaiveDateTime,
    ) -> Result<u64, AppError> {
        let state = self.write("fabric rack relocation archive")?;
        let mut archived = 0;
        for row in state.relocations.iter_mut().filter(|row| {
            !row.deleted && row.fabric_id == fabric_id && row.is_archived.is_none()
        }) {
            row.is_archived = Some(1);
            archived += 1;
        }
        Ok(archived)
    }

    async fn insert_relocation(
        &mut self,
        fabric_id: i64,
        current_rack_id: i64,
        new_rack_id: i64,
        actor_id: i64,
        _at: NaiveDateTime,
    ) -> Result<i64, AppError> {
        let state = self.write("fabric rack relocation log")?;
        let id = next_id(state.relocations.len());
        state.relocations.push(RelocationRow {
            id,
            fabric_id,
            current_rack_id,
            new_rack_id,
            is_archived: None,
            actor_id,
            deleted: false,
        });
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTx {
            mut guard, work, ..
        } = *self;
        *guard = work;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::db_utils::now;

    fn seeded() -> MemoryStore {
        let mut state = WarehouseState::default();
        state.add_block("B1");
        state.add_rack("R1");
        state.add_fabric("F001", "10", "2");
        MemoryStore::new(state)
    }

    #[tokio::test]
    async fn commit_publishes_the_working_copy() {
        let store = seeded();
        let mut tx = store.begin().await.unwrap();
        tx.store_fabric(1, 1, 1, "10", now()).await.unwrap();
        tx.commit().await.unwrap();

        let state = store.snapshot().await;
        assert_eq!(state.fabric("F001").unwrap().rack_id, Some(1));
    }

    #[tokio::test]
    async fn dropping_a_transaction_discards_its_writes() {
        let store = seeded();
        let before = store.snapshot().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.store_fabric(1, 1, 1, "10", now()).await.unwrap();
            tx.insert_inventory(1, Stage::Inventory, now()).await.unwrap();
        }
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn injected_fault_fires_once_on_the_chosen_write() {
        let store = seeded();
        store.fail_on(1);
        let mut tx = store.begin().await.unwrap();
        tx.insert_inventory(1, Stage::Inventory, now()).await.unwrap();
        let err = tx.update_inventory_stage(1, Stage::Washing, now()).await;
        assert!(matches!(err, Err(AppError::InternalServerError(_))));
        tx.update_inventory_stage(1, Stage::Washing, now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rack_listing_orders_by_id_and_resolves_block_names() {
        let mut state = WarehouseState::default();
        let block = state.add_block("B1");
        let rack = state.add_rack("R1");
        for code in ["F003", "F001", "F002"] {
            let id = state.add_fabric(code, "1", "1");
            let fabric = state.fabric_mut(code).unwrap();
            fabric.rack_id = Some(rack);
            if id == 2 {
                fabric.block_id = Some(block);
            }
        }
        state.fabrics[0].deleted = true;
        let store = MemoryStore::new(state);

        let listed = store.fabrics_on_rack(rack).await.unwrap();
        let codes: Vec<&str> = listed.iter().map(|r| r.fabric.code.as_str()).collect();
        assert_eq!(codes, vec!["F001", "F002"]);
        assert_eq!(listed[0].block_name.as_deref(), Some("B1"));
        assert_eq!(listed[1].block_name, None);
    }
}
