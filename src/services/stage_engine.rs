// src/services/stage_engine.rs

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    common::{db_utils::now, error::AppError},
    db::WarehouseTx,
    models::{
        fabric::PlacementKind,
        movement::{NewEntry, NewMovement, NewPlacementLog},
        stage::{entry_type_for, remarks_for, QcResult, Stage},
    },
};

// ---
// 1. Command
// ---

/// One scanned roll inside a move batch.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct MoveEntry {
    #[serde(default)]
    #[schema(example = "F24120001")]
    pub code: String,
    /// Replaces the stored yard when greater than zero (inventory moves only).
    #[schema(value_type = Option<f64>, example = 12.5)]
    pub yard: Option<Decimal>,
    /// Required on every entry of a relaxation move.
    pub finish_date: Option<NaiveDate>,
    /// Defaults to `pass` on a qc_fabric move.
    pub qc_result: Option<QcResult>,
}

/// Optional placement ids as they arrive from the scanner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MovePlacement {
    pub block_id: Option<i64>,
    pub rack_id: Option<i64>,
    pub relaxation_block_id: Option<i64>,
    pub relaxation_rack_id: Option<i64>,
}

/// Where the destination stage puts the roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageTarget {
    Storage {
        block_id: i64,
        rack_id: i64,
    },
    Relaxation {
        relaxation_block_id: i64,
        relaxation_rack_id: i64,
    },
    QualityControl,
    Plain,
}

/// A validated move batch. Only [`MoveCommand::new`] builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveCommand {
    stage: Stage,
    target: StageTarget,
    entries: Vec<MoveEntry>,
}

impl MoveCommand {
    pub fn new(
        stage: Stage,
        placement: MovePlacement,
        entries: Vec<MoveEntry>,
    ) -> Result<Self, AppError> {
        if entries.is_empty() {
            return Err(AppError::invalid("entries", "The entries field is required."));
        }
        if entries.iter().any(|e| e.code.trim().is_empty()) {
            return Err(AppError::invalid(
                "entries",
                "The code field is required for every entry.",
            ));
        }
        if entries
            .iter()
            .any(|e| e.yard.is_some_and(|y| y < Decimal::ZERO))
        {
            return Err(AppError::invalid("entries", "The yard must not be negative."));
        }

        let target = match stage {
            Stage::Inventory => StageTarget::Storage {
                block_id: placement.block_id.ok_or_else(|| {
                    AppError::invalid("block_id", "The block id is required for the inventory stage.")
                })?,
                rack_id: placement.rack_id.ok_or_else(|| {
                    AppError::invalid("rack_id", "The rack id is required for the inventory stage.")
                })?,
            },
            Stage::Relaxation => {
                let relaxation_block_id = placement.relaxation_block_id.ok_or_else(|| {
                    AppError::invalid(
                        "relaxation_block_id",
                        "The relaxation block id is required for the relaxation stage.",
                    )
                })?;
                let relaxation_rack_id = placement.relaxation_rack_id.ok_or_else(|| {
                    AppError::invalid(
                        "relaxation_rack_id",
                        "The relaxation rack id is required for the relaxation stage.",
                    )
                })?;
                if entries.iter().any(|e| e.finish_date.is_none()) {
                    return Err(AppError::invalid(
                        "entries",
                        "The finish date is required for every entry of the relaxation stage.",
                    ));
                }
                StageTarget::Relaxation {
                    relaxation_block_id,
                    relaxation_rack_id,
                }
            }
            Stage::QcFabric => StageTarget::QualityControl,
            _ => StageTarget::Plain,
        };

        Ok(Self {
            stage,
            target,
            entries,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn target(&self) -> StageTarget {
        self.target
    }

    pub fn entries(&self) -> &[MoveEntry] {
        &self.entries
    }
}

/// The yard written on an inventory move: a positive scanned value wins,
/// anything else keeps what is stored.
fn resolve_yard(scanned: Option<Decimal>, stored: &str) -> String {
    match scanned {
        Some(yard) if yard > Decimal::ZERO => yard.normalize().to_string(),
        _ => stored.to_string(),
    }
}

// ---
// 2. Batch
// ---

/// Applies every entry of the batch, in order, inside `tx`.
///
/// The caller owns the transaction: on error it must drop it so nothing
/// written here becomes visible.
pub async fn apply_move(
    tx: &mut dyn WarehouseTx,
    cmd: &MoveCommand,
    actor_id: i64,
) -> Result<(), AppError> {
    let at = now();

    match cmd.target {
        StageTarget::Storage { block_id, rack_id } => {
            ensure_placement(tx, PlacementKind::Block, block_id).await?;
            ensure_placement(tx, PlacementKind::Rack, rack_id).await?;
        }
        StageTarget::Relaxation {
            relaxation_block_id,
            relaxation_rack_id,
        } => {
            ensure_placement(tx, PlacementKind::RelaxationBlock, relaxation_block_id).await?;
            ensure_placement(tx, PlacementKind::RelaxationRack, relaxation_rack_id).await?;
        }
        StageTarget::QualityControl | StageTarget::Plain => {}
    }

    for entry in &cmd.entries {
        move_entry(tx, cmd, entry, actor_id, at).await?;
    }

    Ok(())
}

pub(crate) async fn ensure_placement(
    tx: &mut dyn WarehouseTx,
    kind: PlacementKind,
    id: i64,
) -> Result<(), AppError> {
    if tx.placement_exists(kind, id).await? {
        Ok(())
    } else {
        Err(AppError::Conflict(format!("{} {id} is not found", kind.label())))
    }
}

async fn move_entry(
    tx: &mut dyn WarehouseTx,
    cmd: &MoveCommand,
    entry: &MoveEntry,
    actor_id: i64,
    at: NaiveDateTime,
) -> Result<(), AppError> {
    // 1. Fabric + inventory pointer, locked for the rest of the transaction
    let found = tx
        .lock_fabric_by_code(&entry.code)
        .await?
        .ok_or_else(|| AppError::Conflict(format!("QR code {} is not found", entry.code)))?;
    let fabric_id = found.fabric.id;

    // 2. Where the roll is now ("" before its first move)
    let on_stage = found.on_stage().to_string();

    // 3. Stage-specific placement
    let placement_log = match cmd.target {
        StageTarget::Storage { block_id, rack_id } => {
            let yard = resolve_yard(entry.yard, &found.fabric.yard);
            tx.store_fabric(fabric_id, block_id, rack_id, &yard, at)
                .await?;
            let log = NewPlacementLog::Storage {
                fabric_id,
                block_id,
                rack_id,
            };
            Some(tx.insert_placement_log(&log, actor_id, at).await?)
        }
        StageTarget::Relaxation {
            relaxation_block_id,
            relaxation_rack_id,
        } => {
            let finish_date = entry.finish_date.ok_or_else(|| {
                AppError::invalid(
                    "entries",
                    "The finish date is required for every entry of the relaxation stage.",
                )
            })?;
            tx.relax_fabric(
                fabric_id,
                relaxation_block_id,
                relaxation_rack_id,
                finish_date,
                at,
            )
            .await?;
            let log = NewPlacementLog::Relaxation {
                fabric_id,
                relaxation_block_id,
                relaxation_rack_id,
                finish_date,
            };
            Some(tx.insert_placement_log(&log, actor_id, at).await?)
        }
        StageTarget::QualityControl => {
            let result = entry.qc_result.unwrap_or_default();
            tx.set_qc_result(fabric_id, result, at).await?;
            let log = NewPlacementLog::Control { fabric_id, result };
            Some(tx.insert_placement_log(&log, actor_id, at).await?)
        }
        StageTarget::Plain => None,
    };

    // 4. Remarks
    let remarks = remarks_for(&on_stage, cmd.stage);

    // 5. Movement state machine
    let transition = Transition {
        fabric_id,
        to_stage: cmd.stage,
        on_stage: &on_stage,
        remarks: &remarks,
        actor_id,
    };
    let movement_id = advance_movement(tx, &transition, at).await?;

    // 6. Back-fill the placement log
    if let Some(log) = placement_log {
        tx.link_placement_log(log, movement_id, at).await?;
    }

    Ok(())
}

// ---
// 3. Movement state machine
// ---

#[derive(Debug, Clone, Copy)]
pub struct Transition<'a> {
    pub fabric_id: i64,
    pub to_stage: Stage,
    pub on_stage: &'a str,
    pub remarks: &'a str,
    pub actor_id: i64,
}

/// Closes the fabric's open movement and opens the next one. Returns the id
/// of the new `starting` movement.
pub async fn advance_movement(
    tx: &mut dyn WarehouseTx,
    t: &Transition<'_>,
    at: NaiveDateTime,
) -> Result<i64, AppError> {
    // 1. Inventory pointer (created on the first move, mutated afterwards)
    let inventory_id = match tx.lock_inventory(t.fabric_id).await? {
        Some(id) => id,
        None => tx.insert_inventory(t.fabric_id, t.to_stage, at).await?,
    };

    // 2. Movement type
    let movement_type_id = match tx.movement_type_id(t.to_stage.as_str()).await? {
        Some(id) => id,
        None => {
            tracing::error!(stage = %t.to_stage, "movement type is missing from movement_types");
            return Err(AppError::Conflict(format!(
                "movement type {} is not registered",
                t.to_stage
            )));
        }
    };

    // 3-5. Close the open movement before opening the next one
    let previous = tx.starting_movement(t.fabric_id).await?;
    tx.finish_starting_movements(t.fabric_id, at).await?;
    if let Some(previous_id) = previous {
        tx.close_movement_time(previous_id, at).await?;
    }

    // 6. New movement
    let movement_id = tx
        .insert_movement(&NewMovement {
            fabric_id: t.fabric_id,
            inventory_id,
            movement_type_id,
            remarks: t.remarks,
            actor_id: t.actor_id,
            at,
        })
        .await?;

    // 7. Start time
    tx.insert_movement_time(movement_id, at).await?;

    // 8. Audit entry
    tx.insert_entry(&NewEntry {
        movement_id,
        entry_type: entry_type_for(t.on_stage, t.to_stage),
        from_stage: t.on_stage,
        to_stage: t.to_stage,
        at,
    })
    .await?;

    // 9. Inventory pointer follows the roll
    tx.update_inventory_stage(inventory_id, t.to_stage, at)
        .await?;

    Ok(movement_id)
}
