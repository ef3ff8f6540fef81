// src/models/movement.rs

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::stage::{EntryType, QcResult, Stage};

/// A new `starting` row in `inventory_movements`.
#[derive(Debug, Clone)]
pub struct NewMovement<'a> {
    pub fabric_id: i64,
    pub inventory_id: i64,
    pub movement_type_id: i64,
    pub remarks: &'a str,
    pub actor_id: i64,
    pub at: NaiveDateTime,
}

/// Audit row in `inventory_entries`.
#[derive(Debug, Clone)]
pub struct NewEntry<'a> {
    pub movement_id: i64,
    pub entry_type: EntryType,
    pub from_stage: &'a str,
    pub to_stage: Stage,
    pub at: NaiveDateTime,
}

/// Stage-specific sibling row written before the movement exists.
#[derive(Debug, Clone, PartialEq)]
pub enum NewPlacementLog {
    Storage {
        fabric_id: i64,
        block_id: i64,
        rack_id: i64,
    },
    Relaxation {
        fabric_id: i64,
        relaxation_block_id: i64,
        relaxation_rack_id: i64,
        finish_date: NaiveDate,
    },
    Control {
        fabric_id: i64,
        result: QcResult,
    },
}

/// Handle to an inserted placement log, kept for the movement back-fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementLog {
    Storage(i64),
    Relaxation(i64),
    Control(i64),
}

impl PlacementLog {
    pub fn table(self) -> &'static str {
        match self {
            PlacementLog::Storage(_) => "fabric_storages",
            PlacementLog::Relaxation(_) => "fabric_relaxations",
            PlacementLog::Control(_) => "fabric_controls",
        }
    }

    pub fn id(self) -> i64 {
        match self {
            PlacementLog::Storage(id) | PlacementLog::Relaxation(id) | PlacementLog::Control(id) => id,
        }
    }
}
