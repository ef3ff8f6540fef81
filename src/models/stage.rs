// src/models/stage.rs

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// The closed set of checkpoint stages a roll can be moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inventory,
    Relaxation,
    CuttingWip,
    StockFabric,
    Cncm,
    Washing,
    ReturnSupplier,
    Destroy,
    QcFabric,
}

impl Stage {
    /// Overview order. The position + 1 is the public stage id.
    pub const OVERVIEW: [Stage; 9] = [
        Stage::Inventory,
        Stage::CuttingWip,
        Stage::StockFabric,
        Stage::Cncm,
        Stage::Washing,
        Stage::ReturnSupplier,
        Stage::Destroy,
        Stage::Relaxation,
        Stage::QcFabric,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Inventory => "inventory",
            Stage::Relaxation => "relaxation",
            Stage::CuttingWip => "cutting_wip",
            Stage::StockFabric => "stock_fabric",
            Stage::Cncm => "cncm",
            Stage::Washing => "washing",
            Stage::ReturnSupplier => "return_supplier",
            Stage::Destroy => "destroy",
            Stage::QcFabric => "qc_fabric",
        }
    }

    pub fn overview_id(self) -> i32 {
        // OVERVIEW contains every variant.
        Stage::OVERVIEW
            .iter()
            .position(|s| *s == self)
            .map(|p| p as i32 + 1)
            .unwrap_or_default()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::OVERVIEW
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StageInfo {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "inventory")]
    pub name: String,
}

impl From<Stage> for StageInfo {
    fn from(stage: Stage) -> Self {
        Self {
            id: stage.overview_id(),
            name: stage.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum QcResult {
    #[default]
    Pass,
    Fail,
}

impl QcResult {
    pub fn as_str(self) -> &'static str {
        match self {
            QcResult::Pass => "pass",
            QcResult::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Cross-stage move.
    Out,
    /// Re-scan into the stage the roll is already in.
    Actual,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Out => "out",
            EntryType::Actual => "actual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementStatus {
    Starting,
    Finished,
}

impl MovementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementStatus::Starting => "starting",
            MovementStatus::Finished => "finished",
        }
    }
}

/// Movement remarks. Reports read these verbatim, including the trailing
/// space when the roll had no stage yet.
pub fn remarks_for(on_stage: &str, to: Stage) -> String {
    if on_stage == to.as_str() {
        format!("Return {on_stage}")
    } else {
        format!("From {on_stage}")
    }
}

pub fn entry_type_for(on_stage: &str, to: Stage) -> EntryType {
    if on_stage == to.as_str() {
        EntryType::Actual
    } else {
        EntryType::Out
    }
}
