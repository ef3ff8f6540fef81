// src/models/fabric.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- 1. Fabric (the physical roll) ---
// yard/weight/width are text columns upstream; totals are parsed best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Fabric {
    #[schema(example = 42)]
    pub id: i64,
    #[schema(example = "F24120001")]
    pub code: String,
    pub color: String,
    pub lot: String,
    pub roll: String,
    #[schema(example = "20.5")]
    pub weight: String,
    pub width: Option<String>,
    #[schema(example = "12.5")]
    pub yard: String,
    pub rack_id: Option<i64>,
    pub block_id: Option<i64>,
    pub relaxation_rack_id: Option<i64>,
    pub relaxation_block_id: Option<i64>,
    pub finish_date: Option<NaiveDate>,
    pub qc_result: Option<String>,
    pub status: Option<String>,
    #[schema(example = "ACME")]
    pub buyer: String,
    #[schema(example = "ST-100")]
    pub style: String,
}

// --- 2. Fabric joined with its current inventory pointer ---
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct FabricInventory {
    #[sqlx(flatten)]
    pub fabric: Fabric,
    pub inventory_id: Option<i64>,
    pub stage: Option<String>,
}

impl FabricInventory {
    /// Current stage name, empty when the roll never moved.
    pub fn on_stage(&self) -> &str {
        self.stage.as_deref().unwrap_or_default()
    }
}

// --- 3. Fabric listed on a rack, with its block name ---
#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
pub struct RackFabric {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fabric: Fabric,
    pub block_name: Option<String>,
}

// --- 4. Read models of the checkpoint facade ---
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScanResult {
    #[schema(example = "F24120001")]
    pub qr_code: String,
    pub buyer: String,
    pub style: String,
    pub yard: String,
    /// Only disclosed while the roll sits in `qc_fabric`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qc_result: Option<String>,
    /// Only disclosed while the roll sits in `relaxation`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RackSummary {
    pub total_items: usize,
    #[schema(value_type = f64)]
    pub total_yard: Decimal,
    #[schema(value_type = f64)]
    pub total_weight: Decimal,
    pub block_name: String,
    pub rack_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScanRackResult {
    pub result: Vec<RackFabric>,
    pub summary: RackSummary,
}

// --- 5. Placement reference data (blocks and racks) ---
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PlacementRef {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "R-01")]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementKind {
    Block,
    Rack,
    RelaxationBlock,
    RelaxationRack,
}

impl PlacementKind {
    pub fn table(self) -> &'static str {
        match self {
            PlacementKind::Block => "m_blocks",
            PlacementKind::Rack => "m_racks",
            PlacementKind::RelaxationBlock => "m_relaxation_blocks",
            PlacementKind::RelaxationRack => "m_relaxation_racks",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PlacementKind::Block => "block",
            PlacementKind::Rack => "rack",
            PlacementKind::RelaxationBlock => "relaxation block",
            PlacementKind::RelaxationRack => "relaxation rack",
        }
    }
}
