// src/services/checkpoint_service.rs

use rust_decimal::Decimal;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::WarehouseStore,
    models::{
        auth::AuthContext,
        fabric::{FabricInventory, PlacementRef, RackFabric, RackSummary, ScanRackResult, ScanResult},
        stage::{Stage, StageInfo},
    },
    services::{
        relocation::relocate_rack,
        stage_engine::{apply_move, MoveCommand},
    },
};

/// Public entry points of the checkpoint scanners.
#[derive(Clone)]
pub struct CheckpointService {
    store: Arc<dyn WarehouseStore>,
}

impl CheckpointService {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    pub fn overview(&self) -> Vec<StageInfo> {
        Stage::OVERVIEW.into_iter().map(StageInfo::from).collect()
    }

    pub async fn scan_qr(&self, code: &str) -> Result<ScanResult, AppError> {
        let found = self
            .store
            .find_fabric_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("QR code {code} is not found")))?;

        Ok(scan_result(found))
    }

    pub async fn scan_rack(&self, code: &str) -> Result<ScanRackResult, AppError> {
        let rack = self
            .store
            .find_rack_by_name(code)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rack QR {code} is not found")))?;

        let result = self.store.fabrics_on_rack(rack.id).await?;
        let summary = summarize(&rack, &result);

        Ok(ScanRackResult { result, summary })
    }

    pub async fn move_stage(&self, cmd: &MoveCommand, actor: &AuthContext) -> Result<(), AppError> {
        let mut tx = self.store.begin().await?;

        if let Err(e) = apply_move(tx.as_mut(), cmd, actor.actor_id).await {
            tracing::warn!(
                stage = %cmd.stage(),
                entries = cmd.entries().len(),
                actor_id = actor.actor_id,
                error = %e,
                "move batch rolled back"
            );
            return Err(e);
        }

        tx.commit().await?;
        tracing::info!(
            stage = %cmd.stage(),
            entries = cmd.entries().len(),
            actor_id = actor.actor_id,
            "moved items"
        );
        Ok(())
    }

    pub async fn relocate(
        &self,
        current_rack_id: i64,
        new_rack_id: i64,
        actor: &AuthContext,
    ) -> Result<(), AppError> {
        if current_rack_id == new_rack_id {
            return Err(AppError::invalid(
                "new_rack_id",
                "The new rack must be different from the current rack.",
            ));
        }

        let mut tx = self.store.begin().await?;

        let moved = match relocate_rack(tx.as_mut(), current_rack_id, new_rack_id, actor.actor_id)
            .await
        {
            Ok(moved) => moved,
            Err(e) => {
                tracing::warn!(
                    current_rack_id,
                    new_rack_id,
                    actor_id = actor.actor_id,
                    error = %e,
                    "relocation rolled back"
                );
                return Err(e);
            }
        };

        tx.commit().await?;
        tracing::info!(
            current_rack_id,
            new_rack_id,
            fabrics = moved,
            actor_id = actor.actor_id,
            "relocated rack"
        );
        Ok(())
    }
}

// ---
// Read models
// ---

/// `qc_result` is only shown while the roll is in QC, `finish_date` only
/// while it is relaxing.
fn scan_result(found: FabricInventory) -> ScanResult {
    let on_stage = found.on_stage().parse::<Stage>().ok();
    let fabric = found.fabric;

    ScanResult {
        qr_code: fabric.code,
        buyer: fabric.buyer,
        style: fabric.style,
        yard: fabric.yard,
        qc_result: fabric.qc_result.filter(|_| on_stage == Some(Stage::QcFabric)),
        finish_date: fabric.finish_date.filter(|_| on_stage == Some(Stage::Relaxation)),
    }
}

/// Text column to decimal. Surrounding whitespace is ignored; anything that
/// still does not parse counts as absent.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    raw.trim().parse::<Decimal>().ok()
}

fn summarize(rack: &PlacementRef, items: &[RackFabric]) -> RackSummary {
    let total_yard = items
        .iter()
        .filter_map(|item| parse_amount(&item.fabric.yard))
        .sum();
    let total_weight = items
        .iter()
        .filter_map(|item| parse_amount(&item.fabric.weight))
        .sum();
    let block_name = items
        .iter()
        .find_map(|item| item.block_name.clone())
        .unwrap_or_else(|| "-".to_string());

    RackSummary {
        total_items: items.len(),
        total_yard,
        total_weight,
        block_name,
        rack_number: rack.name.clone(),
    }
}
