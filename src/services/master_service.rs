// src/services/master_service.rs

use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::WarehouseStore,
    models::fabric::{PlacementKind, PlacementRef},
};

/// Block and rack reference data for the scanner pickers.
#[derive(Clone)]
pub struct MasterService {
    store: Arc<dyn WarehouseStore>,
}

impl MasterService {
    pub fn new(store: Arc<dyn WarehouseStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, kind: PlacementKind) -> Result<Vec<PlacementRef>, AppError> {
        self.store.list_placements(kind).await
    }
}
