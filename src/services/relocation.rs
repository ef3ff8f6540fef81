// src/services/relocation.rs

use crate::{
    common::{db_utils::now, error::AppError},
    db::WarehouseTx,
    models::fabric::PlacementKind,
    services::stage_engine::ensure_placement,
};

/// Moves every live fabric on `current_rack_id` to `new_rack_id` inside `tx`
/// and returns how many were moved. Inventory movements are not touched.
pub async fn relocate_rack(
    tx: &mut dyn WarehouseTx,
    current_rack_id: i64,
    new_rack_id: i64,
    actor_id: i64,
) -> Result<usize, AppError> {
    let at = now();

    // 1. Lock the rack's fabrics, lowest id first
    let fabric_ids = tx.lock_fabric_ids_on_rack(current_rack_id).await?;
    if fabric_ids.is_empty() {
        return Err(AppError::Conflict(
            "no fabric found in the selected current rack".to_string(),
        ));
    }

    ensure_placement(tx, PlacementKind::Rack, new_rack_id).await?;

    // 2. One fresh, non-archived log row per fabric
    for fabric_id in &fabric_ids {
        tx.set_fabric_rack(*fabric_id, new_rack_id, at).await?;
        tx.archive_relocations(*fabric_id, at).await?;
        tx.insert_relocation(*fabric_id, current_rack_id, new_rack_id, actor_id, at)
            .await?;
    }

    Ok(fabric_ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, WarehouseState, WarehouseStore};

    fn store_with_rack_of(count: usize) -> MemoryStore {
        let mut state = WarehouseState::default();
        let r1 = state.add_rack("R1");
        state.add_rack("R2");
        for n in 0..count {
            let code = format!("F{n:03}");
            state.add_fabric(&code, "1", "1");
            if let Some(fabric) = state.fabric_mut(&code) {
                fabric.rack_id = Some(r1);
            }
        }
        MemoryStore::new(state)
    }

    #[tokio::test]
    async fn second_relocation_archives_the_first() {
        let store = store_with_rack_of(2);
        for (from, to) in [(1, 2), (2, 1)] {
            let mut tx = store.begin().await.unwrap();
            assert_eq!(relocate_rack(tx.as_mut(), from, to, 1).await.unwrap(), 2);
            tx.commit().await.unwrap();
        }

        let state = store.snapshot().await;
        assert_eq!(state.relocations.len(), 4);
        let open: Vec<_> = state
            .relocations
            .iter()
            .filter(|r| r.is_archived.is_none())
            .map(|r| (r.fabric_id, r.current_rack_id, r.new_rack_id))
            .collect();
        assert_eq!(open, vec![(1, 2, 1), (2, 2, 1)]);
    }

    #[tokio::test]
    async fn empty_rack_is_a_conflict() {
        let store = store_with_rack_of(0);
        let mut tx = store.begin().await.unwrap();
        let err = relocate_rack(tx.as_mut(), 1, 2, 1).await.unwrap_err();
        assert!(
            matches!(err, AppError::Conflict(ref m) if m == "no fabric found in the selected current rack")
        );
    }

    #[tokio::test]
    async fn unknown_destination_rack_is_a_conflict() {
        let store = store_with_rack_of(1);
        let mut tx = store.begin().await.unwrap();
        let err = relocate_rack(tx.as_mut(), 1, 42, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref m) if m == "rack 42 is not found"));
    }
}
