pub mod store;
pub use store::{UserStore, WarehouseStore, WarehouseTx};

pub mod fabric_repo;
pub use fabric_repo::FabricRepository;
pub mod movement_repo;
pub use movement_repo::MovementRepository;
pub mod placement_repo;
pub use placement_repo::PlacementRepository;
pub mod user_repo;
pub use user_repo::UserRepository;

pub mod pg_store;
pub use pg_store::PgStore;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryStore, WarehouseState};
