pub mod auth;
pub mod checkpoint_service;
pub mod master_service;
pub mod relocation;
pub mod stage_engine;
