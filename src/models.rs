pub mod auth;
pub mod fabric;
pub mod movement;
pub mod stage;
