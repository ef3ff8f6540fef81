pub mod auth;
pub mod checkpoint;
pub mod health;
pub mod master;
