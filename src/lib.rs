pub mod config;
pub mod error;
pub mod judge;
pub mod stage;
pub mod summary;
pub mod workflow;
