//! Storage backend (spec §4.1): pooled SQLite with tenant-scoped CRUD.

mod sqlite;
pub mod migrations;

pub use sqlite::{PoolStats, Storage};
