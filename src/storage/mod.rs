//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the tracker, including:
//! - SQLite database initialization and schema management
//! - Variant identity upserts across runs
//! - Append-only observation history
//! - Run tracking

mod schema;
mod sqlite;
mod traits;

pub use schema::{initialize_schema, SCHEMA_SQL};
pub use sqlite::SqliteStore;
pub use traits::{StorageError, StorageResult, VariantStore};

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStore, StorageError> {
    SqliteStore::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
}

/// Represents a colorway identity tracked across runs
#[derive(Debug, Clone)]
pub struct VariantRecord {
    pub hash_key: String,
    pub product_url: String,
    pub color: String,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub first_seen_at: String,
    pub last_seen_at: String,
    pub ever_in_stock: bool,
}

/// Represents one availability/pricing observation
#[derive(Debug, Clone)]
pub struct ObservationRecord {
    pub obs_id: i64,
    pub run_id: i64,
    pub hash_key: String,
    pub crawl_ts: String,
    pub num_sizes_in_stock: i64,
    pub sizes_in_stock: String,
    pub sizes_all: String,
    pub size_quantities: Option<String>,
    pub list_price: Option<String>,
    pub sale_price: Option<String>,
    pub discount: Option<String>,
}
