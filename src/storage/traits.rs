//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use thiserror::Error;

use crate::row::AggregatedRow;
use crate::storage::{ObservationRecord, RunRecord, VariantRecord};

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for variant storage backends
///
/// The crawler records each accepted row twice: an upsert into the `variants`
/// identity table and an append into the `observations` history. Run rows
/// bracket the whole crawl; a run left without `finished_at` did not stop
/// cleanly.
pub trait VariantStore {
    /// Opens a new run and returns its id.
    fn begin_run(&mut self, started_at: &str) -> StorageResult<i64>;

    /// Marks a run as cleanly finished.
    fn finish_run(&mut self, run_id: i64, finished_at: &str) -> StorageResult<()>;

    /// Returns the most recently started run, if any.
    fn latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Inserts or refreshes the variant identity row for `row`.
    ///
    /// `first_seen_at` is set only on insert; `name` and `image_url` never
    /// regress to NULL; `ever_in_stock` is monotonic.
    fn upsert_variant(&mut self, row: &AggregatedRow) -> StorageResult<()>;

    /// Appends one observation for `row` under `run_id`.
    fn insert_observation(&mut self, run_id: i64, row: &AggregatedRow) -> StorageResult<()>;

    /// Reads a variant identity row by hash key.
    fn get_variant(&self, hash_key: &str) -> StorageResult<Option<VariantRecord>>;

    /// Reads all observations for a hash key, oldest first.
    fn observations_for(&self, hash_key: &str) -> StorageResult<Vec<ObservationRecord>>;
}
