//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the colorway database.

use rusqlite::Connection;

use crate::storage::traits::StorageResult;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs; a NULL finished_at marks a run that did not stop cleanly
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT
);

-- One row per colorway identity, kept current across runs
CREATE TABLE IF NOT EXISTS variants (
    hash_key TEXT PRIMARY KEY,
    product_url TEXT NOT NULL,
    color TEXT NOT NULL,
    name TEXT,
    image_url TEXT,
    first_seen_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL,
    ever_in_stock INTEGER NOT NULL DEFAULT 0
);

-- Append-only availability/pricing history
CREATE TABLE IF NOT EXISTS observations (
    obs_id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    hash_key TEXT NOT NULL,
    crawl_ts TEXT NOT NULL,
    num_sizes_in_stock INTEGER NOT NULL,
    sizes_in_stock TEXT NOT NULL,
    sizes_all TEXT NOT NULL,
    size_quantities TEXT,
    list_price TEXT,
    sale_price TEXT,
    discount TEXT
);

CREATE INDEX IF NOT EXISTS idx_obs_hash_ts ON observations(hash_key, crawl_ts);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
