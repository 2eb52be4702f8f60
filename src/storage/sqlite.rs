//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the VariantStore
//! trait.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::row::AggregatedRow;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageResult, VariantStore};
use crate::storage::{ObservationRecord, RunRecord, VariantRecord};

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path`.
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl VariantStore for SqliteStore {
    fn begin_run(&mut self, started_at: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO runs (started_at) VALUES (?1)",
            params![started_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(&mut self, run_id: i64, finished_at: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET finished_at = ?1 WHERE id = ?2",
            params![finished_at, run_id],
        )?;
        Ok(())
    }

    fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at FROM runs ORDER BY id DESC LIMIT 1",
        )?;
        let run = stmt
            .query_row([], |row| {
                Ok(RunRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    finished_at: row.get(2)?,
                })
            })
            .optional()?;
        Ok(run)
    }

    fn upsert_variant(&mut self, row: &AggregatedRow) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO variants (hash_key, product_url, color, name, image_url, first_seen_at, last_seen_at, ever_in_stock)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7)
             ON CONFLICT(hash_key) DO UPDATE SET
                 product_url = excluded.product_url,
                 color = excluded.color,
                 name = COALESCE(excluded.name, variants.name),
                 image_url = COALESCE(excluded.image_url, variants.image_url),
                 last_seen_at = excluded.last_seen_at,
                 ever_in_stock = CASE WHEN excluded.ever_in_stock = 1 THEN 1 ELSE variants.ever_in_stock END",
            params![
                row.hash_key,
                row.product_url,
                row.color,
                row.name,
                row.image_url,
                row.crawl_ts,
                (row.num_sizes_in_stock > 0) as i64,
            ],
        )?;
        Ok(())
    }

    fn insert_observation(&mut self, run_id: i64, row: &AggregatedRow) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO observations (run_id, hash_key, crawl_ts, num_sizes_in_stock, sizes_in_stock, sizes_all, size_quantities, list_price, sale_price, discount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                run_id,
                row.hash_key,
                row.crawl_ts,
                row.num_sizes_in_stock as i64,
                row.sizes_in_stock,
                row.sizes_all,
                row.size_quantities,
                row.list_price,
                row.sale_price,
                row.discount,
            ],
        )?;
        Ok(())
    }

    fn get_variant(&self, hash_key: &str) -> StorageResult<Option<VariantRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash_key, product_url, color, name, image_url, first_seen_at, last_seen_at, ever_in_stock
             FROM variants WHERE hash_key = ?1",
        )?;
        let variant = stmt
            .query_row(params![hash_key], |row| {
                Ok(VariantRecord {
                    hash_key: row.get(0)?,
                    product_url: row.get(1)?,
                    color: row.get(2)?,
                    name: row.get(3)?,
                    image_url: row.get(4)?,
                    first_seen_at: row.get(5)?,
                    last_seen_at: row.get(6)?,
                    ever_in_stock: row.get::<_, i64>(7)? != 0,
                })
            })
            .optional()?;
        Ok(variant)
    }

    fn observations_for(&self, hash_key: &str) -> StorageResult<Vec<ObservationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT obs_id, run_id, hash_key, crawl_ts, num_sizes_in_stock, sizes_in_stock, sizes_all, size_quantities, list_price, sale_price, discount
             FROM observations WHERE hash_key = ?1 ORDER BY obs_id ASC",
        )?;
        let observations = stmt
            .query_map(params![hash_key], |row| {
                Ok(ObservationRecord {
                    obs_id: row.get(0)?,
                    run_id: row.get(1)?,
                    hash_key: row.get(2)?,
                    crawl_ts: row.get(3)?,
                    num_sizes_in_stock: row.get(4)?,
                    sizes_in_stock: row.get(5)?,
                    sizes_all: row.get(6)?,
                    size_quantities: row.get(7)?,
                    list_price: row.get(8)?,
                    sale_price: row.get(9)?,
                    discount: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(observations)
    }
}
