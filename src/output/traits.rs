//! Row sink abstraction
//!
//! The crawler appends observation rows through this trait so the log format
//! stays swappable and tests can capture rows without touching disk.

use thiserror::Error;

use crate::row::AggregatedRow;

/// Errors surfaced by row sinks
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sink rejected rows: {0}")]
    Rejected(String),
}

/// Result type alias for sink operations
pub type SinkResult<T> = std::result::Result<T, SinkError>;

/// An append-only destination for observation rows.
pub trait RowSink: Send {
    /// Appends rows in order. Partial writes are not rolled back; callers
    /// treat a failed append as a failed batch.
    fn append(&mut self, rows: &[AggregatedRow]) -> SinkResult<()>;
}

/// Collects rows in memory. Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<AggregatedRow>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowSink for MemorySink {
    fn append(&mut self, rows: &[AggregatedRow]) -> SinkResult<()> {
        self.rows.extend_from_slice(rows);
        Ok(())
    }
}
