//! Observation outputs: the append-only CSV log and the sink trait the
//! crawler writes through.

pub mod csv_log;
pub mod traits;

pub use csv_log::{CsvLog, HEADER};
pub use traits::{MemorySink, RowSink, SinkError, SinkResult};
