//! Crawl orchestration
//!
//! This module contains the crawl loop and its pacing:
//! - run bookkeeping and resumable visit windows
//! - navigation with bounded retry
//! - colorway de-duplication within a run
//! - jittered politeness delays between requests

mod coordinator;
pub mod pacing;

pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
