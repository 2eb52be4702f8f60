use serde::Serialize;

/// Runtime configuration, built once at startup and passed by reference
/// into the orchestrator. There is no ambient global configuration.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Serialize)]
pub struct CrawlConfig {
    /// Category URL used when no start URL is given on the command line
    pub base_url: String,

    /// Number of crawl workers. The baseline crawl is sequential; values
    /// above 1 are accepted for forward compatibility but not acted on.
    pub concurrency: u32,

    /// Lower bound of the politeness jitter window (milliseconds)
    pub jitter_min_ms: u64,

    /// Upper bound of the politeness jitter window (milliseconds)
    pub jitter_max_ms: u64,

    /// Fixed settle delay after navigating to a product page (milliseconds)
    pub pdp_delay_ms: u64,

    /// Overall budget for parsing one product page (seconds)
    pub page_timeout_secs: u64,

    /// Cap on color options processed per product page (0 = no cap)
    pub max_colors: usize,

    /// Resume offset into the discovered link list, overridable by the
    /// third positional CLI argument
    pub start_at: usize,
}

/// Automation session configuration
#[derive(Debug, Clone, Serialize)]
pub struct SessionConfig {
    /// WebDriver remote endpoint
    pub webdriver_url: String,

    /// User agent announced by the browser session
    pub user_agent: String,

    /// Upstream proxy URL, empty for direct connections
    pub proxy_url: String,

    /// Navigation timeout (milliseconds)
    pub nav_timeout_ms: u64,
}

/// Output locations configuration
#[derive(Debug, Clone, Serialize)]
pub struct OutputConfig {
    /// Path of the append-only flat row log
    pub csv_path: String,

    /// Path of the SQLite run/variant/observation store
    pub db_path: String,

    /// Source tag stamped on every row
    pub source_tag: String,
}
