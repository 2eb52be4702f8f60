//! Configuration module for Colorway
//!
//! Configuration is read from environment variables once at process start
//! (`Config::from_env`), validated, and passed by reference into the
//! orchestrator. See `env.rs` for the variable table and defaults.

mod env;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, OutputConfig, SessionConfig};

// Re-export validation entry point
pub use validation::validate_config;

/// A small, valid configuration for unit tests.
#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        crawl: CrawlConfig {
            base_url: "https://shop.example.com/us/en/c/mens".to_string(),
            concurrency: 1,
            jitter_min_ms: 0,
            jitter_max_ms: 1,
            pdp_delay_ms: 0,
            page_timeout_secs: 30,
            max_colors: 0,
            start_at: 0,
        },
        session: SessionConfig {
            webdriver_url: "http://localhost:4444".to_string(),
            user_agent: "ColorwayTest/0.0".to_string(),
            proxy_url: String::new(),
            nav_timeout_ms: 1000,
        },
        output: OutputConfig {
            csv_path: "test_rows.csv".to_string(),
            db_path: ":memory:".to_string(),
            source_tag: "test-source".to_string(),
        },
    }
}
