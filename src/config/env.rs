//! Environment-variable configuration loading
//!
//! All knobs are read from the process environment exactly once, at startup.
//! Every variable has a documented default so an empty environment yields a
//! working configuration.
//!
//! | Variable              | Default                                      |
//! |-----------------------|----------------------------------------------|
//! | `CATEGORY_URL`        | `https://outlet.arcteryx.com/us/en/c/mens`   |
//! | `CONCURRENCY`         | `1`                                          |
//! | `REQUEST_JITTER_MS_MIN` | `700`                                      |
//! | `REQUEST_JITTER_MS_MAX` | `1500`                                     |
//! | `PDP_DELAY_MS`        | `2500`                                       |
//! | `PAGE_TIMEOUT_SECS`   | `180`                                        |
//! | `MAX_COLORS`          | `0` (no cap)                                 |
//! | `START_AT`            | `0`                                          |
//! | `WEBDRIVER_URL`       | `http://localhost:4444`                      |
//! | `USER_AGENT`          | `ColorwayTracker/0.3 (+contact: ops@example.com)` |
//! | `PROXY_URL`           | empty (direct)                               |
//! | `NAV_TIMEOUT_MS`      | `60000`                                      |
//! | `OUTPUT_CSV`          | `colorway_rows.csv`                          |
//! | `OUTPUT_DB`           | `colorway.sqlite`                            |
//! | `SOURCE_TAG`          | `arcteryx-outlet`                            |

use crate::config::types::{Config, CrawlConfig, OutputConfig, SessionConfig};
use crate::config::validation::validate_config;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::str::FromStr;

/// Reads a string variable, falling back to `default` when unset or empty.
fn var_or(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

/// Reads and parses a numeric variable, falling back to `default` when unset.
///
/// An unparseable value is an error rather than a silent fallback: a typo in
/// a pacing bound should stop the run, not quietly un-throttle it.
fn parsed_var_or<T: FromStr>(name: &str, default: T) -> ConfigResult<T> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => {
            v.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
                variable: name.to_string(),
                message: format!("cannot parse {:?}", v),
            })
        }
        _ => Ok(default),
    }
}

impl Config {
    /// Builds the configuration from the process environment and validates it.
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self {
            crawl: CrawlConfig {
                base_url: var_or("CATEGORY_URL", "https://outlet.arcteryx.com/us/en/c/mens"),
                concurrency: parsed_var_or("CONCURRENCY", 1u32)?,
                jitter_min_ms: parsed_var_or("REQUEST_JITTER_MS_MIN", 700u64)?,
                jitter_max_ms: parsed_var_or("REQUEST_JITTER_MS_MAX", 1500u64)?,
                pdp_delay_ms: parsed_var_or("PDP_DELAY_MS", 2500u64)?,
                page_timeout_secs: parsed_var_or("PAGE_TIMEOUT_SECS", 180u64)?,
                max_colors: parsed_var_or("MAX_COLORS", 0usize)?,
                start_at: parsed_var_or("START_AT", 0usize)?,
            },
            session: SessionConfig {
                webdriver_url: var_or("WEBDRIVER_URL", "http://localhost:4444"),
                user_agent: var_or(
                    "USER_AGENT",
                    "ColorwayTracker/0.3 (+contact: ops@example.com)",
                ),
                proxy_url: var_or("PROXY_URL", ""),
                nav_timeout_ms: parsed_var_or("NAV_TIMEOUT_MS", 60_000u64)?,
            },
            output: OutputConfig {
                csv_path: var_or("OUTPUT_CSV", "colorway_rows.csv"),
                db_path: var_or("OUTPUT_DB", "colorway.sqlite"),
                source_tag: var_or("SOURCE_TAG", "arcteryx-outlet"),
            },
        };

        validate_config(&config)?;
        Ok(config)
    }
}
