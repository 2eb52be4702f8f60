//! Colorway: a polite storefront colorway tracker
//!
//! This crate implements a crawler that walks one category of a rendered
//! storefront, enumerates each product's color options, reconciles price,
//! size, inventory and image data from several unreliable sources, and
//! persists one observation per (product URL, color) pair per run.

pub mod automation;
pub mod config;
pub mod crawler;
pub mod embedded;
pub mod extract;
pub mod output;
pub mod page;
pub mod row;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Colorway operations
#[derive(Debug, Error)]
pub enum ColorwayError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Automation error: {0}")]
    Automation(#[from] automation::AutomationError),

    #[error("Navigation to {url} failed after {attempts} attempts")]
    NavigationExhausted { url: String, attempts: u32 },

    #[error("Page parse timed out for {url}")]
    PageTimeout { url: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid variant phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: page::VariantPhase,
        to: page::VariantPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {variable}: {message}")]
    InvalidValue { variable: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing origin in URL")]
    MissingOrigin,
}

/// Result type alias for Colorway operations
pub type Result<T> = std::result::Result<T, ColorwayError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use page::VariantPhase;
pub use row::AggregatedRow;
pub use url::{absolutize, is_product_path, locale_from_url, same_origin};
