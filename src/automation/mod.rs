//! Automation surface: the rendered-page contract the core consumes
//!
//! The crawler never talks to a browser directly. Everything it needs from a
//! rendered page goes through two narrow traits:
//! - [`PageSurface`]: navigate, query elements, evaluate script, read the URL
//! - [`ElementHandle`]: read attributes/text, click, query nested elements
//!
//! Element operations are independently failable; extraction code treats a
//! failed read as "value absent" and moves to the next fallback. Two
//! implementations ship with the crate: a W3C WebDriver client
//! ([`webdriver::WebDriverSession`]) and a deterministic scripted surface
//! ([`scripted::ScriptedSurface`]) for tests and offline runs.

pub mod scripted;
pub mod webdriver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by automation backends
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Failed to start automation session: {0}")]
    SessionStart(String),

    #[error("Navigation failed for {url}: {message}")]
    Navigation { url: String, message: String },

    #[error("Element operation failed: {0}")]
    Element(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed wire response: {0}")]
    Wire(String),
}

/// Result type alias for automation operations
pub type AutomationResult<T> = std::result::Result<T, AutomationError>;

/// A handle to one element of a rendered page.
///
/// Handles may go stale when the page mutates under them; every method is
/// therefore failable and callers must not assume a second read succeeds
/// because a first one did.
#[async_trait]
pub trait ElementHandle: Send + Sync {
    /// Reads an attribute, `Ok(None)` when the attribute is not present.
    async fn attribute(&self, name: &str) -> AutomationResult<Option<String>>;

    /// Reads the element's visible text content.
    async fn text(&self) -> AutomationResult<String>;

    /// Clicks the element, waiting at most `timeout` for it to be actionable.
    async fn click(&self, timeout: Duration) -> AutomationResult<()>;

    /// Queries descendant elements by CSS selector.
    async fn query_all(&self, selector: &str) -> AutomationResult<Vec<Box<dyn ElementHandle>>>;
}

/// A live rendered-page session.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Navigates the session to `url`, waiting at most `timeout`.
    async fn navigate(&self, url: &str, timeout: Duration) -> AutomationResult<()>;

    /// Returns the session's current URL (after any redirects).
    async fn current_url(&self) -> AutomationResult<String>;

    /// Queries page elements by CSS selector, in document order.
    async fn query_all(&self, selector: &str) -> AutomationResult<Vec<Box<dyn ElementHandle>>>;

    /// Evaluates a script in the page and returns its JSON-serializable result.
    async fn evaluate(&self, script: &str) -> AutomationResult<serde_json::Value>;

    /// Closes the session. Best-effort; errors are reported, not retried.
    async fn close(&self) -> AutomationResult<()>;
}

/// Convenience: reads an attribute, treating any failure as absence.
pub async fn attr_or_none(element: &dyn ElementHandle, name: &str) -> Option<String> {
    match element.attribute(name).await {
        Ok(Some(v)) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Convenience: reads text content, treating any failure as absence.
pub async fn text_or_none(element: &dyn ElementHandle) -> Option<String> {
    match element.text().await {
        Ok(t) if !t.trim().is_empty() => Some(t),
        _ => None,
    }
}
