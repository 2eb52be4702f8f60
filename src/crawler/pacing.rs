//! Politeness delays
//!
//! Every wait between requests is jittered inside a configured window so the
//! crawl never settles into a fixed cadence.

use std::time::Duration;

/// Sleeps for a uniformly random duration in `[min_ms, max_ms]`. An inverted
/// window collapses to `min_ms`.
pub async fn jitter_sleep(min_ms: u64, max_ms: u64) {
    let span = max_ms.saturating_sub(min_ms);
    let ms = min_ms + fastrand::u64(0..=span);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn sleeps_at_least_the_minimum() {
        let start = Instant::now();
        jitter_sleep(20, 30).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn inverted_window_collapses_to_minimum() {
        let start = Instant::now();
        jitter_sleep(10, 5).await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(10));
        assert!(elapsed < Duration::from_millis(200));
    }
}
