//! Crawl coordinator - main orchestration logic
//!
//! Drives one run end to end: open a run row, navigate to the category,
//! discover product links (or accept a single detail-page URL), then visit
//! each page with retry and politeness pacing, de-duplicate colorways, and
//! fan accepted rows out to the CSV sink and the database.

use std::collections::HashSet;
use std::time::Duration;

use url::Url;

use crate::automation::PageSurface;
use crate::config::Config;
use crate::crawler::pacing::jitter_sleep;
use crate::output::RowSink;
use crate::page::{collect_product_links, parse_product_page};
use crate::row::now_iso;
use crate::storage::VariantStore;
use crate::url::{absolutize, is_product_path, locale_from_url};
use crate::{ColorwayError, Result};

/// Navigation attempts per page before it is skipped.
const NAV_ATTEMPTS: u32 = 3;

/// Jitter window between navigation retries.
const NAV_RETRY_JITTER_MS: (u64, u64) = (500, 1200);

/// Jitter window between discovery scroll iterations.
const DISCOVERY_JITTER_MS: (u64, u64) = (300, 800);

/// Added to the configured jitter window for the pause between detail pages.
const POLITENESS_EXTRA_MS: (u64, u64) = (400, 1200);

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub discovered: usize,
    pub visited: usize,
    pub rows_written: usize,
    pub duplicates_skipped: usize,
    pub pages_failed: usize,
}

/// Main crawl coordinator
pub struct Coordinator<'a> {
    page: &'a dyn PageSurface,
    store: &'a mut dyn VariantStore,
    sink: &'a mut dyn RowSink,
    config: &'a Config,
}

impl<'a> Coordinator<'a> {
    pub fn new(
        page: &'a dyn PageSurface,
        store: &'a mut dyn VariantStore,
        sink: &'a mut dyn RowSink,
        config: &'a Config,
    ) -> Self {
        Self {
            page,
            store,
            sink,
            config,
        }
    }

    async fn navigate_with_retry(&self, url: &str) -> Result<()> {
        let timeout = Duration::from_millis(self.config.session.nav_timeout_ms);
        for attempt in 1..=NAV_ATTEMPTS {
            match self.page.navigate(url, timeout).await {
                Ok(()) => return Ok(()),
                Err(error) => {
                    tracing::warn!(url, attempt, max = NAV_ATTEMPTS, %error, "navigation failed");
                    if attempt < NAV_ATTEMPTS {
                        jitter_sleep(NAV_RETRY_JITTER_MS.0, NAV_RETRY_JITTER_MS.1).await;
                    }
                }
            }
        }
        Err(ColorwayError::NavigationExhausted {
            url: url.to_string(),
            attempts: NAV_ATTEMPTS,
        })
    }

    /// Runs one crawl starting at `start_url`. `limit` caps the absolute link
    /// index visited, so it composes with the configured start offset for
    /// windowed resumes.
    ///
    /// The run row is marked finished only when the crawl completes; an early
    /// return leaves `finished_at` NULL as the unclean-stop marker.
    pub async fn run(&mut self, start_url: &str, limit: Option<usize>) -> Result<CrawlSummary> {
        let start = Url::parse(start_url)?;
        let locale = locale_from_url(&start);
        let run_id = self.store.begin_run(&now_iso())?;
        tracing::info!(run_id, start_url, locale, "starting crawl");

        self.navigate_with_retry(start_url).await?;
        jitter_sleep(self.config.crawl.jitter_min_ms, self.config.crawl.jitter_max_ms).await;

        // A detail-page URL means single-page mode: crawl just that product.
        let links = if is_product_path(start.path()) {
            tracing::info!("single page mode: crawling the provided product only");
            vec![start_url.to_string()]
        } else {
            let links = collect_product_links(self.page, DISCOVERY_JITTER_MS).await;
            tracing::info!(count = links.len(), "discovered product links");
            links
        };

        let mut summary = CrawlSummary {
            discovered: links.len(),
            ..CrawlSummary::default()
        };
        let mut seen: HashSet<String> = HashSet::new();
        let base = Url::parse(&self.config.crawl.base_url)?;

        for (index, link) in links.iter().enumerate() {
            if index < self.config.crawl.start_at {
                continue;
            }
            if let Some(limit) = limit {
                if index >= limit {
                    break;
                }
            }
            let url = match absolutize(link, &base) {
                Ok(url) => url.to_string(),
                Err(error) => {
                    tracing::warn!(link, %error, "skipping unparseable link");
                    continue;
                }
            };
            tracing::info!(position = index + 1, total = links.len(), url, "visiting product page");

            if self.navigate_with_retry(&url).await.is_err() {
                summary.pages_failed += 1;
                continue;
            }
            tokio::time::sleep(Duration::from_millis(self.config.crawl.pdp_delay_ms)).await;

            let parse = parse_product_page(
                self.page,
                &url,
                &self.config.crawl,
                &locale,
                &self.config.output.source_tag,
            );
            let timeout = Duration::from_secs(self.config.crawl.page_timeout_secs);
            let rows = match tokio::time::timeout(timeout, parse).await {
                Ok(rows) => rows,
                Err(_) => {
                    tracing::warn!(url, "product page parse timed out");
                    summary.pages_failed += 1;
                    continue;
                }
            };
            summary.visited += 1;

            let mut fresh = Vec::new();
            for row in rows {
                if seen.insert(row.hash_key.clone()) {
                    fresh.push(row);
                } else {
                    summary.duplicates_skipped += 1;
                }
            }
            if fresh.is_empty() {
                tracing::info!(url, "no new colorways on page");
            } else {
                // A failed write drops the rows for that sink only; the other
                // sink and the crawl continue.
                if let Err(error) = self.sink.append(&fresh) {
                    tracing::warn!(url, %error, "flat log append failed, rows dropped from the log");
                }
                for row in &fresh {
                    if let Err(error) = self.store.upsert_variant(row) {
                        tracing::warn!(url, color = %row.color, %error, "variant upsert failed, observation dropped");
                        continue;
                    }
                    if let Err(error) = self.store.insert_observation(run_id, row) {
                        tracing::warn!(url, color = %row.color, %error, "observation insert failed");
                    }
                }
                summary.rows_written += fresh.len();
                tracing::info!(url, rows = fresh.len(), "recorded colorways");
            }

            jitter_sleep(
                self.config.crawl.jitter_min_ms + POLITENESS_EXTRA_MS.0,
                self.config.crawl.jitter_max_ms + POLITENESS_EXTRA_MS.1,
            )
            .await;
        }

        self.store.finish_run(run_id, &now_iso())?;
        tracing::info!(
            run_id,
            visited = summary.visited,
            rows = summary.rows_written,
            duplicates = summary.duplicates_skipped,
            failed = summary.pages_failed,
            "crawl finished"
        );
        Ok(summary)
    }
}

/// Runs a complete crawl with the given backends.
pub async fn run_crawl(
    page: &dyn PageSurface,
    store: &mut dyn VariantStore,
    sink: &mut dyn RowSink,
    config: &Config,
    start_url: &str,
    limit: Option<usize>,
) -> Result<CrawlSummary> {
    Coordinator::new(page, store, sink, config).run(start_url, limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::scripted::{ScriptedElement, ScriptedPage, ScriptedSurface};
    use crate::config;
    use crate::output::{MemorySink, SinkError, SinkResult};
    use crate::row::AggregatedRow;
    use crate::storage::SqliteStore;
    use serde_json::json;

    const GRID: &str = "https://shop.example.com/us/en/c/mens";

    fn quick_config() -> Config {
        let mut config = config::test_config();
        config.crawl.base_url = GRID.to_string();
        config.crawl.jitter_min_ms = 0;
        config.crawl.jitter_max_ms = 1;
        config.crawl.pdp_delay_ms = 0;
        config
    }

    fn pdp(color: &str, price: &str) -> ScriptedPage {
        ScriptedPage::new()
            .with_script(
                crate::embedded::JSON_LD_SCRIPT,
                json!([{"name": format!("{} Jacket", color), "sku": "SKU-1"}]),
            )
            .with_elements(
                ".qa--colour-selector li[aria-label]",
                vec![ScriptedElement::new().attr("aria-label", color)],
            )
            .with_elements(
                "[data-testid='price']",
                vec![ScriptedElement::new().text(price)],
            )
    }

    fn grid_surface() -> ScriptedSurface {
        ScriptedSurface::new()
            .with_page(
                GRID,
                ScriptedPage::new().with_anchor_schedule(vec![vec!["/shop/alpha", "/shop/beta"]]),
            )
            .with_page("https://shop.example.com/shop/alpha", pdp("Black", "$ 99.00"))
            .with_page("https://shop.example.com/shop/beta", pdp("Tatsu", "$ 120.00"))
    }

    #[tokio::test]
    async fn crawls_grid_and_records_rows() {
        let surface = grid_surface();
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = MemorySink::new();
        let config = quick_config();

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
            .await
            .unwrap();

        assert_eq!(summary.discovered, 2);
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.rows_written, 2);
        assert_eq!(summary.pages_failed, 0);
        assert_eq!(sink.rows.len(), 2);
        assert!(store.latest_run().unwrap().unwrap().finished_at.is_some());

        let variant = store.get_variant(&sink.rows[0].hash_key).unwrap().unwrap();
        assert_eq!(variant.color, "Black");
    }

    #[tokio::test]
    async fn single_page_mode_skips_discovery() {
        let url = "https://shop.example.com/shop/alpha";
        let surface = ScriptedSurface::new().with_page(url, pdp("Black", "$ 99.00"));
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = MemorySink::new();
        let config = quick_config();

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, url, None)
            .await
            .unwrap();
        assert_eq!(summary.discovered, 1);
        assert_eq!(sink.rows.len(), 1);
        assert_eq!(sink.rows[0].product_url, url);
    }

    #[tokio::test]
    async fn transient_navigation_failures_are_retried() {
        let surface = grid_surface().fail_navigations("https://shop.example.com/shop/alpha", 2);
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = MemorySink::new();
        let config = quick_config();

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
            .await
            .unwrap();
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.pages_failed, 0);
    }

    #[tokio::test]
    async fn exhausted_navigation_skips_the_page() {
        let surface = grid_surface().fail_navigations("https://shop.example.com/shop/alpha", 5);
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = MemorySink::new();
        let config = quick_config();

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
            .await
            .unwrap();
        assert_eq!(summary.pages_failed, 1);
        assert_eq!(summary.visited, 1);
        assert_eq!(sink.rows.len(), 1);
    }

    #[tokio::test]
    async fn limit_and_start_offset_window_the_visit_range() {
        let surface = grid_surface();
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = MemorySink::new();
        let mut config = quick_config();
        config.crawl.start_at = 1;

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
            .await
            .unwrap();
        assert_eq!(summary.visited, 1);
        assert_eq!(sink.rows[0].product_url, "https://shop.example.com/shop/beta");

        let mut sink = MemorySink::new();
        let mut store = SqliteStore::new_in_memory().unwrap();
        config.crawl.start_at = 0;
        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, Some(1))
            .await
            .unwrap();
        assert_eq!(summary.visited, 1);
        assert_eq!(sink.rows[0].product_url, "https://shop.example.com/shop/alpha");
    }

    /// A sink that rejects every append, standing in for a full disk.
    struct RejectingSink;

    impl RowSink for RejectingSink {
        fn append(&mut self, _rows: &[AggregatedRow]) -> SinkResult<()> {
            Err(SinkError::Rejected("disk full".into()))
        }
    }

    #[tokio::test]
    async fn sink_failure_does_not_abort_the_run() {
        let surface = grid_surface();
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = RejectingSink;
        let config = quick_config();

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
            .await
            .unwrap();

        // Both pages are still visited and the run is closed out.
        assert_eq!(summary.visited, 2);
        assert_eq!(summary.rows_written, 2);
        assert!(store.latest_run().unwrap().unwrap().finished_at.is_some());

        // The database writes are independent of the failed log.
        let hash = AggregatedRow::hash_key("https://shop.example.com/shop/alpha", "Black");
        let variant = store.get_variant(&hash).unwrap().unwrap();
        assert_eq!(variant.color, "Black");
        assert_eq!(store.observations_for(&hash).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_colorways_are_dropped_within_a_run() {
        // The swatch strip renders "Black" twice; both clicks resolve to the
        // same (product_url, color) identity.
        let doubled = ScriptedPage::new()
            .with_elements(
                ".qa--colour-selector li[aria-label]",
                vec![
                    ScriptedElement::new().attr("aria-label", "Black"),
                    ScriptedElement::new().attr("aria-label", "Black"),
                ],
            )
            .with_elements(
                "[data-testid='price']",
                vec![ScriptedElement::new().text("$ 99.00")],
            );
        let surface = ScriptedSurface::new()
            .with_page(
                GRID,
                ScriptedPage::new().with_anchor_schedule(vec![vec!["/shop/alpha"]]),
            )
            .with_page("https://shop.example.com/shop/alpha", doubled);
        let mut store = SqliteStore::new_in_memory().unwrap();
        let mut sink = MemorySink::new();
        let config = quick_config();

        let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
            .await
            .unwrap();
        assert_eq!(summary.rows_written, 1);
        assert_eq!(summary.duplicates_skipped, 1);
        assert_eq!(sink.rows.len(), 1);
    }
}
