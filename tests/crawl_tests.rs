//! Integration tests for the crawl pipeline
//!
//! These tests drive the full pipeline against a scripted automation
//! surface: category discovery, per-colorway extraction, CSV logging,
//! and the SQLite run/variant/observation store.

use colorway::automation::scripted::{ScriptedElement, ScriptedPage, ScriptedSurface};
use colorway::config::{Config, CrawlConfig, OutputConfig, SessionConfig};
use colorway::crawler::run_crawl;
use colorway::output::{CsvLog, MemorySink, HEADER};
use colorway::storage::{SqliteStore, VariantStore};
use serde_json::json;

const GRID: &str = "https://shop.example.com/us/en/c/mens";

/// Creates a test configuration with pacing collapsed to near zero
fn create_test_config(csv_path: &str, db_path: &str) -> Config {
    Config {
        crawl: CrawlConfig {
            base_url: GRID.to_string(),
            concurrency: 1,
            jitter_min_ms: 0,
            jitter_max_ms: 1,
            pdp_delay_ms: 0,
            page_timeout_secs: 30,
            max_colors: 0,
            start_at: 0,
        },
        session: SessionConfig {
            webdriver_url: "http://127.0.0.1:9515".to_string(),
            user_agent: "colorway-test/0.3".to_string(),
            proxy_url: String::new(),
            nav_timeout_ms: 1_000,
        },
        output: OutputConfig {
            csv_path: csv_path.to_string(),
            db_path: db_path.to_string(),
            source_tag: "test".to_string(),
        },
    }
}

/// A product page with one colorway, two sizes (M in stock, S sold out),
/// and a dedicated compare/current price pair.
fn pdp(color: &str, list: &str, sale: &str) -> ScriptedPage {
    ScriptedPage::new()
        .with_script(
            colorway::embedded::JSON_LD_SCRIPT,
            json!([{
                "@type": "Product",
                "name": format!("{} Jacket", color),
                "sku": "JKT-001",
                "image": "https://images.example.com/jacket.jpg",
            }]),
        )
        .with_elements(
            ".qa--colour-selector li[aria-label]",
            vec![ScriptedElement::new().attr("aria-label", color)],
        )
        .with_elements(
            "[data-testid='pdp-size-option']",
            vec![
                ScriptedElement::new().attr("aria-label", "M"),
                ScriptedElement::new()
                    .attr("aria-label", "S")
                    .attr("class", "size-chip size--no--stock"),
            ],
        )
        .with_elements(
            "[data-testid*='compare']",
            vec![ScriptedElement::new().text(list)],
        )
        .with_elements(
            "[data-testid*='current']",
            vec![ScriptedElement::new().text(sale)],
        )
}

fn grid_surface() -> ScriptedSurface {
    ScriptedSurface::new()
        .with_page(
            GRID,
            ScriptedPage::new().with_anchor_schedule(vec![
                vec!["/shop/alpha"],
                vec!["/shop/alpha", "/shop/beta"],
            ]),
        )
        .with_page(
            "https://shop.example.com/shop/alpha",
            pdp("Black", "$ 180.00", "$ 99.00"),
        )
        .with_page(
            "https://shop.example.com/shop/beta",
            pdp("Tatsu", "$ 220.00", "$ 220.00"),
        )
}

#[tokio::test]
async fn full_crawl_writes_csv_and_database() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("rows.csv");
    let csv_path = csv_path.to_str().unwrap();

    let surface = grid_surface();
    let mut store = SqliteStore::new_in_memory().unwrap();
    let mut sink = CsvLog::open(csv_path).unwrap();
    let config = create_test_config(csv_path, ":memory:");

    let summary = run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
        .await
        .unwrap();

    assert_eq!(summary.discovered, 2);
    assert_eq!(summary.visited, 2);
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.pages_failed, 0);

    // The CSV carries the header plus one line per colorway.
    let contents = std::fs::read_to_string(csv_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], HEADER.join(","));
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Black"));
    assert!(lines[1].contains("$ 180.00"));
    assert!(lines[1].contains("$ 99.00"));

    // The run row is closed out on clean completion.
    let run = store.latest_run().unwrap().unwrap();
    assert!(run.finished_at.is_some());

    // Each colorway lands in the variant table with an observation.
    let hash = colorway::AggregatedRow::hash_key("https://shop.example.com/shop/alpha", "Black");
    let variant = store.get_variant(&hash).unwrap().unwrap();
    assert_eq!(variant.color, "Black");
    assert_eq!(variant.name.as_deref(), Some("Black Jacket"));
    assert!(variant.ever_in_stock);

    let observations = store.observations_for(&hash).unwrap();
    assert_eq!(observations.len(), 1);
    assert_eq!(observations[0].run_id, run.id);
    assert_eq!(observations[0].sizes_all, "M,S");
    assert_eq!(observations[0].sizes_in_stock, "M");
    assert_eq!(observations[0].num_sizes_in_stock, 1);
    assert_eq!(observations[0].list_price.as_deref(), Some("$ 180.00"));
    assert_eq!(observations[0].sale_price.as_deref(), Some("$ 99.00"));
}

#[tokio::test]
async fn repeat_runs_accumulate_observations() {
    let surface = grid_surface();
    let mut store = SqliteStore::new_in_memory().unwrap();
    let config = create_test_config("unused.csv", ":memory:");

    let mut sink = MemorySink::new();
    run_crawl(&surface, &mut store, &mut sink, &config, GRID, None)
        .await
        .unwrap();

    // A later run where the product has sold out entirely.
    let sold_out = ScriptedPage::new()
        .with_elements(
            ".qa--colour-selector li[aria-label]",
            vec![ScriptedElement::new().attr("aria-label", "Black")],
        )
        .with_elements(
            "[data-testid='pdp-size-option']",
            vec![
                ScriptedElement::new()
                    .attr("aria-label", "M")
                    .attr("class", "size--no--stock"),
                ScriptedElement::new()
                    .attr("aria-label", "S")
                    .attr("class", "size--no--stock"),
            ],
        )
        .with_elements(
            "[data-testid*='current']",
            vec![ScriptedElement::new().text("$ 99.00")],
        );
    let surface = ScriptedSurface::new().with_page("https://shop.example.com/shop/alpha", sold_out);

    let mut sink = MemorySink::new();
    let url = "https://shop.example.com/shop/alpha";
    run_crawl(&surface, &mut store, &mut sink, &config, url, None)
        .await
        .unwrap();

    let hash = colorway::AggregatedRow::hash_key(url, "Black");
    let observations = store.observations_for(&hash).unwrap();
    assert_eq!(observations.len(), 2);
    assert_eq!(observations[1].num_sizes_in_stock, 0);

    // Stock history is monotonic: once seen in stock, always marked so.
    let variant = store.get_variant(&hash).unwrap().unwrap();
    assert!(variant.ever_in_stock);

    // Both runs are recorded, each closed out.
    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.id, 2);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn csv_rotation_preserves_prior_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("rows.csv");
    std::fs::write(&csv_path, "old_column_a,old_column_b\n1,2\n").unwrap();

    let surface = ScriptedSurface::new().with_page(
        "https://shop.example.com/shop/alpha",
        pdp("Black", "$ 180.00", "$ 99.00"),
    );
    let mut store = SqliteStore::new_in_memory().unwrap();
    let mut sink = CsvLog::open(&csv_path).unwrap();
    let config = create_test_config(csv_path.to_str().unwrap(), ":memory:");

    let url = "https://shop.example.com/shop/alpha";
    run_crawl(&surface, &mut store, &mut sink, &config, url, None)
        .await
        .unwrap();

    // The incompatible file was rotated aside, not overwritten.
    let backups: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(".bak_"))
        .collect();
    assert_eq!(backups.len(), 1);
    let backup = std::fs::read_to_string(backups[0].path()).unwrap();
    assert!(backup.starts_with("old_column_a,old_column_b"));

    let contents = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(contents.lines().next().unwrap(), HEADER.join(","));
    assert_eq!(contents.lines().count(), 2);
}
