//! Per-colorway extraction on a product detail page
//!
//! For each colour option the walk clicks the swatch, reads sizes, selects a
//! size so sale pricing renders, then resolves prices. Ordering matters:
//! sizes must be read before any size is selected, because availability is
//! per-colour and a size click can mutate the rendered chips. The
//! [`VariantWalk`] state machine makes that ordering structural instead of
//! conventional.

use serde_json::Value;
use std::time::Duration;

use crate::automation::{attr_or_none, PageSurface};
use crate::config::CrawlConfig;
use crate::crawler::pacing::jitter_sleep;
use crate::embedded;
use crate::extract::{fields, money, price, sizes, SwatchRef};
use crate::row::{now_iso, AggregatedRow, SizeBuckets};
use crate::{ColorwayError, Result};

const CLICK_TIMEOUT: Duration = Duration::from_secs(5);
const CHILD_CLICK_TIMEOUT: Duration = Duration::from_secs(3);

/// Stage of the walk through one colorway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantPhase {
    Idle,
    ColorSelected,
    SizesRead,
    PriceRead,
}

impl VariantPhase {
    /// The phase that must be current before entering `self`.
    fn predecessor(self) -> VariantPhase {
        match self {
            VariantPhase::Idle => VariantPhase::PriceRead,
            VariantPhase::ColorSelected => VariantPhase::Idle,
            VariantPhase::SizesRead => VariantPhase::ColorSelected,
            VariantPhase::PriceRead => VariantPhase::SizesRead,
        }
    }
}

/// Enforces the colorway extraction order. Reading prices before sizes, or
/// sizes before a colour is selected, is rejected rather than silently
/// producing rows from a half-settled page.
#[derive(Debug)]
pub struct VariantWalk {
    phase: VariantPhase,
}

impl VariantWalk {
    pub fn new() -> Self {
        Self {
            phase: VariantPhase::Idle,
        }
    }

    pub fn phase(&self) -> VariantPhase {
        self.phase
    }

    pub fn advance(&mut self, to: VariantPhase) -> Result<()> {
        if self.phase != to.predecessor() {
            return Err(ColorwayError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }
}

impl Default for VariantWalk {
    fn default() -> Self {
        Self::new()
    }
}

async fn click_swatch(page: &dyn PageSurface, swatch: &SwatchRef) {
    let Some(handle) = fields::resolve_swatch(page, swatch).await else {
        return;
    };
    if handle.click(CLICK_TIMEOUT).await.is_ok() {
        return;
    }
    // List items are often not directly actionable; click the interactive
    // child instead.
    if let Ok(children) = handle.query_all("button, [role='radio'], label").await {
        if let Some(child) = children.first() {
            let _ = child.click(CHILD_CLICK_TIMEOUT).await;
        }
    }
}

async fn color_label(page: &dyn PageSurface, swatch: &SwatchRef) -> Option<String> {
    if let Some(label) = &swatch.label {
        return Some(label.clone());
    }
    if let Some(handle) = fields::resolve_swatch(page, swatch).await {
        if let Ok(children) = handle.query_all("[aria-label]").await {
            if let Some(child) = children.first() {
                if let Some(label) = attr_or_none(child.as_ref(), "aria-label").await {
                    return Some(label);
                }
            }
        }
    }
    fields::read_selected_color_name(page).await
}

/// Moves swatches whose label matches an explicit "Discounted colour" callout
/// to the front, so a colour cap still covers the discounted one.
fn prioritize_discounted(swatches: Vec<SwatchRef>, discounted: Option<&str>) -> Vec<SwatchRef> {
    let Some(discounted) = discounted else {
        return swatches;
    };
    let needle = discounted.to_lowercase();
    let (mut matched, other): (Vec<_>, Vec<_>) = swatches.into_iter().partition(|swatch| {
        swatch
            .label
            .as_deref()
            .map(|l| l.to_lowercase().contains(&needle))
            .unwrap_or(false)
    });
    if matched.is_empty() {
        return other;
    }
    matched.extend(other);
    matched
}

fn embedded_price_fallback(
    state: Option<&Value>,
    json_ld: &serde_json::Map<String, Value>,
    fields_out: &mut price::PriceFields,
) {
    let ld_sale = price::prices_from_json_ld(json_ld);
    let currency = fields::currency_from_json_ld(json_ld);

    let mut compare_val: Option<Value> = None;
    let mut current_val: Option<Value> = None;
    if let Some(state) = state {
        let found = embedded::collect_price_fields(state);
        compare_val = ["compareatprice", "compare_at_price", "compare_at", "listprice"]
            .iter()
            .find_map(|key| found.get(*key).cloned());
        current_val = ["saleprice", "finalprice", "price"]
            .iter()
            .find_map(|key| found.get(*key).cloned());
    }

    if fields_out.list_price.is_none() {
        fields_out.list_price = compare_val
            .as_ref()
            .and_then(|v| money::to_price_string(v, currency.as_deref()));
    }
    if fields_out.sale_price.is_none() {
        fields_out.sale_price = ld_sale.or_else(|| {
            current_val
                .as_ref()
                .and_then(|v| money::to_price_string(v, currency.as_deref()))
        });
    }
}

struct ColorwayObservation {
    color: Option<String>,
    prices: price::PriceFields,
    sizes: Vec<(String, bool)>,
    size_quantities: std::collections::BTreeMap<String, i64>,
    image_url: Option<String>,
    inventory_amount: Option<i64>,
}

async fn observe_colorway(
    page: &dyn PageSurface,
    swatch: Option<&SwatchRef>,
    state: Option<&Value>,
    json_ld: &serde_json::Map<String, Value>,
    crawl: &CrawlConfig,
) -> Result<ColorwayObservation> {
    let mut walk = VariantWalk::new();

    walk.advance(VariantPhase::ColorSelected)?;
    let color = match swatch {
        Some(swatch) => {
            click_swatch(page, swatch).await;
            jitter_sleep(crawl.jitter_min_ms, crawl.jitter_max_ms).await;
            color_label(page, swatch).await
        }
        None => fields::read_selected_color_name(page).await,
    };
    fields::dismiss_cookie_banner(page).await;

    // Sizes first: availability is per-colour and the upcoming size click
    // can refresh the chips.
    walk.advance(VariantPhase::SizesRead)?;
    let product = state.and_then(embedded::product_from_state);
    let (mut size_pairs, mut size_quantities) = match &product {
        Some(product) => embedded::sizes_for_color(product, color.as_deref()),
        None => (Vec::new(), std::collections::BTreeMap::new()),
    };
    if size_pairs.is_empty() {
        size_pairs = sizes::extract_sizes(page).await;
    }

    sizes::select_first_in_stock_size(page, &size_pairs).await;

    walk.advance(VariantPhase::PriceRead)?;
    let mut prices = price::resolve_prices(page).await;
    if prices.list_price.is_none() || prices.sale_price.is_none() {
        embedded_price_fallback(state, json_ld, &mut prices);
    }
    if prices.discount.is_none() {
        prices.discount = price::discount_text(page).await;
    }
    let (list, sale) =
        price::derive_missing(prices.list_price.take(), prices.sale_price.take(), prices.discount.as_deref());
    let (list, sale) = price::normalize_order(list, sale);
    prices.list_price = list;
    prices.sale_price = sale;

    let mut image_url = product
        .as_ref()
        .and_then(|p| embedded::hero_image_for_color(p, color.as_deref()));
    if image_url.is_none() {
        image_url = fields::image_from_json_ld(json_ld);
    }
    if image_url.is_none() {
        image_url = fields::read_image_url(page).await;
    }

    let amounts = state.map(embedded::collect_inventory_amounts).unwrap_or_default();
    if size_quantities.is_empty() {
        if let Some(state) = state {
            size_quantities = embedded::collect_size_quantities(state, color.as_deref());
        }
    }
    let inventory_amount = embedded::resolve_inventory_amount(&amounts, &size_quantities);

    walk.advance(VariantPhase::Idle)?;
    Ok(ColorwayObservation {
        color,
        prices,
        sizes: size_pairs,
        size_quantities,
        image_url,
        inventory_amount,
    })
}

/// Parses a product detail page into one row per colour option.
///
/// Per-colour failures are logged and skipped; the page yields whatever rows
/// its healthy colours produce. De-duplication across pages happens upstream.
pub async fn parse_product_page(
    page: &dyn PageSurface,
    url: &str,
    crawl: &CrawlConfig,
    locale: &str,
    source_tag: &str,
) -> Vec<AggregatedRow> {
    tracing::debug!(url, "parsing product page");
    let json_ld = embedded::read_json_ld(page).await;
    let state = embedded::read_state(page).await;

    let base_name = fields::name_from_json_ld(&json_ld);
    let sku = fields::sku_from_json_ld(&json_ld);
    let category_path = fields::extract_breadcrumb(page).await;

    let mut swatches = fields::find_color_swatches(page).await;
    let discounted = fields::read_discounted_color_name(page).await;
    swatches = prioritize_discounted(swatches, discounted.as_deref());
    if crawl.max_colors > 0 {
        swatches.truncate(crawl.max_colors);
    }
    tracing::debug!(url, colors = swatches.len(), "found color options");

    // A page without swatches is a single-colorway product.
    let targets: Vec<Option<SwatchRef>> = if swatches.is_empty() {
        vec![None]
    } else {
        swatches.into_iter().map(Some).collect()
    };

    let mut rows = Vec::new();
    for (index, target) in targets.iter().enumerate() {
        let observation =
            match observe_colorway(page, target.as_ref(), state.as_ref(), &json_ld, crawl).await {
                Ok(observation) => observation,
                Err(error) => {
                    tracing::warn!(url, color_index = index + 1, %error, "colorway extraction failed");
                    continue;
                }
            };

        let name = match &base_name {
            Some(name) => Some(name.clone()),
            None => fields::read_heading(page).await,
        };
        // Index fallback keeps distinct unnamed colorways from de-duplicating
        // into one.
        let color = observation
            .color
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| format!("color_{}", index + 1));

        let buckets = SizeBuckets::from_pairs(&observation.sizes);
        let size_quantities = if observation.size_quantities.is_empty() {
            None
        } else {
            serde_json::to_string(&observation.size_quantities).ok()
        };

        rows.push(AggregatedRow {
            crawl_ts: now_iso(),
            locale: locale.to_string(),
            category_path: category_path.clone(),
            name,
            sku: sku.clone(),
            product_url: url.to_string(),
            color: color.clone(),
            list_price: observation.prices.list_price,
            sale_price: observation.prices.sale_price,
            discount: observation.prices.discount,
            image_url: observation.image_url,
            inventory_amount: observation.inventory_amount,
            size_quantities,
            sizes_all: buckets.joined_all(),
            sizes_in_stock: buckets.joined_in_stock(),
            sizes_out_of_stock: buckets.joined_out_of_stock(),
            num_sizes_in_stock: buckets.in_stock.len(),
            hash_key: AggregatedRow::hash_key(url, &color),
            source: source_tag.to_string(),
        });
        tracing::debug!(url, color = %color, sizes = buckets.all.len(), in_stock = buckets.in_stock.len(), "colorway extracted");
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::scripted::{ScriptedElement, ScriptedPage, ScriptedSurface};
    use crate::config;
    use serde_json::json;

    const PDP: &str = "https://shop.example.com/us/en/shop/alpha-jacket";

    fn crawl_config() -> CrawlConfig {
        let mut crawl = config::test_config().crawl;
        crawl.jitter_min_ms = 0;
        crawl.jitter_max_ms = 1;
        crawl
    }

    fn state_blob() -> serde_json::Value {
        json!({
            "props": {"pageProps": {"product": {
                "colourOptions": {"options": [
                    {"label": "Black Sapphire", "value": "c1",
                     "heroImage": {"url": "/products/alpha/black.jpg"}},
                    {"label": "Tatsu", "value": "c2",
                     "heroImage": {"url": "/products/alpha/tatsu.jpg"}},
                ]},
                "sizeOptions": {"options": [
                    {"label": "S", "value": "s1"},
                    {"label": "M", "value": "s2"},
                ]},
                "variants": [
                    {"colourId": "c1", "sizeId": "s1", "inventory": 3},
                    {"colourId": "c1", "sizeId": "s2", "inventory": 0},
                    {"colourId": "c2", "sizeId": "s1", "inventory": 7},
                    {"colourId": "c2", "sizeId": "s2", "inventory": 2},
                ],
            }}}
        })
    }

    fn pdp_page() -> ScriptedPage {
        ScriptedPage::new()
            .with_script(embedded::STATE_SCRIPT, state_blob())
            .with_script(
                embedded::JSON_LD_SCRIPT,
                json!([{"name": "Alpha Jacket", "sku": "ALPHA-1",
                        "offers": {"price": "175.00", "priceCurrency": "USD"}}]),
            )
            .with_elements(
                ".qa--colour-selector li[aria-label]",
                vec![
                    ScriptedElement::new().attr("aria-label", "Black Sapphire"),
                    ScriptedElement::new().attr("aria-label", "Tatsu"),
                ],
            )
            .with_elements(
                "[data-testid='price']",
                vec![ScriptedElement::new().text("$ 250.00 $ 175.00 Save 30%")],
            )
            .with_elements(
                "nav[aria-label=\"breadcrumb\"]",
                vec![ScriptedElement::new().text("Home / Men's / Jackets")],
            )
    }

    async fn surface() -> ScriptedSurface {
        let surface = ScriptedSurface::new().with_page(PDP, pdp_page());
        surface.navigate(PDP, Duration::from_secs(1)).await.unwrap();
        surface
    }

    #[test]
    fn walk_enforces_ordering() {
        let mut walk = VariantWalk::new();
        assert!(matches!(
            walk.advance(VariantPhase::SizesRead),
            Err(ColorwayError::InvalidTransition { .. })
        ));
        walk.advance(VariantPhase::ColorSelected).unwrap();
        assert!(matches!(
            walk.advance(VariantPhase::PriceRead),
            Err(ColorwayError::InvalidTransition { .. })
        ));
        walk.advance(VariantPhase::SizesRead).unwrap();
        walk.advance(VariantPhase::PriceRead).unwrap();
        walk.advance(VariantPhase::Idle).unwrap();
        assert_eq!(walk.phase(), VariantPhase::Idle);
    }

    #[tokio::test]
    async fn emits_one_row_per_colorway() {
        let surface = surface().await;
        let crawl = crawl_config();
        let rows = parse_product_page(&surface, PDP, &crawl, "us-en", "arcteryx-outlet").await;

        assert_eq!(rows.len(), 2);
        let black = &rows[0];
        assert_eq!(black.color, "Black Sapphire");
        assert_eq!(black.name.as_deref(), Some("Alpha Jacket"));
        assert_eq!(black.sku.as_deref(), Some("ALPHA-1"));
        assert_eq!(black.category_path.as_deref(), Some("Home / Men's / Jackets"));
        assert_eq!(black.sizes_all, "M,S");
        assert_eq!(black.sizes_in_stock, "S");
        assert_eq!(black.sizes_out_of_stock, "M");
        assert_eq!(black.num_sizes_in_stock, 1);
        assert_eq!(black.inventory_amount, Some(3));
        assert_eq!(black.list_price.as_deref(), Some("$ 250.00"));
        assert_eq!(black.sale_price.as_deref(), Some("$ 175.00"));
        assert_eq!(black.discount.as_deref(), Some("30%"));
        assert_eq!(
            black.image_url.as_deref(),
            Some("https://images.arcteryx.com/products/alpha/black.jpg")
        );
        assert_eq!(
            black.size_quantities.as_deref(),
            Some("{\"M\":0,\"S\":3}")
        );
        assert_ne!(rows[0].hash_key, rows[1].hash_key);
        assert_eq!(rows[1].inventory_amount, Some(9));
    }

    #[tokio::test]
    async fn colour_cap_limits_rows() {
        let surface = surface().await;
        let mut crawl = crawl_config();
        crawl.max_colors = 1;
        let rows = parse_product_page(&surface, PDP, &crawl, "us-en", "arcteryx-outlet").await;
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn swatchless_page_yields_single_indexed_colorway() {
        let page = ScriptedPage::new().with_elements(
            "[data-testid='price']",
            vec![ScriptedElement::new().text("$ 99.00")],
        );
        let surface = ScriptedSurface::new().with_page(PDP, page);
        surface.navigate(PDP, Duration::from_secs(1)).await.unwrap();
        let crawl = crawl_config();
        let rows = parse_product_page(&surface, PDP, &crawl, "us-en", "arcteryx-outlet").await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].color, "color_1");
        assert_eq!(rows[0].sale_price.as_deref(), Some("$ 99.00"));
    }

    #[test]
    fn discounted_colour_moves_to_front() {
        let swatches = vec![
            SwatchRef { selector: "s".into(), index: 0, label: Some("Black".into()) },
            SwatchRef { selector: "s".into(), index: 1, label: Some("Blue Tetra/Black".into()) },
        ];
        let ordered = prioritize_discounted(swatches, Some("Blue Tetra"));
        assert_eq!(ordered[0].label.as_deref(), Some("Blue Tetra/Black"));
    }
}
