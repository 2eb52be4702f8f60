//! Price resolution for a selected colorway
//!
//! Storefront markup around prices is unstable, so resolution runs a fallback
//! chain and takes the first layer that yields values:
//! 1. dedicated compare-at / current containers
//! 2. generic price-container text (two amounts: min is sale, max is list;
//!    one amount with "Save N%" copy nearby is the list price, else sale)
//! 3. a whole-body scan when a side is still missing or both sides read the
//!    same amount, with financing lines stripped first
//! 4. JSON-LD offers, when the rendered DOM gave nothing
//!
//! Reconciliation then derives a missing side from the discount percent and
//! swaps the pair if sale ended up above list.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::money;
use crate::automation::{text_or_none, PageSurface};

/// Lines matching this carry financing offers ("4 payments of $43.75 with
/// Klarna") whose smaller amounts would corrupt the min/max assignment.
static FINANCING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)payments?|klarna|afterpay|affirm|interest").expect("financing pattern"));

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws pattern"));

/// Reads the page body's visible text for the wide-scan fallback.
const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

const COMPARE_SELECTORS: &[&str] = &[
    "[data-testid*='compare']",
    ".compare-at, .CompareAt, [class*='compare']",
    ".price--compare, .price-compare, .was-price, .PriceCompare",
    "del, .strike, .strikethrough",
];

const CURRENT_SELECTORS: &[&str] = &[
    "[data-testid*='current']",
    ".current-price, .CurrentPrice, [class*='current']",
    ".price--sale, .sale-price, .SalePrice, .PriceSale",
    ".price, .Price .value",
];

const PRICE_TEXT_SELECTORS: &[&str] = &[
    "[data-testid='price']",
    "[data-testid*='price']",
    "[data-test*='price']",
    ".product-price, .ProductPrice, .price, .Price, [class*='Price']",
    ".sale-price, .SalePrice, [class*='sale']",
    ".regular-price, .RegularPrice, [class*='regular']",
    "[aria-label*='Price'], [aria-label*='price']",
    "[data-testid*='compare'], .compare-at, .CompareAt, [class*='compare']",
    "[data-testid*='current'], .current-price, .CurrentPrice, [class*='current']",
];

const DISCOUNT_SELECTORS: &[&str] = &["[class*='discount']", "[data-testid*='discount']"];

/// Resolved prices for one colorway. All values are display strings with the
/// currency marker intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceFields {
    pub list_price: Option<String>,
    pub sale_price: Option<String>,
    pub discount: Option<String>,
}

fn squash_ws(text: &str) -> String {
    WHITESPACE_PATTERN.replace_all(text, " ").trim().to_string()
}

fn strip_financing_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !FINANCING_PATTERN.is_match(line))
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// First text content under `selector`, whitespace-squashed. Query failures
/// and empty matches count as absent.
async fn first_text(page: &dyn PageSurface, selector: &str) -> Option<String> {
    let elements = page.query_all(selector).await.ok()?;
    for element in &elements {
        if let Some(text) = text_or_none(element.as_ref()).await {
            return Some(squash_ws(&text));
        }
    }
    None
}

/// Gathers visible price-related text from tolerant selectors, preferring
/// blocks that carry "Save N%" copy since those hold the full price pair.
pub async fn price_text(page: &dyn PageSurface) -> Option<String> {
    static HAS_MONEY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[$€£]\s?\d").expect("money probe"));
    let mut prioritized: Vec<String> = Vec::new();
    let mut generic: Vec<String> = Vec::new();
    for selector in PRICE_TEXT_SELECTORS {
        let elements = match page.query_all(selector).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        for element in elements.iter().take(3) {
            let Some(raw) = text_or_none(element.as_ref()).await else {
                continue;
            };
            let cleaned = squash_ws(&strip_financing_lines(&raw));
            if cleaned.is_empty() {
                continue;
            }
            if money::mentions_save_percent(&cleaned) {
                prioritized.push(cleaned);
            } else {
                generic.push(cleaned);
            }
        }
    }
    prioritized
        .into_iter()
        .chain(generic)
        .find(|text| HAS_MONEY.is_match(text))
}

/// Reads a discount percent ("30%") from dedicated badges, falling back to a
/// percent anywhere in the price text.
pub async fn discount_text(page: &dyn PageSurface) -> Option<String> {
    for selector in DISCOUNT_SELECTORS {
        if let Some(text) = first_text(page, selector).await {
            if let Some(pct) = money::find_percent(&text) {
                return Some(format!("{}%", pct));
            }
        }
    }
    let text = price_text(page).await?;
    money::find_percent(&text).map(|pct| format!("{}%", pct))
}

/// Runs the DOM-side fallback chain and returns whatever prices it yields.
pub async fn resolve_prices(page: &dyn PageSurface) -> PriceFields {
    let mut fields = PriceFields::default();

    // Dedicated containers first; take the first amount each side yields.
    for (slot, selectors) in [
        (&mut fields.list_price, COMPARE_SELECTORS),
        (&mut fields.sale_price, CURRENT_SELECTORS),
    ] {
        for selector in selectors {
            if let Some(text) = first_text(page, selector).await {
                if let Some(amount) = money::find_amounts(&text).into_iter().next() {
                    *slot = Some(amount);
                    break;
                }
            }
        }
    }

    // Generic price text overrides when it carries a full pair.
    let text = price_text(page).await.unwrap_or_default();
    let amounts = money::find_amounts(&text);
    match amounts.len() {
        0 => {}
        1 => {
            if money::mentions_save_percent(&text) {
                fields.list_price.get_or_insert_with(|| amounts[0].clone());
            } else {
                fields.sale_price.get_or_insert_with(|| amounts[0].clone());
            }
        }
        _ => {
            let (min, max) = min_max_amounts(&amounts);
            fields.sale_price = Some(min);
            fields.list_price = Some(max);
        }
    }

    if !text.is_empty() {
        fields.discount = money::find_percent(&text).map(|pct| format!("{}%", pct));
    }

    // Wide scan when a side is missing or both sides read the same amount.
    // Narrow containers often expose only the compare-at number.
    let needs_wide_scan = fields.sale_price.is_none()
        || fields.list_price.is_none()
        || fields.sale_price == fields.list_price;
    if needs_wide_scan {
        let body = match page.evaluate(BODY_TEXT_SCRIPT).await {
            Ok(Value::String(s)) => s,
            _ => text.clone(),
        };
        let amounts = money::find_amounts(&strip_financing_lines(&body));
        if amounts.len() >= 2 {
            let (min, max) = min_max_amounts(&amounts);
            fields.sale_price = Some(min);
            fields.list_price = Some(max);
        }
    }

    fields
}

fn min_max_amounts(amounts: &[String]) -> (String, String) {
    let mut min = (amounts[0].clone(), f64::MAX);
    let mut max = (amounts[0].clone(), f64::MIN);
    for amount in amounts {
        let value = money::parse_amount(amount).unwrap_or(0.0);
        if value < min.1 {
            min = (amount.clone(), value);
        }
        if value > max.1 {
            max = (amount.clone(), value);
        }
    }
    (min.0, max.0)
}

/// Pulls a single price out of JSON-LD offers. List-vs-sale is unknowable
/// there, so the value lands on the sale side.
pub fn prices_from_json_ld(json_ld: &serde_json::Map<String, Value>) -> Option<String> {
    match json_ld.get("offers")? {
        Value::Object(offer) => {
            let price = offer.get("price")?;
            let price = match price {
                Value::String(s) if !s.is_empty() => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => return None,
            };
            match offer.get("priceCurrency").and_then(Value::as_str) {
                Some(cur) if !cur.is_empty() => Some(format!("{} {}", cur, price)),
                _ => Some(price),
            }
        }
        Value::Array(offers) => {
            let mut lowest: Option<f64> = None;
            let mut currency = String::new();
            for offer in offers {
                let Some(price) = offer.get("price").and_then(|p| match p {
                    Value::String(s) => s.parse::<f64>().ok(),
                    Value::Number(n) => n.as_f64(),
                    _ => None,
                }) else {
                    continue;
                };
                if lowest.map_or(true, |l| price < l) {
                    lowest = Some(price);
                }
                if currency.is_empty() {
                    if let Some(cur) = offer.get("priceCurrency").and_then(Value::as_str) {
                        currency = cur.to_string();
                    }
                }
            }
            let lowest = lowest?;
            if currency.is_empty() {
                Some(lowest.to_string())
            } else {
                Some(format!("{} {}", currency, lowest))
            }
        }
        _ => None,
    }
}

/// Derives the missing side of a price pair from the discount percent.
/// Percentages outside (0%, 95%) are treated as noise and left alone.
pub fn derive_missing(
    list_price: Option<String>,
    sale_price: Option<String>,
    discount: Option<&str>,
) -> (Option<String>, Option<String>) {
    let Some(discount) = discount else {
        return (list_price, sale_price);
    };
    if list_price.is_some() && sale_price.is_some() {
        return (list_price, sale_price);
    }
    let Some(pct) = money::find_percent(discount) else {
        return (list_price, sale_price);
    };
    let pct = pct as f64 / 100.0;
    if pct <= 0.0 || pct >= 0.95 {
        return (list_price, sale_price);
    }
    match (&list_price, &sale_price) {
        (Some(list), None) => {
            let Some(amount) = money::parse_amount(list) else {
                return (list_price, sale_price);
            };
            let currency = money::currency_prefix(list);
            let sale = (amount * (1.0 - pct) + 1e-6).round_to_cents();
            let derived = money::format_amount(&currency, sale);
            (list_price, Some(derived))
        }
        (None, Some(sale)) => {
            let Some(amount) = money::parse_amount(sale) else {
                return (list_price, sale_price);
            };
            let currency = money::currency_prefix(sale);
            let list = (amount / (1.0 - pct) + 1e-6).round_to_cents();
            let derived = money::format_amount(&currency, list);
            (Some(derived), sale_price)
        }
        _ => (list_price, sale_price),
    }
}

trait RoundToCents {
    fn round_to_cents(self) -> f64;
}

impl RoundToCents for f64 {
    fn round_to_cents(self) -> f64 {
        (self * 100.0).round() / 100.0
    }
}

/// Swaps the pair when the sale amount reads higher than the list amount.
pub fn normalize_order(
    list_price: Option<String>,
    sale_price: Option<String>,
) -> (Option<String>, Option<String>) {
    if let (Some(list), Some(sale)) = (&list_price, &sale_price) {
        let lp = money::parse_amount(list).unwrap_or(0.0);
        let sp = money::parse_amount(sale).unwrap_or(0.0);
        if sp > lp {
            return (sale_price, list_price);
        }
    }
    (list_price, sale_price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::scripted::{ScriptedElement, ScriptedPage, ScriptedSurface};
    use serde_json::json;
    use std::time::Duration;

    async fn surface_with(page: ScriptedPage) -> ScriptedSurface {
        let url = "https://shop.example/shop/jacket";
        let surface = ScriptedSurface::new().with_page(url, page);
        surface.navigate(url, Duration::from_secs(1)).await.unwrap();
        surface
    }

    #[tokio::test]
    async fn dedicated_containers_split_list_and_sale() {
        let page = ScriptedPage::new()
            .with_elements(
                ".price--compare, .price-compare, .was-price, .PriceCompare",
                vec![ScriptedElement::new().text("$ 250.00")],
            )
            .with_elements(
                ".price--sale, .sale-price, .SalePrice, .PriceSale",
                vec![ScriptedElement::new().text("$ 175.00")],
            );
        let surface = surface_with(page).await;
        let fields = resolve_prices(&surface).await;
        assert_eq!(fields.list_price.as_deref(), Some("$ 250.00"));
        assert_eq!(fields.sale_price.as_deref(), Some("$ 175.00"));
    }

    #[tokio::test]
    async fn two_amounts_in_generic_text_assign_min_and_max() {
        let page = ScriptedPage::new().with_elements(
            "[data-testid='price']",
            vec![ScriptedElement::new().text("$300.00 $199.00 Save 33%")],
        );
        let surface = surface_with(page).await;
        let fields = resolve_prices(&surface).await;
        assert_eq!(fields.sale_price.as_deref(), Some("$199.00"));
        assert_eq!(fields.list_price.as_deref(), Some("$300.00"));
        assert_eq!(fields.discount.as_deref(), Some("33%"));
    }

    #[tokio::test]
    async fn single_amount_with_save_copy_is_list_price() {
        let page = ScriptedPage::new().with_elements(
            "[data-testid='price']",
            vec![ScriptedElement::new().text("Save 30% $200.00")],
        );
        let surface = surface_with(page).await;
        let fields = resolve_prices(&surface).await;
        assert_eq!(fields.list_price.as_deref(), Some("$200.00"));
        assert_eq!(fields.sale_price, None);
    }

    #[tokio::test]
    async fn financing_lines_are_stripped_before_scanning() {
        let page = ScriptedPage::new().with_elements(
            "[data-testid='price']",
            vec![ScriptedElement::new().text("$240.00\n4 payments of $60.00 with Klarna")],
        );
        let surface = surface_with(page).await;
        let fields = resolve_prices(&surface).await;
        assert_eq!(fields.sale_price.as_deref(), Some("$240.00"));
    }

    #[tokio::test]
    async fn body_scan_fills_missing_side() {
        let page = ScriptedPage::new()
            .with_elements(
                ".price--compare, .price-compare, .was-price, .PriceCompare",
                vec![ScriptedElement::new().text("$ 250.00")],
            )
            .with_script(
                "document.body ? document.body.innerText : ''",
                json!("Alpha Jacket $ 250.00 now $ 175.00"),
            );
        let surface = surface_with(page).await;
        let fields = resolve_prices(&surface).await;
        assert_eq!(fields.list_price.as_deref(), Some("$ 250.00"));
        assert_eq!(fields.sale_price.as_deref(), Some("$ 175.00"));
    }

    #[test]
    fn json_ld_single_offer_lands_on_sale_side() {
        let json_ld = json!({"offers": {"price": "175.00", "priceCurrency": "USD"}});
        let map = json_ld.as_object().unwrap();
        assert_eq!(prices_from_json_ld(map).as_deref(), Some("USD 175.00"));
    }

    #[test]
    fn json_ld_offer_array_takes_lowest() {
        let json_ld = json!({"offers": [
            {"price": 200.0, "priceCurrency": "USD"},
            {"price": 150.0, "priceCurrency": "USD"},
        ]});
        let map = json_ld.as_object().unwrap();
        assert_eq!(prices_from_json_ld(map).as_deref(), Some("USD 150"));
    }

    #[test]
    fn derives_sale_from_list_and_discount() {
        let (list, sale) = derive_missing(Some("$ 200.00".into()), None, Some("25%"));
        assert_eq!(list.as_deref(), Some("$ 200.00"));
        assert_eq!(sale.as_deref(), Some("$ 150.00"));
    }

    #[test]
    fn derives_list_from_sale_and_discount() {
        let (list, sale) = derive_missing(None, Some("$ 150.00".into()), Some("25%"));
        assert_eq!(list.as_deref(), Some("$ 200.00"));
        assert_eq!(sale.as_deref(), Some("$ 150.00"));
    }

    #[test]
    fn implausible_discount_derives_nothing() {
        let (list, sale) = derive_missing(Some("$ 200.00".into()), None, Some("99%"));
        assert_eq!(list.as_deref(), Some("$ 200.00"));
        assert_eq!(sale, None);
    }

    #[test]
    fn swaps_inverted_pairs() {
        let (list, sale) = normalize_order(Some("$100".into()), Some("$150".into()));
        assert_eq!(list.as_deref(), Some("$150"));
        assert_eq!(sale.as_deref(), Some("$100"));
    }
}
