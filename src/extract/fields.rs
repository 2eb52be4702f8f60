//! Field resolvers for everything on a detail page that is not a price or a
//! size: product name, SKU, breadcrumb path, hero image, colour swatches and
//! labels, and the cookie banner that blocks all of the above.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

use super::sizes::SIZE_TOKEN_PATTERN;
use crate::automation::{attr_or_none, text_or_none, ElementHandle, PageSurface};

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws pattern"));

static DISCOUNTED_COLOR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Discounted colou?r:\s*([^\n]+)").expect("discounted colour pattern"));

const BODY_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

const SWATCH_SELECTORS: &[&str] = &[
    "[data-testid*='color']:is(button,[role='radio'])",
    "button[aria-label*='Color']",
    "button[aria-label*='colour']",
    "[class*='color'] [role='radio']",
    "[class*='swatch'] [role='radio']",
    ".qa--colour-selector li[aria-label]",
    "fieldset[class*='colour'] li[aria-label]",
    "ul[class*='colour'] li[aria-label]",
    "ol[class*='colour'] li[aria-label]",
    "[class*='color'] li[aria-label]",
    "[class*='colour'] li[aria-label]",
];

const SELECTED_COLOR_SELECTORS: &[&str] = &[
    "[data-testid='selected-color-name']",
    "[data-testid='pdp-color-label']",
    "[aria-live] .color-name",
    ".selected .color-name, .ColorName",
];

const IMAGE_SELECTORS: &[&str] = &[
    "figure[data-testid*='hero'] img",
    "[data-testid*='hero'] img",
    "[data-testid='pdp-hero-image'] img",
    ".swiper-slide.swiper-slide-active img",
    "img[alt*='product'], img[alt*='Product'], img.hero, .ProductGallery img",
];

// currentSrc reflects the responsive source actually rendered, which the
// src attribute often does not.
const HERO_CURRENT_SRC_SCRIPT: &str = "(function(){var img = document.querySelector('[data-testid*=\"hero\"] img, .swiper-slide.swiper-slide-active img, .ProductGallery img'); return img && img.currentSrc ? img.currentSrc : ''})()";

const COOKIE_SELECTORS: &[&str] = &[
    "#onetrust-accept-btn-handler",
    "button#accept-recommended-btn-handler",
    "button[aria-label*='Accept']",
    "[data-testid*='cookie'] button",
];

/// A colour option on the page. Handles go stale when a swatch click mutates
/// the DOM, so swatches are addressed by selector plus index and re-queried
/// at click time.
#[derive(Debug, Clone, PartialEq)]
pub struct SwatchRef {
    pub selector: String,
    pub index: usize,
    pub label: Option<String>,
}

fn squash_ws(text: &str) -> String {
    WHITESPACE_PATTERN.replace_all(text, " ").trim().to_string()
}

/// Finds colour swatches, filtering out chips whose label is a bare size
/// token. The first selector that yields anything wins.
pub async fn find_color_swatches(page: &dyn PageSurface) -> Vec<SwatchRef> {
    for selector in SWATCH_SELECTORS {
        let elements = match page.query_all(selector).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        if elements.is_empty() {
            continue;
        }
        let mut swatches = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            let label = match attr_or_none(element.as_ref(), "aria-label").await {
                Some(l) => Some(l),
                None => text_or_none(element.as_ref()).await.map(|t| t.trim().to_string()),
            };
            if let Some(l) = &label {
                if SIZE_TOKEN_PATTERN.is_match(l) {
                    continue;
                }
            }
            swatches.push(SwatchRef {
                selector: selector.to_string(),
                index,
                label,
            });
        }
        if !swatches.is_empty() {
            return swatches;
        }
    }
    Vec::new()
}

/// Re-queries a swatch by position. `None` when the DOM no longer has it.
pub async fn resolve_swatch(
    page: &dyn PageSurface,
    swatch: &SwatchRef,
) -> Option<Box<dyn ElementHandle>> {
    let mut elements = page.query_all(&swatch.selector).await.ok()?;
    if swatch.index < elements.len() {
        Some(elements.swap_remove(swatch.index))
    } else {
        None
    }
}

/// Reads the label of the currently selected colour from dedicated markup.
pub async fn read_selected_color_name(page: &dyn PageSurface) -> Option<String> {
    for selector in SELECTED_COLOR_SELECTORS {
        if let Ok(elements) = page.query_all(selector).await {
            for element in &elements {
                if let Some(text) = text_or_none(element.as_ref()).await {
                    return Some(text.trim().to_string());
                }
            }
        }
    }
    None
}

/// Reads an explicit "Discounted colour: <name>" callout from the body text.
pub async fn read_discounted_color_name(page: &dyn PageSurface) -> Option<String> {
    let body = match page.evaluate(BODY_TEXT_SCRIPT).await {
        Ok(Value::String(s)) => s,
        _ => return None,
    };
    DISCOUNTED_COLOR_PATTERN
        .captures(&body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Breadcrumb trail as a single whitespace-squashed string.
pub async fn extract_breadcrumb(page: &dyn PageSurface) -> Option<String> {
    for selector in ["nav[aria-label=\"breadcrumb\"]", ".breadcrumb, .breadcrumbs"] {
        if let Ok(elements) = page.query_all(selector).await {
            for element in &elements {
                if let Some(text) = text_or_none(element.as_ref()).await {
                    let crumb = squash_ws(&text);
                    if !crumb.is_empty() {
                        return Some(crumb);
                    }
                }
            }
        }
    }
    None
}

/// Product name from the page heading.
pub async fn read_heading(page: &dyn PageSurface) -> Option<String> {
    let elements = page.query_all("h1").await.ok()?;
    let first = elements.first()?;
    text_or_none(first.as_ref()).await.map(|t| t.trim().to_string())
}

/// Representative product image from the DOM. Prefers the rendered
/// `currentSrc`, then `src`, then lazy-load attributes, then the first
/// `srcset` entry. Scheme-relative URLs get https.
pub async fn read_image_url(page: &dyn PageSurface) -> Option<String> {
    if let Ok(Value::String(src)) = page.evaluate(HERO_CURRENT_SRC_SCRIPT).await {
        if !src.is_empty() {
            if let Some(stripped) = src.strip_prefix("//") {
                return Some(format!("https://{}", stripped));
            }
            return Some(src);
        }
    }
    for selector in IMAGE_SELECTORS {
        let elements = match page.query_all(selector).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        let Some(element) = elements.first() else {
            continue;
        };
        let mut src = attr_or_none(element.as_ref(), "src").await;
        if src.is_none() {
            src = attr_or_none(element.as_ref(), "data-src").await;
        }
        if src.is_none() {
            if let Some(srcset) = attr_or_none(element.as_ref(), "srcset").await {
                src = srcset
                    .split(',')
                    .next()
                    .and_then(|part| part.trim().split(' ').next())
                    .map(str::to_string);
            }
        }
        if let Some(src) = src {
            if let Some(stripped) = src.strip_prefix("//") {
                return Some(format!("https://{}", stripped));
            }
            return Some(src);
        }
    }
    None
}

/// Best-effort dismissal of cookie consent banners. Errors are swallowed;
/// a stuck banner degrades extraction but never fails the page.
pub async fn dismiss_cookie_banner(page: &dyn PageSurface) {
    for selector in COOKIE_SELECTORS {
        let elements = match page.query_all(selector).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        if let Some(element) = elements.first() {
            if element.as_ref().click(Duration::from_secs(1)).await.is_ok() {
                return;
            }
        }
    }
}

/// Product name from merged JSON-LD blocks.
pub fn name_from_json_ld(json_ld: &serde_json::Map<String, Value>) -> Option<String> {
    json_ld.get("name").and_then(Value::as_str).map(str::to_string)
}

/// SKU from merged JSON-LD blocks.
pub fn sku_from_json_ld(json_ld: &serde_json::Map<String, Value>) -> Option<String> {
    match json_ld.get("sku")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Image URL from JSON-LD, accepting either a string or an array of strings.
pub fn image_from_json_ld(json_ld: &serde_json::Map<String, Value>) -> Option<String> {
    match json_ld.get("image")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => items.first().and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

/// Currency code from JSON-LD offers, consulted when embedded-state prices
/// arrive as bare numbers.
pub fn currency_from_json_ld(json_ld: &serde_json::Map<String, Value>) -> Option<String> {
    let offers = json_ld.get("offers")?;
    let offer = match offers {
        Value::Object(_) => offers,
        Value::Array(items) => items.first()?,
        _ => return None,
    };
    offer
        .get("priceCurrency")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}
