//! Size option extraction from the rendered DOM
//!
//! Size chips come in several markup shapes; the first selector that yields
//! options wins and later selectors are not consulted. Labels are normalized
//! ("29 - R" becomes "29R") and de-duplicated first-wins, so a label seen as
//! in-stock keeps that state even if a later duplicate reads out-of-stock.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::automation::{attr_or_none, text_or_none, ElementHandle, PageSurface};
use std::time::Duration;

const SIZE_SELECTORS: &[&str] = &[
    "[data-testid='pdp-size-option']",
    "[data-testid='size-selector'] [role='radio']",
    "[role='radiogroup'] [role='radio']",
    ".size, .Size, .size-chip, .sizeChip, button[aria-label*='Size']",
    ".qa--size-list li",
    "[class*='size-list'] li",
];

/// Matches bare size tokens (XS, M, XXL, 30, 7.5, 32W). Used to tell size
/// chips apart from colour swatches when both carry aria-labels.
pub static SIZE_TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(XXS|XS|S|M|L|XL|XXL|XXXL|\d|\d+\.\d+|\d+M|\d+W)$").expect("size token pattern")
});

static OOS_BUTTON_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)no--stock|sold|out").expect("oos button pattern"));

static OOS_ELEMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)no--stock|sold|out|disabled").expect("oos element pattern"));

/// Normalizes a size label: whitespace stripped, hyphens removed.
pub fn normalize_size_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

async fn label_of(element: &dyn ElementHandle) -> String {
    // data-size-value carries the canonical label when present
    if let Ok(children) = element.query_all("button, [role='radio']").await {
        if let Some(child) = children.first() {
            if let Some(value) = attr_or_none(child.as_ref(), "data-size-value").await {
                return value.trim().to_string();
            }
        }
    }
    if let Some(label) = attr_or_none(element, "aria-label").await {
        return label.trim().to_string();
    }
    text_or_none(element).await.unwrap_or_default().trim().to_string()
}

async fn is_out_of_stock(element: &dyn ElementHandle) -> bool {
    if element.attribute("disabled").await.ok().flatten().is_some() {
        return true;
    }
    if let Some(aria) = attr_or_none(element, "aria-disabled").await {
        if aria.eq_ignore_ascii_case("true") {
            return true;
        }
    }
    if let Some(class) = attr_or_none(element, "class").await {
        if OOS_ELEMENT_PATTERN.is_match(&class) {
            return true;
        }
    }
    if let Ok(children) = element.query_all("button, [role='radio']").await {
        if let Some(child) = children.first() {
            if let Some(class) = attr_or_none(child.as_ref(), "class").await {
                if OOS_BUTTON_PATTERN.is_match(&class) {
                    return true;
                }
            }
        }
    }
    false
}

/// Reads `(size_label, in_stock)` pairs for the currently selected colorway.
pub async fn extract_sizes(page: &dyn PageSurface) -> Vec<(String, bool)> {
    let mut sizes: Vec<(String, bool)> = Vec::new();
    for selector in SIZE_SELECTORS {
        let elements = match page.query_all(selector).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        if elements.is_empty() {
            continue;
        }
        for element in &elements {
            let label = normalize_size_label(&label_of(element.as_ref()).await);
            let in_stock = !is_out_of_stock(element.as_ref()).await;
            sizes.push((label, in_stock));
        }
        if !sizes.is_empty() {
            break;
        }
    }
    let mut seen = std::collections::HashSet::new();
    sizes
        .into_iter()
        .filter(|(label, _)| !label.is_empty() && seen.insert(label.clone()))
        .collect()
}

/// Clicks the first in-stock size chip so sale pricing renders. Best-effort:
/// failures leave the page as-is and pricing falls back to other sources.
pub async fn select_first_in_stock_size(page: &dyn PageSurface, sizes: &[(String, bool)]) {
    let Some((target, _)) = sizes.iter().find(|(label, in_stock)| *in_stock && !label.is_empty())
    else {
        return;
    };
    for selector in [
        "[data-testid='pdp-size-option']",
        "[role='radio']",
        "button[aria-label*='Size']",
    ] {
        let elements = match page.query_all(selector).await {
            Ok(e) => e,
            Err(_) => continue,
        };
        for element in &elements {
            let label = normalize_size_label(&label_of(element.as_ref()).await);
            if &label == target {
                if element.as_ref().click(Duration::from_secs(1)).await.is_ok() {
                    return;
                }
            }
        }
    }
}
