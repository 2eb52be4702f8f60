//! Storefront-specific embedded product state
//!
//! The storefront's rendering framework embeds a product object with colour
//! options, size options, and per-(colour, size) variants. When present this
//! is the most reliable source for sizes and per-size inventory — it
//! describes exactly what the size selector will render — so the resolvers
//! consult it before falling back to the DOM.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Hosts that serve product imagery with root-relative asset paths.
const IMAGE_HOST: &str = "https://images.arcteryx.com";

static SIZE_SORT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:[.xX]?(\d)?)").expect("size sort pattern"));

/// Extracts the embedded product object from framework state.
///
/// Some deployments embed the product as a JSON string rather than an
/// object; both forms are accepted.
pub fn product_from_state(state: &Value) -> Option<Value> {
    let raw = state.get("props")?.get("pageProps")?.get("product")?;
    match raw {
        Value::String(s) => serde_json::from_str(s).ok(),
        Value::Object(_) => Some(raw.clone()),
        _ => None,
    }
}

/// Returns the selected colour id, falling back to a label match against
/// `color_name` when the state declares no selection.
fn selected_colour_id(product: &Value, color_name: Option<&str>) -> Option<String> {
    let colour_options = product.get("colourOptions")?;
    if let Some(selected) = colour_options.get("selected") {
        if !selected.is_null() {
            return Some(value_to_id(selected));
        }
    }

    let name = color_name?.to_lowercase();
    let options = colour_options.get("options")?.as_array()?;
    for option in options {
        let label = option.get("label").and_then(Value::as_str).unwrap_or("");
        if !label.is_empty() && label.to_lowercase().contains(&name) {
            return option.get("value").map(value_to_id);
        }
    }
    None
}

/// Reads `(sizes, per-size quantities)` for one colour from embedded state.
///
/// Returns empty results when the expected structure is absent, so callers
/// can chain straight into the DOM fallback.
pub fn sizes_for_color(
    product: &Value,
    color_name: Option<&str>,
) -> (Vec<(String, bool)>, BTreeMap<String, i64>) {
    let Some(colour_id) = selected_colour_id(product, color_name) else {
        return (Vec::new(), BTreeMap::new());
    };

    // sizeId -> label
    let mut labels: BTreeMap<String, String> = BTreeMap::new();
    if let Some(options) = product
        .get("sizeOptions")
        .and_then(|o| o.get("options"))
        .and_then(Value::as_array)
    {
        for option in options {
            let id = option.get("value").map(value_to_id);
            let label = option.get("label").and_then(Value::as_str);
            if let (Some(id), Some(label)) = (id, label) {
                if !label.trim().is_empty() {
                    labels.insert(id, strip_whitespace(label));
                }
            }
        }
    }

    let mut quantities: BTreeMap<String, i64> = BTreeMap::new();
    if let Some(variants) = product.get("variants").and_then(Value::as_array) {
        for variant in variants {
            if variant.get("colourId").map(value_to_id).as_deref() != Some(colour_id.as_str()) {
                continue;
            }
            let Some(size_id) = variant.get("sizeId").map(value_to_id) else {
                continue;
            };
            let Some(label) = labels.get(&size_id) else {
                continue;
            };
            let inventory = variant
                .get("inventory")
                .and_then(Value::as_f64)
                .unwrap_or(0.0) as i64;
            quantities.insert(label.clone(), inventory);
        }
    }

    let mut ordered: Vec<String> = quantities.keys().cloned().collect();
    ordered.sort_by_key(|label| size_sort_key(label));
    let sizes = ordered
        .into_iter()
        .map(|label| {
            let in_stock = quantities.get(&label).copied().unwrap_or(0) > 0;
            (label, in_stock)
        })
        .collect();
    (sizes, quantities)
}

/// Picks a colour-matched hero image, falling back to the product main image.
pub fn hero_image_for_color(product: &Value, color_name: Option<&str>) -> Option<String> {
    let colour_id = selected_colour_id(product, color_name);
    if let Some(options) = product
        .get("colourOptions")
        .and_then(|o| o.get("options"))
        .and_then(Value::as_array)
    {
        for option in options {
            let matches = match &colour_id {
                Some(id) => option.get("value").map(value_to_id).as_deref() == Some(id.as_str()),
                None => false,
            };
            if matches {
                if let Some(url) = image_url_of(option) {
                    return Some(url);
                }
                break;
            }
        }
    }

    product.get("mainImage").and_then(|main| {
        main.get("url")
            .and_then(Value::as_str)
            .and_then(normalize_asset_url)
    })
}

fn image_url_of(option: &Value) -> Option<String> {
    for key in ["heroImage", "image", "thumbnail"] {
        if let Some(url) = option
            .get(key)
            .and_then(|img| img.get("url"))
            .and_then(Value::as_str)
        {
            if let Some(normalized) = normalize_asset_url(url) {
                return Some(normalized);
            }
        }
    }
    None
}

/// Normalizes asset URLs: protocol-relative gets https, root-relative gets
/// the image host, absolute URLs pass through.
pub fn normalize_asset_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        return Some(url.to_string());
    }
    if url.starts_with("//") {
        return Some(format!("https:{}", url));
    }
    if url.starts_with('/') {
        return Some(format!("{}{}", IMAGE_HOST, url));
    }
    Some(url.to_string())
}

/// Numeric-aware ordering: `24`, `26.5`, `28` before lexically-sorted labels
/// like `L`, `M`, `XL`.
fn size_sort_key(label: &str) -> (i64, String) {
    if let Some(captures) = SIZE_SORT_PATTERN.captures(label) {
        let major: i64 = captures
            .get(1)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let minor: i64 = captures
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        return (major * 10 + minor, label.to_string());
    }
    (i64::MAX, label.to_string())
}

fn value_to_id(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_product() -> Value {
        json!({
            "colourOptions": {
                "selected": null,
                "options": [
                    { "label": "Black Sapphire", "value": 100,
                      "heroImage": { "url": "//img.example.com/black.jpg" } },
                    { "label": "Forage", "value": 101,
                      "image": { "url": "/s/forage.jpg" } }
                ]
            },
            "sizeOptions": {
                "options": [
                    { "label": "S", "value": 1 },
                    { "label": "M", "value": 2 },
                    { "label": "L", "value": 3 }
                ]
            },
            "variants": [
                { "colourId": 100, "sizeId": 1, "inventory": 0 },
                { "colourId": 100, "sizeId": 2, "inventory": 3 },
                { "colourId": 101, "sizeId": 3, "inventory": 7 }
            ],
            "mainImage": { "url": "https://img.example.com/main.jpg" }
        })
    }

    fn wrap_state(product: Value) -> Value {
        json!({ "props": { "pageProps": { "product": product } } })
    }

    #[test]
    fn product_parses_from_object_and_string_forms() {
        let state = wrap_state(sample_product());
        assert!(product_from_state(&state).is_some());

        let as_string = json!({
            "props": { "pageProps": { "product": sample_product().to_string() } }
        });
        assert!(product_from_state(&as_string).is_some());
    }

    #[test]
    fn sizes_follow_the_matched_colour() {
        let product = sample_product();
        let (sizes, quantities) = sizes_for_color(&product, Some("black sapphire"));
        assert_eq!(
            sizes,
            vec![("M".to_string(), true), ("S".to_string(), false)]
        );
        assert_eq!(quantities.get("M"), Some(&3));
        assert_eq!(quantities.get("S"), Some(&0));

        let (forage_sizes, _) = sizes_for_color(&product, Some("forage"));
        assert_eq!(forage_sizes, vec![("L".to_string(), true)]);
    }

    #[test]
    fn unknown_colour_yields_empty_results() {
        let product = sample_product();
        let (sizes, quantities) = sizes_for_color(&product, Some("seafoam"));
        assert!(sizes.is_empty());
        assert!(quantities.is_empty());
    }

    #[test]
    fn hero_image_matches_colour_and_normalizes() {
        let product = sample_product();
        assert_eq!(
            hero_image_for_color(&product, Some("black")),
            Some("https://img.example.com/black.jpg".to_string())
        );
        assert_eq!(
            hero_image_for_color(&product, Some("forage")),
            Some(format!("{}/s/forage.jpg", IMAGE_HOST))
        );
        // No match: main image fallback
        assert_eq!(
            hero_image_for_color(&product, Some("seafoam")),
            Some("https://img.example.com/main.jpg".to_string())
        );
    }

    #[test]
    fn numeric_sizes_sort_numerically() {
        let mut labels = vec!["30".to_string(), "28.5".to_string(), "M".to_string()];
        labels.sort_by_key(|l| size_sort_key(l));
        assert_eq!(labels, vec!["28.5", "30", "M"]);
    }
}
