//! Recursive visitor over embedded page-state values
//!
//! Rendering frameworks embed large, loosely structured JSON blobs in their
//! pages. This module scans such blobs for price and inventory fields using
//! explicit key allow-lists and bounds checks, kept as data rather than
//! scattered conditionals. The whole thing is a best-effort heuristic: a key
//! named `quantity` three levels deep may or may not describe the variant on
//! screen, which is why every number is bounds-checked and the caller only
//! uses the result when nothing more authoritative resolved.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Keys conventionally used for stock quantities in embedded state.
const QUANTITY_KEYS: &[&str] = &[
    "ats",
    "availableToSell",
    "available",
    "quantityAvailable",
    "inventory",
    "inventoryQuantity",
    "qty",
    "quantity",
    "stock",
    "stockQty",
    "onHand",
];

/// Keys conventionally used for prices, matched case-insensitively.
const PRICE_KEYS: &[&str] = &[
    "price",
    "saleprice",
    "listprice",
    "finalprice",
    "compareatprice",
    "compare_at_price",
    "compare_at",
];

/// Keys that may carry a size label on a variant-like object.
const SIZE_LABEL_KEYS: &[&str] = &[
    "size",
    "sizeLabel",
    "size_value",
    "sizeValue",
    "attributeSize",
    "variantSize",
    "label",
    "value",
];

/// Keys that may carry a color name on a variant-like object.
const COLOR_KEYS: &[&str] = &["color", "colour", "attributeColor", "variantColor"];

/// Upper bound for a believable total-inventory figure. Anything above this
/// is more likely a price in cents or an unrelated counter.
pub const INVENTORY_BOUND: i64 = 2000;

/// Upper bound for a believable per-size quantity.
const SIZE_QTY_BOUND: i64 = 500;

/// Collects likely price fields from a nested value, keyed by the lowercased
/// field name. Later occurrences overwrite earlier ones, matching a
/// depth-first reading of the blob.
pub fn collect_price_fields(value: &Value) -> HashMap<String, Value> {
    let mut found = HashMap::new();
    walk_prices(value, &mut found);
    found
}

fn walk_prices(value: &Value, found: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let lower = key.to_lowercase();
                if PRICE_KEYS.contains(&lower.as_str()) {
                    found.insert(lower, child.clone());
                }
                walk_prices(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_prices(item, found);
            }
        }
        _ => {}
    }
}

/// Collects every in-bounds quantity-keyed integer from a nested value.
pub fn collect_inventory_amounts(value: &Value) -> Vec<i64> {
    let mut amounts = Vec::new();
    walk_inventory(value, &mut amounts);
    amounts
}

fn walk_inventory(value: &Value, amounts: &mut Vec<i64>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if QUANTITY_KEYS.contains(&key.as_str()) {
                    if let Some(amount) = integer_in_bounds(child, INVENTORY_BOUND) {
                        amounts.push(amount);
                    }
                }
                walk_inventory(child, amounts);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_inventory(item, amounts);
            }
        }
        _ => {}
    }
}

/// Collects a size-label -> quantity map from variant-like objects.
///
/// When `color_hint` is given, objects that declare a different color are
/// skipped entirely; objects that declare no color at all are still read.
pub fn collect_size_quantities(value: &Value, color_hint: Option<&str>) -> BTreeMap<String, i64> {
    let mut quantities = BTreeMap::new();
    walk_size_quantities(value, color_hint, &mut quantities);
    quantities
}

fn walk_size_quantities(
    value: &Value,
    color_hint: Option<&str>,
    quantities: &mut BTreeMap<String, i64>,
) {
    match value {
        Value::Object(map) => {
            consider_variant_object(map, color_hint, quantities);
            for child in map.values() {
                walk_size_quantities(child, color_hint, quantities);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_size_quantities(item, color_hint, quantities);
            }
        }
        _ => {}
    }
}

fn consider_variant_object(
    map: &serde_json::Map<String, Value>,
    color_hint: Option<&str>,
    quantities: &mut BTreeMap<String, i64>,
) {
    let Some(label) = size_label_of(map) else {
        return;
    };

    if let Some(hint) = color_hint {
        for color_key in COLOR_KEYS {
            if let Some(Value::String(declared)) = map.get(*color_key) {
                if !declared.to_lowercase().contains(&hint.to_lowercase()) {
                    return;
                }
            }
        }
    }

    for quantity_key in QUANTITY_KEYS {
        if let Some(child) = map.get(*quantity_key) {
            if let Some(quantity) = integer_in_bounds(child, SIZE_QTY_BOUND) {
                quantities.insert(label, quantity);
                return;
            }
        }
    }
}

/// Reads a size label from a variant-like object, checking direct keys first
/// and then an `attributes: [{name: "Size", value: "M"}]` array pattern.
pub fn size_label_of(map: &serde_json::Map<String, Value>) -> Option<String> {
    for key in SIZE_LABEL_KEYS {
        if let Some(Value::String(s)) = map.get(*key) {
            if !s.trim().is_empty() {
                return Some(strip_whitespace(s));
            }
        }
    }

    if let Some(Value::Array(attributes)) = map.get("attributes") {
        for attribute in attributes {
            let Value::Object(attr) = attribute else {
                continue;
            };
            let name = attr
                .get("name")
                .or_else(|| attr.get("label"))
                .and_then(Value::as_str)
                .unwrap_or("");
            if name.trim().eq_ignore_ascii_case("size") {
                if let Some(Value::String(v)) = attr.get("value") {
                    if !v.trim().is_empty() {
                        return Some(strip_whitespace(v));
                    }
                }
            }
        }
    }
    None
}

/// Resolves a single inventory figure from the collected evidence.
///
/// A per-size quantity map is the strongest signal and is summed directly.
/// Otherwise the matched scalars are summed; when that sum blows past the
/// plausibility bound the maximum single value is reported instead. Both
/// tiers are heuristics, not guarantees.
pub fn resolve_inventory_amount(
    amounts: &[i64],
    size_quantities: &BTreeMap<String, i64>,
) -> Option<i64> {
    if !size_quantities.is_empty() {
        return Some(size_quantities.values().sum());
    }
    if amounts.is_empty() {
        return None;
    }
    let total: i64 = amounts.iter().sum();
    if (0..=INVENTORY_BOUND).contains(&total) {
        Some(total)
    } else {
        amounts.iter().copied().max()
    }
}

fn integer_in_bounds(value: &Value, bound: i64) -> Option<i64> {
    let number = match value {
        Value::Number(n) => n.as_f64()? as i64,
        _ => return None,
    };
    (0..=bound).contains(&number).then_some(number)
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
