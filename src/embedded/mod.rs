//! Embedded page state: structured data distinct from the visible DOM
//!
//! Two kinds of embedded data are read from a rendered page:
//! - JSON-LD blocks (`script[type="application/ld+json"]`), merged into one
//!   object and used for name/SKU/offers/image fallbacks
//! - the rendering framework's state blob, used for the site-specific size /
//!   inventory / hero-image structures and for generic key scanning
//!
//! Both are fetched through script evaluation so the automation backend does
//! the JSON serialization; a page without either yields empty values, never
//! an error.

pub mod store_state;
pub mod walk;

use crate::automation::PageSurface;
use serde_json::{Map, Value};

pub use store_state::{hero_image_for_color, normalize_asset_url, product_from_state, sizes_for_color};
pub use walk::{
    collect_inventory_amounts, collect_price_fields, collect_size_quantities,
    resolve_inventory_amount,
};

/// Expression returning the framework state blob, or null when absent.
pub const STATE_SCRIPT: &str = "window.__NEXT_DATA__ || null";

/// Expression returning every parseable JSON-LD block on the page.
pub const JSON_LD_SCRIPT: &str = "Array.from(document.querySelectorAll('script[type=\"application/ld+json\"]')).map(function(s){ try { return JSON.parse(s.textContent) } catch (e) { return null } })";

/// Reads the framework state blob. Absence is `None`, never an error.
pub async fn read_state(page: &dyn PageSurface) -> Option<Value> {
    match page.evaluate(STATE_SCRIPT).await {
        Ok(Value::Null) | Err(_) => None,
        Ok(value) => Some(value),
    }
}

/// Reads and merges all JSON-LD blocks into a single object.
///
/// Blocks may be objects or arrays of objects; later keys overwrite earlier
/// ones, matching document order.
pub async fn read_json_ld(page: &dyn PageSurface) -> Map<String, Value> {
    let mut merged = Map::new();
    let Ok(Value::Array(blocks)) = page.evaluate(JSON_LD_SCRIPT).await else {
        return merged;
    };
    for block in blocks {
        match block {
            Value::Object(map) => merged.extend(map),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(map) = item {
                        merged.extend(map);
                    }
                }
            }
            _ => {}
        }
    }
    merged
}
