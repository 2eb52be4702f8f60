//! The aggregated output record
//!
//! One [`AggregatedRow`] per `(product_url, color)` pair per crawl. Prices
//! are display strings with currency markers; size lists are comma-joined;
//! `size_quantities` is a JSON object string when per-size counts were found.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Everything resolved for one colorway of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub crawl_ts: String,
    pub locale: String,
    pub category_path: Option<String>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub product_url: String,
    pub color: String,
    pub list_price: Option<String>,
    pub sale_price: Option<String>,
    pub discount: Option<String>,
    pub image_url: Option<String>,
    pub inventory_amount: Option<i64>,
    pub size_quantities: Option<String>,
    pub sizes_all: String,
    pub sizes_in_stock: String,
    pub sizes_out_of_stock: String,
    pub num_sizes_in_stock: usize,
    pub hash_key: String,
    pub source: String,
}

impl AggregatedRow {
    /// Stable identity for a colorway across runs.
    pub fn hash_key(product_url: &str, color: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(product_url.as_bytes());
        hasher.update(b"|");
        hasher.update(color.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// UTC crawl timestamp in RFC 3339 form.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

/// Size labels partitioned by availability, ready for the row's joined
/// string fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SizeBuckets {
    pub all: Vec<String>,
    pub in_stock: Vec<String>,
    pub out_of_stock: Vec<String>,
}

impl SizeBuckets {
    pub fn from_pairs(sizes: &[(String, bool)]) -> Self {
        let mut buckets = Self::default();
        for (label, in_stock) in sizes {
            if label.is_empty() {
                continue;
            }
            buckets.all.push(label.clone());
            if *in_stock {
                buckets.in_stock.push(label.clone());
            } else {
                buckets.out_of_stock.push(label.clone());
            }
        }
        buckets
    }

    pub fn joined_all(&self) -> String {
        self.all.join(",")
    }

    pub fn joined_in_stock(&self) -> String {
        self.in_stock.join(",")
    }

    pub fn joined_out_of_stock(&self) -> String {
        self.out_of_stock.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_key_is_stable_and_color_sensitive() {
        let a = AggregatedRow::hash_key("https://shop.example/shop/jacket", "Black");
        let b = AggregatedRow::hash_key("https://shop.example/shop/jacket", "Black");
        let c = AggregatedRow::hash_key("https://shop.example/shop/jacket", "Tatsu");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn size_buckets_partition_and_preserve_order() {
        let sizes = vec![
            ("S".to_string(), true),
            ("M".to_string(), false),
            ("".to_string(), true),
            ("L".to_string(), true),
        ];
        let buckets = SizeBuckets::from_pairs(&sizes);
        assert_eq!(buckets.joined_all(), "S,M,L");
        assert_eq!(buckets.joined_in_stock(), "S,L");
        assert_eq!(buckets.joined_out_of_stock(), "M");
        assert_eq!(buckets.in_stock.len(), 2);
    }
}
