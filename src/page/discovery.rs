//! Product link discovery on category grids
//!
//! Category pages render products through infinite scroll, so discovery
//! alternates harvesting anchors with scrolling to the bottom until the
//! distinct product-link count holds steady for three iterations (or a hard
//! iteration cap trips). Harvested hrefs are then absolutized, restricted to
//! the category's origin, and filtered to detail-page paths.

use std::collections::BTreeSet;
use url::Url;

use crate::automation::{attr_or_none, PageSurface};
use crate::crawler::pacing::jitter_sleep;
use crate::url::{absolutize, is_product_path, same_origin};

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight)";

/// Scroll iterations before discovery gives up on the count stabilizing.
const MAX_SCROLL_ITERATIONS: usize = 40;

/// Consecutive iterations with an unchanged count that end the scroll loop.
const STABLE_ITERATIONS: usize = 3;

async fn harvest_hrefs(page: &dyn PageSurface) -> Vec<String> {
    let mut hrefs = Vec::new();
    if let Ok(anchors) = page.query_all("a[href]").await {
        for anchor in &anchors {
            if let Some(href) = attr_or_none(anchor.as_ref(), "href").await {
                if is_product_path(&href) {
                    hrefs.push(href);
                }
            }
        }
    }
    hrefs
}

/// Scrolls the current page until its product-link count stabilizes and
/// returns the discovered detail-page URLs, absolute, same-origin only, and
/// sorted for a deterministic visit order.
///
/// `jitter_ms` is the `(min, max)` pause between scroll iterations.
pub async fn collect_product_links(page: &dyn PageSurface, jitter_ms: (u64, u64)) -> Vec<String> {
    let mut hrefs: Vec<String> = Vec::new();
    let mut last_count = usize::MAX;
    let mut stable = 0;

    for _ in 0..MAX_SCROLL_ITERATIONS {
        hrefs = harvest_hrefs(page).await;
        let count = hrefs.iter().collect::<BTreeSet<_>>().len();

        if page.evaluate(SCROLL_SCRIPT).await.is_err() {
            break;
        }
        jitter_sleep(jitter_ms.0, jitter_ms.1).await;

        if count == last_count {
            stable += 1;
            if stable >= STABLE_ITERATIONS {
                break;
            }
        } else {
            stable = 0;
        }
        last_count = count;
    }

    let page_url = match page.current_url().await {
        Ok(url) => url,
        Err(_) => return Vec::new(),
    };
    let Ok(page_url) = Url::parse(&page_url) else {
        return Vec::new();
    };

    let mut links = BTreeSet::new();
    for href in hrefs {
        let Ok(absolute) = absolutize(&href, &page_url) else {
            continue;
        };
        if !same_origin(&absolute, &page_url) {
            continue;
        }
        if !is_product_path(absolute.path()) {
            continue;
        }
        links.insert(absolute.to_string());
    }
    links.into_iter().collect()
}
