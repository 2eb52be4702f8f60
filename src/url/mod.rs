//! URL handling for link discovery and navigation
//!
//! Category grids emit hrefs in every shape: absolute, root-relative,
//! protocol-relative, and document-relative. Everything is resolved against
//! the page the href was found on before any filtering happens.

use crate::{UrlError, UrlResult};
use url::Url;

/// Returns true when `path` looks like a product detail page.
///
/// The storefront uses `/shop/` slugs; `/product/` and `/products/` are kept
/// for deployments that expose the older path style.
pub fn is_product_path(path: &str) -> bool {
    path.contains("/shop/") || path.contains("/product/") || path.contains("/products/")
}

/// Resolves an href to an absolute URL against the page it appeared on.
///
/// # Resolution rules
///
/// 1. `https://...` and `http://...` are taken as-is
/// 2. `//host/path` inherits the page's scheme
/// 3. `/path` resolves against the page's origin
/// 4. anything else resolves relative to the page URL
pub fn absolutize(href: &str, page_url: &Url) -> UrlResult<Url> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Parse("empty href".to_string()));
    }

    let resolved = if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).map_err(|e| UrlError::Parse(e.to_string()))?
    } else if let Some(rest) = href.strip_prefix("//") {
        Url::parse(&format!("{}://{}", page_url.scheme(), rest))
            .map_err(|e| UrlError::Parse(e.to_string()))?
    } else {
        page_url
            .join(href)
            .map_err(|e| UrlError::Parse(e.to_string()))?
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return Err(UrlError::InvalidScheme(resolved.scheme().to_string()));
    }
    Ok(resolved)
}

/// Returns true when two URLs share scheme, host and port.
pub fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme() && a.host_str() == b.host_str() && a.port_or_known_default() == b.port_or_known_default()
}

/// Derives a locale tag like `us-en` from path segments such as `/us/en/...`.
///
/// Falls back to `us-en` when the URL carries no recognizable locale pair.
pub fn locale_from_url(url: &Url) -> String {
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    if segments.len() >= 2 && segments[0].len() == 2 && segments[1].len() == 2 {
        return format!("{}-{}", segments[0], segments[1]);
    }
    "us-en".to_string()
}
