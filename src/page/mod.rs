//! Page-level operations: link discovery on category grids and the
//! per-colorway walk over product detail pages.

pub mod discovery;
pub mod variants;

pub use discovery::collect_product_links;
pub use variants::{parse_product_page, VariantPhase, VariantWalk};
