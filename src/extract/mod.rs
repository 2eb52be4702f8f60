//! DOM-side field extraction
//!
//! Every resolver here is tolerant by construction: selectors are tried in
//! order, element failures read as "absent", and callers combine DOM results
//! with embedded-state fallbacks before deciding a field is truly missing.

pub mod fields;
pub mod money;
pub mod price;
pub mod sizes;

pub use fields::SwatchRef;
pub use price::PriceFields;
