//! Type inference and value coercion
//!
//! Both operate on single header tokens or cells and know nothing about
//! files or stores.

pub mod coercion;
pub mod types;

pub use coercion::{coerce_value, is_fraction};
pub use types::{TYPE_EXCEPTIONS, TYPE_TOKENS, infer_column, lookup_type_token};
