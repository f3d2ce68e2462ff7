//! Arrow data handling utilities
//!
//! Helpers for pulling typed columns out of record batches with clear errors
//! when a column is missing or has an unusable type.

pub mod array_utils;
pub mod extractors;

pub use array_utils::{downcast_array, get_column};
pub use extractors::{extract_dates, extract_i32s, extract_strings};
