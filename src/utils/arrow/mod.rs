//! Arrow data handling utilities
//!
//! Typed column access on conformed record batches and constructors for
//! output columns.

pub mod array_utils;
pub mod extractors;

pub use array_utils::{column_as, downcast_array};
pub use extractors::{
    f64_column, i64_column, int64_column, opt_f64, opt_i64, opt_str,
    string_column, utf8_column,
};
