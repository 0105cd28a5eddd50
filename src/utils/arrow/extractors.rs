//! Field extraction utilities for Arrow record batches
//!
//! Null-aware scalar readers and builders for the columns written to stage
//! artifacts.

use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, Float64Array, Int64Array, StringArray,
};
use arrow::record_batch::RecordBatch;

use super::array_utils::column_as;
use crate::error::Result;

/// Read a nullable string cell; empty strings read as missing
#[must_use]
pub fn opt_str(array: &StringArray, row: usize) -> Option<&str> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row).trim();
    (!value.is_empty()).then_some(value)
}

/// Read a nullable integer cell
#[must_use]
pub fn opt_i64(array: &Int64Array, row: usize) -> Option<i64> {
    (!array.is_null(row)).then(|| array.value(row))
}

/// Read a nullable float cell; NaN reads as missing
#[must_use]
pub fn opt_f64(array: &Float64Array, row: usize) -> Option<f64> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row);
    (!value.is_nan()).then_some(value)
}

/// Typed access to an `Int64` column of a conformed batch
pub fn int64_column<'a>(batch: &'a RecordBatch, table: &str, column: &str) -> Result<&'a Int64Array> {
    column_as::<Int64Array>(batch, table, column)
}

/// Typed access to a `Utf8` column of a conformed batch
pub fn utf8_column<'a>(batch: &'a RecordBatch, table: &str, column: &str) -> Result<&'a StringArray> {
    column_as::<StringArray>(batch, table, column)
}

/// Build a nullable `Float64` column
#[must_use]
pub fn f64_column(values: Vec<Option<f64>>) -> ArrayRef {
    Arc::new(Float64Array::from(values))
}

/// Build a nullable `Int64` column
#[must_use]
pub fn i64_column(values: Vec<Option<i64>>) -> ArrayRef {
    Arc::new(Int64Array::from(values))
}

/// Build a nullable `Utf8` column
#[must_use]
pub fn string_column(values: Vec<Option<String>>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}
