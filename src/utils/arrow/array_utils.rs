//! Utilities for working with Arrow arrays.

use arrow::array::Array;
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};

/// Downcast an array to a concrete type, naming the column on failure
///
/// # Arguments
/// * `array` - The array to downcast
/// * `table` - Table the column belongs to (for error context)
/// * `column` - Column name (for error context)
pub fn downcast_array<'a, T: Array + 'static>(
    array: &'a dyn Array,
    table: &str,
    column: &str,
) -> Result<&'a T> {
    array.as_any().downcast_ref::<T>().ok_or_else(|| {
        PipelineError::schema(
            table,
            format!(
                "column {column} has type {} which cannot be read as {}",
                array.data_type(),
                std::any::type_name::<T>()
                    .rsplit("::")
                    .next()
                    .unwrap_or("the expected type")
            ),
        )
    })
}

/// Look up a column by name and downcast it
pub fn column_as<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    table: &str,
    column: &str,
) -> Result<&'a T> {
    let array = batch
        .column_by_name(column)
        .ok_or_else(|| PipelineError::schema(table, format!("missing column {column}")))?;
    downcast_array::<T>(array.as_ref(), table, column)
}
