//! Core filtering functionality for record batches
//!
//! Filters compute a boolean keep-mask per batch; combining filters combines
//! masks so a chunk is copied at most once.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::BooleanArray;
use arrow::compute::{and, filter_record_batch as arrow_filter_batch};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};

/// Filter a record batch based on a boolean mask
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - The boolean mask indicating which rows to keep
///
/// # Returns
/// A new record batch with only rows where mask is true, in their original order
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(PipelineError::Validation(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    Ok(arrow_filter_batch(batch, mask)?)
}

/// Trait for objects that can filter record batches
pub trait BatchFilter: std::fmt::Debug + Send + Sync {
    /// Rows of `batch` to keep
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray>;

    /// Returns the set of column names required by this filter
    fn required_columns(&self) -> HashSet<String>;

    /// Filter a record batch
    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mask = self.mask(batch)?;
        filter_record_batch(batch, &mask)
    }
}

/// A filter that always includes all rows
#[derive(Debug, Clone, Default)]
pub struct IncludeAllFilter;

impl BatchFilter for IncludeAllFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        Ok(BooleanArray::from(vec![true; batch.num_rows()]))
    }

    fn required_columns(&self) -> HashSet<String> {
        HashSet::new()
    }
}

/// A filter that combines multiple filters with a logical AND
#[derive(Debug, Clone)]
pub struct AndFilter {
    filters: Vec<Arc<dyn BatchFilter>>,
}

impl AndFilter {
    /// Create a new AND filter
    #[must_use]
    pub fn new(filters: Vec<Arc<dyn BatchFilter>>) -> Self {
        Self { filters }
    }
}

impl BatchFilter for AndFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let mut combined = IncludeAllFilter.mask(batch)?;
        for filter in &self.filters {
            // Nothing left to narrow
            if combined.true_count() == 0 {
                break;
            }
            combined = and(&combined, &filter.mask(batch)?)?;
        }
        Ok(combined)
    }

    fn required_columns(&self) -> HashSet<String> {
        let mut columns = HashSet::new();
        for filter in &self.filters {
            columns.extend(filter.required_columns());
        }
        columns
    }
}
