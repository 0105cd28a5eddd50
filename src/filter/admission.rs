//! Admission-key filtering
//!
//! Restricts event rows to the cohort's admissions.

use std::collections::HashSet;

use arrow::array::{Array, BooleanArray};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::error::Result;
use crate::filter::core::BatchFilter;
use crate::utils::arrow::int64_column;

/// A filter that includes only rows whose admission id is in a set
#[derive(Debug, Clone)]
pub struct AdmissionFilter {
    hadm_ids: FxHashSet<i64>,
    column: String,
}

impl AdmissionFilter {
    /// Create a filter on the `hadm_id` column
    #[must_use]
    pub fn new(hadm_ids: FxHashSet<i64>) -> Self {
        Self {
            hadm_ids,
            column: "hadm_id".to_string(),
        }
    }
}

impl BatchFilter for AdmissionFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let ids = int64_column(batch, "event batch", &self.column)?;
        Ok((0..ids.len())
            .map(|i| Some(!ids.is_null(i) && self.hadm_ids.contains(&ids.value(i))))
            .collect())
    }

    fn required_columns(&self) -> HashSet<String> {
        HashSet::from([self.column.clone()])
    }
}
