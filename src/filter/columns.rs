//! Column-value filters used by the event folds

use std::collections::HashSet;

use arrow::array::{Array, BooleanArray};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::error::{PipelineError, Result};
use crate::filter::core::BatchFilter;
use crate::rules::PatternClassifier;
use crate::utils::arrow::{int64_column, opt_str, utf8_column};

/// Keep rows where every listed column is non-null
#[derive(Debug, Clone)]
pub struct NotNullFilter {
    columns: Vec<String>,
}

impl NotNullFilter {
    /// Create a filter over the given columns
    #[must_use]
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl BatchFilter for NotNullFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let arrays = self
            .columns
            .iter()
            .map(|name| {
                batch
                    .column_by_name(name)
                    .ok_or_else(|| PipelineError::schema("event batch", format!("missing column {name}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok((0..batch.num_rows())
            .map(|row| Some(arrays.iter().all(|a| a.is_valid(row))))
            .collect())
    }

    fn required_columns(&self) -> HashSet<String> {
        self.columns.iter().cloned().collect()
    }
}

/// Keep rows whose integer item id is in an allow-list
#[derive(Debug, Clone)]
pub struct ItemFilter {
    item_ids: FxHashSet<i64>,
    column: String,
}

impl ItemFilter {
    /// Create a filter on the `itemid` column
    #[must_use]
    pub fn new(item_ids: FxHashSet<i64>) -> Self {
        Self {
            item_ids,
            column: "itemid".to_string(),
        }
    }
}

impl BatchFilter for ItemFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let ids = int64_column(batch, "event batch", &self.column)?;
        Ok((0..ids.len())
            .map(|i| Some(!ids.is_null(i) && self.item_ids.contains(&ids.value(i))))
            .collect())
    }

    fn required_columns(&self) -> HashSet<String> {
        HashSet::from([self.column.clone()])
    }
}

/// Keep diagnosis rows of one ICD version whose code matches a rule table
#[derive(Debug, Clone)]
pub struct CodeFilter {
    version: i64,
    classifier: PatternClassifier,
}

impl CodeFilter {
    /// Create a filter for `version` codes accepted by `classifier`
    #[must_use]
    pub fn new(version: i64, classifier: PatternClassifier) -> Self {
        Self {
            version,
            classifier,
        }
    }
}

impl BatchFilter for CodeFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let versions = int64_column(batch, "diagnoses_icd", "icd_version")?;
        let codes = utf8_column(batch, "diagnoses_icd", "icd_code")?;

        Ok((0..batch.num_rows())
            .map(|i| {
                let keep = !versions.is_null(i)
                    && versions.value(i) == self.version
                    && opt_str(codes, i).is_some_and(|code| self.classifier.is_match(code));
                Some(keep)
            })
            .collect())
    }

    fn required_columns(&self) -> HashSet<String> {
        HashSet::from(["icd_version".to_string(), "icd_code".to_string()])
    }
}
