//! Named columns keyed by admission

use ndarray::Array2;

use crate::error::{PipelineError, Result};

/// Column-oriented working table with one row per cohort admission
///
/// Every value column is `Option<f64>` so unmeasured labs stay distinct from
/// zero until imputation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureFrame {
    /// Patient identifiers in row order
    pub subject_ids: Vec<i64>,
    /// Admission identifiers in row order
    pub hadm_ids: Vec<i64>,
    /// Readmission labels in row order
    pub labels: Vec<bool>,
    columns: Vec<(String, Vec<Option<f64>>)>,
}

impl FeatureFrame {
    /// Start a frame from its key and label columns
    pub fn new(subject_ids: Vec<i64>, hadm_ids: Vec<i64>, labels: Vec<bool>) -> Result<Self> {
        if subject_ids.len() != hadm_ids.len() || labels.len() != hadm_ids.len() {
            return Err(PipelineError::Validation(format!(
                "key columns disagree on length: {} subjects, {} admissions, {} labels",
                subject_ids.len(),
                hadm_ids.len(),
                labels.len()
            )));
        }
        Ok(Self {
            subject_ids,
            hadm_ids,
            labels,
            columns: Vec::new(),
        })
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.hadm_ids.len()
    }

    /// Whether the frame has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hadm_ids.is_empty()
    }

    /// Append a column; names are unique and lengths must match
    pub fn push(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.len() {
            return Err(PipelineError::Validation(format!(
                "column {name} has {} rows, frame has {}",
                values.len(),
                self.len()
            )));
        }
        if self.contains(name) {
            return Err(PipelineError::Validation(format!("duplicate column {name}")));
        }
        self.columns.push((name.to_string(), values));
        Ok(())
    }

    /// Append a column without missing values
    pub fn push_dense(&mut self, name: &str, values: impl IntoIterator<Item = f64>) -> Result<()> {
        self.push(name, values.into_iter().map(Some).collect())
    }

    /// Replace the values of an existing column
    pub fn replace(&mut self, name: &str, values: Vec<Option<f64>>) -> Result<()> {
        if values.len() != self.len() {
            return Err(PipelineError::Validation(format!(
                "replacement for {name} has {} rows, frame has {}",
                values.len(),
                self.len()
            )));
        }
        let slot = self
            .columns
            .iter_mut()
            .find(|(n, _)| n == name)
            .ok_or_else(|| PipelineError::Validation(format!("no column {name} to replace")))?;
        slot.1 = values;
        Ok(())
    }

    /// Whether a column exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Values of a column
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Column names in insertion order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    /// Missing cells in a column; unknown columns count as fully missing
    #[must_use]
    pub fn missing(&self, name: &str) -> usize {
        self.column(name)
            .map_or(self.len(), |c| c.iter().filter(|v| v.is_none()).count())
    }

    /// Dense matrix of the named columns
    ///
    /// Fails when a column is absent or has a missing cell.
    pub fn dense<S: AsRef<str>>(&self, names: &[S]) -> Result<Array2<f64>> {
        let mut matrix = Array2::<f64>::zeros((self.len(), names.len()));
        for (j, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let column = self
                .column(name)
                .ok_or_else(|| PipelineError::Validation(format!("unknown column {name}")))?;
            for (i, value) in column.iter().enumerate() {
                matrix[[i, j]] = value.ok_or_else(|| {
                    PipelineError::Validation(format!(
                        "column {name} is missing a value for admission {}",
                        self.hadm_ids[i]
                    ))
                })?;
            }
        }
        Ok(matrix)
    }
}
