//! Final fixed-schema feature table

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use ndarray::{Array1, Array2};

use crate::error::{PipelineError, Result};
use crate::schema::features::{KEY_COLUMNS, LABEL_COLUMN, MODEL_COLUMNS, feature_schema};
use crate::utils::arrow::column_as;

use super::frame::FeatureFrame;

/// One row per cohort admission, columns in schema order, no missing values
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    batch: RecordBatch,
}

impl FeatureTable {
    /// Materialize the schema columns of a completed frame
    ///
    /// Any missing value in a model column is an error.
    pub fn from_frame(frame: &FeatureFrame) -> Result<Self> {
        let mut columns: Vec<ArrayRef> = Vec::with_capacity(3 + MODEL_COLUMNS.len());
        columns.push(Arc::new(Int64Array::from(frame.subject_ids.clone())));
        columns.push(Arc::new(Int64Array::from(frame.hadm_ids.clone())));
        columns.push(Arc::new(Int64Array::from(
            frame.labels.iter().map(|l| i64::from(*l)).collect::<Vec<_>>(),
        )));

        let mut residual = Vec::new();
        for name in MODEL_COLUMNS {
            let values = frame.column(name).ok_or_else(|| {
                PipelineError::schema("features", format!("assembled frame lacks column {name}"))
            })?;
            let missing = values.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                residual.push(format!("{name} ({missing})"));
                continue;
            }
            columns.push(Arc::new(Float64Array::from(
                values.iter().map(|v| v.unwrap_or_default()).collect::<Vec<_>>(),
            )));
        }
        if !residual.is_empty() {
            return Err(PipelineError::Validation(format!(
                "missing values remain in model columns: {}",
                residual.join(", ")
            )));
        }

        Ok(Self {
            batch: RecordBatch::try_new(feature_schema(), columns)?,
        })
    }

    /// Underlying batch
    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Number of admissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.batch.num_rows()
    }

    /// Whether the table has no admissions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Model column names in order
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        MODEL_COLUMNS.iter().map(|c| (*c).to_string()).collect()
    }

    fn int_column(&self, name: &str) -> Result<Vec<i64>> {
        Ok(column_as::<Int64Array>(&self.batch, "features", name)?.values().to_vec())
    }

    /// Patient identifiers
    pub fn subject_ids(&self) -> Result<Vec<i64>> {
        self.int_column(KEY_COLUMNS[0])
    }

    /// Admission identifiers
    pub fn hadm_ids(&self) -> Result<Vec<i64>> {
        self.int_column(KEY_COLUMNS[1])
    }

    /// Labels as booleans
    pub fn labels(&self) -> Result<Vec<bool>> {
        Ok(self.int_column(LABEL_COLUMN)?.into_iter().map(|v| v != 0).collect())
    }

    /// Labels as 0.0 / 1.0
    pub fn label_vector(&self) -> Result<Array1<f64>> {
        Ok(self.labels()?.into_iter().map(|l| f64::from(u8::from(l))).collect())
    }

    /// Model columns as a dense row-major matrix
    pub fn matrix(&self) -> Result<Array2<f64>> {
        let mut x = Array2::<f64>::zeros((self.len(), MODEL_COLUMNS.len()));
        for (j, name) in MODEL_COLUMNS.iter().enumerate() {
            let column = column_as::<Float64Array>(&self.batch, "features", name)?;
            for (i, v) in column.values().iter().enumerate() {
                x[[i, j]] = *v;
            }
        }
        Ok(x)
    }
}
