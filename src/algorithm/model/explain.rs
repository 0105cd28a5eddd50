//! Additive explanations of the linear model

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::Serialize;

use crate::error::{PipelineError, Result};

use super::logistic::LogisticModel;

/// Global importance of one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    /// Mean absolute contribution over the explained rows
    pub mean_abs_contribution: f64,
    /// Coefficient on the standardized scale
    pub coefficient: f64,
}

/// Per-row, per-feature contributions to the linear predictor
///
/// For a linear model the contribution of feature `j` to row `i` is exactly
/// `coef_j * (z_ij - mean(z_j))`; contributions plus the mean decision sum
/// to the row's decision value.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    pub features: Vec<String>,
    /// Rows x features
    pub contributions: Array2<f64>,
    /// Decision value averaged over the rows
    pub base_value: f64,
    /// Predicted probabilities
    pub risk: Array1<f64>,
}

impl Explanation {
    /// Explain `x` (raw scale) with a fitted model
    pub fn new(model: &LogisticModel, x: ArrayView2<'_, f64>, features: Vec<String>) -> Result<Self> {
        if features.len() != model.coefficients.len() || x.ncols() != features.len() {
            return Err(PipelineError::Validation(format!(
                "{} feature names, {} coefficients, {} columns",
                features.len(),
                model.coefficients.len(),
                x.ncols()
            )));
        }

        let z = model.standardizer.transform(x);
        let decision = model.decision(z.view());
        let centers = z.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(z.ncols()));

        let mut contributions = z;
        for (j, mut column) in contributions.axis_iter_mut(Axis(1)).enumerate() {
            let coefficient = model.coefficients[j];
            let center = centers[j];
            column.mapv_inplace(|v| coefficient * (v - center));
        }

        Ok(Self {
            features,
            contributions,
            base_value: decision.mean().unwrap_or(model.intercept),
            risk: decision.mapv(|t| 1.0 / (1.0 + (-t).exp())),
        })
    }

    /// Features ranked by mean absolute contribution, largest first
    #[must_use]
    pub fn importance(&self, model: &LogisticModel) -> Vec<FeatureImportance> {
        let n = self.contributions.nrows().max(1) as f64;
        let mut ranking: Vec<FeatureImportance> = self
            .features
            .iter()
            .enumerate()
            .map(|(j, feature)| FeatureImportance {
                feature: feature.clone(),
                mean_abs_contribution: self.contributions.column(j).iter().map(|v| v.abs()).sum::<f64>() / n,
                coefficient: model.coefficients[j],
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.mean_abs_contribution
                .total_cmp(&a.mean_abs_contribution)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        ranking
    }

    /// Scored table: keys, label, risk score and one `contrib_` column per feature
    pub fn scores_record_batch(&self, subject_ids: &[i64], hadm_ids: &[i64], labels: &[bool]) -> Result<RecordBatch> {
        let mut fields = vec![
            Field::new("subject_id", DataType::Int64, false),
            Field::new("hadm_id", DataType::Int64, false),
            Field::new("readmit_30d", DataType::Int64, false),
            Field::new("risk_score", DataType::Float64, false),
        ];
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(subject_ids.to_vec())),
            Arc::new(Int64Array::from(hadm_ids.to_vec())),
            Arc::new(Int64Array::from(
                labels.iter().map(|l| i64::from(*l)).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(self.risk.to_vec())),
        ];
        for (j, feature) in self.features.iter().enumerate() {
            fields.push(Field::new(format!("contrib_{feature}"), DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from(self.contributions.column(j).to_vec())));
        }
        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}
