//! Baseline model over the assembled feature matrix
//!
//! Only the matrix and the label are consumed: an elastic-net logistic
//! regression is cross-validated, refitted on every row and explained with
//! exact linear contributions.

pub mod cv;
pub mod explain;
pub mod logistic;

use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::algorithm::features::FeatureTable;
use crate::config::ModelConfig;
use crate::error::Result;

pub use cv::{CvReport, FoldMetrics, auroc, cross_validate, stratified_folds};
pub use explain::{Explanation, FeatureImportance};
pub use logistic::{ElasticNet, LogisticModel, Standardizer};

/// Cross-validation metrics and the global feature ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelReport {
    pub cross_validation: CvReport,
    pub importance: Vec<FeatureImportance>,
    /// Model refitted on every row
    pub model: LogisticModel,
}

/// Evaluate, refit and explain the baseline model
///
/// Returns the report and the scored table.
pub fn train_and_explain(table: &FeatureTable, config: &ModelConfig) -> Result<(ModelReport, RecordBatch)> {
    let x = table.matrix()?;
    let labels = table.labels()?;
    let y = table.label_vector()?;
    let trainer = ElasticNet::from(config);

    let cross_validation = cross_validate(&x, &labels, &trainer, config.folds, config.seed)?;
    let model = trainer.fit(x.view(), y.view());
    log::info!("Refitted on {} admissions in {} iterations", labels.len(), model.iterations);

    let explanation = Explanation::new(&model, x.view(), table.feature_names())?;
    let importance = explanation.importance(&model);
    for entry in importance.iter().take(5) {
        log::info!(
            "  {:<24} mean |contribution| {:.4} (coefficient {:+.4})",
            entry.feature,
            entry.mean_abs_contribution,
            entry.coefficient
        );
    }
    let scores = explanation.scores_record_batch(&table.subject_ids()?, &table.hadm_ids()?, &labels)?;

    Ok((
        ModelReport {
            cross_validation,
            importance,
            model,
        },
        scores,
    ))
}
