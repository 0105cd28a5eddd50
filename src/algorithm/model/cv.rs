//! Stratified cross-validation and discrimination metrics

use ndarray::{Array1, Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{PipelineError, Result};

use super::logistic::ElasticNet;

/// Metrics of one held-out fold
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoldMetrics {
    /// Fold index
    pub fold: usize,
    /// Held-out rows
    pub n_test: usize,
    /// Area under the ROC curve; missing when the fold has one class
    pub auroc: Option<f64>,
    /// Mean squared error of the predicted probabilities
    pub brier: f64,
    /// Share of rows classified correctly at 0.5
    pub accuracy: f64,
}

/// Per-fold metrics and their means
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvReport {
    pub folds: Vec<FoldMetrics>,
    pub mean_auroc: Option<f64>,
    pub mean_brier: f64,
    pub mean_accuracy: f64,
}

/// Held-out row indices per fold, classes spread evenly
///
/// Positive and negative rows are shuffled separately with `seed` and dealt
/// round-robin, so every row lands in exactly one fold.
#[must_use]
pub fn stratified_folds(labels: &[bool], k: usize, seed: u64) -> Vec<Vec<usize>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![Vec::new(); k.max(1)];

    let mut positives: Vec<usize> = (0..labels.len()).filter(|&i| labels[i]).collect();
    let mut negatives: Vec<usize> = (0..labels.len()).filter(|&i| !labels[i]).collect();
    positives.shuffle(&mut rng);
    negatives.shuffle(&mut rng);

    let n_folds = folds.len();
    for (slot, row) in positives.into_iter().chain(negatives).enumerate() {
        folds[slot % n_folds].push(row);
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    folds
}

/// Rank-based AUROC with ties averaged
#[must_use]
pub fn auroc(scores: &[f64], labels: &[bool]) -> Option<f64> {
    let positives = labels.iter().filter(|l| **l).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; tied rows share the mean rank
        let mean_rank = (start + end) as f64 / 2.0 + 1.0;
        rank_sum += mean_rank * order[start..=end].iter().filter(|&&i| labels[i]).count() as f64;
        start = end + 1;
    }

    let p = positives as f64;
    Some((rank_sum - p * (p + 1.0) / 2.0) / (p * negatives as f64))
}

/// Mean squared difference between probabilities and outcomes
#[must_use]
pub fn brier(probabilities: &[f64], labels: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    probabilities
        .iter()
        .zip(labels)
        .map(|(p, l)| (p - f64::from(u8::from(*l))).powi(2))
        .sum::<f64>()
        / labels.len() as f64
}

/// Share of correct classifications at a 0.5 threshold
#[must_use]
pub fn accuracy(probabilities: &[f64], labels: &[bool]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|(p, l)| (**p >= 0.5) == **l)
        .count();
    correct as f64 / labels.len() as f64
}

/// Cross-validate the trainer over `k` stratified folds
///
/// Folds are fitted in parallel; each one only reads the shared matrix
/// through its index sets.
pub fn cross_validate(
    x: &Array2<f64>,
    labels: &[bool],
    trainer: &ElasticNet,
    k: usize,
    seed: u64,
) -> Result<CvReport> {
    if k < 2 || labels.len() < k {
        return Err(PipelineError::Validation(format!(
            "cannot run {k}-fold cross-validation on {} rows",
            labels.len()
        )));
    }
    if x.nrows() != labels.len() {
        return Err(PipelineError::Validation(format!(
            "{} feature rows for {} labels",
            x.nrows(),
            labels.len()
        )));
    }

    let folds = stratified_folds(labels, k, seed);
    let y: Array1<f64> = labels.iter().map(|l| f64::from(u8::from(*l))).collect();

    let metrics: Vec<FoldMetrics> = folds
        .par_iter()
        .enumerate()
        .map(|(fold, test)| {
            let mut held_out = vec![false; labels.len()];
            for &i in test {
                held_out[i] = true;
            }
            let train: Vec<usize> = (0..labels.len()).filter(|&i| !held_out[i]).collect();

            let model = trainer.fit(
                x.select(Axis(0), &train).view(),
                y.select(Axis(0), &train).view(),
            );
            let probabilities = model.predict_proba(x.select(Axis(0), test).view()).to_vec();
            let truth: Vec<bool> = test.iter().map(|&i| labels[i]).collect();

            FoldMetrics {
                fold,
                n_test: test.len(),
                auroc: auroc(&probabilities, &truth),
                brier: brier(&probabilities, &truth),
                accuracy: accuracy(&probabilities, &truth),
            }
        })
        .collect();

    let n = metrics.len() as f64;
    let aurocs: Vec<f64> = metrics.iter().filter_map(|m| m.auroc).collect();
    let report = CvReport {
        mean_auroc: (!aurocs.is_empty()).then(|| aurocs.iter().sum::<f64>() / aurocs.len() as f64),
        mean_brier: metrics.iter().map(|m| m.brier).sum::<f64>() / n,
        mean_accuracy: metrics.iter().map(|m| m.accuracy).sum::<f64>() / n,
        folds: metrics,
    };

    log::info!(
        "{k}-fold CV: AUROC {}, Brier {:.4}, accuracy {:.3}",
        report
            .mean_auroc
            .map_or_else(|| "n/a".to_string(), |a| format!("{a:.3}")),
        report.mean_brier,
        report.mean_accuracy
    );
    Ok(report)
}
