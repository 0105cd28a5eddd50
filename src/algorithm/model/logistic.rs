//! Elastic-net logistic regression fitted by proximal gradient descent

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::Serialize;

use crate::config::ModelConfig;

/// Column centering and scaling learned on training rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Standardizer {
    /// Column means
    pub mean: Vec<f64>,
    /// Column standard deviations; constant columns use 1
    pub scale: Vec<f64>,
}

impl Standardizer {
    /// Learn means and standard deviations of every column
    #[must_use]
    pub fn fit(x: ArrayView2<'_, f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());
        for column in x.columns() {
            let m = column.sum() / n;
            let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            let sd = var.sqrt();
            mean.push(m);
            scale.push(if sd > 1e-12 { sd } else { 1.0 });
        }
        Self { mean, scale }
    }

    /// Standardize rows with the learned parameters
    #[must_use]
    pub fn transform(&self, x: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut z = x.to_owned();
        for (j, mut column) in z.axis_iter_mut(Axis(1)).enumerate() {
            column.mapv_inplace(|v| (v - self.mean[j]) / self.scale[j]);
        }
        z
    }
}

/// Fitted model on the standardized scale
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogisticModel {
    /// Unpenalized intercept
    pub intercept: f64,
    /// Coefficients of the standardized features
    pub coefficients: Vec<f64>,
    /// Scaling applied before the linear predictor
    pub standardizer: Standardizer,
    /// Gradient steps taken
    pub iterations: usize,
}

impl LogisticModel {
    /// Linear predictor for standardized rows
    #[must_use]
    pub fn decision(&self, z: ArrayView2<'_, f64>) -> Array1<f64> {
        let beta = ArrayView1::from(self.coefficients.as_slice());
        z.dot(&beta) + self.intercept
    }

    /// Predicted probability of the positive class for raw rows
    #[must_use]
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Array1<f64> {
        let z = self.standardizer.transform(x);
        self.decision(z.view()).mapv(sigmoid)
    }
}

/// Penalized logistic regression trainer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticNet {
    /// Overall penalty strength
    pub alpha: f64,
    /// Share of the penalty that is L1
    pub l1_ratio: f64,
    /// Maximum gradient steps
    pub max_iterations: usize,
    /// Stop when no coefficient moves more than this
    pub tolerance: f64,
}

impl From<&ModelConfig> for ElasticNet {
    fn from(config: &ModelConfig) -> Self {
        Self {
            alpha: config.alpha,
            l1_ratio: config.l1_ratio,
            max_iterations: config.max_iterations,
            tolerance: config.tolerance,
        }
    }
}

impl ElasticNet {
    /// Fit on raw rows `x` and 0/1 targets `y`
    ///
    /// Minimizes mean log-loss plus
    /// `alpha * (l1_ratio * |w|_1 + (1 - l1_ratio) / 2 * |w|_2^2)`.
    #[must_use]
    pub fn fit(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> LogisticModel {
        let standardizer = Standardizer::fit(x);
        let z = standardizer.transform(x);
        let n = z.nrows().max(1) as f64;
        let p = z.ncols();

        let l1 = self.alpha * self.l1_ratio;
        let l2 = self.alpha * (1.0 - self.l1_ratio);
        // Lipschitz bound of the smooth part, intercept column included
        let frobenius = z.iter().map(|v| v * v).sum::<f64>() / n;
        let step = 1.0 / (0.25 * (frobenius + 1.0) + l2);

        let mut w = Array1::<f64>::zeros(p);
        let mut b = y.mean().map_or(0.0, |m| logit(m.clamp(1e-6, 1.0 - 1e-6)));
        let mut iterations = 0;

        for _ in 0..self.max_iterations {
            iterations += 1;
            let residual = (z.dot(&w) + b).mapv(sigmoid) - y;
            let grad_w = z.t().dot(&residual) / n + &w * l2;
            let grad_b = residual.sum() / n;

            let mut delta: f64 = (step * grad_b).abs();
            b -= step * grad_b;
            for j in 0..p {
                let updated = soft_threshold(w[j] - step * grad_w[j], step * l1);
                delta = delta.max((updated - w[j]).abs());
                w[j] = updated;
            }
            if delta < self.tolerance {
                break;
            }
        }

        LogisticModel {
            intercept: b,
            coefficients: w.to_vec(),
            standardizer,
            iterations,
        }
    }
}

fn sigmoid(t: f64) -> f64 {
    1.0 / (1.0 + (-t).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn soft_threshold(v: f64, threshold: f64) -> f64 {
    v.signum() * (v.abs() - threshold).max(0.0)
}
