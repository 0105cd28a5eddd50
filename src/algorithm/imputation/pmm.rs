//! Predictive mean matching for one column

use ndarray::{Array1, Array2, Axis};
use rand::Rng;
use rand::seq::IndexedRandom;

use super::linalg::ridge_least_squares;

/// Draws replacements for the missing cells of one column
#[derive(Debug, Clone, Copy)]
pub struct PredictiveMeanMatcher {
    /// Candidate donors per missing cell
    pub donors: usize,
    /// Ridge penalty for the regressions
    pub ridge: f64,
}

impl PredictiveMeanMatcher {
    /// Impute the rows of `target` where `observed` is false
    ///
    /// `predictors` holds one row per target row and must already include an
    /// intercept column. A regression is fitted on the observed rows (used to
    /// score donors) and another on a bootstrap resample of them (used to
    /// score the missing rows). Each missing row receives the observed value
    /// of a donor drawn at random among the `donors` observed rows with the
    /// closest predictions. Returns `(row, value)` pairs for the missing rows.
    pub fn impute<R: Rng + ?Sized>(
        &self,
        target: &[f64],
        observed: &[bool],
        predictors: &Array2<f64>,
        rng: &mut R,
    ) -> Vec<(usize, f64)> {
        let obs: Vec<usize> = (0..target.len()).filter(|&i| observed[i]).collect();
        let mis: Vec<usize> = (0..target.len()).filter(|&i| !observed[i]).collect();
        if obs.is_empty() || mis.is_empty() {
            return Vec::new();
        }

        let x_obs = predictors.select(Axis(0), &obs);
        let y_obs: Array1<f64> = obs.iter().map(|&i| target[i]).collect();

        let boot: Vec<usize> = (0..obs.len()).map(|_| rng.random_range(0..obs.len())).collect();
        let x_boot = x_obs.select(Axis(0), &boot);
        let y_boot = y_obs.select(Axis(0), &boot);

        let fitted = ridge_least_squares(x_obs.view(), y_obs.view(), self.ridge);
        let drawn = ridge_least_squares(x_boot.view(), y_boot.view(), self.ridge);

        let (Some(beta_hat), Some(beta_dot)) = (fitted, drawn) else {
            // Degenerate design: fall back to a random observed value
            return mis
                .into_iter()
                .map(|row| (row, y_obs[rng.random_range(0..y_obs.len())]))
                .collect();
        };

        // Donor predictions sorted ascending for a windowed nearest search
        let donor_pred = x_obs.dot(&beta_hat);
        let mut ranked: Vec<(f64, f64)> = donor_pred
            .iter()
            .zip(y_obs.iter())
            .map(|(&p, &y)| (p, y))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

        let x_mis = predictors.select(Axis(0), &mis);
        let mis_pred = x_mis.dot(&beta_dot);
        let k = self.donors.clamp(1, ranked.len());

        mis.iter()
            .zip(mis_pred.iter())
            .map(|(&row, &prediction)| {
                let candidates = nearest(&ranked, prediction, k);
                let value = candidates
                    .choose(rng)
                    .map_or(ranked[0].1, |&i| ranked[i].1);
                (row, value)
            })
            .collect()
    }
}

/// Indices of the `k` entries of `ranked` whose prediction is closest to `target`
fn nearest(ranked: &[(f64, f64)], target: f64, k: usize) -> Vec<usize> {
    let mut right = ranked.partition_point(|(p, _)| *p < target);
    let mut left = right;
    let mut picked = Vec::with_capacity(k);

    while picked.len() < k && (left > 0 || right < ranked.len()) {
        let take_left = match (left > 0, right < ranked.len()) {
            (true, true) => (target - ranked[left - 1].0) <= (ranked[right].0 - target),
            (true, false) => true,
            _ => false,
        };
        if take_left {
            left -= 1;
            picked.push(left);
        } else {
            picked.push(right);
            right += 1;
        }
    }
    picked
}
