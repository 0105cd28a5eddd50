//! Chained-equation imputation of the lab columns
//!
//! Lab values are missing structurally: a test was not ordered. Before any
//! value is filled in, admissions without a single lab result are flagged.
//! Each lab column with gaps is then imputed in turn from the auxiliary
//! columns and the other labs by predictive mean matching, for a fixed
//! number of passes. The whole procedure runs independently once per
//! ensemble member; one member replaces the lab columns.

pub mod linalg;
pub mod pmm;

use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::config::ImputationConfig;
use crate::error::{PipelineError, Result};

pub use pmm::PredictiveMeanMatcher;

/// Completed lab columns
#[derive(Debug, Clone, PartialEq)]
pub struct ImputationResult {
    /// Lab column names
    pub columns: Vec<String>,
    /// Admission had no lab value at all before imputation
    pub no_labs_flag: Vec<bool>,
    /// Selected member, one vector per lab column
    pub completed: Vec<Vec<f64>>,
    /// Every member when the ensemble is retained, otherwise empty
    pub ensemble: Vec<Vec<Vec<f64>>>,
    /// Index of the selected member
    pub selected: usize,
    /// Missing cells per lab column before imputation
    pub missing_before: Vec<usize>,
    /// Columns without any observed value, filled with their reference value
    pub reference_filled: Vec<String>,
}

impl ImputationResult {
    /// Missing cells before imputation, over all lab columns
    #[must_use]
    pub fn total_missing(&self) -> usize {
        self.missing_before.iter().sum()
    }
}

/// Multiple imputation by chained equations
#[derive(Debug, Clone)]
pub struct MiceImputer<'a> {
    config: &'a ImputationConfig,
}

impl<'a> MiceImputer<'a> {
    /// Create an imputer for `config`
    #[must_use]
    pub fn new(config: &'a ImputationConfig) -> Self {
        Self { config }
    }

    /// Impute the lab columns
    ///
    /// # Arguments
    /// * `labs` - One vector per lab column, `None` where unmeasured
    /// * `names` - Lab column names
    /// * `reference` - Fallback value per lab column
    /// * `auxiliary` - Fully observed predictors, one row per admission
    pub fn impute(
        &self,
        labs: &[Vec<Option<f64>>],
        names: &[String],
        reference: &[f64],
        auxiliary: &Array2<f64>,
    ) -> Result<ImputationResult> {
        let rows = auxiliary.nrows();
        if labs.len() != names.len() || labs.len() != reference.len() {
            return Err(PipelineError::Validation(format!(
                "{} lab columns with {} names and {} reference values",
                labs.len(),
                names.len(),
                reference.len()
            )));
        }
        if let Some(bad) = labs.iter().position(|c| c.len() != rows) {
            return Err(PipelineError::Validation(format!(
                "lab column {} has {} rows, auxiliary predictors have {rows}",
                names[bad],
                labs[bad].len()
            )));
        }
        if auxiliary.iter().any(|v| !v.is_finite()) {
            return Err(PipelineError::Validation(
                "auxiliary imputation predictors must be fully observed".to_string(),
            ));
        }

        let no_labs_flag: Vec<bool> = (0..rows)
            .map(|r| !labs.is_empty() && labs.iter().all(|c| c[r].is_none()))
            .collect();
        let missing_before: Vec<usize> = labs
            .iter()
            .map(|c| c.iter().filter(|v| v.is_none()).count())
            .collect();

        let reference_filled: Vec<String> = labs
            .iter()
            .zip(names)
            .filter(|(c, _)| !c.is_empty() && c.iter().all(Option::is_none))
            .map(|(_, n)| n.clone())
            .collect();
        for name in &reference_filled {
            log::warn!("{name} has no observed value; filling with its reference value");
        }

        let aux = standardize_columns(auxiliary);
        let members = (0..self.config.n_imputations)
            .map(|m| self.complete_once(labs, reference, &aux, self.config.seed.wrapping_add(m as u64)))
            .collect::<Vec<_>>();

        let selected = self.config.selected_imputation;
        let completed = members.get(selected).cloned().ok_or_else(|| {
            PipelineError::Config(format!(
                "selected_imputation {selected} is outside the {} members",
                members.len()
            ))
        })?;
        let ensemble = if self.config.retain_ensemble {
            members
        } else {
            Vec::new()
        };

        log::info!(
            "Imputed {} missing lab cells over {} rows ({} members, member {selected} selected, {} admissions without labs)",
            missing_before.iter().sum::<usize>(),
            rows,
            self.config.n_imputations,
            no_labs_flag.iter().filter(|f| **f).count()
        );

        Ok(ImputationResult {
            columns: names.to_vec(),
            no_labs_flag,
            completed,
            ensemble,
            selected,
            missing_before,
            reference_filled,
        })
    }

    /// One completed dataset
    fn complete_once(
        &self,
        labs: &[Vec<Option<f64>>],
        reference: &[f64],
        aux: &Array2<f64>,
        seed: u64,
    ) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let rows = aux.nrows();
        let observed: Vec<Vec<bool>> = labs
            .iter()
            .map(|c| c.iter().map(Option::is_some).collect())
            .collect();

        // Initial fill from each column's own observed values
        let mut current: Vec<Vec<f64>> = labs
            .iter()
            .zip(reference)
            .map(|(column, &fallback)| {
                let pool: Vec<f64> = column.iter().flatten().copied().collect();
                column
                    .iter()
                    .map(|v| match v {
                        Some(v) => *v,
                        None => pool.choose(&mut rng).copied().unwrap_or(fallback),
                    })
                    .collect()
            })
            .collect();

        let targets: Vec<usize> = (0..labs.len())
            .filter(|&j| {
                let n_obs = observed[j].iter().filter(|o| **o).count();
                n_obs > 0 && n_obs < rows
            })
            .collect();
        let matcher = PredictiveMeanMatcher {
            donors: self.config.donors,
            ridge: self.config.ridge,
        };

        for _ in 0..self.config.max_iterations {
            for &j in &targets {
                let predictors = design_matrix(aux, &current, j);
                for (row, value) in matcher.impute(&current[j], &observed[j], &predictors, &mut rng) {
                    current[j][row] = value;
                }
            }
        }
        current
    }
}

/// Intercept, auxiliary columns and every lab column except `skip`, all
/// standardized
fn design_matrix(aux: &Array2<f64>, labs: &[Vec<f64>], skip: usize) -> Array2<f64> {
    let rows = aux.nrows();
    let others: Vec<&Vec<f64>> = labs
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != skip)
        .map(|(_, c)| c)
        .collect();

    let mut x = Array2::<f64>::ones((rows, 1 + aux.ncols() + others.len()));
    for (k, column) in aux.columns().into_iter().enumerate() {
        x.column_mut(1 + k).assign(&column);
    }
    for (k, column) in others.into_iter().enumerate() {
        let z = standardize(column);
        for (r, v) in z.into_iter().enumerate() {
            x[[r, 1 + aux.ncols() + k]] = v;
        }
    }
    x
}

fn standardize(values: &[f64]) -> Vec<f64> {
    let n = values.len().max(1) as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let sd = var.sqrt();
    if sd > 1e-12 {
        values.iter().map(|v| (v - mean) / sd).collect()
    } else {
        vec![0.0; values.len()]
    }
}

fn standardize_columns(matrix: &Array2<f64>) -> Array2<f64> {
    let mut out = matrix.clone();
    for mut column in out.columns_mut() {
        let z = standardize(&column.to_vec());
        for (cell, v) in column.iter_mut().zip(z) {
            *cell = v;
        }
    }
    out
}
