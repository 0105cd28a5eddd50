//! Configuration for the readmission pipeline.
//!
//! Every section has defaults so a configuration file only needs to name
//! the input tables. Values can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::util::safe_open_file;
use crate::error::{PipelineError, Result};
use crate::rules::RuleTables;

/// Default number of rows per chunk when streaming event tables
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Environment variable overriding the chunk size
pub const ENV_CHUNK_SIZE: &str = "READMIT_CHUNK_SIZE";
/// Environment variable overriding the output directory
pub const ENV_OUTPUT_DIR: &str = "READMIT_OUTPUT_DIR";
/// Environment variable overriding the imputation seed
pub const ENV_SEED: &str = "READMIT_SEED";

/// Locations of the raw tables and optional prefiltered extracts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    /// Admission records
    pub admissions: PathBuf,
    /// Patient records
    pub patients: PathBuf,
    /// Diagnosis codes per admission
    pub diagnoses: PathBuf,
    /// Laboratory item dictionary
    pub lab_items: PathBuf,
    /// Laboratory results
    pub labevents: PathBuf,
    /// Prescriptions
    pub prescriptions: PathBuf,
    /// ICU stays (optional)
    pub icustays: Option<PathBuf>,
    /// Prefiltered lab extract used instead of `labevents` when present
    pub lab_extract: Option<PathBuf>,
    /// Prefiltered prescription extract used instead of `prescriptions` when present
    pub prescription_extract: Option<PathBuf>,
}

/// What to do with admissions whose patient record is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPatientPolicy {
    /// Pass the admission through with missing demographics
    #[default]
    Keep,
    /// Drop the admission
    Exclude,
}

/// Cohort eligibility settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohortConfig {
    /// ICD version of the qualifying diagnosis codes
    pub icd_version: i64,
    /// Minimum age at admission (inclusive)
    pub min_age: i64,
    /// Whether admissions ending in death are excluded
    pub exclude_in_hospital_death: bool,
    /// Handling of admissions without a patient record
    pub missing_patient_policy: MissingPatientPolicy,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            icd_version: 10,
            min_age: 18,
            exclude_in_hospital_death: true,
            missing_patient_policy: MissingPatientPolicy::Keep,
        }
    }
}

/// Readmission label settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutcomeConfig {
    /// Maximum gap between discharge and the next admission, in days
    pub window_days: i64,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

/// Prior-utilization settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilizationConfig {
    /// Length of the trailing window for prior admissions, in days
    pub lookback_days: i64,
}

impl Default for UtilizationConfig {
    fn default() -> Self {
        Self { lookback_days: 365 }
    }
}

/// Chunked event aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Rows per chunk
    pub chunk_size: usize,
    /// Write the filtered residues as reusable Parquet extracts
    pub write_extracts: bool,
    /// Directory for fold checkpoints written when a chunk fails
    pub checkpoint_dir: Option<PathBuf>,
    /// Restrict lab items to blood specimens when the dictionary has a fluid column
    pub blood_labs_only: bool,
    /// Show progress spinners while streaming
    pub show_progress: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            write_extracts: true,
            checkpoint_dir: None,
            blood_labs_only: true,
            show_progress: true,
        }
    }
}

/// Chained-equation imputation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationConfig {
    /// Number of independently completed datasets
    pub n_imputations: usize,
    /// Passes over the lab columns per completed dataset
    pub max_iterations: usize,
    /// Candidate donors for predictive mean matching
    pub donors: usize,
    /// Base random seed
    pub seed: u64,
    /// Ensemble member that replaces the lab columns
    pub selected_imputation: usize,
    /// Keep every ensemble member on the result
    pub retain_ensemble: bool,
    /// Fully observed columns used as predictors
    pub auxiliary_columns: Vec<String>,
    /// Ridge penalty stabilizing the regression fits
    pub ridge: f64,
}

impl Default for ImputationConfig {
    fn default() -> Self {
        Self {
            n_imputations: 5,
            max_iterations: 5,
            donors: 5,
            seed: 2025,
            selected_imputation: 0,
            retain_ensemble: false,
            auxiliary_columns: [
                "age_at_admit",
                "los_days",
                "prior_admits_12m",
                "num_diagnoses",
                "n_medications",
                "emergency_admission",
                "dx_cerebral_infarction",
                "dx_ich",
                "dx_epilepsy",
                "dx_diabetes",
                "dx_chf",
                "dx_ckd",
                "on_anticoagulant",
                "on_insulin",
                "readmit_30d",
            ]
            .iter()
            .map(|c| (*c).to_string())
            .collect(),
            ridge: 1e-4,
        }
    }
}

/// Baseline model evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Whether to train and explain the baseline model
    pub enabled: bool,
    /// Number of cross-validation folds
    pub folds: usize,
    /// Overall penalty strength
    pub alpha: f64,
    /// Share of the penalty that is L1
    pub l1_ratio: f64,
    /// Gradient steps per fit
    pub max_iterations: usize,
    /// Convergence tolerance on the coefficient change
    pub tolerance: f64,
    /// Seed for fold assignment
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            folds: 5,
            alpha: 0.01,
            l1_ratio: 0.5,
            max_iterations: 2_000,
            tolerance: 1e-6,
            seed: 2025,
        }
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw input tables
    pub input: InputPaths,
    /// Directory receiving stage artifacts
    pub output_dir: PathBuf,
    /// Cohort eligibility
    pub cohort: CohortConfig,
    /// Readmission label
    pub outcome: OutcomeConfig,
    /// Prior utilization
    pub utilization: UtilizationConfig,
    /// Event aggregation
    pub events: EventConfig,
    /// Imputation
    pub imputation: ImputationConfig,
    /// Baseline model
    pub model: ModelConfig,
    /// Rule tables
    pub rules: RuleTables,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: InputPaths::default(),
            output_dir: PathBuf::from("output"),
            cohort: CohortConfig::default(),
            outcome: OutcomeConfig::default(),
            utilization: UtilizationConfig::default(),
            events: EventConfig::default(),
            imputation: ImputationConfig::default(),
            model: ModelConfig::default(),
            rules: RuleTables::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file
    ///
    /// Relative input paths are resolved against the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = safe_open_file(path, "pipeline configuration")?;
        let mut config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let file = crate::error::util::safe_create_file(path, "pipeline configuration")?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Resolve relative paths against `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };

        let input = &mut self.input;
        resolve(&mut input.admissions);
        resolve(&mut input.patients);
        resolve(&mut input.diagnoses);
        resolve(&mut input.lab_items);
        resolve(&mut input.labevents);
        resolve(&mut input.prescriptions);
        for optional in [
            &mut input.icustays,
            &mut input.lab_extract,
            &mut input.prescription_extract,
        ] {
            if let Some(p) = optional.as_mut() {
                resolve(p);
            }
        }
        resolve(&mut self.output_dir);
        if let Some(p) = self.events.checkpoint_dir.as_mut() {
            resolve(p);
        }
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CHUNK_SIZE) {
            self.events.chunk_size = value.trim().parse().map_err(|_| {
                PipelineError::Config(format!("{ENV_CHUNK_SIZE} must be a positive integer, got '{value}'"))
            })?;
        }
        if let Some(value) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(value) = lookup(ENV_SEED) {
            let seed: u64 = value.trim().parse().map_err(|_| {
                PipelineError::Config(format!("{ENV_SEED} must be an integer, got '{value}'"))
            })?;
            self.imputation.seed = seed;
            self.model.seed = seed;
        }
        Ok(())
    }

    /// Check values that would make a stage meaningless
    pub fn validate(&self) -> Result<()> {
        if self.events.chunk_size == 0 {
            return Err(PipelineError::Config("chunk_size must be > 0".to_string()));
        }
        if self.outcome.window_days < 0 {
            return Err(PipelineError::Config("window_days must be >= 0".to_string()));
        }
        if self.utilization.lookback_days <= 0 {
            return Err(PipelineError::Config("lookback_days must be > 0".to_string()));
        }
        if self.imputation.n_imputations == 0 {
            return Err(PipelineError::Config("n_imputations must be > 0".to_string()));
        }
        if self.imputation.selected_imputation >= self.imputation.n_imputations {
            return Err(PipelineError::Config(format!(
                "selected_imputation ({}) must be < n_imputations ({})",
                self.imputation.selected_imputation, self.imputation.n_imputations
            )));
        }
        if self.imputation.donors == 0 {
            return Err(PipelineError::Config("donors must be > 0".to_string()));
        }
        if self.model.enabled && self.model.folds < 2 {
            return Err(PipelineError::Config("folds must be >= 2".to_string()));
        }
        if !(0.0..=1.0).contains(&self.model.l1_ratio) {
            return Err(PipelineError::Config("l1_ratio must be within [0, 1]".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Admissions: {}", self.input.admissions.display())?;
        writeln!(f, "  Lab Events: {}", self.input.labevents.display())?;
        if let Some(extract) = &self.input.lab_extract {
            writeln!(f, "  Lab Extract: {}", extract.display())?;
        }
        writeln!(f, "  Prescriptions: {}", self.input.prescriptions.display())?;
        if let Some(extract) = &self.input.prescription_extract {
            writeln!(f, "  Prescription Extract: {}", extract.display())?;
        }
        writeln!(f, "  Output Directory: {}", self.output_dir.display())?;
        writeln!(f, "  ICD Version: {}", self.cohort.icd_version)?;
        writeln!(f, "  Minimum Age: {}", self.cohort.min_age)?;
        writeln!(f, "  Missing Patients: {:?}", self.cohort.missing_patient_policy)?;
        writeln!(f, "  Readmission Window: {} days", self.outcome.window_days)?;
        writeln!(f, "  Prior Admission Lookback: {} days", self.utilization.lookback_days)?;
        writeln!(f, "  Chunk Size: {}", self.events.chunk_size)?;
        writeln!(
            f,
            "  Imputations: {} x {} passes (seed {}, selected #{})",
            self.imputation.n_imputations,
            self.imputation.max_iterations,
            self.imputation.seed,
            self.imputation.selected_imputation
        )?;
        if self.model.enabled {
            writeln!(f, "  Model: elastic net, {} folds", self.model.folds)?;
        }
        Ok(())
    }
}
