//! Stage orchestration
//!
//! Runs the stages strictly forward and writes an artifact at every stage
//! boundary. The small reference tables are loaded concurrently on the
//! blocking pool; everything after that runs on one thread over owned data.

use std::path::{Path, PathBuf};
use std::time::Instant;

use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::algorithm::cohort::{Cohort, CohortBuilder, qualifying_admissions};
use crate::algorithm::events::{EventAggregator, EventFeatures};
use crate::algorithm::events::labs::resolve_lab_items;
use crate::algorithm::features::{FeatureAssembler, FeatureTable, StageOutputs, events_record_batch};
use crate::algorithm::imputation::{ImputationResult, MiceImputer};
use crate::algorithm::model::{ModelReport, train_and_explain};
use crate::algorithm::outcome::{Labels, label_readmissions, labeled_record_batch};
use crate::algorithm::report::StageReport;
use crate::algorithm::utilization::{IcuUtilization, icu_utilization, prior_admission_counts};
use crate::config::PipelineConfig;
use crate::error::util::validate_directory;
use crate::error::{PipelineError, Result};
use crate::models::{Admission, CohortAdmission, Patient};
use crate::rules::CompiledRules;
use crate::schema::{FEATURE_SCHEMA_VERSION, TableSpec};
use crate::source::{EventSource, open_file, read_table};
use crate::utils::io::{write_csv, write_parquet};
use crate::utils::logging::{create_spinner, finish_progress_bar, log_warning};

/// File names of the stage artifacts
pub mod artifacts {
    pub const COHORT: &str = "cohort.csv";
    pub const LABELED: &str = "labeled.csv";
    pub const EVENTS: &str = "events.csv";
    pub const FEATURES: &str = "features.csv";
    pub const LAB_EXTRACT: &str = "labevents_extract.parquet";
    pub const PRESCRIPTION_EXTRACT: &str = "prescriptions_extract.parquet";
    pub const SCORES: &str = "scores.csv";
    pub const SUMMARY: &str = "summary.json";
}

/// Reference tables read whole before the stages run
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub admissions: Vec<RecordBatch>,
    pub patients: Vec<RecordBatch>,
    pub lab_items: Vec<RecordBatch>,
}

impl ReferenceTables {
    /// Load admissions, patients and the lab dictionary concurrently
    pub async fn load(config: &PipelineConfig) -> Result<Self> {
        let start = Instant::now();
        let chunk_size = config.events.chunk_size;
        let spawn = |path: PathBuf, spec: TableSpec| {
            tokio::task::spawn_blocking(move || read_table(&path, spec, chunk_size))
        };

        let (admissions, patients, lab_items) = tokio::try_join!(
            spawn(config.input.admissions.clone(), TableSpec::admissions()),
            spawn(config.input.patients.clone(), TableSpec::patients()),
            spawn(config.input.lab_items.clone(), TableSpec::lab_items()),
        )?;

        let tables = Self {
            admissions: admissions?,
            patients: patients?,
            lab_items: lab_items?,
        };
        log::info!("Loaded reference tables in {:?}", start.elapsed());
        Ok(tables)
    }
}

/// Streamed event tables
#[derive(Debug)]
pub struct EventSources {
    pub diagnoses: Box<dyn EventSource>,
    pub labevents: Box<dyn EventSource>,
    pub prescriptions: Box<dyn EventSource>,
    pub icustays: Option<Box<dyn EventSource>>,
    /// Lab rows come from a prefiltered extract
    pub lab_extract_in_use: bool,
    /// Prescription rows come from a prefiltered extract
    pub prescription_extract_in_use: bool,
}

impl EventSources {
    /// Open the configured files; an existing extract replaces its raw table
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        let input = &config.input;
        let chunk_size = config.events.chunk_size;
        let existing = |p: &Option<PathBuf>| {
            let path = p.as_ref()?;
            if path.exists() {
                Some(path.clone())
            } else {
                log_warning("Configured extract not found, reading the raw table", Some(path));
                None
            }
        };

        let lab_extract = existing(&input.lab_extract);
        let prescription_extract = existing(&input.prescription_extract);
        if let Some(path) = &lab_extract {
            log::info!("Using lab extract {} instead of {}", path.display(), input.labevents.display());
        }
        if let Some(path) = &prescription_extract {
            log::info!(
                "Using prescription extract {} instead of {}",
                path.display(),
                input.prescriptions.display()
            );
        }

        Self {
            diagnoses: open_file(&input.diagnoses, TableSpec::diagnoses(), chunk_size),
            labevents: open_file(
                lab_extract.as_deref().unwrap_or(input.labevents.as_path()),
                TableSpec::labevents(),
                chunk_size,
            ),
            prescriptions: open_file(
                prescription_extract.as_deref().unwrap_or(input.prescriptions.as_path()),
                TableSpec::prescriptions(),
                chunk_size,
            ),
            icustays: input
                .icustays
                .as_deref()
                .map(|path| open_file(path, TableSpec::icustays(), chunk_size)),
            lab_extract_in_use: lab_extract.is_some(),
            prescription_extract_in_use: prescription_extract.is_some(),
        }
    }
}

/// Imputation facts kept in the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputationSummary {
    pub n_imputations: usize,
    pub selected: usize,
    pub ensemble_retained: bool,
    /// Missing cells per lab column before imputation
    pub missing_before: Vec<(String, usize)>,
    pub reference_filled: Vec<String>,
    pub admissions_without_labs: usize,
}

/// Machine-readable account of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub feature_schema_version: u32,
    pub cohort_size: usize,
    pub readmissions: usize,
    pub stages: Vec<StageReport>,
    pub imputation: ImputationSummary,
    pub model: Option<ModelReport>,
    pub artifacts: Vec<PathBuf>,
    pub elapsed_seconds: f64,
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub cohort: Cohort,
    pub labels: Labels,
    pub events: EventFeatures,
    pub imputation: ImputationResult,
    pub features: FeatureTable,
    pub summary: RunSummary,
}

/// The readmission feature pipeline
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    rules: CompiledRules,
}

impl Pipeline {
    /// Validate the configuration and compile the rule tables
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.rules.compile()?;
        Ok(Self { config, rules })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load the configured files and run every stage
    pub async fn run(&self) -> Result<PipelineOutput> {
        let tables = ReferenceTables::load(&self.config).await?;
        let sources = EventSources::from_config(&self.config);
        self.run_with(&tables, &sources)
    }

    fn artifact(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    fn write(&self, name: &str, batch: &RecordBatch, written: &mut Vec<PathBuf>) -> Result<()> {
        let path = self.artifact(name);
        write_csv(&path, std::slice::from_ref(batch))?;
        written.push(path);
        Ok(())
    }

    /// Run every stage over already opened inputs
    pub fn run_with(&self, tables: &ReferenceTables, sources: &EventSources) -> Result<PipelineOutput> {
        let start = Instant::now();
        let config = &self.config;
        validate_directory(&config.output_dir, true)?;
        if let Some(dir) = &config.events.checkpoint_dir {
            validate_directory(dir, true)?;
        }
        let mut written = Vec::new();
        let show_progress = config.events.show_progress;

        // Cohort
        let (admissions, quality) = Admission::from_batches(&tables.admissions)?;
        let (patients, skipped) = Patient::index_batches(&tables.patients)?;
        let aggregator = EventAggregator::new(&config.events, &self.rules, config.cohort.icd_version);
        let mut event_report = StageReport::new("events");
        let known: FxHashSet<i64> = admissions.iter().map(|a| a.hadm_id).collect();
        let diagnosis_codes = aggregator.diagnosis_codes(sources.diagnoses.as_ref(), &known, &mut event_report)?;
        let qualifying = qualifying_admissions(&diagnosis_codes, config.cohort.icd_version, &self.rules.qualifying)?;
        let mut cohort = CohortBuilder::new(&config.cohort).build(admissions, quality, &patients, &qualifying);
        cohort.report.anomaly("patient rows without id or anchor", skipped);
        if cohort.is_empty() {
            log::warn!("No admission qualified for the cohort");
        }
        self.write(
            artifacts::COHORT,
            &CohortAdmission::to_record_batch(&cohort.admissions)?,
            &mut written,
        )?;

        // Labels
        let mut outcome_report = StageReport::new("outcome");
        let labels = label_readmissions(&cohort.admissions, config.outcome.window_days);
        outcome_report.record("labelled admissions", cohort.len(), labels.len());
        outcome_report.record("readmissions", labels.len(), labels.positives());
        outcome_report.anomaly("next admissions before discharge", labels.negative_gaps);
        self.write(
            artifacts::LABELED,
            &labeled_record_batch(&cohort.admissions, &labels)?,
            &mut written,
        )?;

        // Events
        let hadm_ids = cohort.hadm_ids();
        let items = resolve_lab_items(&tables.lab_items, &self.rules.labs, config.events.blood_labs_only)?;
        event_report.record("lab items resolved", tables.lab_items.iter().map(RecordBatch::num_rows).sum(), items.len());

        let (labs, lab_residue) = aggregator.labs(sources.labevents.as_ref(), &hadm_ids, &items, &mut event_report)?;
        let (medications, prescription_residue) =
            aggregator.medications(sources.prescriptions.as_ref(), &hadm_ids, &mut event_report)?;
        let diagnoses = aggregator.diagnoses(&diagnosis_codes, &hadm_ids)?;

        if config.events.write_extracts {
            let extracts = [
                (
                    artifacts::LAB_EXTRACT,
                    &lab_residue,
                    sources.lab_extract_in_use,
                ),
                (
                    artifacts::PRESCRIPTION_EXTRACT,
                    &prescription_residue,
                    sources.prescription_extract_in_use,
                ),
            ];
            for (name, residue, in_use) in extracts {
                if in_use {
                    continue;
                }
                let path = self.artifact(name);
                write_parquet(&path, residue.schema(), std::slice::from_ref(residue))?;
                written.push(path);
            }
        }

        // Utilization
        let mut utilization_report = StageReport::new("utilization");
        let prior_admits = prior_admission_counts(&cohort.admissions, config.utilization.lookback_days);
        let icu = match &sources.icustays {
            Some(source) => icu_utilization(source.as_ref(), &hadm_ids, show_progress)?,
            None => {
                log::info!("No ICU stay table configured; ICU features are zero");
                IcuUtilization::default()
            }
        };
        utilization_report.record("admissions with ICU stays", cohort.len(), icu.admissions());
        utilization_report.anomaly("ICU stays with unusable times", icu.invalid_stays);

        // Assembly
        let mut feature_report = StageReport::new("features");
        let assembler = FeatureAssembler::new(&self.rules);
        let outputs = StageOutputs {
            cohort: &cohort.admissions,
            labels: &labels,
            labs: &labs,
            medications: &medications,
            diagnoses: &diagnoses,
            prior_admits: &prior_admits,
            icu: &icu,
        };
        let frame = assembler.assemble(&outputs, &mut feature_report)?;
        self.write(artifacts::EVENTS, &events_record_batch(&frame)?, &mut written)?;

        // Imputation
        let auxiliary = frame.dense(&config.imputation.auxiliary_columns)?;
        let (names, values, reference) = assembler.lab_columns(&frame);
        let spinner = create_spinner(Some("Imputing lab values"), show_progress);
        let imputation = MiceImputer::new(&config.imputation).impute(&values, &names, &reference, &auxiliary)?;
        finish_progress_bar(&spinner, Some("imputation done"));
        feature_report.record(
            "lab cells imputed",
            names.len() * frame.len(),
            imputation.total_missing(),
        );

        let features = assembler.finalize(frame, &imputation)?;
        if features.len() != cohort.len() {
            return Err(PipelineError::Validation(format!(
                "feature table has {} rows for {} cohort admissions",
                features.len(),
                cohort.len()
            )));
        }
        self.write(artifacts::FEATURES, features.batch(), &mut written)?;

        // Downstream model
        let model = if config.model.enabled {
            self.evaluate(&features, &mut written)?
        } else {
            None
        };

        let summary = RunSummary {
            feature_schema_version: FEATURE_SCHEMA_VERSION,
            cohort_size: cohort.len(),
            readmissions: labels.positives(),
            stages: vec![
                cohort.report.clone(),
                outcome_report,
                event_report,
                utilization_report,
                feature_report,
            ],
            imputation: ImputationSummary {
                n_imputations: config.imputation.n_imputations,
                selected: imputation.selected,
                ensemble_retained: !imputation.ensemble.is_empty(),
                missing_before: names.into_iter().zip(imputation.missing_before.iter().copied()).collect(),
                reference_filled: imputation.reference_filled.clone(),
                admissions_without_labs: imputation.no_labs_flag.iter().filter(|f| **f).count(),
            },
            model,
            artifacts: written,
            elapsed_seconds: start.elapsed().as_secs_f64(),
        };
        write_summary(&self.artifact(artifacts::SUMMARY), &summary)?;

        log::info!(
            "Pipeline finished: {} admissions, {} readmissions, {:.1}s",
            summary.cohort_size,
            summary.readmissions,
            summary.elapsed_seconds
        );

        Ok(PipelineOutput {
            cohort,
            labels,
            events: EventFeatures {
                labs,
                medications,
                diagnoses,
            },
            imputation,
            features,
            summary,
        })
    }

    /// Cross-validate and explain the baseline model when the table allows it
    fn evaluate(&self, features: &FeatureTable, written: &mut Vec<PathBuf>) -> Result<Option<ModelReport>> {
        let labels = features.labels()?;
        let positives = labels.iter().filter(|l| **l).count();
        let folds = self.config.model.folds;
        if positives < folds || labels.len() - positives < folds {
            log::warn!(
                "Skipping the baseline model: {positives} readmissions among {} admissions is too few for {folds} folds",
                labels.len()
            );
            return Ok(None);
        }

        let (report, scores) = train_and_explain(features, &self.config.model)?;
        self.write(artifacts::SCORES, &scores, written)?;
        Ok(Some(report))
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let file = crate::error::util::safe_create_file(path, "run summary")?;
    serde_json::to_writer_pretty(file, summary)?;
    Ok(())
}
