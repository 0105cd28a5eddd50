//! Event aggregation
//!
//! Large long-format event tables (labs, prescriptions, diagnoses) are
//! folded chunk by chunk down to cohort rows, then reduced to one row of
//! features per admission.

pub mod checkpoint;
pub mod chunked;
pub mod diagnoses;
pub mod labs;
pub mod medications;

use std::path::Path;

use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::algorithm::report::StageReport;
use crate::config::EventConfig;
use crate::error::Result;
use crate::filter::BatchFilter;
use crate::rules::CompiledRules;
use crate::source::EventSource;

pub use checkpoint::{Checkpoint, fold_resumable};
pub use chunked::{FoldState, fold_source};
pub use diagnoses::{DiagnosisRow, DiagnosisSummary, diagnosis_filter, summarize_diagnoses};
pub use labs::{LabItemMap, LabPanel, lab_filter, reduce_last_values, resolve_lab_items};
pub use medications::{MedicationRow, MedicationSummary, medication_filter, summarize_medications};

/// Per-admission event features
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFeatures {
    /// Last lab values
    pub labs: LabPanel,
    /// Prescription count and class flags
    pub medications: MedicationSummary,
    /// Diagnosis count and category flags
    pub diagnoses: DiagnosisSummary,
}

/// Runs the event folds for one cohort
#[derive(Debug)]
pub struct EventAggregator<'a> {
    config: &'a EventConfig,
    rules: &'a CompiledRules,
    icd_version: i64,
    checkpoint: Option<Checkpoint>,
}

impl<'a> EventAggregator<'a> {
    /// Create an aggregator; folds checkpoint into `config.checkpoint_dir`
    /// when it is set
    #[must_use]
    pub fn new(config: &'a EventConfig, rules: &'a CompiledRules, icd_version: i64) -> Self {
        Self {
            config,
            rules,
            icd_version,
            checkpoint: config.checkpoint_dir.as_deref().map(Checkpoint::new),
        }
    }

    /// Checkpoint directory in use, if any
    #[must_use]
    pub fn checkpoint_dir(&self) -> Option<&Path> {
        self.config.checkpoint_dir.as_deref()
    }

    fn fold(
        &self,
        source: &dyn EventSource,
        filter: &dyn BatchFilter,
        report: &mut StageReport,
    ) -> Result<RecordBatch> {
        let state = fold_resumable(
            source,
            filter,
            self.checkpoint.as_ref(),
            self.config.chunk_size,
            self.config.show_progress,
        )?;
        report.record(&format!("{} fold", source.name()), state.rows_in, state.rows_kept);
        state.finish(&source.spec().arrow_schema())
    }

    /// Fold lab results and reduce them to the last value per category
    pub fn labs(
        &self,
        source: &dyn EventSource,
        cohort: &FxHashSet<i64>,
        items: &LabItemMap,
        report: &mut StageReport,
    ) -> Result<(LabPanel, RecordBatch)> {
        let names = self.rules.labs.iter().map(|l| l.name.clone()).collect();
        let residue = self.fold(source, &lab_filter(cohort, items), report)?;
        let panel = reduce_last_values(&residue, items, names)?;
        report.anomaly("lab rows with unparseable chart time", panel.unparseable_times);
        report.record("admissions with labs", cohort.len(), panel.measured_admissions());
        Ok((panel, residue))
    }

    /// Fold prescriptions and summarize them per admission
    pub fn medications(
        &self,
        source: &dyn EventSource,
        cohort: &FxHashSet<i64>,
        report: &mut StageReport,
    ) -> Result<(MedicationSummary, RecordBatch)> {
        let residue = self.fold(source, &medication_filter(cohort), report)?;
        let summary = summarize_medications(&residue, &self.rules.medications)?;
        report.record("admissions with prescriptions", cohort.len(), summary.admissions());
        Ok((summary, residue))
    }

    /// Fold the diagnosis codes of the given admissions
    ///
    /// One pass serves both cohort selection and the diagnosis features.
    pub fn diagnosis_codes(
        &self,
        source: &dyn EventSource,
        admissions: &FxHashSet<i64>,
        report: &mut StageReport,
    ) -> Result<RecordBatch> {
        self.fold(source, &diagnosis_filter(admissions), report)
    }

    /// Summarize folded diagnosis codes for the cohort admissions
    pub fn diagnoses(&self, codes: &RecordBatch, cohort: &FxHashSet<i64>) -> Result<DiagnosisSummary> {
        let residue = diagnosis_filter(cohort).filter(codes)?;
        summarize_diagnoses(&residue, &self.rules.diagnoses, self.icd_version)
    }
}
