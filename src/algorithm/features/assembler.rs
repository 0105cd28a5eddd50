//! Joins every stage output onto the cohort

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::algorithm::events::{DiagnosisSummary, LabPanel, MedicationSummary};
use crate::algorithm::imputation::ImputationResult;
use crate::algorithm::outcome::Labels;
use crate::algorithm::report::StageReport;
use crate::algorithm::utilization::IcuUtilization;
use crate::error::{PipelineError, Result};
use crate::models::CohortAdmission;
use crate::rules::CompiledRules;
use crate::schema::features::{
    LABEL_COLUMN, RACE_INDICATORS, RACE_REFERENCE, prefixed, validate_prefix_group,
};

use super::encoding::{DemographicEncoder, RACE_FALLBACK, RACE_MISSING};
use super::frame::FeatureFrame;
use super::table::FeatureTable;

/// Outputs of the earlier stages, keyed by admission
#[derive(Debug, Clone, Copy)]
pub struct StageOutputs<'a> {
    /// Cohort rows; defines the row set and order
    pub cohort: &'a [CohortAdmission],
    pub labels: &'a Labels,
    pub labs: &'a LabPanel,
    pub medications: &'a MedicationSummary,
    pub diagnoses: &'a DiagnosisSummary,
    pub prior_admits: &'a FxHashMap<i64, u32>,
    pub icu: &'a IcuUtilization,
}

/// Builds the feature frame and the final feature table
#[derive(Debug, Clone, Copy)]
pub struct FeatureAssembler<'a> {
    rules: &'a CompiledRules,
}

impl<'a> FeatureAssembler<'a> {
    #[must_use]
    pub fn new(rules: &'a CompiledRules) -> Self {
        Self { rules }
    }

    /// Check that the rule tables produce exactly the schema's column groups
    pub fn validate_columns(&self, outputs: &StageOutputs<'_>) -> Result<()> {
        validate_prefix_group("lab_", &outputs.labs.column_names())?;
        validate_prefix_group("on_", &outputs.medications.column_names())?;
        validate_prefix_group("dx_", &outputs.diagnoses.column_names())?;
        validate_prefix_group("race_", &prefixed("race_", &RACE_INDICATORS))?;

        for group in self.rules.race.names() {
            let known = group == RACE_REFERENCE || RACE_INDICATORS.contains(&group.as_str());
            if !known {
                return Err(PipelineError::schema(
                    "features",
                    format!("race rule '{group}' has no indicator column"),
                ));
            }
        }
        Ok(())
    }

    /// Join the stage outputs onto the cohort
    ///
    /// Counts and flags are zero-filled for admissions without events; lab
    /// columns stay missing for imputation. A missing age is replaced by the
    /// cohort median and counted on `report`.
    pub fn assemble(&self, outputs: &StageOutputs<'_>, report: &mut StageReport) -> Result<FeatureFrame> {
        self.validate_columns(outputs)?;

        let cohort = outputs.cohort;
        let mut frame = FeatureFrame::new(
            cohort.iter().map(CohortAdmission::subject_id).collect(),
            cohort.iter().map(CohortAdmission::hadm_id).collect(),
            cohort
                .iter()
                .map(|a| outputs.labels.is_readmission(a.hadm_id()))
                .collect(),
        )?;
        let flag = |b: bool| f64::from(u8::from(b));

        let (ages, filled) = fill_missing_age(cohort)?;
        report.anomaly("ages filled with the cohort median", filled);
        frame.push_dense("age_at_admit", ages)?;

        let encoder = DemographicEncoder::new(self.rules);
        let encoded: Vec<_> = cohort.iter().map(|a| encoder.encode(a)).collect();
        frame.push_dense("female", encoded.iter().map(|e| flag(e.female)))?;
        frame.push_dense("los_days", cohort.iter().map(|a| a.los_days))?;
        frame.push_dense("emergency_admission", encoded.iter().map(|e| flag(e.emergency_admission)))?;
        frame.push_dense("insurance_medicare", encoded.iter().map(|e| flag(e.insurance_medicare)))?;
        frame.push_dense("insurance_medicaid", encoded.iter().map(|e| flag(e.insurance_medicaid)))?;
        frame.push_dense("married", encoded.iter().map(|e| flag(e.married)))?;
        for (k, group) in RACE_INDICATORS.iter().enumerate() {
            frame.push_dense(
                &format!("race_{group}"),
                encoded.iter().map(|e| flag(e.race_indicators()[k])),
            )?;
        }
        let unknown_race = encoded.iter().filter(|e| e.race_group == RACE_MISSING).count();
        let other_race = encoded.iter().filter(|e| e.race_group == RACE_FALLBACK).count();
        log::debug!("Race groups: {unknown_race} unknown, {other_race} other");

        frame.push_dense(
            "prior_admits_12m",
            cohort
                .iter()
                .map(|a| f64::from(outputs.prior_admits.get(&a.hadm_id()).copied().unwrap_or(0))),
        )?;
        let icu: Vec<_> = cohort.iter().map(|a| outputs.icu.get(a.hadm_id())).collect();
        frame.push_dense("had_icu_stay", icu.iter().map(|u| flag(u.had_icu_stay)))?;
        frame.push_dense("icu_los_days", icu.iter().map(|u| u.icu_los_days))?;

        let dx: Vec<_> = cohort.iter().map(|a| outputs.diagnoses.row(a.hadm_id())).collect();
        frame.push_dense("num_diagnoses", dx.iter().map(|d| d.num_diagnoses as f64))?;
        for (k, name) in outputs.diagnoses.column_names().iter().enumerate() {
            frame.push_dense(name, dx.iter().map(|d| flag(d.flags[k])))?;
        }

        let labs: Vec<_> = cohort.iter().map(|a| outputs.labs.row(a.hadm_id())).collect();
        for (k, name) in outputs.labs.column_names().iter().enumerate() {
            frame.push(name, labs.iter().map(|row| row[k]).collect())?;
        }

        let meds: Vec<_> = cohort.iter().map(|a| outputs.medications.row(a.hadm_id())).collect();
        frame.push_dense("n_medications", meds.iter().map(|m| m.n_medications as f64))?;
        for (k, name) in outputs.medications.column_names().iter().enumerate() {
            frame.push_dense(name, meds.iter().map(|m| flag(m.flags[k])))?;
        }

        // Available to the imputation models as an auxiliary predictor
        let label_values: Vec<f64> = frame.labels.iter().map(|l| flag(*l)).collect();
        frame.push_dense(LABEL_COLUMN, label_values)?;

        report.record("assembled admissions", cohort.len(), frame.len());
        Ok(frame)
    }

    /// Lab columns of `frame` and their fallback values, in rule order
    #[must_use]
    pub fn lab_columns(&self, frame: &FeatureFrame) -> (Vec<String>, Vec<Vec<Option<f64>>>, Vec<f64>) {
        let names: Vec<String> = self.rules.labs.iter().map(|l| format!("lab_{}", l.name)).collect();
        let values = names
            .iter()
            .map(|n| frame.column(n).map_or_else(|| vec![None; frame.len()], <[_]>::to_vec))
            .collect();
        let reference = self.rules.labs.iter().map(|l| l.reference_value).collect();
        (names, values, reference)
    }

    /// Substitute the imputed labs and the no-labs flag, then materialize
    /// the schema
    pub fn finalize(&self, mut frame: FeatureFrame, imputation: &ImputationResult) -> Result<FeatureTable> {
        for (name, values) in imputation.columns.iter().zip(&imputation.completed) {
            frame.replace(name, values.iter().copied().map(Some).collect())?;
        }
        frame.push_dense(
            "no_labs_flag",
            imputation.no_labs_flag.iter().map(|f| f64::from(u8::from(*f))),
        )?;
        FeatureTable::from_frame(&frame)
    }
}

/// Ages with gaps filled by the median of the known ages
fn fill_missing_age(cohort: &[CohortAdmission]) -> Result<(Vec<f64>, usize)> {
    let mut known: Vec<f64> = cohort.iter().filter_map(|a| a.age_at_admit).collect();
    let missing = cohort.len() - known.len();
    if missing == 0 {
        return Ok((known, 0));
    }
    if known.is_empty() {
        return Err(PipelineError::Validation(
            "no admission has a known age to fill missing ages from".to_string(),
        ));
    }

    known.sort_by(f64::total_cmp);
    let mid = known.len() / 2;
    let median = if known.len() % 2 == 0 {
        (known[mid - 1] + known[mid]) / 2.0
    } else {
        known[mid]
    };
    let ages = cohort.iter().map(|a| a.age_at_admit.unwrap_or(median)).collect();
    Ok((ages, missing))
}

/// Pre-imputation event and utilization columns for the events artifact
pub fn events_record_batch(frame: &FeatureFrame) -> Result<RecordBatch> {
    let mut names: Vec<&str> = frame
        .column_names()
        .filter(|n| n.starts_with("lab_"))
        .collect();
    names.push("n_medications");
    names.extend(frame.column_names().filter(|n| n.starts_with("on_")));
    names.push("num_diagnoses");
    names.extend(frame.column_names().filter(|n| n.starts_with("dx_")));
    names.extend(["prior_admits_12m", "had_icu_stay", "icu_los_days"]);

    let mut fields = vec![Field::new("hadm_id", DataType::Int64, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from(frame.hadm_ids.clone()))];
    for name in names {
        let values = frame
            .column(name)
            .ok_or_else(|| PipelineError::Validation(format!("feature frame lacks column {name}")))?;
        fields.push(Field::new(name, DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(values.to_vec())));
    }
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
