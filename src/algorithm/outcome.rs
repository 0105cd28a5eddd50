//! Readmission labels
//!
//! Per patient, admissions are ordered by `(admittime, hadm_id)`. An
//! admission is a readmission case when the patient's next admission starts
//! within the window after its discharge.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::TimeDelta;
use itertools::Itertools;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::models::CohortAdmission;
use crate::utils::time::days_between;

/// Label of one admission
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeLabel {
    /// Next admission began within the window after discharge
    pub readmit_30d: bool,
    /// Days from discharge to the next admission; missing without one
    pub days_to_next_admission: Option<f64>,
}

/// Labels for a cohort
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Labels {
    by_admission: FxHashMap<i64, OutcomeLabel>,
    /// Next admissions starting before the previous discharge
    pub negative_gaps: usize,
}

impl Labels {
    /// Label of an admission
    #[must_use]
    pub fn get(&self, hadm_id: i64) -> Option<OutcomeLabel> {
        self.by_admission.get(&hadm_id).copied()
    }

    /// Whether an admission is a readmission case; unknown ids are not
    #[must_use]
    pub fn is_readmission(&self, hadm_id: i64) -> bool {
        self.get(hadm_id).is_some_and(|l| l.readmit_30d)
    }

    /// Number of positive labels
    #[must_use]
    pub fn positives(&self) -> usize {
        self.by_admission.values().filter(|l| l.readmit_30d).count()
    }

    /// Number of labelled admissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_admission.len()
    }

    /// Whether nothing was labelled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_admission.is_empty()
    }
}

/// Label every admission of the cohort
///
/// The result does not depend on the order of `admissions`. A gap of
/// exactly `window_days` is a readmission; negative gaps (overlapping
/// stays) are labelled 0 and counted.
#[must_use]
pub fn label_readmissions(admissions: &[CohortAdmission], window_days: i64) -> Labels {
    let window = TimeDelta::days(window_days);
    let mut labels = Labels::default();

    let by_patient = admissions.iter().into_group_map_by(|a| a.subject_id());
    for (_, mut stays) in by_patient {
        stays.sort_by_key(|a| (a.admission.admittime, a.hadm_id()));

        for (index, stay) in stays.iter().enumerate() {
            let label = match stays.get(index + 1) {
                Some(next) => {
                    let gap = next.admission.admittime - stay.admission.dischtime;
                    if gap < TimeDelta::zero() {
                        labels.negative_gaps += 1;
                    }
                    OutcomeLabel {
                        readmit_30d: gap >= TimeDelta::zero() && gap <= window,
                        days_to_next_admission: Some(days_between(
                            &stay.admission.dischtime,
                            &next.admission.admittime,
                        )),
                    }
                }
                None => OutcomeLabel {
                    readmit_30d: false,
                    days_to_next_admission: None,
                },
            };
            labels.by_admission.insert(stay.hadm_id(), label);
        }
    }

    if labels.negative_gaps > 0 {
        log::warn!(
            "{} admissions overlap the previous stay of the same patient",
            labels.negative_gaps
        );
    }
    log::info!(
        "Labelled {} admissions, {} readmissions within {window_days} days",
        labels.len(),
        labels.positives()
    );
    labels
}

/// Cohort artifact with the label columns appended
pub fn labeled_record_batch(cohort: &[CohortAdmission], labels: &Labels) -> Result<RecordBatch> {
    let base = CohortAdmission::to_record_batch(cohort)?;

    let mut fields: Vec<Field> = base.schema().fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new("readmit_30d", DataType::Int64, false));
    fields.push(Field::new("days_to_next_admission", DataType::Float64, true));

    let mut columns: Vec<ArrayRef> = base.columns().to_vec();
    columns.push(Arc::new(Int64Array::from(
        cohort
            .iter()
            .map(|a| i64::from(labels.is_readmission(a.hadm_id())))
            .collect::<Vec<_>>(),
    )));
    columns.push(Arc::new(
        cohort
            .iter()
            .map(|a| labels.get(a.hadm_id()).and_then(|l| l.days_to_next_admission))
            .collect::<Float64Array>(),
    ));

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
