//! Prior utilization
//!
//! Trailing-window counts of earlier admissions of the same patient, and ICU
//! use during the admission.

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use chrono::{NaiveDateTime, TimeDelta};
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::events::chunked::fold_source;
use crate::error::Result;
use crate::filter::{AdmissionFilter, AndFilter, BatchFilter, NotNullFilter};
use crate::models::CohortAdmission;
use crate::source::EventSource;
use crate::utils::arrow::{int64_column, opt_i64, opt_str, utf8_column};
use crate::utils::time::{days_between, parse_timestamp};

/// Count, for every admission, the same patient's admissions starting in
/// `[t - lookback, t)`
///
/// Each patient's admission times are sorted once and both window edges are
/// found by binary search, so simultaneous admissions never count each other.
#[must_use]
pub fn prior_admission_counts(admissions: &[CohortAdmission], lookback_days: i64) -> FxHashMap<i64, u32> {
    let lookback = TimeDelta::days(lookback_days);
    let mut counts = FxHashMap::default();

    let by_patient = admissions.iter().into_group_map_by(|a| a.subject_id());
    for (_, stays) in by_patient {
        let mut times: Vec<NaiveDateTime> = stays.iter().map(|a| a.admission.admittime).collect();
        times.sort_unstable();

        for stay in stays {
            let t = stay.admission.admittime;
            let lower = times.partition_point(|x| *x < t - lookback);
            let upper = times.partition_point(|x| *x < t);
            counts.insert(stay.hadm_id(), u32::try_from(upper - lower).unwrap_or(u32::MAX));
        }
    }
    counts
}

/// ICU use during one admission
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IcuUse {
    /// Any ICU stay recorded
    pub had_icu_stay: bool,
    /// Summed ICU stay length in fractional days
    pub icu_los_days: f64,
}

/// ICU use per admission, with the stays that could not be used
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IcuUtilization {
    by_admission: FxHashMap<i64, IcuUse>,
    /// Stays with unparseable or reversed times
    pub invalid_stays: usize,
}

impl IcuUtilization {
    /// ICU use of an admission; none recorded means no ICU stay
    #[must_use]
    pub fn get(&self, hadm_id: i64) -> IcuUse {
        self.by_admission.get(&hadm_id).copied().unwrap_or_default()
    }

    /// Admissions with at least one ICU stay
    #[must_use]
    pub fn admissions(&self) -> usize {
        self.by_admission.len()
    }

    /// Summarize a filtered ICU stay residue
    pub fn from_residue(residue: &RecordBatch) -> Result<Self> {
        let hadm = int64_column(residue, "icustays", "hadm_id")?;
        let intime = utf8_column(residue, "icustays", "intime")?;
        let outtime = utf8_column(residue, "icustays", "outtime")?;

        let mut result = Self::default();
        for row in 0..residue.num_rows() {
            let Some(hadm_id) = opt_i64(hadm, row) else {
                continue;
            };
            let (Some(start), Some(end)) = (
                opt_str(intime, row).and_then(parse_timestamp),
                opt_str(outtime, row).and_then(parse_timestamp),
            ) else {
                result.invalid_stays += 1;
                continue;
            };

            let length = days_between(&start, &end);
            let entry = result.by_admission.entry(hadm_id).or_default();
            entry.had_icu_stay = true;
            if length >= 0.0 {
                entry.icu_los_days += length;
            } else {
                result.invalid_stays += 1;
            }
        }

        if result.invalid_stays > 0 {
            log::warn!("{} ICU stays had unusable times", result.invalid_stays);
        }
        Ok(result)
    }
}

/// Fold an ICU stay source down to the cohort and summarize it
pub fn icu_utilization(
    source: &dyn EventSource,
    cohort: &FxHashSet<i64>,
    show_progress: bool,
) -> Result<IcuUtilization> {
    let filters: Vec<Arc<dyn BatchFilter>> = vec![
        Arc::new(AdmissionFilter::new(cohort.clone())),
        Arc::new(NotNullFilter::new(&["intime", "outtime"])),
    ];
    let state = fold_source(source, &AndFilter::new(filters), None, show_progress)?;
    let residue = state.finish(&source.spec().arrow_schema())?;
    IcuUtilization::from_residue(&residue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Admission;
    use crate::schema::TableSpec;
    use crate::source::MemorySource;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    fn stay(subject_id: i64, hadm_id: i64, admit: &str) -> CohortAdmission {
        let admittime = parse_timestamp(admit).unwrap();
        CohortAdmission::new(
            Admission {
                subject_id,
                hadm_id,
                admittime,
                dischtime: admittime + TimeDelta::days(1),
                admission_type: "ELECTIVE".to_string(),
                insurance: None,
                marital_status: None,
                race: None,
                died_in_hospital: false,
            },
            None,
        )
    }

    #[test]
    fn trailing_year_window() {
        let cohort = vec![
            stay(1, 1, "2020-01-01"),
            stay(1, 2, "2020-04-10"),
            stay(1, 3, "2021-02-04"),
            stay(2, 4, "2020-01-01"),
        ];
        let counts = prior_admission_counts(&cohort, 365);
        assert_eq!(counts[&1], 0);
        assert_eq!(counts[&2], 1);
        assert_eq!(counts[&3], 1);
        assert_eq!(counts[&4], 0);
    }

    #[test]
    fn lower_edge_is_inclusive_and_simultaneous_excluded() {
        let cohort = vec![
            stay(1, 1, "2020-01-01"),
            stay(1, 2, "2020-12-31"),
            stay(1, 3, "2020-12-31"),
        ];
        let counts = prior_admission_counts(&cohort, 365);
        assert_eq!(counts[&2], 1);
        assert_eq!(counts[&3], 1);
    }

    #[test]
    fn icu_stays_sum_per_admission() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("hadm_id", DataType::Int64, true),
            Field::new("intime", DataType::Utf8, true),
            Field::new("outtime", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 1, 2, 9])),
                Arc::new(StringArray::from(vec![
                    "2020-01-01 00:00:00",
                    "2020-01-03 00:00:00",
                    "2020-01-02 00:00:00",
                    "2020-01-01 00:00:00",
                ])),
                Arc::new(StringArray::from(vec![
                    "2020-01-02 12:00:00",
                    "2020-01-03 12:00:00",
                    "2020-01-01 00:00:00",
                    "2020-01-02 00:00:00",
                ])),
            ],
        )
        .unwrap();
        let source = MemorySource::new(TableSpec::icustays(), vec![batch], 2);

        let icu = icu_utilization(&source, &[1, 2, 3].into_iter().collect(), false).unwrap();
        assert!(icu.get(1).had_icu_stay);
        assert!((icu.get(1).icu_los_days - 2.0).abs() < 1e-12);
        assert!(icu.get(2).had_icu_stay);
        assert_eq!(icu.get(2).icu_los_days, 0.0);
        assert_eq!(icu.get(3), IcuUse::default());
        assert_eq!(icu.invalid_stays, 1);
        assert_eq!(icu.admissions(), 2);
    }
}
