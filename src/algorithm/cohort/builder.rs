//! Cohort builder implementation

use rustc_hash::{FxHashMap, FxHashSet};

use crate::algorithm::report::StageReport;
use crate::config::{CohortConfig, MissingPatientPolicy};
use crate::models::{Admission, AdmissionQuality, CohortAdmission, Patient};

/// Eligible admissions with their construction report
#[derive(Debug, Clone)]
pub struct Cohort {
    /// Admissions ordered by patient, admission time and id
    pub admissions: Vec<CohortAdmission>,
    /// Row counts per filtering step
    pub report: StageReport,
}

impl Cohort {
    /// Number of admissions
    #[must_use]
    pub fn len(&self) -> usize {
        self.admissions.len()
    }

    /// Whether no admission qualified
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admissions.is_empty()
    }

    /// Admission identifiers
    #[must_use]
    pub fn hadm_ids(&self) -> FxHashSet<i64> {
        self.admissions.iter().map(CohortAdmission::hadm_id).collect()
    }

    /// Admissions lacking a patient record
    #[must_use]
    pub fn missing_patients(&self) -> usize {
        self.admissions.iter().filter(|a| a.patient.is_none()).count()
    }
}

/// Applies the eligibility rules to admissions
#[derive(Debug, Clone)]
pub struct CohortBuilder<'a> {
    config: &'a CohortConfig,
}

impl<'a> CohortBuilder<'a> {
    /// Create a builder for `config`
    #[must_use]
    pub fn new(config: &'a CohortConfig) -> Self {
        Self { config }
    }

    /// Build the cohort
    ///
    /// # Arguments
    /// * `admissions` - Valid admissions (invariant violations already dropped)
    /// * `quality` - Counts of the rows dropped while reading admissions
    /// * `patients` - Patient records by subject
    /// * `qualifying` - Admissions with a qualifying diagnosis
    #[must_use]
    pub fn build(
        &self,
        admissions: Vec<Admission>,
        quality: AdmissionQuality,
        patients: &FxHashMap<i64, Patient>,
        qualifying: &FxHashSet<i64>,
    ) -> Cohort {
        let mut report = StageReport::new("cohort");
        report.record("valid admissions", quality.rows_read, admissions.len());
        report.anomaly("admissions with unparseable fields", quality.unparseable);
        report.anomaly("admissions discharged before admission", quality.negative_stay);
        report.anomaly("duplicate admission ids", quality.duplicate_hadm_id);

        let input = admissions.len();
        let admissions: Vec<Admission> = admissions
            .into_iter()
            .filter(|a| qualifying.contains(&a.hadm_id))
            .collect();
        report.record("qualifying diagnosis", input, admissions.len());

        let mut rows: Vec<CohortAdmission> = admissions
            .into_iter()
            .map(|a| {
                let patient = patients.get(&a.subject_id).cloned();
                CohortAdmission::new(a, patient)
            })
            .collect();
        let missing = rows.iter().filter(|r| r.patient.is_none()).count();
        report.anomaly("admissions without patient record", missing);

        if self.config.missing_patient_policy == MissingPatientPolicy::Exclude {
            let input = rows.len();
            rows.retain(|r| r.patient.is_some());
            report.record("patient record present", input, rows.len());
        }

        let min_age = self.config.min_age as f64;
        let input = rows.len();
        rows.retain(|r| r.age_at_admit.is_none_or(|age| age >= min_age));
        report.record(&format!("age >= {}", self.config.min_age), input, rows.len());

        if self.config.exclude_in_hospital_death {
            let input = rows.len();
            rows.retain(|r| !r.admission.died_in_hospital);
            report.record("alive at discharge", input, rows.len());
        }

        rows.sort_by(|a, b| {
            (a.subject_id(), a.admission.admittime, a.hadm_id())
                .cmp(&(b.subject_id(), b.admission.admittime, b.hadm_id()))
        });

        if rows.is_empty() {
            log::warn!("Cohort is empty");
        }

        Cohort {
            admissions: rows,
            report,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::parse_timestamp;

    fn admission(subject_id: i64, hadm_id: i64, admit: &str, died: bool) -> Admission {
        let admittime = parse_timestamp(admit).unwrap();
        Admission {
            subject_id,
            hadm_id,
            admittime,
            dischtime: admittime + chrono::TimeDelta::days(2),
            admission_type: "EW EMER.".to_string(),
            insurance: None,
            marital_status: None,
            race: None,
            died_in_hospital: died,
        }
    }

    fn patient(subject_id: i64, anchor_age: i64) -> (i64, Patient) {
        (
            subject_id,
            Patient {
                subject_id,
                gender: Some("M".to_string()),
                anchor_age,
                anchor_year: 2180,
            },
        )
    }

    fn inputs() -> (Vec<Admission>, FxHashMap<i64, Patient>, FxHashSet<i64>) {
        let admissions = vec![
            admission(1, 10, "2180-01-01", false),
            admission(2, 20, "2180-01-01", false),
            admission(3, 30, "2180-01-01", false),
            admission(4, 40, "2180-01-01", true),
            admission(5, 50, "2180-01-01", false),
            admission(1, 11, "2180-06-01", false),
        ];
        let patients = [patient(1, 70), patient(2, 12), patient(4, 50), patient(5, 40)]
            .into_iter()
            .collect();
        let qualifying = [10, 11, 20, 30, 40].into_iter().collect();
        (admissions, patients, qualifying)
    }

    #[test]
    fn keep_policy_passes_missing_patients() {
        let (admissions, patients, qualifying) = inputs();
        let config = CohortConfig::default();
        let cohort = CohortBuilder::new(&config).build(
            admissions,
            AdmissionQuality::default(),
            &patients,
            &qualifying,
        );

        let ids: Vec<i64> = cohort.admissions.iter().map(CohortAdmission::hadm_id).collect();
        assert_eq!(ids, vec![10, 11, 30]);
        assert_eq!(cohort.missing_patients(), 1);
        assert_eq!(cohort.report.anomalies["admissions without patient record"], 1);
    }

    #[test]
    fn exclude_policy_drops_missing_patients() {
        let (admissions, patients, qualifying) = inputs();
        let config = CohortConfig {
            missing_patient_policy: MissingPatientPolicy::Exclude,
            ..CohortConfig::default()
        };
        let cohort = CohortBuilder::new(&config).build(
            admissions,
            AdmissionQuality::default(),
            &patients,
            &qualifying,
        );
        assert_eq!(cohort.len(), 2);
        assert_eq!(cohort.missing_patients(), 0);
    }

    #[test]
    fn no_qualifying_admissions_is_an_empty_cohort() {
        let (admissions, patients, _) = inputs();
        let config = CohortConfig::default();
        let cohort = CohortBuilder::new(&config).build(
            admissions,
            AdmissionQuality::default(),
            &patients,
            &FxHashSet::default(),
        );
        assert!(cohort.is_empty());
        assert_eq!(cohort.report.final_count(), Some(0));
    }
}
