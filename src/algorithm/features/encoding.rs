//! Categorical encodings of admission and patient attributes

use crate::models::CohortAdmission;
use crate::rules::CompiledRules;
use crate::schema::features::RACE_INDICATORS;

/// Group used for race strings that match no rule
pub const RACE_FALLBACK: &str = "other";
/// Group used when the race string is missing
pub const RACE_MISSING: &str = "unknown";

/// Encoded demographic and administrative attributes of one admission
#[derive(Debug, Clone, PartialEq)]
pub struct DemographicRow {
    /// Recorded sex is female
    pub female: bool,
    /// Admission type matched an emergency pattern
    pub emergency_admission: bool,
    /// Insurance mentions Medicare
    pub insurance_medicare: bool,
    /// Insurance mentions Medicaid
    pub insurance_medicaid: bool,
    /// Marital status is married
    pub married: bool,
    /// Race group name
    pub race_group: String,
}

impl DemographicRow {
    /// One-hot race indicators in [`RACE_INDICATORS`] order; the reference
    /// group sets none of them
    #[must_use]
    pub fn race_indicators(&self) -> [bool; RACE_INDICATORS.len()] {
        RACE_INDICATORS.map(|group| group == self.race_group)
    }
}

/// Encodes admissions with the compiled rule tables
#[derive(Debug, Clone, Copy)]
pub struct DemographicEncoder<'a> {
    rules: &'a CompiledRules,
}

impl<'a> DemographicEncoder<'a> {
    #[must_use]
    pub fn new(rules: &'a CompiledRules) -> Self {
        Self { rules }
    }

    /// Race group of a raw race string; first matching rule wins
    #[must_use]
    pub fn race_group(&self, race: Option<&str>) -> String {
        match race.map(str::trim).filter(|r| !r.is_empty()) {
            None => RACE_MISSING.to_string(),
            Some(race) => self
                .rules
                .race
                .first_match(race)
                .map_or_else(|| RACE_FALLBACK.to_string(), |i| self.rules.race.names()[i].clone()),
        }
    }

    /// Encode one cohort admission
    #[must_use]
    pub fn encode(&self, row: &CohortAdmission) -> DemographicRow {
        let admission = &row.admission;
        let insurance = admission
            .insurance
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        DemographicRow {
            female: row.patient.as_ref().is_some_and(|p| p.is_female()),
            emergency_admission: self.rules.emergency.is_match(&admission.admission_type),
            insurance_medicare: insurance.contains("medicare"),
            insurance_medicaid: insurance.contains("medicaid"),
            married: admission
                .marital_status
                .as_deref()
                .is_some_and(|m| m.trim().eq_ignore_ascii_case("married")),
            race_group: self.race_group(admission.race.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Admission, Patient};
    use crate::rules::RuleTables;
    use crate::utils::time::parse_timestamp;

    fn admission(admission_type: &str, insurance: Option<&str>, marital: Option<&str>, race: Option<&str>) -> CohortAdmission {
        CohortAdmission::new(
            Admission {
                subject_id: 1,
                hadm_id: 1,
                admittime: parse_timestamp("2180-01-01 08:00:00").unwrap(),
                dischtime: parse_timestamp("2180-01-03 08:00:00").unwrap(),
                admission_type: admission_type.to_string(),
                insurance: insurance.map(str::to_string),
                marital_status: marital.map(str::to_string),
                race: race.map(str::to_string),
                died_in_hospital: false,
            },
            Some(Patient {
                subject_id: 1,
                gender: Some("F".to_string()),
                anchor_age: 70,
                anchor_year: 2180,
            }),
        )
    }

    #[test]
    fn race_groups_follow_rule_order() {
        let rules = RuleTables::default().compile().unwrap();
        let encoder = DemographicEncoder::new(&rules);
        assert_eq!(encoder.race_group(Some("WHITE - RUSSIAN")), "white");
        assert_eq!(encoder.race_group(Some("HISPANIC/LATINO - PUERTO RICAN")), "hispanic");
        assert_eq!(encoder.race_group(Some("BLACK/AFRICAN AMERICAN")), "black");
        assert_eq!(encoder.race_group(Some("UNABLE TO OBTAIN")), "unknown");
        assert_eq!(encoder.race_group(Some("PATIENT DECLINED TO ANSWER")), "unknown");
        assert_eq!(encoder.race_group(Some("AMERICAN INDIAN/ALASKA NATIVE")), "other");
        assert_eq!(encoder.race_group(None), "unknown");
        assert_eq!(encoder.race_group(Some("  ")), "unknown");
    }

    #[test]
    fn white_is_the_reference_group() {
        let rules = RuleTables::default().compile().unwrap();
        let encoder = DemographicEncoder::new(&rules);
        let row = encoder.encode(&admission("ELECTIVE", None, None, Some("WHITE")));
        assert!(row.race_indicators().iter().all(|f| !f));

        let row = encoder.encode(&admission("ELECTIVE", None, None, Some("ASIAN - CHINESE")));
        assert_eq!(row.race_indicators(), [false, false, true, false, false]);
    }

    #[test]
    fn administrative_flags() {
        let rules = RuleTables::default().compile().unwrap();
        let encoder = DemographicEncoder::new(&rules);

        let row = encoder.encode(&admission("EW EMER.", Some("Medicare"), Some("MARRIED"), None));
        assert!(row.female);
        assert!(row.emergency_admission);
        assert!(row.insurance_medicare);
        assert!(!row.insurance_medicaid);
        assert!(row.married);

        let row = encoder.encode(&admission("URGENT", Some("Medicaid"), Some("SINGLE"), None));
        assert!(row.emergency_admission);
        assert!(row.insurance_medicaid);
        assert!(!row.married);

        let row = encoder.encode(&admission("ELECTIVE", Some("Other"), None, None));
        assert!(!row.emergency_admission);
        assert!(!row.insurance_medicare && !row.insurance_medicaid);
    }
}
