//! Versioned feature table schema
//!
//! The model column list is the source of truth. Columns produced at runtime
//! are checked against it instead of being discovered by prefix.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};

use crate::error::{PipelineError, Result};

/// Version of [`MODEL_COLUMNS`]; bump whenever the list changes
pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Key columns leading every feature table
pub const KEY_COLUMNS: [&str; 2] = ["subject_id", "hadm_id"];

/// Binary outcome column
pub const LABEL_COLUMN: &str = "readmit_30d";

/// Model feature columns in output order
pub const MODEL_COLUMNS: [&str; 40] = [
    "age_at_admit",
    "female",
    "los_days",
    "emergency_admission",
    "insurance_medicare",
    "insurance_medicaid",
    "married",
    "race_black",
    "race_hispanic",
    "race_asian",
    "race_other",
    "race_unknown",
    "prior_admits_12m",
    "had_icu_stay",
    "icu_los_days",
    "num_diagnoses",
    "dx_cerebral_infarction",
    "dx_ich",
    "dx_epilepsy",
    "dx_parkinson",
    "dx_alzheimer",
    "dx_ms",
    "dx_diabetes",
    "dx_chf",
    "dx_copd",
    "dx_ckd",
    "lab_creatinine",
    "lab_hemoglobin",
    "lab_wbc",
    "lab_glucose",
    "lab_sodium",
    "lab_potassium",
    "lab_bun",
    "lab_platelet",
    "no_labs_flag",
    "n_medications",
    "on_anticoagulant",
    "on_statin",
    "on_insulin",
    "on_antiepileptic",
];

/// Race groups that get an indicator column; `white` is the reference
pub const RACE_INDICATORS: [&str; 5] = ["black", "hispanic", "asian", "other", "unknown"];

/// Reference race group omitted from the one-hot expansion
pub const RACE_REFERENCE: &str = "white";

/// Arrow schema of the assembled feature table
#[must_use]
pub fn feature_schema() -> SchemaRef {
    let mut fields = Vec::with_capacity(KEY_COLUMNS.len() + 1 + MODEL_COLUMNS.len());
    for key in KEY_COLUMNS {
        fields.push(Field::new(key, DataType::Int64, false));
    }
    fields.push(Field::new(LABEL_COLUMN, DataType::Int64, false));
    for column in MODEL_COLUMNS {
        fields.push(Field::new(column, DataType::Float64, false));
    }
    Arc::new(Schema::new(fields))
}

/// Columns produced by a rule table, prefixed (e.g. `lab_` + `sodium`)
#[must_use]
pub fn prefixed<S: AsRef<str>>(prefix: &str, names: &[S]) -> Vec<String> {
    names
        .iter()
        .map(|n| format!("{prefix}{}", n.as_ref()))
        .collect()
}

/// Check that the columns a rule table produces are exactly the schema's
/// columns with that prefix, in the same order
pub fn validate_prefix_group(prefix: &str, produced: &[String]) -> Result<()> {
    let expected: Vec<&str> = MODEL_COLUMNS
        .iter()
        .copied()
        .filter(|c| c.starts_with(prefix))
        .collect();

    if expected.len() == produced.len() && expected.iter().zip(produced).all(|(e, p)| *e == p.as_str()) {
        Ok(())
    } else {
        Err(PipelineError::schema(
            format!("feature schema v{FEATURE_SCHEMA_VERSION}"),
            format!(
                "rule tables produce [{}] but the schema expects [{}] for prefix '{prefix}'",
                produced.join(", "),
                expected.join(", ")
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTables;
    use std::collections::HashSet;

    #[test]
    fn model_columns_are_unique() {
        let unique: HashSet<&str> = MODEL_COLUMNS.iter().copied().collect();
        assert_eq!(unique.len(), MODEL_COLUMNS.len());
    }

    #[test]
    fn default_rules_match_schema() {
        let rules = RuleTables::default();
        let labs: Vec<&str> = rules.labs.iter().map(|l| l.name.as_str()).collect();
        let meds: Vec<&str> = rules.medications.iter().map(|m| m.name.as_str()).collect();
        let dx: Vec<&str> = rules.diagnoses.iter().map(|d| d.name.as_str()).collect();

        validate_prefix_group("lab_", &prefixed("lab_", &labs)).unwrap();
        validate_prefix_group("on_", &prefixed("on_", &meds)).unwrap();
        validate_prefix_group("dx_", &prefixed("dx_", &dx)).unwrap();
        validate_prefix_group(
            "race_",
            &prefixed("race_", &RACE_INDICATORS),
        )
        .unwrap();
    }

    #[test]
    fn renamed_rule_is_rejected() {
        let produced = prefixed("on_", &["anticoagulant", "statin", "insulin", "aed"]);
        assert!(validate_prefix_group("on_", &produced).is_err());
    }

    #[test]
    fn schema_has_keys_label_and_features() {
        let schema = feature_schema();
        assert_eq!(schema.fields().len(), 43);
        assert_eq!(schema.field(2).name(), LABEL_COLUMN);
    }
}
