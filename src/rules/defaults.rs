//! Default rule tables for the neurological readmission cohort

use serde::{Deserialize, Serialize};

use super::{LabRule, MatchMode, PatternClassifier, PatternRule};
use crate::error::Result;

/// All rule tables used by the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    /// ICD code prefixes that qualify an admission for the cohort
    pub qualifying_codes: Vec<String>,
    /// Laboratory categories resolved against the lab dictionary
    pub labs: Vec<LabRule>,
    /// Drug classes matched against prescription drug names
    pub medications: Vec<PatternRule>,
    /// Diagnosis categories matched against ICD code prefixes
    pub diagnoses: Vec<PatternRule>,
    /// Race groups, first match wins; unmatched values fall into `other`
    pub race: Vec<PatternRule>,
    /// Admission type fragments that mark an emergency admission
    pub emergency_admission_types: Vec<String>,
}

impl Default for RuleTables {
    fn default() -> Self {
        let mut qualifying_codes = vec!["G".to_string()];
        qualifying_codes.extend((60..=69).map(|n| format!("I{n}")));

        Self {
            qualifying_codes,
            labs: vec![
                LabRule::new("creatinine", &["Creatinine"], 1.0),
                LabRule::new("hemoglobin", &["Hemoglobin"], 13.0),
                LabRule::new("wbc", &["White Blood Cells", "WBC Count", "WBC"], 8.0),
                LabRule::new("glucose", &["Glucose"], 110.0),
                LabRule::new("sodium", &["Sodium"], 139.0),
                LabRule::new("potassium", &["Potassium"], 4.1),
                LabRule::new("bun", &["Urea Nitrogen"], 18.0),
                LabRule::new("platelet", &["Platelet Count"], 220.0),
            ],
            medications: vec![
                PatternRule::new(
                    "anticoagulant",
                    &[
                        "warfarin",
                        "heparin",
                        "enoxaparin",
                        "apixaban",
                        "rivaroxaban",
                        "dabigatran",
                        "edoxaban",
                        "fondaparinux",
                    ],
                ),
                PatternRule::new(
                    "statin",
                    &[
                        "atorvastatin",
                        "simvastatin",
                        "rosuvastatin",
                        "pravastatin",
                        "lovastatin",
                        "pitavastatin",
                        "fluvastatin",
                    ],
                ),
                PatternRule::new("insulin", &["insulin"]),
                PatternRule::new(
                    "antiepileptic",
                    &[
                        "levetiracetam",
                        "phenytoin",
                        "fosphenytoin",
                        "valpro",
                        "divalproex",
                        "carbamazepine",
                        "oxcarbazepine",
                        "lamotrigine",
                        "lacosamide",
                        "topiramate",
                        "phenobarbital",
                        "zonisamide",
                        "clobazam",
                    ],
                ),
            ],
            diagnoses: vec![
                PatternRule::new("cerebral_infarction", &["I63"]),
                PatternRule::new("ich", &["I61"]),
                PatternRule::new("epilepsy", &["G40"]),
                PatternRule::new("parkinson", &["G20"]),
                PatternRule::new("alzheimer", &["G30"]),
                PatternRule::new("ms", &["G35"]),
                PatternRule::new("diabetes", &["E08", "E09", "E10", "E11", "E13"]),
                PatternRule::new("chf", &["I50"]),
                PatternRule::new("copd", &["J44"]),
                PatternRule::new("ckd", &["N18"]),
            ],
            race: vec![
                PatternRule::new("unknown", &["UNKNOWN", "UNABLE", "DECLINED"]),
                PatternRule::new("hispanic", &["HISPANIC", "LATINO"]),
                PatternRule::new("black", &["BLACK"]),
                PatternRule::new("asian", &["ASIAN"]),
                PatternRule::new("white", &["WHITE"]),
            ],
            emergency_admission_types: vec!["EMER".to_string(), "URGENT".to_string()],
        }
    }
}

/// Rule tables compiled once per run
#[derive(Debug, Clone)]
pub struct CompiledRules {
    /// Qualifying cohort code range
    pub qualifying: PatternClassifier,
    /// Drug classes
    pub medications: PatternClassifier,
    /// Diagnosis categories
    pub diagnoses: PatternClassifier,
    /// Race groups
    pub race: PatternClassifier,
    /// Emergency admission types
    pub emergency: PatternClassifier,
    /// Lab categories
    pub labs: Vec<LabRule>,
}

impl RuleTables {
    /// Compile every table
    pub fn compile(&self) -> Result<CompiledRules> {
        let qualifying = vec![PatternRule {
            name: "qualifying".to_string(),
            patterns: self.qualifying_codes.clone(),
        }];
        let emergency = vec![PatternRule {
            name: "emergency".to_string(),
            patterns: self.emergency_admission_types.clone(),
        }];

        Ok(CompiledRules {
            qualifying: PatternClassifier::compile(&qualifying, MatchMode::Prefix)?,
            medications: PatternClassifier::compile(&self.medications, MatchMode::Substring)?,
            diagnoses: PatternClassifier::compile(&self.diagnoses, MatchMode::Prefix)?,
            race: PatternClassifier::compile(&self.race, MatchMode::Substring)?,
            emergency: PatternClassifier::compile(&emergency, MatchMode::Substring)?,
            labs: self.labs.clone(),
        })
    }
}
