//! Diagnosis codes: distinct code count and category flags

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::filter::{AdmissionFilter, AndFilter, BatchFilter, NotNullFilter};
use crate::rules::PatternClassifier;
use crate::utils::arrow::{int64_column, opt_i64, opt_str, utf8_column};

/// Row filter for the per-admission diagnosis fold
#[must_use]
pub fn diagnosis_filter(cohort: &FxHashSet<i64>) -> AndFilter {
    let filters: Vec<Arc<dyn BatchFilter>> = vec![
        Arc::new(AdmissionFilter::new(cohort.clone())),
        Arc::new(NotNullFilter::new(&["icd_code"])),
    ];
    AndFilter::new(filters)
}

/// Diagnosis features of one admission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisRow {
    /// Distinct (version, code) pairs
    pub num_diagnoses: usize,
    /// Any code of the category, in category order
    pub flags: Vec<bool>,
}

/// Diagnosis features for every admission with codes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosisSummary {
    /// Category names in rule order
    pub categories: Vec<String>,
    rows: FxHashMap<i64, DiagnosisRow>,
}

impl DiagnosisSummary {
    /// Summary without any codes
    #[must_use]
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            rows: FxHashMap::default(),
        }
    }

    /// Output flag column names (`dx_<category>`)
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| format!("dx_{c}")).collect()
    }

    /// Features of an admission; zero and all-false without codes
    #[must_use]
    pub fn row(&self, hadm_id: i64) -> DiagnosisRow {
        self.rows.get(&hadm_id).cloned().unwrap_or_else(|| DiagnosisRow {
            num_diagnoses: 0,
            flags: vec![false; self.categories.len()],
        })
    }
}

/// Summarize a diagnosis residue
///
/// Category prefixes are only applied to codes of `icd_version`; codes of
/// other versions still count towards `num_diagnoses`.
pub fn summarize_diagnoses(
    residue: &RecordBatch,
    classifier: &PatternClassifier,
    icd_version: i64,
) -> Result<DiagnosisSummary> {
    let hadm = int64_column(residue, "diagnoses_icd", "hadm_id")?;
    let code = utf8_column(residue, "diagnoses_icd", "icd_code")?;
    let version = int64_column(residue, "diagnoses_icd", "icd_version")?;

    let mut codes: FxHashMap<i64, FxHashSet<(Option<i64>, String)>> = FxHashMap::default();
    for row in 0..residue.num_rows() {
        let (Some(hadm_id), Some(icd)) = (opt_i64(hadm, row), opt_str(code, row)) else {
            continue;
        };
        codes
            .entry(hadm_id)
            .or_default()
            .insert((opt_i64(version, row), icd.to_uppercase()));
    }

    let rows = codes
        .into_iter()
        .map(|(hadm_id, set)| {
            let mut flags = vec![false; classifier.len()];
            for (v, icd) in &set {
                if *v != Some(icd_version) {
                    continue;
                }
                for category in classifier.matches(icd) {
                    flags[category] = true;
                }
            }
            (
                hadm_id,
                DiagnosisRow {
                    num_diagnoses: set.len(),
                    flags,
                },
            )
        })
        .collect();

    Ok(DiagnosisSummary {
        categories: classifier.names().to_vec(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleTables;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};

    #[test]
    fn flags_only_target_version() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("hadm_id", DataType::Int64, true),
            Field::new("icd_code", DataType::Utf8, true),
            Field::new("icd_version", DataType::Int64, true),
        ]));
        let residue = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 1, 1, 1])),
                Arc::new(StringArray::from(vec!["I639", "i639", "E119", "G40"])),
                Arc::new(Int64Array::from(vec![10, 10, 10, 9])),
            ],
        )
        .unwrap();

        let rules = RuleTables::default().compile().unwrap();
        let summary = summarize_diagnoses(&residue, &rules.diagnoses, 10).unwrap();
        let row = summary.row(1);
        assert_eq!(row.num_diagnoses, 3);

        let names = summary.column_names();
        let flag = |name: &str| row.flags[names.iter().position(|n| n == name).unwrap()];
        assert!(flag("dx_cerebral_infarction"));
        assert!(flag("dx_diabetes"));
        assert!(!flag("dx_epilepsy"));
        assert_eq!(summary.row(2).num_diagnoses, 0);
    }
}
