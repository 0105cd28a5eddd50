//! Prescriptions: distinct drug count and drug-class flags

use std::sync::Arc;

use arrow::record_batch::RecordBatch;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Result;
use crate::filter::{AdmissionFilter, AndFilter, BatchFilter, NotNullFilter};
use crate::rules::PatternClassifier;
use crate::utils::arrow::{int64_column, opt_i64, opt_str, utf8_column};

/// Row filter for the prescription fold
///
/// Every drug of a cohort admission is kept; the class patterns only decide
/// flags, the count covers all distinct drugs.
#[must_use]
pub fn medication_filter(cohort: &FxHashSet<i64>) -> AndFilter {
    let filters: Vec<Arc<dyn BatchFilter>> = vec![
        Arc::new(AdmissionFilter::new(cohort.clone())),
        Arc::new(NotNullFilter::new(&["drug"])),
    ];
    AndFilter::new(filters)
}

/// Medication features of one admission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationRow {
    /// Distinct normalized drug names
    pub n_medications: usize,
    /// Any drug matched the class, in class order
    pub flags: Vec<bool>,
}

/// Medication features for every admission that had prescriptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MedicationSummary {
    /// Class names in rule order
    pub classes: Vec<String>,
    rows: FxHashMap<i64, MedicationRow>,
}

impl MedicationSummary {
    /// Summary without any prescriptions
    #[must_use]
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            rows: FxHashMap::default(),
        }
    }

    /// Output flag column names (`on_<class>`)
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.classes.iter().map(|c| format!("on_{c}")).collect()
    }

    /// Features of an admission; zero and all-false without prescriptions
    #[must_use]
    pub fn row(&self, hadm_id: i64) -> MedicationRow {
        self.rows.get(&hadm_id).cloned().unwrap_or_else(|| MedicationRow {
            n_medications: 0,
            flags: vec![false; self.classes.len()],
        })
    }

    /// Admissions with at least one prescription
    #[must_use]
    pub fn admissions(&self) -> usize {
        self.rows.len()
    }
}

/// Trimmed, lower-cased drug name; blank names are dropped
fn normalize_drug(drug: &str) -> Option<String> {
    let name = drug.trim().to_lowercase();
    (!name.is_empty()).then_some(name)
}

/// Summarize a prescription residue
pub fn summarize_medications(residue: &RecordBatch, classifier: &PatternClassifier) -> Result<MedicationSummary> {
    let hadm = int64_column(residue, "prescriptions", "hadm_id")?;
    let drug = utf8_column(residue, "prescriptions", "drug")?;

    let mut drugs: FxHashMap<i64, FxHashSet<String>> = FxHashMap::default();
    for row in 0..residue.num_rows() {
        let (Some(hadm_id), Some(name)) = (opt_i64(hadm, row), opt_str(drug, row).and_then(normalize_drug)) else {
            continue;
        };
        drugs.entry(hadm_id).or_default().insert(name);
    }

    let rows = drugs
        .into_iter()
        .map(|(hadm_id, names)| {
            let mut flags = vec![false; classifier.len()];
            for name in &names {
                for class in classifier.matches(name) {
                    flags[class] = true;
                }
            }
            (
                hadm_id,
                MedicationRow {
                    n_medications: names.len(),
                    flags,
                },
            )
        })
        .collect();

    Ok(MedicationSummary {
        classes: classifier.names().to_vec(),
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
    fn counts_distinct_normalized_drugs() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("hadm_id", DataType::Int64, true),
            Field::new("drug", DataType::Utf8, true),
        ]));
        let residue = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 1, 1, 1, 2])),
                Arc::new(StringArray::from(vec![
                    "Heparin",
                    " heparin ",
                    "Insulin Glargine",
                    "Acetaminophen",
                    "  ",
                ])),
            ],
        )
        .unwrap();

        let rules = RuleTables::default().compile().unwrap();
        let summary = summarize_medications(&residue, &rules.medications).unwrap();

        let row = summary.row(1);
        assert_eq!(row.n_medications, 3);
        assert_eq!(row.flags, vec![true, false, true, false]);
        assert_eq!(summary.row(2), MedicationRow { n_medications: 0, flags: vec![false; 4] });
        assert_eq!(summary.row(99).n_medications, 0);
        assert_eq!(summary.admissions(), 1);
    }
}
