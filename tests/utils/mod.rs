use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use readmit::pipeline::{EventSources, ReferenceTables};
use readmit::schema::TableSpec;
use readmit::source::MemorySource;
use readmit::utils::format_timestamp;
use readmit::PipelineConfig;

/// One admission row, timed in whole days after a fixed epoch
#[derive(Debug, Clone, Copy)]
pub struct Stay {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub admit_day: i64,
    pub los_days: i64,
}

impl Stay {
    #[must_use]
    pub const fn new(subject_id: i64, hadm_id: i64, admit_day: i64, los_days: i64) -> Self {
        Self {
            subject_id,
            hadm_id,
            admit_day,
            los_days,
        }
    }
}

/// Timestamp `days` days and `hours` hours after 2150-01-01
#[must_use]
pub fn at(days: i64, hours: i64) -> String {
    let epoch: NaiveDateTime = NaiveDate::from_ymd_opt(2150, 1, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("valid epoch");
    format_timestamp(&(epoch + TimeDelta::days(days) + TimeDelta::hours(hours)))
}

fn batch(fields: Vec<(&str, DataType)>, columns: Vec<ArrayRef>) -> RecordBatch {
    let schema = Schema::new(
        fields
            .into_iter()
            .map(|(name, data_type)| Field::new(name, data_type, true))
            .collect::<Vec<_>>(),
    );
    RecordBatch::try_new(Arc::new(schema), columns).expect("valid test batch")
}

fn strings(values: Vec<String>) -> ArrayRef {
    Arc::new(StringArray::from(values))
}

/// Emergency admissions of married Medicare patients
#[must_use]
pub fn admissions(stays: &[Stay]) -> RecordBatch {
    batch(
        vec![
            ("subject_id", DataType::Int64),
            ("hadm_id", DataType::Int64),
            ("admittime", DataType::Utf8),
            ("dischtime", DataType::Utf8),
            ("admission_type", DataType::Utf8),
            ("insurance", DataType::Utf8),
            ("marital_status", DataType::Utf8),
            ("race", DataType::Utf8),
            ("hospital_expire_flag", DataType::Int64),
        ],
        vec![
            Arc::new(Int64Array::from(stays.iter().map(|s| s.subject_id).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(stays.iter().map(|s| s.hadm_id).collect::<Vec<_>>())),
            strings(stays.iter().map(|s| at(s.admit_day, 0)).collect()),
            strings(stays.iter().map(|s| at(s.admit_day + s.los_days, 0)).collect()),
            strings(stays.iter().map(|_| "EW EMER.".to_string()).collect()),
            strings(stays.iter().map(|_| "Medicare".to_string()).collect()),
            strings(stays.iter().map(|_| "MARRIED".to_string()).collect()),
            strings(stays.iter().map(|_| "WHITE".to_string()).collect()),
            Arc::new(Int64Array::from(vec![0; stays.len()])),
        ],
    )
}

/// Patients as `(subject_id, gender, anchor_age)`, anchored in 2150
#[must_use]
pub fn patients(rows: &[(i64, &str, i64)]) -> RecordBatch {
    batch(
        vec![
            ("subject_id", DataType::Int64),
            ("gender", DataType::Utf8),
            ("anchor_age", DataType::Int64),
            ("anchor_year", DataType::Int64),
        ],
        vec![
            Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
            strings(rows.iter().map(|r| r.1.to_string()).collect()),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(vec![2150; rows.len()])),
        ],
    )
}

/// Diagnosis codes as `(hadm_id, icd_code, icd_version)`
#[must_use]
pub fn diagnoses(rows: &[(i64, &str, i64)]) -> RecordBatch {
    batch(
        vec![
            ("hadm_id", DataType::Int64),
            ("icd_code", DataType::Utf8),
            ("icd_version", DataType::Int64),
        ],
        vec![
            Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
            strings(rows.iter().map(|r| r.1.to_string()).collect()),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.2).collect::<Vec<_>>())),
        ],
    )
}

/// Blood creatinine (1), blood glucose (2), urine creatinine (3)
#[must_use]
pub fn lab_items() -> RecordBatch {
    batch(
        vec![
            ("itemid", DataType::Int64),
            ("label", DataType::Utf8),
            ("fluid", DataType::Utf8),
        ],
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            strings(vec!["Creatinine".into(), "Glucose".into(), "Creatinine".into()]),
            strings(vec!["Blood".into(), "Blood".into(), "Urine".into()]),
        ],
    )
}

/// Lab results as `(hadm_id, itemid, charttime, valuenum)`
#[must_use]
pub fn labevents(rows: &[(i64, i64, String, Option<f64>)]) -> RecordBatch {
    batch(
        vec![
            ("hadm_id", DataType::Int64),
            ("itemid", DataType::Int64),
            ("charttime", DataType::Utf8),
            ("valuenum", DataType::Float64),
        ],
        vec![
            Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(rows.iter().map(|r| r.1).collect::<Vec<_>>())),
            strings(rows.iter().map(|r| r.2.clone()).collect()),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.3).collect::<Vec<_>>())),
        ],
    )
}

/// Prescriptions as `(hadm_id, drug)`
#[must_use]
pub fn prescriptions(rows: &[(i64, &str)]) -> RecordBatch {
    batch(
        vec![("hadm_id", DataType::Int64), ("drug", DataType::Utf8)],
        vec![
            Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
            strings(rows.iter().map(|r| r.1.to_string()).collect()),
        ],
    )
}

/// ICU stays as `(hadm_id, intime, outtime)`
#[must_use]
pub fn icustays(rows: &[(i64, String, String)]) -> RecordBatch {
    batch(
        vec![
            ("hadm_id", DataType::Int64),
            ("intime", DataType::Utf8),
            ("outtime", DataType::Utf8),
        ],
        vec![
            Arc::new(Int64Array::from(rows.iter().map(|r| r.0).collect::<Vec<_>>())),
            strings(rows.iter().map(|r| r.1.clone()).collect()),
            strings(rows.iter().map(|r| r.2.clone()).collect()),
        ],
    )
}

/// Raw tables of one test scenario
#[derive(Debug, Clone)]
pub struct Scenario {
    pub admissions: RecordBatch,
    pub patients: RecordBatch,
    pub diagnoses: RecordBatch,
    pub labevents: RecordBatch,
    pub prescriptions: RecordBatch,
    pub icustays: Option<RecordBatch>,
}

impl Scenario {
    /// Conformed reference tables
    #[must_use]
    pub fn tables(&self) -> ReferenceTables {
        ReferenceTables {
            admissions: vec![TableSpec::admissions().conform(&self.admissions).expect("admissions conform")],
            patients: vec![TableSpec::patients().conform(&self.patients).expect("patients conform")],
            lab_items: vec![TableSpec::lab_items().conform(&lab_items()).expect("lab items conform")],
        }
    }

    /// In-memory event sources served in chunks of `chunk_size` rows
    #[must_use]
    pub fn sources(&self, chunk_size: usize) -> EventSources {
        let source = |spec: TableSpec, batch: &RecordBatch| -> Box<dyn readmit::EventSource> {
            Box::new(MemorySource::new(spec, vec![batch.clone()], chunk_size))
        };
        EventSources {
            diagnoses: source(TableSpec::diagnoses(), &self.diagnoses),
            labevents: source(TableSpec::labevents(), &self.labevents),
            prescriptions: source(TableSpec::prescriptions(), &self.prescriptions),
            icustays: self.icustays.as_ref().map(|b| source(TableSpec::icustays(), b)),
            lab_extract_in_use: false,
            prescription_extract_in_use: false,
        }
    }
}

/// Quiet configuration writing into `dir`, without the downstream model
#[must_use]
pub fn test_config(dir: &Path, chunk_size: usize) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.output_dir = dir.to_path_buf();
    config.events.chunk_size = chunk_size;
    config.events.show_progress = false;
    config.imputation.n_imputations = 2;
    config.imputation.max_iterations = 3;
    config.model.enabled = false;
    config
}

/// Ten neurological admissions over six patients, with a readmission
/// chain, a paediatric patient, a non-neurological admission and an
/// admission without labs or prescriptions
#[must_use]
pub fn neuro_scenario() -> Scenario {
    let stays = [
        Stay::new(1, 101, 0, 3),
        Stay::new(1, 102, 10, 2),
        Stay::new(1, 103, 200, 4),
        Stay::new(2, 201, 5, 5),
        Stay::new(3, 301, 20, 1),
        Stay::new(3, 302, 60, 3),
        Stay::new(4, 401, 30, 2),
        Stay::new(5, 501, 40, 6),
        Stay::new(6, 601, 50, 2),
        Stay::new(7, 701, 70, 3),
    ];
    let diagnoses_rows = [
        (101, "I639", 10),
        (101, "E119", 10),
        (102, "G40909", 10),
        (103, "I610", 10),
        (103, "N183", 10),
        (201, "G20", 10),
        (301, "G309", 10),
        (302, "G35", 10),
        (302, "I5022", 10),
        (401, "I639", 10),
        (501, "K219", 10),
        (601, "G4733", 10),
        (601, "4019", 9),
        (701, "G40909", 10),
    ];
    let mut labs = Vec::new();
    for (i, hadm) in [101, 102, 103, 201, 301, 302, 401, 601].into_iter().enumerate() {
        let base = i as f64;
        labs.push((hadm, 1, at(0, 0), Some(0.8 + 0.1 * base)));
        if hadm != 302 {
            labs.push((hadm, 2, at(0, 0), Some(100.0 + 5.0 * base)));
        }
        labs.push((hadm, 3, at(0, 0), Some(50.0)));
    }
    // Later draw of the same item wins
    labs.push((101, 1, at(1, 0), Some(2.4)));
    labs.push((101, 1, at(0, 12), Some(9.9)));

    Scenario {
        admissions: admissions(&stays),
        patients: patients(&[(1, "F", 70), (2, "M", 55), (3, "F", 81), (4, "M", 12), (5, "F", 60), (6, "M", 66)]),
        diagnoses: diagnoses(&diagnoses_rows),
        labevents: labevents(&labs),
        prescriptions: prescriptions(&[
            (101, "Heparin"),
            (101, "Heparin"),
            (101, "Atorvastatin"),
            (102, "LevETIRAcetam"),
            (103, "Insulin Glargine"),
            (201, "Acetaminophen"),
            (301, "Warfarin"),
            (302, "Senna"),
            (401, "Aspirin"),
        ]),
        icustays: Some(icustays(&[(101, at(0, 2), at(1, 2)), (201, at(5, 0), at(5, 12))])),
    }
}
