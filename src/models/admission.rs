//! Admission entity model

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDateTime};
use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::error::Result;
use crate::models::patient::Patient;
use crate::utils::arrow::{int64_column, opt_i64, opt_str, utf8_column};
use crate::utils::time::{days_between, format_timestamp, parse_timestamp};

/// One hospital admission
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Patient identifier
    pub subject_id: i64,
    /// Admission identifier, unique across the table
    pub hadm_id: i64,
    /// Admission time
    pub admittime: NaiveDateTime,
    /// Discharge time, never before `admittime`
    pub dischtime: NaiveDateTime,
    /// Admission type (e.g. "EW EMER.", "ELECTIVE")
    pub admission_type: String,
    /// Insurance category
    pub insurance: Option<String>,
    /// Marital status
    pub marital_status: Option<String>,
    /// Recorded race
    pub race: Option<String>,
    /// Whether the patient died during the stay
    pub died_in_hospital: bool,
}

/// Rows dropped while reading admissions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AdmissionQuality {
    /// Rows read
    pub rows_read: usize,
    /// Missing identifiers or unparseable timestamps
    pub unparseable: usize,
    /// Discharge before admission
    pub negative_stay: usize,
    /// Repeated admission identifiers (first occurrence kept)
    pub duplicate_hadm_id: usize,
}

impl AdmissionQuality {
    /// Total rows dropped
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.unparseable + self.negative_stay + self.duplicate_hadm_id
    }
}

impl Admission {
    /// Length of stay in fractional days
    #[must_use]
    pub fn los_days(&self) -> f64 {
        days_between(&self.admittime, &self.dischtime)
    }

    /// Read conformed admission batches, dropping rows that break the
    /// admission invariants
    pub fn from_batches(batches: &[RecordBatch]) -> Result<(Vec<Self>, AdmissionQuality)> {
        let mut admissions = Vec::new();
        let mut quality = AdmissionQuality::default();
        let mut seen = FxHashSet::default();

        for batch in batches {
            let subject = int64_column(batch, "admissions", "subject_id")?;
            let hadm = int64_column(batch, "admissions", "hadm_id")?;
            let admit = utf8_column(batch, "admissions", "admittime")?;
            let disch = utf8_column(batch, "admissions", "dischtime")?;
            let kind = utf8_column(batch, "admissions", "admission_type")?;
            let expired = int64_column(batch, "admissions", "hospital_expire_flag")?;
            let insurance = utf8_column(batch, "admissions", "insurance")?;
            let marital = utf8_column(batch, "admissions", "marital_status")?;
            let race = utf8_column(batch, "admissions", "race")?;

            for row in 0..batch.num_rows() {
                quality.rows_read += 1;

                let parsed = (
                    opt_i64(subject, row),
                    opt_i64(hadm, row),
                    opt_str(admit, row).and_then(parse_timestamp),
                    opt_str(disch, row).and_then(parse_timestamp),
                );
                let (Some(subject_id), Some(hadm_id), Some(admittime), Some(dischtime)) = parsed
                else {
                    quality.unparseable += 1;
                    continue;
                };
                if dischtime < admittime {
                    quality.negative_stay += 1;
                    continue;
                }
                if !seen.insert(hadm_id) {
                    quality.duplicate_hadm_id += 1;
                    continue;
                }

                admissions.push(Self {
                    subject_id,
                    hadm_id,
                    admittime,
                    dischtime,
                    admission_type: opt_str(kind, row).unwrap_or_default().to_string(),
                    insurance: opt_str(insurance, row).map(str::to_string),
                    marital_status: opt_str(marital, row).map(str::to_string),
                    race: opt_str(race, row).map(str::to_string),
                    died_in_hospital: opt_i64(expired, row).is_some_and(|f| f != 0),
                });
            }
        }

        if quality.dropped() > 0 {
            log::warn!(
                "Dropped {} of {} admission rows ({} unparseable, {} negative stays, {} duplicate ids)",
                quality.dropped(),
                quality.rows_read,
                quality.unparseable,
                quality.negative_stay,
                quality.duplicate_hadm_id
            );
        }
        Ok((admissions, quality))
    }
}

/// An admission that passed cohort eligibility, with derived demographics
#[derive(Debug, Clone, PartialEq)]
pub struct CohortAdmission {
    /// The admission
    pub admission: Admission,
    /// Patient record, absent when the patients table lacks the subject
    pub patient: Option<Patient>,
    /// Age in the admission year; missing without a patient record
    pub age_at_admit: Option<f64>,
    /// Length of stay in fractional days
    pub los_days: f64,
}

impl CohortAdmission {
    /// Join an admission with its (optional) patient record
    #[must_use]
    pub fn new(admission: Admission, patient: Option<Patient>) -> Self {
        let age_at_admit = patient
            .as_ref()
            .map(|p| p.age_in(i64::from(admission.admittime.year())) as f64);
        let los_days = admission.los_days();
        Self {
            admission,
            patient,
            age_at_admit,
            los_days,
        }
    }

    /// Admission identifier
    #[must_use]
    pub fn hadm_id(&self) -> i64 {
        self.admission.hadm_id
    }

    /// Patient identifier
    #[must_use]
    pub fn subject_id(&self) -> i64 {
        self.admission.subject_id
    }

    /// Arrow schema of the cohort artifact
    #[must_use]
    pub fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("subject_id", DataType::Int64, false),
            Field::new("hadm_id", DataType::Int64, false),
            Field::new("admittime", DataType::Utf8, false),
            Field::new("dischtime", DataType::Utf8, false),
            Field::new("admission_type", DataType::Utf8, false),
            Field::new("insurance", DataType::Utf8, true),
            Field::new("marital_status", DataType::Utf8, true),
            Field::new("race", DataType::Utf8, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("anchor_age", DataType::Int64, true),
            Field::new("age_at_admit", DataType::Float64, true),
            Field::new("los_days", DataType::Float64, false),
        ]))
    }

    /// Convert cohort rows to a `RecordBatch`
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        let strings = |f: &dyn Fn(&Self) -> Option<String>| -> ArrayRef {
            Arc::new(rows.iter().map(f).collect::<StringArray>())
        };

        let columns: Vec<ArrayRef> = vec![
            Arc::new(Int64Array::from(rows.iter().map(Self::subject_id).collect::<Vec<_>>())),
            Arc::new(Int64Array::from(rows.iter().map(Self::hadm_id).collect::<Vec<_>>())),
            strings(&|r| Some(format_timestamp(&r.admission.admittime))),
            strings(&|r| Some(format_timestamp(&r.admission.dischtime))),
            strings(&|r| Some(r.admission.admission_type.clone())),
            strings(&|r| r.admission.insurance.clone()),
            strings(&|r| r.admission.marital_status.clone()),
            strings(&|r| r.admission.race.clone()),
            strings(&|r| r.patient.as_ref().and_then(|p| p.gender.clone())),
            Arc::new(
                rows.iter()
                    .map(|r| r.patient.as_ref().map(|p| p.anchor_age))
                    .collect::<Int64Array>(),
            ),
            Arc::new(rows.iter().map(|r| r.age_at_admit).collect::<Float64Array>()),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.los_days).collect::<Vec<_>>())),
        ];

        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }
}
