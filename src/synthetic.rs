//! Seeded synthetic raw tables shaped like the clinical database extract
//!
//! Produces admissions, patients, diagnosis codes, the lab dictionary, lab
//! results, prescriptions and ICU stays with the awkward cases the pipeline
//! has to handle: repeat admissions, non-neurological admissions, paediatric
//! patients, in-hospital deaths, absent patient records, unmeasured labs,
//! admissions without prescriptions and a few rows with unusable fields.
//! This is not real patient data.

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::error::util::validate_directory;
use crate::error::{PipelineError, Result};
use crate::utils::arrow::{f64_column, i64_column, string_column};
use crate::utils::io::write_csv;
use crate::utils::time::format_timestamp;

/// Lab dictionary rows: item id, label, fluid
const LAB_ITEMS: [(i64, &str, &str); 11] = [
    (50912, "Creatinine", "Blood"),
    (51222, "Hemoglobin", "Blood"),
    (51301, "White Blood Cells", "Blood"),
    (50931, "Glucose", "Blood"),
    (50983, "Sodium", "Blood"),
    (50971, "Potassium", "Blood"),
    (51006, "Urea Nitrogen", "Blood"),
    (51265, "Platelet Count", "Blood"),
    (51082, "Creatinine", "Urine"),
    (51981, "Glucose", "Urine"),
    (50868, "Anion Gap", "Blood"),
];

/// Share of admissions missing each blood lab, in dictionary order
const LAB_MISSING: [f64; 8] = [0.045, 0.072, 0.058, 0.125, 0.040, 0.061, 0.083, 0.035];

const RACES: [(&str, f64); 7] = [
    ("WHITE", 0.57),
    ("BLACK/AFRICAN AMERICAN", 0.16),
    ("HISPANIC/LATINO - PUERTO RICAN", 0.08),
    ("ASIAN - CHINESE", 0.05),
    ("OTHER", 0.08),
    ("UNKNOWN", 0.04),
    ("", 0.02),
];
const INSURANCE: [(&str, f64); 3] = [("Medicare", 0.55), ("Medicaid", 0.18), ("Other", 0.27)];
const MARITAL: [(&str, f64); 5] = [
    ("MARRIED", 0.38),
    ("SINGLE", 0.25),
    ("DIVORCED", 0.10),
    ("WIDOWED", 0.17),
    ("", 0.10),
];
const ADMISSION_TYPES: [(&str, f64); 4] = [
    ("URGENT", 0.33),
    ("EW EMER.", 0.52),
    ("OBSERVATION ADMIT", 0.10),
    ("ELECTIVE", 0.05),
];

/// Neurological codes with prior probabilities
const NEURO_CODES: [(&str, f64); 8] = [
    ("I639", 0.22),
    ("I610", 0.09),
    ("G40909", 0.18),
    ("G20", 0.08),
    ("G309", 0.07),
    ("G35", 0.04),
    ("G4733", 0.20),
    ("I609", 0.12),
];
/// Comorbidity codes with prior probabilities
const COMORBIDITY_CODES: [(&str, f64); 4] = [("E119", 0.28), ("I5022", 0.18), ("J449", 0.14), ("N183", 0.16)];
const OTHER_CODES: [&str; 10] = [
    "K219", "Z87891", "I10", "E785", "F329", "N390", "D649", "Z7901", "R262", "M549",
];

const OTHER_DRUGS: [&str; 14] = [
    "Acetaminophen",
    "Ondansetron",
    "Pantoprazole",
    "Docusate Sodium",
    "Senna",
    "Metoprolol Tartrate",
    "Lisinopril",
    "Furosemide",
    "Sodium Chloride 0.9%  Flush",
    "Potassium Chloride",
    "Bisacodyl",
    "Polyethylene Glycol",
    "Amlodipine",
    "Aspirin",
];
const ANTICOAGULANTS: [&str; 4] = ["Heparin", "Warfarin", "Apixaban", "Enoxaparin Sodium"];
const STATINS: [&str; 3] = ["Atorvastatin", "Simvastatin", "Rosuvastatin"];
const INSULINS: [&str; 2] = ["Insulin Glargine", "Insulin Lispro"];
const ANTIEPILEPTICS: [&str; 4] = ["LevETIRAcetam", "Phenytoin", "Valproic Acid", "Lacosamide"];

/// File names written by [`SyntheticDataset::write`]
pub const FILES: [&str; 7] = [
    "admissions.csv",
    "patients.csv",
    "diagnoses_icd.csv",
    "d_labitems.csv",
    "labevents.csv",
    "prescriptions.csv",
    "icustays.csv",
];

fn normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, sd: f64) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    mean + sd * (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

fn lognormal<R: Rng + ?Sized>(rng: &mut R, mu: f64, sigma: f64) -> f64 {
    normal(rng, mu, sigma).exp()
}

fn poisson<R: Rng + ?Sized>(rng: &mut R, lambda: f64) -> usize {
    let limit = (-lambda).exp();
    let mut k = 0;
    let mut p: f64 = rng.random();
    while p > limit {
        k += 1;
        p *= rng.random::<f64>();
    }
    k
}

fn weighted<'a, R: Rng + ?Sized>(rng: &mut R, choices: &[(&'a str, f64)]) -> &'a str {
    choices
        .choose_weighted(rng, |c| c.1)
        .map_or(choices[0].0, |c| c.0)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn blank_to_none(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

struct PatientRow {
    subject_id: i64,
    gender: &'static str,
    anchor_age: i64,
    anchor_year: i64,
    recorded: bool,
}

struct AdmissionRow {
    subject_id: i64,
    hadm_id: i64,
    admittime: NaiveDateTime,
    dischtime: NaiveDateTime,
    admission_type: &'static str,
    insurance: &'static str,
    marital_status: &'static str,
    race: &'static str,
    died: bool,
}

#[derive(Default)]
struct Tables {
    admissions: Vec<AdmissionRow>,
    patients: Vec<PatientRow>,
    diagnoses: Vec<(i64, i64, String, i64, i64)>,
    labevents: Vec<(i64, i64, i64, NaiveDateTime, Option<f64>)>,
    prescriptions: Vec<(i64, i64, String)>,
    icustays: Vec<(i64, i64, i64, NaiveDateTime, NaiveDateTime)>,
}

/// Synthetic raw tables as record batches
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub admissions: RecordBatch,
    pub patients: RecordBatch,
    pub diagnoses: RecordBatch,
    pub lab_items: RecordBatch,
    pub labevents: RecordBatch,
    pub prescriptions: RecordBatch,
    pub icustays: RecordBatch,
}

impl SyntheticDataset {
    /// Generate about `admissions` admissions from `seed`
    ///
    /// The same arguments always give the same tables.
    pub fn generate(admissions: usize, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let epoch = NaiveDate::from_ymd_opt(2150, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| PipelineError::Config("invalid synthetic epoch".to_string()))?;

        let mut tables = Tables::default();
        let mut next_hadm = 200_001;
        let mut subject_id = 100_000;

        while tables.admissions.len() < admissions {
            subject_id += 1;
            let paediatric = rng.random_bool(0.04);
            let anchor_age = if paediatric {
                rng.random_range(6..16)
            } else {
                normal(&mut rng, 67.0, 15.0).clamp(18.0, 91.0) as i64
            };
            let anchor_year = 2150 + rng.random_range(0..10);
            let gender = if rng.random_bool(0.47) { "F" } else { "M" };
            tables.patients.push(PatientRow {
                subject_id,
                gender,
                anchor_age,
                anchor_year,
                recorded: !rng.random_bool(0.02),
            });

            let race = weighted(&mut rng, &RACES);
            let insurance = weighted(&mut rng, &INSURANCE);
            let marital_status = weighted(&mut rng, &MARITAL);
            let ckd = rng.random_bool(0.16);
            let diabetes = rng.random_bool(0.28);
            let epilepsy = rng.random_bool(0.18);

            let first_day = (anchor_year - 2150) * 365 + rng.random_range(0..300);
            let mut admittime = epoch
                + TimeDelta::days(first_day)
                + TimeDelta::minutes(rng.random_range(0..24 * 60));

            loop {
                let hadm_id = next_hadm;
                next_hadm += 1;
                let los = lognormal(&mut rng, 1.6, 0.7).clamp(0.5, 60.0);
                let mut dischtime = admittime + TimeDelta::minutes((los * 24.0 * 60.0) as i64);
                if rng.random_bool(0.004) {
                    dischtime = admittime - TimeDelta::hours(3);
                }
                let died = rng.random_bool(0.03);
                let neuro = rng.random_bool(0.85);

                let flags = generate_diagnoses(&mut rng, &mut tables, subject_id, hadm_id, neuro, ckd, diabetes, epilepsy);
                generate_labs(&mut rng, &mut tables, subject_id, hadm_id, admittime, dischtime, ckd, diabetes, gender);
                generate_prescriptions(&mut rng, &mut tables, subject_id, hadm_id, diabetes, epilepsy || flags.epilepsy);
                if rng.random_bool(0.25) && dischtime > admittime {
                    let start = admittime + TimeDelta::hours(rng.random_range(0..12));
                    let length = lognormal(&mut rng, 0.8, 0.6).clamp(0.3, los);
                    let mut end = start + TimeDelta::minutes((length * 24.0 * 60.0) as i64);
                    if rng.random_bool(0.01) {
                        end = start - TimeDelta::hours(1);
                    }
                    tables.icustays.push((subject_id, hadm_id, 30_000_000 + hadm_id, start, end));
                }

                tables.admissions.push(AdmissionRow {
                    subject_id,
                    hadm_id,
                    admittime,
                    dischtime,
                    admission_type: weighted(&mut rng, &ADMISSION_TYPES),
                    insurance,
                    marital_status,
                    race,
                    died,
                });

                if died || tables.admissions.len() >= admissions {
                    break;
                }

                // Risk of an early return grows with severity
                let age = anchor_age + i64::from(admittime.year()) - anchor_year;
                let logit = -1.3
                    + 0.02 * (age - 67) as f64
                    + 0.35 * f64::from(u8::from(flags.ich))
                    + 0.25 * f64::from(u8::from(flags.infarction))
                    + 0.3 * f64::from(u8::from(ckd))
                    + 0.15 * f64::from(u8::from(flags.chf))
                    + normal(&mut rng, 0.0, 0.3);
                let early = rng.random_bool(1.0 / (1.0 + (-logit).exp()));
                let gap_days = if early {
                    rng.random_range(0.0..30.0)
                } else if rng.random_bool(0.3) {
                    rng.random_range(30.5..420.0)
                } else {
                    break;
                };
                admittime = dischtime.max(admittime) + TimeDelta::minutes((gap_days * 24.0 * 60.0) as i64);
            }
        }

        build_batches(&tables)
    }

    /// Write every table as CSV into `dir` together with a `config.json`
    /// pointing at them; returns the configuration file path
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        validate_directory(dir, true)?;
        let batches = [
            &self.admissions,
            &self.patients,
            &self.diagnoses,
            &self.lab_items,
            &self.labevents,
            &self.prescriptions,
            &self.icustays,
        ];
        for (name, batch) in FILES.iter().zip(batches) {
            write_csv(&dir.join(name), std::slice::from_ref(batch))?;
        }

        let config = synthetic_config();
        let path = dir.join("config.json");
        config.to_file(&path)?;
        Ok(path)
    }
}

/// Configuration with relative paths to the synthetic files
#[must_use]
pub fn synthetic_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input.admissions = PathBuf::from(FILES[0]);
    config.input.patients = PathBuf::from(FILES[1]);
    config.input.diagnoses = PathBuf::from(FILES[2]);
    config.input.lab_items = PathBuf::from(FILES[3]);
    config.input.labevents = PathBuf::from(FILES[4]);
    config.input.prescriptions = PathBuf::from(FILES[5]);
    config.input.icustays = Some(PathBuf::from(FILES[6]));
    config.output_dir = PathBuf::from("output");
    config.events.chunk_size = 5_000;
    config
}

#[derive(Default)]
struct DiagnosisFlags {
    infarction: bool,
    ich: bool,
    epilepsy: bool,
    chf: bool,
}

#[allow(clippy::too_many_arguments)]
fn generate_diagnoses<R: Rng + ?Sized>(
    rng: &mut R,
    tables: &mut Tables,
    subject_id: i64,
    hadm_id: i64,
    neuro: bool,
    ckd: bool,
    diabetes: bool,
    epilepsy: bool,
) -> DiagnosisFlags {
    let mut codes: Vec<(String, i64)> = Vec::new();
    let mut flags = DiagnosisFlags::default();

    if neuro {
        for (code, p) in NEURO_CODES {
            let forced = epilepsy && code.starts_with("G40");
            if forced || rng.random_bool(p) {
                codes.push((code.to_string(), 10));
            }
        }
        if !codes.iter().any(|(c, _)| c.starts_with('G') || c.starts_with("I6")) {
            codes.push(("G4733".to_string(), 10));
        }
    }
    for (code, p) in COMORBIDITY_CODES {
        let forced = (ckd && code.starts_with("N18")) || (diabetes && code.starts_with("E11"));
        if forced || rng.random_bool(p * 0.5) {
            codes.push((code.to_string(), 10));
        }
    }
    let extra = poisson(rng, 3.5).max(usize::from(codes.is_empty()));
    for _ in 0..extra {
        if let Some(code) = OTHER_CODES.choose(rng) {
            codes.push(((*code).to_string(), 10));
        }
    }
    // Legacy coding on a few admissions: counted, never flagged
    if rng.random_bool(0.03) {
        codes.push(("4019".to_string(), 9));
    }

    for (seq, (code, version)) in codes.into_iter().enumerate() {
        flags.infarction |= version == 10 && code.starts_with("I63");
        flags.ich |= version == 10 && code.starts_with("I61");
        flags.epilepsy |= version == 10 && code.starts_with("G40");
        flags.chf |= version == 10 && code.starts_with("I50");
        tables.diagnoses.push((subject_id, hadm_id, code, version, seq as i64 + 1));
    }
    flags
}

#[allow(clippy::too_many_arguments)]
fn generate_labs<R: Rng + ?Sized>(
    rng: &mut R,
    tables: &mut Tables,
    subject_id: i64,
    hadm_id: i64,
    admittime: NaiveDateTime,
    dischtime: NaiveDateTime,
    ckd: bool,
    diabetes: bool,
    gender: &str,
) {
    if rng.random_bool(0.05) {
        return;
    }
    let span_minutes = (dischtime - admittime).num_minutes().max(60);

    let creatinine_base = lognormal(rng, 0.1, 0.35) * if ckd { 1.8 } else { 1.0 };
    for (category, (itemid, _, _)) in LAB_ITEMS.iter().take(8).enumerate() {
        if rng.random_bool(LAB_MISSING[category]) {
            continue;
        }
        let draws = rng.random_range(1..=3);
        for _ in 0..draws {
            let value = match category {
                0 => round_to((creatinine_base * normal(rng, 1.0, 0.08)).clamp(0.3, 8.0), 2),
                1 => {
                    let sex_mean = if gender == "F" { 12.2 } else { 13.8 };
                    let mean = sex_mean - if ckd { 1.5 } else { 0.0 };
                    round_to(normal(rng, mean, 1.9).clamp(5.0, 19.0), 1)
                }
                2 => round_to(lognormal(rng, 2.1, 0.35).clamp(1.5, 35.0), 1),
                3 => {
                    let factor = if diabetes { 1.3 } else { 1.0 };
                    (lognormal(rng, 4.8, 0.25) * factor).clamp(50.0, 500.0).round()
                }
                4 => normal(rng, 139.0, 3.5).clamp(118.0, 158.0).round(),
                5 => round_to(normal(rng, 4.1, 0.5).clamp(2.5, 6.5), 1),
                6 => (creatinine_base * normal(rng, 12.0, 3.0) + 5.0).clamp(5.0, 80.0).round(),
                _ => normal(rng, 220.0, 75.0).clamp(30.0, 600.0).round(),
            };
            let charttime = admittime + TimeDelta::minutes(rng.random_range(0..span_minutes));
            let value = (!rng.random_bool(0.01)).then_some(value);
            tables.labevents.push((subject_id, hadm_id, *itemid, charttime, value));
        }
    }

    // Urine and unrelated items that the lab allow-list must ignore
    for (itemid, _, _) in LAB_ITEMS.iter().skip(8) {
        if rng.random_bool(0.3) {
            let charttime = admittime + TimeDelta::minutes(rng.random_range(0..span_minutes));
            tables
                .labevents
                .push((subject_id, hadm_id, *itemid, charttime, Some(round_to(rng.random_range(1.0..150.0), 1))));
        }
    }
}

fn generate_prescriptions<R: Rng + ?Sized>(
    rng: &mut R,
    tables: &mut Tables,
    subject_id: i64,
    hadm_id: i64,
    diabetes: bool,
    epilepsy: bool,
) {
    if rng.random_bool(0.08) {
        return;
    }
    let mut drugs: Vec<&str> = Vec::new();
    let count = poisson(rng, 6.0).clamp(1, 14);
    drugs.extend(OTHER_DRUGS.choose_multiple(rng, count));

    let classes: [(&[&str], f64); 4] = [
        (&ANTICOAGULANTS, 0.32),
        (&STATINS, 0.38),
        (&INSULINS, if diabetes { 0.55 } else { 0.03 }),
        (&ANTIEPILEPTICS, if epilepsy { 0.85 } else { 0.12 }),
    ];
    for (names, p) in classes {
        if rng.random_bool(p) {
            if let Some(name) = names.choose(rng) {
                drugs.push(*name);
            }
        }
    }

    for drug in drugs {
        // Repeated orders of the same drug count once
        let orders = if rng.random_bool(0.2) { 2 } else { 1 };
        for _ in 0..orders {
            tables.prescriptions.push((subject_id, hadm_id, drug.to_string()));
        }
    }
}

fn batch(fields: Vec<Field>, columns: Vec<ArrayRef>) -> Result<RecordBatch> {
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

fn build_batches(tables: &Tables) -> Result<SyntheticDataset> {
    let int = |name: &str| Field::new(name, DataType::Int64, true);
    let text = |name: &str| Field::new(name, DataType::Utf8, true);
    let float = |name: &str| Field::new(name, DataType::Float64, true);
    let ts = |t: &NaiveDateTime| Some(format_timestamp(t));

    let a = &tables.admissions;
    let admissions = batch(
        vec![
            int("subject_id"),
            int("hadm_id"),
            text("admittime"),
            text("dischtime"),
            text("admission_type"),
            text("insurance"),
            text("marital_status"),
            text("race"),
            int("hospital_expire_flag"),
        ],
        vec![
            i64_column(a.iter().map(|r| Some(r.subject_id)).collect()),
            i64_column(a.iter().map(|r| Some(r.hadm_id)).collect()),
            string_column(a.iter().map(|r| ts(&r.admittime)).collect()),
            string_column(a.iter().map(|r| ts(&r.dischtime)).collect()),
            string_column(a.iter().map(|r| Some(r.admission_type.to_string())).collect()),
            string_column(a.iter().map(|r| blank_to_none(r.insurance)).collect()),
            string_column(a.iter().map(|r| blank_to_none(r.marital_status)).collect()),
            string_column(a.iter().map(|r| blank_to_none(r.race)).collect()),
            i64_column(a.iter().map(|r| Some(i64::from(r.died))).collect()),
        ],
    )?;

    let p: Vec<&PatientRow> = tables.patients.iter().filter(|p| p.recorded).collect();
    let patients = batch(
        vec![int("subject_id"), text("gender"), int("anchor_age"), int("anchor_year")],
        vec![
            i64_column(p.iter().map(|r| Some(r.subject_id)).collect()),
            string_column(p.iter().map(|r| Some(r.gender.to_string())).collect()),
            i64_column(p.iter().map(|r| Some(r.anchor_age)).collect()),
            i64_column(p.iter().map(|r| Some(r.anchor_year)).collect()),
        ],
    )?;

    let d = &tables.diagnoses;
    let diagnoses = batch(
        vec![int("subject_id"), int("hadm_id"), int("seq_num"), text("icd_code"), int("icd_version")],
        vec![
            i64_column(d.iter().map(|r| Some(r.0)).collect()),
            i64_column(d.iter().map(|r| Some(r.1)).collect()),
            i64_column(d.iter().map(|r| Some(r.4)).collect()),
            string_column(d.iter().map(|r| Some(r.2.clone())).collect()),
            i64_column(d.iter().map(|r| Some(r.3)).collect()),
        ],
    )?;

    let lab_items = batch(
        vec![int("itemid"), text("label"), text("fluid"), text("category")],
        vec![
            i64_column(LAB_ITEMS.iter().map(|r| Some(r.0)).collect()),
            string_column(LAB_ITEMS.iter().map(|r| Some(r.1.to_string())).collect()),
            string_column(LAB_ITEMS.iter().map(|r| Some(r.2.to_string())).collect()),
            string_column(LAB_ITEMS.iter().map(|_| Some("Chemistry".to_string())).collect()),
        ],
    )?;

    let l = &tables.labevents;
    let labevents = batch(
        vec![
            int("labevent_id"),
            int("subject_id"),
            int("hadm_id"),
            int("itemid"),
            text("charttime"),
            float("valuenum"),
        ],
        vec![
            i64_column((1..=l.len() as i64).map(Some).collect()),
            i64_column(l.iter().map(|r| Some(r.0)).collect()),
            i64_column(l.iter().map(|r| Some(r.1)).collect()),
            i64_column(l.iter().map(|r| Some(r.2)).collect()),
            string_column(l.iter().map(|r| ts(&r.3)).collect()),
            f64_column(l.iter().map(|r| r.4).collect()),
        ],
    )?;

    let rx = &tables.prescriptions;
    let prescriptions = batch(
        vec![int("subject_id"), int("hadm_id"), text("drug")],
        vec![
            i64_column(rx.iter().map(|r| Some(r.0)).collect()),
            i64_column(rx.iter().map(|r| Some(r.1)).collect()),
            string_column(rx.iter().map(|r| Some(r.2.clone())).collect()),
        ],
    )?;

    let icu = &tables.icustays;
    let icustays = batch(
        vec![int("subject_id"), int("hadm_id"), int("stay_id"), text("intime"), text("outtime")],
        vec![
            i64_column(icu.iter().map(|r| Some(r.0)).collect()),
            i64_column(icu.iter().map(|r| Some(r.1)).collect()),
            i64_column(icu.iter().map(|r| Some(r.2)).collect()),
            string_column(icu.iter().map(|r| ts(&r.3)).collect()),
            string_column(icu.iter().map(|r| ts(&r.4)).collect()),
        ],
    )?;

    log::info!(
        "Generated {} admissions for {} patients, {} lab rows, {} prescriptions",
        admissions.num_rows(),
        tables.patients.len(),
        labevents.num_rows(),
        prescriptions.num_rows()
    );

    Ok(SyntheticDataset {
        admissions,
        patients,
        diagnoses,
        lab_items,
        labevents,
        prescriptions,
        icustays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_seeded() {
        let first = SyntheticDataset::generate(120, 5).unwrap();
        let second = SyntheticDataset::generate(120, 5).unwrap();
        assert_eq!(first.admissions, second.admissions);
        assert_eq!(first.labevents, second.labevents);
        assert_eq!(first.admissions.num_rows(), 120);
    }

    #[test]
    fn samplers_have_plausible_moments() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let mean = (0..n).map(|_| normal(&mut rng, 5.0, 2.0)).sum::<f64>() / n as f64;
        assert!((mean - 5.0).abs() < 0.1);
        let mean = (0..n).map(|_| poisson(&mut rng, 4.0) as f64).sum::<f64>() / n as f64;
        assert!((mean - 4.0).abs() < 0.1);
    }
}
