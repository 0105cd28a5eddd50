use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arrow::array::{Array, Float64Array};
use readmit::algorithm::features::FeatureTable;
use readmit::error::PipelineError;
use readmit::pipeline::artifacts;
use readmit::schema::TableSpec;
use readmit::source::{ChunkIter, EventSource, MemorySource};
use readmit::{FEATURE_SCHEMA_VERSION, Pipeline, feature_schema};

use crate::utils::{at, labevents, neuro_scenario, test_config};

fn column(table: &FeatureTable, name: &str) -> Vec<f64> {
    table
        .batch()
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .map(|c| c.values().to_vec())
        .unwrap_or_else(|| panic!("missing column {name}"))
}

#[test]
fn builds_cohort_labels_and_features() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = neuro_scenario();
    let pipeline = Pipeline::new(test_config(dir.path(), 1_000)).unwrap();

    let output = pipeline
        .run_with(&scenario.tables(), &scenario.sources(1_000))
        .unwrap();

    // Paediatric (401) and non-neurological (501) admissions are excluded,
    // the admission without a patient record (701) is kept
    let features = &output.features;
    assert_eq!(
        features.hadm_ids().unwrap(),
        vec![101, 102, 103, 201, 301, 302, 601, 701]
    );
    assert_eq!(
        features.labels().unwrap(),
        vec![true, false, false, false, false, false, false, false]
    );
    assert_eq!(output.summary.readmissions, 1);
    assert_eq!(
        column(features, "prior_admits_12m"),
        vec![0.0, 1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0]
    );

    let icu = column(features, "icu_los_days");
    assert!((icu[0] - 1.0).abs() < 1e-9);
    assert!((icu[3] - 0.5).abs() < 1e-9);
    assert_eq!(column(features, "had_icu_stay")[..4], [1.0, 0.0, 0.0, 1.0]);

    // Last blood creatinine by chart time; urine results are ignored
    assert!((column(features, "lab_creatinine")[0] - 2.4).abs() < 1e-9);
    assert_eq!(column(features, "no_labs_flag"), vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);

    assert_eq!(column(features, "n_medications")[0], 2.0);
    assert_eq!(column(features, "on_anticoagulant")[0], 1.0);
    assert_eq!(column(features, "on_statin")[0], 1.0);
    assert_eq!(column(features, "on_antiepileptic")[1], 1.0);
    assert_eq!(column(features, "n_medications")[6..], [0.0, 0.0]);
    assert_eq!(column(features, "dx_diabetes")[0], 1.0);
    assert_eq!(column(features, "dx_ckd")[2], 1.0);
    assert_eq!(column(features, "emergency_admission"), vec![1.0; 8]);
    assert_eq!(column(features, "female")[..3], [1.0, 1.0, 1.0]);

    for name in [
        artifacts::COHORT,
        artifacts::LABELED,
        artifacts::EVENTS,
        artifacts::FEATURES,
        artifacts::LAB_EXTRACT,
        artifacts::PRESCRIPTION_EXTRACT,
        artifacts::SUMMARY,
    ] {
        assert!(dir.path().join(name).exists(), "{name} was not written");
    }
    assert!(!dir.path().join(artifacts::SCORES).exists());
}

#[test]
fn feature_columns_follow_the_versioned_schema() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = neuro_scenario();
    let output = Pipeline::new(test_config(dir.path(), 1_000))
        .unwrap()
        .run_with(&scenario.tables(), &scenario.sources(1_000))
        .unwrap();

    let expected: Vec<String> = feature_schema().fields().iter().map(|f| f.name().clone()).collect();
    let actual: Vec<String> = output
        .features
        .batch()
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    assert_eq!(actual, expected);
    assert_eq!(output.summary.feature_schema_version, FEATURE_SCHEMA_VERSION);
    assert_eq!(output.features.feature_names().len(), 40);
}

#[test]
fn imputation_completes_labs_deterministically() {
    let scenario = neuro_scenario();
    let run = || {
        let dir = tempfile::tempdir().unwrap();
        Pipeline::new(test_config(dir.path(), 1_000))
            .unwrap()
            .run_with(&scenario.tables(), &scenario.sources(1_000))
            .unwrap()
    };

    let first = run();
    let second = run();
    assert_eq!(first.features.batch(), second.features.batch());
    assert_eq!(first.imputation.completed, second.imputation.completed);

    let glucose = first
        .imputation
        .columns
        .iter()
        .position(|c| c == "lab_glucose")
        .unwrap();
    // 302 and 701 lack glucose
    assert_eq!(first.imputation.missing_before[glucose], 2);
    assert!(first.imputation.completed.iter().flatten().all(|v| v.is_finite()));
    // Observed values are never changed
    assert!((column(&first.features, "lab_glucose")[0] - 100.0).abs() < 1e-9);
}

#[test]
fn retained_ensemble_has_every_member() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = neuro_scenario();
    let mut config = test_config(dir.path(), 1_000);
    config.imputation.n_imputations = 3;
    config.imputation.selected_imputation = 2;
    config.imputation.retain_ensemble = true;

    let output = Pipeline::new(config)
        .unwrap()
        .run_with(&scenario.tables(), &scenario.sources(1_000))
        .unwrap();
    assert_eq!(output.imputation.ensemble.len(), 3);
    assert_eq!(output.imputation.selected, 2);
    assert_eq!(output.imputation.completed, output.imputation.ensemble[2]);
    assert!(output.summary.imputation.ensemble_retained);
}

#[test]
fn missing_event_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = neuro_scenario();
    let mut sources = scenario.sources(1_000);
    let broken = labevents(&[(101, 1, at(0, 0), Some(1.0))])
        .project(&[0, 1, 2])
        .unwrap();
    sources.labevents = Box::new(MemorySource::new(TableSpec::labevents(), vec![broken], 1_000));

    let err = Pipeline::new(test_config(dir.path(), 1_000))
        .unwrap()
        .run_with(&scenario.tables(), &sources)
        .unwrap_err();
    let PipelineError::ChunkFailed { cause, .. } = err else {
        panic!("expected a chunk failure");
    };
    assert!(matches!(*cause, PipelineError::SchemaMismatch { .. }));
    assert!(!dir.path().join(artifacts::FEATURES).exists());
}

#[test]
fn excluding_missing_patients_drops_their_admissions() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = neuro_scenario();
    let mut config = test_config(dir.path(), 1_000);
    config.cohort.missing_patient_policy = readmit::config::MissingPatientPolicy::Exclude;

    let output = Pipeline::new(config)
        .unwrap()
        .run_with(&scenario.tables(), &scenario.sources(1_000))
        .unwrap();
    assert!(!output.features.hadm_ids().unwrap().contains(&701));
    assert_eq!(output.summary.cohort_size, 7);
}

/// Counts how often the wrapped source is opened
#[derive(Debug)]
struct CountingSource {
    inner: MemorySource,
    opened: Arc<AtomicUsize>,
}

impl EventSource for CountingSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn spec(&self) -> &TableSpec {
        self.inner.spec()
    }

    fn chunks(&self) -> readmit::Result<ChunkIter<'_>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.inner.chunks()
    }
}

#[test]
fn diagnoses_are_read_once() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = neuro_scenario();
    let reference = Pipeline::new(test_config(dir.path(), 3))
        .unwrap()
        .run_with(&scenario.tables(), &scenario.sources(3))
        .unwrap();

    let opened = Arc::new(AtomicUsize::new(0));
    let mut sources = scenario.sources(3);
    sources.diagnoses = Box::new(CountingSource {
        inner: MemorySource::new(TableSpec::diagnoses(), vec![scenario.diagnoses.clone()], 3),
        opened: Arc::clone(&opened),
    });
    let output = Pipeline::new(test_config(dir.path(), 3))
        .unwrap()
        .run_with(&scenario.tables(), &sources)
        .unwrap();

    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(output.events.diagnoses, reference.events.diagnoses);
    assert_eq!(output.features.batch(), reference.features.batch());
}
