use arrow::array::{Array, Float64Array};
use readmit::Pipeline;

use crate::utils::{Scenario, Stay, admissions, diagnoses, labevents, patients, prescriptions, test_config};

fn window_scenario() -> Scenario {
    Scenario {
        admissions: admissions(&[
            Stay::new(1, 11, 0, 2),
            Stay::new(1, 12, 100, 2),
            Stay::new(1, 13, 400, 2),
            Stay::new(2, 21, 0, 2),
            Stay::new(2, 22, 32, 2),
        ]),
        patients: patients(&[(1, "M", 60), (2, "F", 75)]),
        diagnoses: diagnoses(&[
            (11, "I639", 10),
            (12, "I639", 10),
            (13, "G20", 10),
            (21, "G35", 10),
            (22, "G35", 10),
        ]),
        labevents: labevents(&[]),
        prescriptions: prescriptions(&[]),
        icustays: None,
    }
}

#[test]
fn trailing_window_counts_and_boundary_readmission() {
    let dir = tempfile::tempdir().unwrap();
    let scenario = window_scenario();
    let output = Pipeline::new(test_config(dir.path(), 2))
        .unwrap()
        .run_with(&scenario.tables(), &scenario.sources(2))
        .unwrap();

    let prior = output
        .features
        .batch()
        .column_by_name("prior_admits_12m")
        .and_then(|c| c.as_any().downcast_ref::<Float64Array>())
        .map(|c| c.values().to_vec())
        .unwrap();
    // Day 400 looks back to day 35, so only the day 100 admission counts
    assert_eq!(prior, vec![0.0, 1.0, 1.0, 0.0, 1.0]);

    // Discharge on day 2, next admission on day 32: exactly the window
    assert_eq!(
        output.features.labels().unwrap(),
        vec![false, false, false, true, false]
    );
    assert!(output.imputation.no_labs_flag.iter().all(|f| *f));
    assert_eq!(output.summary.imputation.reference_filled.len(), 8);
}
