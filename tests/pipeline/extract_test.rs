use readmit::Pipeline;
use readmit::pipeline::artifacts;
use readmit::schema::TableSpec;
use readmit::source::open_file;

use crate::utils::{neuro_scenario, test_config};

#[test]
fn extracts_substitute_for_raw_event_tables() {
    let scenario = neuro_scenario();
    let first_dir = tempfile::tempdir().unwrap();
    let raw = Pipeline::new(test_config(first_dir.path(), 3))
        .unwrap()
        .run_with(&scenario.tables(), &scenario.sources(3))
        .unwrap();

    let mut sources = scenario.sources(3);
    sources.labevents = open_file(
        &first_dir.path().join(artifacts::LAB_EXTRACT),
        TableSpec::labevents(),
        3,
    );
    sources.prescriptions = open_file(
        &first_dir.path().join(artifacts::PRESCRIPTION_EXTRACT),
        TableSpec::prescriptions(),
        3,
    );
    sources.lab_extract_in_use = true;
    sources.prescription_extract_in_use = true;

    let second_dir = tempfile::tempdir().unwrap();
    let from_extracts = Pipeline::new(test_config(second_dir.path(), 3))
        .unwrap()
        .run_with(&scenario.tables(), &sources)
        .unwrap();

    assert_eq!(from_extracts.events, raw.events);
    assert_eq!(from_extracts.features.batch(), raw.features.batch());
    // Extracts in use are not rewritten
    assert!(!second_dir.path().join(artifacts::LAB_EXTRACT).exists());
    assert!(!second_dir.path().join(artifacts::PRESCRIPTION_EXTRACT).exists());
}
