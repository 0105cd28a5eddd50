use arrow::compute::concat_batches;
use readmit::Pipeline;

use crate::utils::{at, labevents, neuro_scenario, test_config};

#[test]
fn chunk_size_does_not_change_the_result() {
    let scenario = neuro_scenario();
    let run = |chunk_size: usize| {
        let dir = tempfile::tempdir().unwrap();
        Pipeline::new(test_config(dir.path(), chunk_size))
            .unwrap()
            .run_with(&scenario.tables(), &scenario.sources(chunk_size))
            .unwrap()
    };

    let reference = run(100_000);
    for chunk_size in [1, 2, 7] {
        let output = run(chunk_size);
        assert_eq!(output.events, reference.events, "events differ at chunk size {chunk_size}");
        assert_eq!(
            output.features.batch(),
            reference.features.batch(),
            "features differ at chunk size {chunk_size}"
        );
    }
}

#[test]
fn repeated_latest_lab_in_a_later_chunk_changes_nothing() {
    let scenario = neuro_scenario();
    let mut repeated = neuro_scenario();
    let copy = labevents(&[(101, 1, at(1, 0), Some(2.4))]);
    repeated.labevents = concat_batches(&scenario.labevents.schema(), [&scenario.labevents, &copy]).unwrap();

    let run = |scenario: &crate::utils::Scenario| {
        let dir = tempfile::tempdir().unwrap();
        Pipeline::new(test_config(dir.path(), 2))
            .unwrap()
            .run_with(&scenario.tables(), &scenario.sources(2))
            .unwrap()
    };

    let reference = run(&scenario);
    let output = run(&repeated);
    assert_eq!(output.events.labs, reference.events.labs);
    assert_eq!(output.events.labs.row(101)[0], Some(2.4));
    assert_eq!(output.features.batch(), reference.features.batch());
}
