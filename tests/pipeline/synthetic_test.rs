use std::path::Path;

use readmit::pipeline::artifacts;
use readmit::synthetic::{FILES, SyntheticDataset};
use readmit::{Pipeline, PipelineConfig};

fn load_config(config_path: &Path, output_dir: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::from_file(config_path).unwrap();
    config.output_dir = output_dir.to_path_buf();
    config.events.show_progress = false;
    config.events.chunk_size = 997;
    config.imputation.n_imputations = 2;
    config.model.folds = 3;
    config
}

#[tokio::test]
async fn synthetic_tables_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = SyntheticDataset::generate(800, 2025).unwrap();
    let config_path = dataset.write(dir.path()).unwrap();
    for name in FILES {
        assert!(dir.path().join(name).exists(), "{name} was not written");
    }

    let first_out = dir.path().join("first");
    let output = Pipeline::new(load_config(&config_path, &first_out))
        .unwrap()
        .run()
        .await
        .unwrap();

    let summary = &output.summary;
    assert!(summary.cohort_size > 0 && summary.cohort_size < 800);
    assert!(summary.readmissions > 0);
    assert_eq!(output.features.len(), summary.cohort_size);
    assert!(summary.imputation.admissions_without_labs > 0);
    assert!(summary.imputation.reference_filled.is_empty());

    let model = summary.model.as_ref().expect("model was trained");
    assert_eq!(model.cross_validation.folds.len(), 3);
    assert_eq!(model.importance.len(), 40);
    assert!(first_out.join(artifacts::SCORES).exists());
    assert!(first_out.join(artifacts::SUMMARY).exists());

    // A second run reading the filtered extracts gives the same table
    let second_out = dir.path().join("second");
    let mut config = load_config(&config_path, &second_out);
    config.input.lab_extract = Some(first_out.join(artifacts::LAB_EXTRACT));
    config.input.prescription_extract = Some(first_out.join(artifacts::PRESCRIPTION_EXTRACT));
    let rerun = Pipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(rerun.features.batch(), output.features.batch());
    assert!(!second_out.join(artifacts::LAB_EXTRACT).exists());
}
