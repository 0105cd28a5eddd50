use std::sync::Arc;

use arrow::array::StringArray;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use readmit::algorithm::events::{Checkpoint, fold_resumable, fold_source};
use readmit::error::PipelineError;
use readmit::filter::AdmissionFilter;
use readmit::schema::TableSpec;
use readmit::source::MemorySource;

use crate::utils::prescriptions;

fn chunks() -> Vec<RecordBatch> {
    vec![
        prescriptions(&[(1, "Heparin"), (2, "Senna")]),
        prescriptions(&[(1, "Warfarin"), (3, "Insulin Lispro")]),
        prescriptions(&[(3, "Aspirin"), (1, "Heparin")]),
    ]
}

fn broken_chunk() -> RecordBatch {
    RecordBatch::try_new(
        Arc::new(Schema::new(vec![Field::new("drug", DataType::Utf8, true)])),
        vec![Arc::new(StringArray::from(vec!["Heparin"]))],
    )
    .unwrap()
}

#[test]
fn resumed_fold_equals_uninterrupted_fold() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = Checkpoint::new(dir.path());
    let filter = AdmissionFilter::new([1, 3].into_iter().collect());
    let spec = TableSpec::prescriptions();

    let mut failing_chunks = chunks();
    failing_chunks[1] = broken_chunk();
    let failing = MemorySource::from_chunks(spec.clone(), failing_chunks).with_name("rx");
    let err = fold_resumable(&failing, &filter, Some(&checkpoint), 2, false).unwrap_err();
    assert!(matches!(err, PipelineError::ChunkFailed { chunk_index: 1, .. }));
    assert!(dir.path().join("rx.checkpoint.json").exists());

    let repaired = MemorySource::from_chunks(spec.clone(), chunks()).with_name("rx");
    let resumed = fold_resumable(&repaired, &filter, Some(&checkpoint), 2, false).unwrap();
    let uninterrupted = fold_source(&repaired, &filter, None, false).unwrap();

    assert_eq!(resumed.chunks_done, uninterrupted.chunks_done);
    assert_eq!(resumed.rows_in, uninterrupted.rows_in);
    assert_eq!(resumed.rows_kept, 5);
    let schema = spec.arrow_schema();
    assert_eq!(resumed.finish(&schema).unwrap(), uninterrupted.finish(&schema).unwrap());
    // A completed fold clears its checkpoint
    assert!(!dir.path().join("rx.checkpoint.json").exists());
}

#[test]
fn checkpoint_from_another_chunk_size_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let checkpoint = Checkpoint::new(dir.path());
    let filter = AdmissionFilter::new([1].into_iter().collect());

    let mut failing_chunks = chunks();
    failing_chunks[2] = broken_chunk();
    let failing = MemorySource::from_chunks(TableSpec::prescriptions(), failing_chunks);
    assert!(fold_resumable(&failing, &filter, Some(&checkpoint), 2, false).is_err());

    let repaired = MemorySource::from_chunks(TableSpec::prescriptions(), chunks());
    let err = fold_resumable(&repaired, &filter, Some(&checkpoint), 4, false).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}
