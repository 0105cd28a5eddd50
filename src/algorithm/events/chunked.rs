//! Bounded-memory chunked fold
//!
//! An event source is consumed chunk by chunk. Each chunk is filtered on
//! arrival and only its residue is kept in the [`FoldState`]; the residue is
//! concatenated once when the fold finishes. At most one unfiltered chunk is
//! alive at any time.

use std::time::Instant;

use arrow::compute::concat_batches;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};
use crate::filter::BatchFilter;
use crate::source::EventSource;
use crate::utils::logging::{create_chunk_progress_bar, finish_progress_bar};

/// Accumulator threaded through the chunks of one source
#[derive(Debug, Clone, Default)]
pub struct FoldState {
    /// Filtered rows of every chunk folded so far, in source order
    pub residue: Vec<RecordBatch>,
    /// Chunks folded so far
    pub chunks_done: usize,
    /// Rows read so far
    pub rows_in: usize,
    /// Rows kept so far
    pub rows_kept: usize,
}

impl FoldState {
    /// Filter one chunk and add its residue
    ///
    /// The state is unchanged when filtering fails.
    pub fn absorb(&mut self, chunk: &RecordBatch, filter: &dyn BatchFilter) -> Result<()> {
        let kept = filter.filter(chunk)?;

        self.chunks_done += 1;
        self.rows_in += chunk.num_rows();
        self.rows_kept += kept.num_rows();
        if kept.num_rows() > 0 {
            self.residue.push(kept);
        }
        Ok(())
    }

    /// Concatenate the residue into one batch
    pub fn finish(self, schema: &SchemaRef) -> Result<RecordBatch> {
        Ok(concat_batches(schema, &self.residue)?)
    }
}

/// Fold every chunk of `source` through `filter`
///
/// With `resume`, the chunks already counted in the resumed state are
/// skipped. A chunk that fails to read, conform or filter ends the fold with
/// [`PipelineError::ChunkFailed`] carrying the state folded before it.
pub fn fold_source(
    source: &dyn EventSource,
    filter: &dyn BatchFilter,
    resume: Option<FoldState>,
    show_progress: bool,
) -> Result<FoldState> {
    let start = Instant::now();
    let mut state = resume.unwrap_or_default();
    let skip = state.chunks_done;
    if skip > 0 {
        log::info!(
            "Resuming {} after {skip} chunks ({} rows kept)",
            source.name(),
            state.rows_kept
        );
    }

    let progress = create_chunk_progress_bar(source.name(), show_progress);
    progress.set_position(state.rows_in as u64);

    for (chunk_index, chunk) in source.chunks()?.enumerate().skip(skip) {
        let outcome = chunk.and_then(|chunk| {
            state.absorb(&chunk, filter)?;
            Ok(chunk.num_rows())
        });

        match outcome {
            Ok(rows) => progress.inc(rows as u64),
            Err(cause) => {
                progress.abandon();
                return Err(PipelineError::ChunkFailed {
                    source_name: source.name().to_string(),
                    chunk_index,
                    cause: Box::new(cause),
                    partial: Box::new(state),
                });
            }
        }
    }

    finish_progress_bar(&progress, Some("done"));
    log::info!(
        "Folded {} chunks of {}: kept {} of {} rows in {:?}",
        state.chunks_done,
        source.name(),
        state.rows_kept,
        state.rows_in,
        start.elapsed()
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AdmissionFilter;
    use crate::schema::TableSpec;
    use crate::source::MemorySource;
    use crate::utils::arrow::int64_column;
    use arrow::array::{Int64Array, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn prescriptions(ids: &[i64]) -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("hadm_id", DataType::Int64, true),
            Field::new("drug", DataType::Utf8, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(ids.to_vec())),
                Arc::new(StringArray::from(vec!["Heparin"; ids.len()])),
            ],
        )
        .unwrap()
    }

    fn kept_ids(state: FoldState) -> Vec<i64> {
        let batch = state
            .finish(&TableSpec::prescriptions().arrow_schema())
            .unwrap();
        int64_column(&batch, "test", "hadm_id").unwrap().values().to_vec()
    }

    #[test]
    fn residue_keeps_source_order() {
        let filter = AdmissionFilter::new([1, 3].into_iter().collect());
        let source = MemorySource::new(
            TableSpec::prescriptions(),
            vec![prescriptions(&[3, 2, 1, 3, 4, 1, 2])],
            2,
        );

        let state = fold_source(&source, &filter, None, false).unwrap();
        assert_eq!(state.chunks_done, 4);
        assert_eq!(state.rows_in, 7);
        assert_eq!(state.rows_kept, 4);
        assert_eq!(kept_ids(state), vec![3, 1, 3, 1]);
    }

    #[test]
    fn failing_chunk_returns_partial_state() {
        let broken = RecordBatch::try_new(
            Arc::new(Schema::new(vec![Field::new("drug", DataType::Utf8, true)])),
            vec![Arc::new(StringArray::from(vec!["Heparin"]))],
        )
        .unwrap();
        let source = MemorySource::from_chunks(
            TableSpec::prescriptions(),
            vec![prescriptions(&[1, 2]), broken, prescriptions(&[1])],
        );
        let filter = AdmissionFilter::new([1].into_iter().collect());

        let err = fold_source(&source, &filter, None, false).unwrap_err();
        let PipelineError::ChunkFailed {
            chunk_index,
            partial,
            ..
        } = err
        else {
            panic!("expected a chunk failure");
        };
        assert_eq!(chunk_index, 1);
        assert_eq!(partial.chunks_done, 1);
        assert_eq!(partial.rows_kept, 1);
    }

    #[test]
    fn resume_skips_folded_chunks() {
        let source = MemorySource::from_chunks(
            TableSpec::prescriptions(),
            vec![prescriptions(&[1, 2]), prescriptions(&[1, 1])],
        );
        let filter = AdmissionFilter::new([1].into_iter().collect());

        let first = {
            let mut state = FoldState::default();
            state.absorb(&prescriptions(&[1, 2]), &filter).unwrap();
            state
        };
        let resumed = fold_source(&source, &filter, Some(first), false).unwrap();
        assert_eq!(resumed.chunks_done, 2);
        assert_eq!(resumed.rows_in, 4);
        assert_eq!(kept_ids(resumed), vec![1, 1, 1]);
    }
}
