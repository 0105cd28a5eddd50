//! Fold checkpoints
//!
//! When a chunk fails, the state folded before it is written next to a small
//! JSON record of how far the fold got. A later run loads it and continues
//! from the next chunk instead of re-reading the whole source.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algorithm::events::chunked::{FoldState, fold_source};
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{PipelineError, Result};
use crate::filter::BatchFilter;
use crate::source::EventSource;
use crate::utils::io::{read_parquet, write_parquet};

/// Progress record stored beside the residue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    /// Source the fold was reading
    pub source: String,
    /// Chunks folded before the failure
    pub chunks_done: usize,
    /// Rows read before the failure
    pub rows_in: usize,
    /// Rows kept before the failure
    pub rows_kept: usize,
    /// Chunk size the chunk count refers to
    pub chunk_size: usize,
}

/// Checkpoint directory for chunked folds
#[derive(Debug, Clone)]
pub struct Checkpoint {
    dir: PathBuf,
}

impl Checkpoint {
    /// Checkpoints stored in `dir`
    #[must_use]
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn residue_path(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{source}.residue.parquet"))
    }

    fn meta_path(&self, source: &str) -> PathBuf {
        self.dir.join(format!("{source}.checkpoint.json"))
    }

    /// Persist a partial fold of `source`
    pub fn save(&self, source: &dyn EventSource, chunk_size: usize, state: &FoldState) -> Result<()> {
        let name = source.name();
        write_parquet(
            &self.residue_path(name),
            source.spec().arrow_schema(),
            &state.residue,
        )?;

        let meta = CheckpointMeta {
            source: name.to_string(),
            chunks_done: state.chunks_done,
            rows_in: state.rows_in,
            rows_kept: state.rows_kept,
            chunk_size,
        };
        let file = safe_create_file(&self.meta_path(name), "fold checkpoint")?;
        serde_json::to_writer_pretty(file, &meta)?;

        log::warn!(
            "Checkpointed {name} after {} chunks to {}",
            state.chunks_done,
            self.dir.display()
        );
        Ok(())
    }

    /// Load the partial fold of `source`, if one was saved
    ///
    /// A checkpoint taken with another chunk size cannot be resumed because
    /// chunk counts would no longer line up with source rows.
    pub fn load(&self, source: &dyn EventSource, chunk_size: usize) -> Result<Option<FoldState>> {
        let meta_path = self.meta_path(source.name());
        if !meta_path.exists() {
            return Ok(None);
        }

        let file = safe_open_file(&meta_path, "fold checkpoint")?;
        let meta: CheckpointMeta = serde_json::from_reader(std::io::BufReader::new(file))?;
        if meta.chunk_size != chunk_size {
            return Err(PipelineError::Config(format!(
                "checkpoint for {} was taken with chunk size {} but the run uses {chunk_size}",
                meta.source, meta.chunk_size
            )));
        }

        let residue = read_parquet(&self.residue_path(source.name()))?
            .iter()
            .map(|batch| source.spec().conform(batch))
            .collect::<Result<Vec<_>>>()?;
        let rows: usize = residue.iter().map(|b| b.num_rows()).sum();
        if rows != meta.rows_kept {
            return Err(PipelineError::Validation(format!(
                "checkpoint residue for {} has {rows} rows, expected {}",
                meta.source, meta.rows_kept
            )));
        }

        Ok(Some(FoldState {
            residue,
            chunks_done: meta.chunks_done,
            rows_in: meta.rows_in,
            rows_kept: meta.rows_kept,
        }))
    }

    /// Remove the checkpoint of `source`
    pub fn clear(&self, source: &str) -> Result<()> {
        for path in [self.meta_path(source), self.residue_path(source)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }
}

/// Fold a source, resuming from and writing to `checkpoint` when given
///
/// A completed fold clears its checkpoint. A failed fold leaves a checkpoint
/// behind and returns the original error.
pub fn fold_resumable(
    source: &dyn EventSource,
    filter: &dyn BatchFilter,
    checkpoint: Option<&Checkpoint>,
    chunk_size: usize,
    show_progress: bool,
) -> Result<FoldState> {
    let Some(checkpoint) = checkpoint else {
        return fold_source(source, filter, None, show_progress);
    };

    let resume = checkpoint.load(source, chunk_size)?;
    match fold_source(source, filter, resume, show_progress) {
        Ok(state) => {
            checkpoint.clear(source.name())?;
            Ok(state)
        }
        Err(err) => {
            if let PipelineError::ChunkFailed { partial, .. } = &err {
                checkpoint.save(source, chunk_size, partial)?;
            }
            Err(err)
        }
    }
}
