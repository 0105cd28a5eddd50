//! In-memory source

use arrow::record_batch::RecordBatch;

use super::{ChunkIter, EventSource};
use crate::error::Result;
use crate::schema::TableSpec;

/// Record batches held in memory
///
/// Batches are re-sliced to `chunk_size` rows so fold behavior can be
/// exercised at any chunk size. With [`MemorySource::from_chunks`] each batch
/// is one chunk verbatim, which lets a chunk carry a broken layout.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    spec: TableSpec,
    batches: Vec<RecordBatch>,
    chunk_size: Option<usize>,
}

impl MemorySource {
    /// Serve `batches` in chunks of at most `chunk_size` rows
    #[must_use]
    pub fn new(spec: TableSpec, batches: Vec<RecordBatch>, chunk_size: usize) -> Self {
        Self {
            name: spec.name.to_string(),
            spec,
            batches,
            chunk_size: Some(chunk_size.max(1)),
        }
    }

    /// Serve each batch as its own chunk
    #[must_use]
    pub fn from_chunks(spec: TableSpec, batches: Vec<RecordBatch>) -> Self {
        Self {
            name: spec.name.to_string(),
            spec,
            batches,
            chunk_size: None,
        }
    }

    /// Rename the source (checkpoint files are keyed by name)
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    fn slices(&self) -> Vec<RecordBatch> {
        let Some(size) = self.chunk_size else {
            return self.batches.clone();
        };
        let mut chunks = Vec::new();
        for batch in &self.batches {
            let mut offset = 0;
            while offset < batch.num_rows() {
                let len = size.min(batch.num_rows() - offset);
                chunks.push(batch.slice(offset, len));
                offset += len;
            }
        }
        chunks
    }
}

impl EventSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn chunks(&self) -> Result<ChunkIter<'_>> {
        Ok(Box::new(
            self.slices()
                .into_iter()
                .map(move |chunk| self.spec.conform(&chunk)),
        ))
    }
}
