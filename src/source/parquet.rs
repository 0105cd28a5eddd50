//! Parquet source for extracts and columnar raw tables

use std::path::{Path, PathBuf};

use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::{ChunkIter, EventSource};
use crate::error::Result;
use crate::error::util::safe_open_file;
use crate::schema::TableSpec;

/// A Parquet file read in chunks of `chunk_size` rows, projected to the
/// table's columns
#[derive(Debug, Clone)]
pub struct ParquetSource {
    path: PathBuf,
    spec: TableSpec,
    chunk_size: usize,
}

impl ParquetSource {
    /// Create a source over `path`
    #[must_use]
    pub fn new(path: &Path, spec: TableSpec, chunk_size: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            spec,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl EventSource for ParquetSource {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn chunks(&self) -> Result<ChunkIter<'_>> {
        let file = safe_open_file(&self.path, self.spec.name)?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let file_schema = builder.schema().clone();
        self.spec.check(&file_schema)?;

        let projection: Vec<usize> = self
            .spec
            .columns
            .iter()
            .filter_map(|c| file_schema.index_of(c.name).ok())
            .collect();
        let mask = ProjectionMask::leaves(builder.parquet_schema(), projection);

        let reader = builder
            .with_projection(mask)
            .with_batch_size(self.chunk_size)
            .build()?;

        Ok(Box::new(reader.map(move |batch| self.spec.conform(&batch?))))
    }
}
