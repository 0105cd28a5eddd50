//! Delimited text source

use std::path::{Path, PathBuf};

use arrow::csv::ReaderBuilder;

use super::{ChunkIter, EventSource};
use crate::error::Result;
use crate::error::util::safe_open_file;
use crate::schema::TableSpec;
use crate::utils::io::csv::csv_header_schema;

/// A CSV file with a header row, read in chunks of `chunk_size` rows
///
/// Only the columns the table knows are parsed.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    spec: TableSpec,
    chunk_size: usize,
}

impl CsvSource {
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

impl EventSource for CsvSource {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn spec(&self) -> &TableSpec {
        &self.spec
    }

    fn chunks(&self) -> Result<ChunkIter<'_>> {
        let (schema, projection) = csv_header_schema(&self.path, &self.spec)?;
        let file = safe_open_file(&self.path, self.spec.name)?;
        let reader = ReaderBuilder::new(schema)
            .with_header(true)
            .with_batch_size(self.chunk_size)
            .with_projection(projection)
            .build(file)?;

        Ok(Box::new(reader.map(move |batch| self.spec.conform(&batch?))))
    }
}
