//! Chunked table sources
//!
//! Every raw table is read through [`EventSource`], which yields bounded
//! record batches already conformed to the table's canonical schema. The
//! source format (delimited text, Parquet or memory) is invisible to the
//! stages that consume the chunks.

pub mod csv;
pub mod memory;
pub mod parquet;

use std::path::Path;

use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::schema::TableSpec;

pub use self::csv::CsvSource;
pub use self::memory::MemorySource;
pub use self::parquet::ParquetSource;

/// Iterator over the conformed chunks of a source
pub type ChunkIter<'a> = Box<dyn Iterator<Item = Result<RecordBatch>> + 'a>;

/// A named table that can be streamed in bounded chunks
pub trait EventSource: std::fmt::Debug + Send + Sync {
    /// Name used in logs, errors and checkpoints
    fn name(&self) -> &str;

    /// Canonical layout of the chunks
    fn spec(&self) -> &TableSpec;

    /// Open the source and stream its chunks in source order
    ///
    /// Fails immediately when a required column is absent. Per-chunk read or
    /// conversion failures surface as `Err` items of the iterator.
    fn chunks(&self) -> Result<ChunkIter<'_>>;

    /// Read every chunk into memory
    fn read_all(&self) -> Result<Vec<RecordBatch>> {
        self.chunks()?.collect()
    }
}

/// Open a file source, choosing the reader from the file extension
///
/// `.parquet` files use the Parquet reader; anything else is read as CSV
/// with a header row.
#[must_use]
pub fn open_file(path: &Path, spec: TableSpec, chunk_size: usize) -> Box<dyn EventSource> {
    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));

    if is_parquet {
        Box::new(ParquetSource::new(path, spec, chunk_size))
    } else {
        Box::new(CsvSource::new(path, spec, chunk_size))
    }
}

/// Read a whole table from a file path
pub fn read_table(path: &Path, spec: TableSpec, chunk_size: usize) -> Result<Vec<RecordBatch>> {
    open_file(path, spec, chunk_size).read_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_selects_reader() {
        let parquet = open_file(Path::new("x/labevents_extract.PARQUET"), TableSpec::labevents(), 10);
        let csv = open_file(Path::new("x/labevents.csv"), TableSpec::labevents(), 10);
        assert!(format!("{parquet:?}").starts_with("ParquetSource"));
        assert!(format!("{csv:?}").starts_with("CsvSource"));
    }
}
