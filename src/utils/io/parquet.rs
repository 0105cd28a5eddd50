//! Parquet file operations
//!
//! Used for filtered extracts and fold checkpoints: compact, typed and
//! readable chunk by chunk through [`crate::source::ParquetSource`].

use std::path::Path;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::Result;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Default batch size for Parquet reading
pub const DEFAULT_BATCH_SIZE: usize = 16384;

/// Write batches sharing `schema` to a Parquet file
///
/// An empty batch list still produces a valid file carrying the schema.
pub fn write_parquet(path: &Path, schema: SchemaRef, batches: &[RecordBatch]) -> Result<usize> {
    let start = std::time::Instant::now();
    log_operation_start("Writing", path);

    let file = safe_create_file(path, "Parquet extract")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;

    let mut rows = 0;
    for batch in batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.close()?;

    log_operation_complete("Wrote", path, rows, Some(start.elapsed()));
    Ok(rows)
}

/// Read a whole Parquet file into record batches
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>> {
    let start = std::time::Instant::now();
    log_operation_start("Reading parquet file", path);

    let file = safe_open_file(path, "Parquet extract")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(DEFAULT_BATCH_SIZE)
        .build()?;

    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    log_operation_complete("Read", path, rows, Some(start.elapsed()));
    Ok(batches)
}
