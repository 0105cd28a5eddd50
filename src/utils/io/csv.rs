//! Delimited text artifacts

use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::Result;
use crate::schema::TableSpec;
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Write record batches to a CSV file with a header row
///
/// Missing values are written as empty fields.
pub fn write_csv(path: &Path, batches: &[RecordBatch]) -> Result<usize> {
    let start = std::time::Instant::now();
    log_operation_start("Writing", path);

    let file = safe_create_file(path, "CSV artifact")?;
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .build(BufWriter::new(file));

    let mut rows = 0;
    for batch in batches {
        writer.write(batch)?;
        rows += batch.num_rows();
    }
    writer.into_inner().flush()?;

    log_operation_complete("Wrote", path, rows, Some(start.elapsed()));
    Ok(rows)
}

/// Read the header row of a CSV file and map it onto a table's canonical types
///
/// Columns the table does not know are typed as `Utf8` and projected away.
/// Returns the file schema and the projection selecting the table's columns.
pub fn csv_header_schema(path: &Path, spec: &TableSpec) -> Result<(SchemaRef, Vec<usize>)> {
    let mut file = safe_open_file(path, spec.name)?;
    let (header, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(0))?;

    let fields: Vec<Field> = header
        .fields()
        .iter()
        .map(|f| {
            let data_type = spec
                .columns
                .iter()
                .find(|c| c.name == f.name().as_str())
                .map_or(DataType::Utf8, |c| c.data_type.clone());
            Field::new(f.name(), data_type, true)
        })
        .collect();
    let schema = Schema::new(fields);
    spec.check(&schema)?;

    let projection = spec
        .columns
        .iter()
        .filter_map(|c| schema.index_of(c.name).ok())
        .collect();

    file.seek(SeekFrom::Start(0))?;
    Ok((Arc::new(schema), projection))
}
