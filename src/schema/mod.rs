//! Table schemas
//!
//! Raw input tables are addressed by column name and conformed to canonical
//! Arrow types on every chunk. The feature table has a fixed, versioned
//! column list in [`features`].

pub mod features;

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, new_null_array};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;

use crate::error::{PipelineError, Result};

pub use features::{FEATURE_SCHEMA_VERSION, MODEL_COLUMNS, feature_schema};

/// One expected column of a raw table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Column name in the source header
    pub name: &'static str,
    /// Canonical type after conforming
    pub data_type: DataType,
    /// Whether the table is unusable without this column
    pub required: bool,
}

impl ColumnSpec {
    const fn required(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            required: true,
        }
    }

    const fn optional(name: &'static str, data_type: DataType) -> Self {
        Self {
            name,
            data_type,
            required: false,
        }
    }
}

/// Expected layout of a raw table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    /// Table name used in logs and errors
    pub name: &'static str,
    /// Expected columns in canonical order
    pub columns: Vec<ColumnSpec>,
}

impl TableSpec {
    /// Admission records
    #[must_use]
    pub fn admissions() -> Self {
        Self {
            name: "admissions",
            columns: vec![
                ColumnSpec::required("subject_id", DataType::Int64),
                ColumnSpec::required("hadm_id", DataType::Int64),
                ColumnSpec::required("admittime", DataType::Utf8),
                ColumnSpec::required("dischtime", DataType::Utf8),
                ColumnSpec::required("admission_type", DataType::Utf8),
                ColumnSpec::required("hospital_expire_flag", DataType::Int64),
                ColumnSpec::optional("insurance", DataType::Utf8),
                ColumnSpec::optional("marital_status", DataType::Utf8),
                ColumnSpec::optional("race", DataType::Utf8),
            ],
        }
    }

    /// Patient records
    #[must_use]
    pub fn patients() -> Self {
        Self {
            name: "patients",
            columns: vec![
                ColumnSpec::required("subject_id", DataType::Int64),
                ColumnSpec::required("gender", DataType::Utf8),
                ColumnSpec::required("anchor_age", DataType::Int64),
                ColumnSpec::required("anchor_year", DataType::Int64),
            ],
        }
    }

    /// Diagnosis codes
    #[must_use]
    pub fn diagnoses() -> Self {
        Self {
            name: "diagnoses_icd",
            columns: vec![
                ColumnSpec::required("hadm_id", DataType::Int64),
                ColumnSpec::required("icd_code", DataType::Utf8),
                ColumnSpec::required("icd_version", DataType::Int64),
                ColumnSpec::optional("subject_id", DataType::Int64),
            ],
        }
    }

    /// Laboratory item dictionary
    #[must_use]
    pub fn lab_items() -> Self {
        Self {
            name: "d_labitems",
            columns: vec![
                ColumnSpec::required("itemid", DataType::Int64),
                ColumnSpec::required("label", DataType::Utf8),
                ColumnSpec::optional("fluid", DataType::Utf8),
            ],
        }
    }

    /// Laboratory results
    #[must_use]
    pub fn labevents() -> Self {
        Self {
            name: "labevents",
            columns: vec![
                ColumnSpec::required("hadm_id", DataType::Int64),
                ColumnSpec::required("itemid", DataType::Int64),
                ColumnSpec::required("charttime", DataType::Utf8),
                ColumnSpec::required("valuenum", DataType::Float64),
            ],
        }
    }

    /// Prescriptions
    #[must_use]
    pub fn prescriptions() -> Self {
        Self {
            name: "prescriptions",
            columns: vec![
                ColumnSpec::required("hadm_id", DataType::Int64),
                ColumnSpec::required("drug", DataType::Utf8),
            ],
        }
    }

    /// ICU stays
    #[must_use]
    pub fn icustays() -> Self {
        Self {
            name: "icustays",
            columns: vec![
                ColumnSpec::required("hadm_id", DataType::Int64),
                ColumnSpec::required("intime", DataType::Utf8),
                ColumnSpec::required("outtime", DataType::Utf8),
            ],
        }
    }

    /// Canonical Arrow schema; every column is nullable
    #[must_use]
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::new(Schema::new(
            self.columns
                .iter()
                .map(|c| Field::new(c.name, c.data_type.clone(), true))
                .collect::<Vec<_>>(),
        ))
    }

    /// Names of the required columns
    pub fn required_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().filter(|c| c.required).map(|c| c.name)
    }

    /// Fail when a source schema lacks a required column
    pub fn check(&self, schema: &Schema) -> Result<()> {
        let missing: Vec<&str> = self
            .required_columns()
            .filter(|name| schema.index_of(name).is_err())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::schema(
                self.name,
                format!("missing required column(s): {}", missing.join(", ")),
            ))
        }
    }

    /// Select, order and cast a batch to the canonical schema
    ///
    /// Absent optional columns become all-null columns. Absent required
    /// columns are a schema error.
    pub fn conform(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        self.check(batch.schema().as_ref())?;

        let columns = self
            .columns
            .iter()
            .map(|spec| -> Result<ArrayRef> {
                match batch.column_by_name(spec.name) {
                    Some(column) if column.data_type() == &spec.data_type => Ok(column.clone()),
                    Some(column) => cast(column.as_ref(), &spec.data_type).map_err(|e| {
                        PipelineError::schema(
                            self.name,
                            format!(
                                "column {} cannot be read as {}: {e}",
                                spec.name, spec.data_type
                            ),
                        )
                    }),
                    None => Ok(new_null_array(&spec.data_type, batch.num_rows())),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RecordBatch::try_new(self.arrow_schema(), columns)?)
    }
}
