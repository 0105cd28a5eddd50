//! A Rust library for building a 30-day readmission feature table from raw
//! hospital admission, patient, diagnosis, laboratory, prescription and ICU
//! extracts, with chunked event aggregation, multiple imputation and a
//! cross-validated baseline model.

pub mod algorithm;
pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod schema;
pub mod source;
pub mod synthetic;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{EventSources, Pipeline, PipelineOutput, ReferenceTables, RunSummary};

// Stages
pub use algorithm::cohort::{Cohort, CohortBuilder};
pub use algorithm::events::{EventAggregator, EventFeatures};
pub use algorithm::features::{FeatureAssembler, FeatureTable};
pub use algorithm::imputation::{ImputationResult, MiceImputer};
pub use algorithm::outcome::{Labels, label_readmissions};
pub use algorithm::utilization::{IcuUtilization, prior_admission_counts};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Sources and schema
pub use schema::features::{FEATURE_SCHEMA_VERSION, MODEL_COLUMNS, feature_schema};
pub use source::{EventSource, open_file};
