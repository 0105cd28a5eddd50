//! IO utilities for stage artifacts
//!
//! Delimited text for the human-inspectable stage boundaries and Parquet for
//! filtered extracts and fold checkpoints.

pub mod csv;
pub mod parquet;

pub use csv::write_csv;
pub use parquet::{read_parquet, write_parquet};
