//! Logging utilities for stage reporting and progress tracking

pub mod log;
pub mod progress;

pub use log::{log_operation_complete, log_operation_start, log_stage_summary, log_warning};
pub use progress::{create_chunk_progress_bar, create_spinner, finish_progress_bar};
