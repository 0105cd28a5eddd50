//! Logging utilities
//!
//! One message shape for artifact reads and writes and one for the row
//! counts of every stage step.

use std::path::Path;
use std::time::Duration;

/// Log the start of a file operation
pub fn log_operation_start(operation: &str, path: &Path) {
    log::info!("{} {}", operation, path.display());
}

/// Log a finished file operation
///
/// # Arguments
/// * `operation` - Past-tense verb, e.g. `Wrote`
/// * `path` - File that was read or written
/// * `rows` - Rows moved
/// * `elapsed` - Time taken, when measured
pub fn log_operation_complete(operation: &str, path: &Path, rows: usize, elapsed: Option<Duration>) {
    match elapsed {
        Some(duration) => log::info!("{operation} {rows} rows, {} ({duration:?})", path.display()),
        None => log::info!("{operation} {rows} rows, {}", path.display()),
    }
}

/// Log the row counts entering and leaving a stage step
pub fn log_stage_summary(stage: &str, rows_in: usize, rows_out: usize) {
    log::info!("{stage}: {rows_in} rows in, {rows_out} rows out");
}

/// Log a warning, optionally tied to a path
pub fn log_warning(message: &str, path: Option<&Path>) {
    match path {
        Some(path) => log::warn!("{message}: {}", path.display()),
        None => log::warn!("{message}"),
    }
}
