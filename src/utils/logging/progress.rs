//! Progress reporting for chunked scans
//!
//! Event tables are read without knowing their length up front, so the
//! chunk bar counts rows with a spinner rather than filling towards a total.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Template for the per-source chunk counter
pub const CHUNK_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {prefix} {human_pos} rows ({per_sec}) {msg}";

/// Template for plain spinners
pub const SPINNER_TEMPLATE: &str = "{spinner:.green} {elapsed_precise} {msg}";

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Create a row counter for one chunked source
///
/// Returns a hidden bar when `visible` is false so callers can tick it
/// unconditionally.
#[must_use]
pub fn create_chunk_progress_bar(source: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(style(CHUNK_TEMPLATE));
    pb.set_prefix(source.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Create a spinner for operations without a known length
#[must_use]
pub fn create_spinner(message: Option<&str>, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(style(SPINNER_TEMPLATE));
    if let Some(msg) = message {
        pb.set_message(msg.to_string());
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Finish a progress bar with an optional completion message
pub fn finish_progress_bar(pb: &ProgressBar, message: Option<&str>) {
    if let Some(msg) = message {
        pb.finish_with_message(msg.to_string());
    } else {
        pb.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_bar_still_counts() {
        let pb = create_chunk_progress_bar("labevents", false);
        pb.inc(5);
        pb.inc(7);
        assert_eq!(pb.position(), 12);
        finish_progress_bar(&pb, Some("done"));
        assert!(pb.is_finished());
    }
}
