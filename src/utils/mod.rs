//! Shared helpers: Arrow column access, timestamps, file I/O and logging.

pub mod arrow;
pub mod io;
pub mod logging;
pub mod time;

pub use time::{days_between, format_timestamp, parse_timestamp};
