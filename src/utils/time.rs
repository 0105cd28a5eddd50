//! Timestamp parsing and arithmetic

use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Format used when timestamps are written to artifacts
pub const OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a timestamp cell
///
/// Accepts space or `T` separated date-times with optional fractional
/// seconds, a trailing `Z`, or a bare date (read as midnight).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().trim_end_matches('Z');
    if value.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Render a timestamp for artifacts
#[must_use]
pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(OUTPUT_FORMAT).to_string()
}

/// Signed length of `to - from` in fractional days
#[must_use]
pub fn days_between(from: &NaiveDateTime, to: &NaiveDateTime) -> f64 {
    (*to - *from).num_seconds() as f64 / 86_400.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn parses_common_layouts() {
        let expected = NaiveDate::from_ymd_opt(2180, 5, 6)
            .unwrap()
            .and_hms_opt(22, 23, 0)
            .unwrap();
        assert_eq!(ts("2180-05-06 22:23:00"), expected);
        assert_eq!(ts("2180-05-06T22:23:00"), expected);
        assert_eq!(ts("2180-05-06T22:23:00.000Z"), expected);
        assert_eq!(
            ts("2180-05-06"),
            NaiveDate::from_ymd_opt(2180, 5, 6).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2020-13-01").is_none());
    }

    #[test]
    fn fractional_days() {
        let a = ts("2020-01-01 00:00:00");
        let b = ts("2020-01-02 12:00:00");
        assert!((days_between(&a, &b) - 1.5).abs() < 1e-12);
        assert!((days_between(&b, &a) + 1.5).abs() < 1e-12);
    }
}
