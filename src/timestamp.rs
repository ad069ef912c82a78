//! Timestamp Codec
//!
//! Converts calendar instants into the fixed-width `YYYYMMDDhhmmss` form the
//! wiki API accepts as a revision continuation token.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};

/// Width of an encoded timestamp
pub const TIMESTAMP_WIDTH: usize = 14;

/// Encode an instant as `YYYYMMDDhhmmss` (UTC, zero-padded).
///
/// Lexicographic order of the output matches chronological order for every
/// year in `0..=9999`, which is the only range the wiki API accepts.
pub fn encode(instant: DateTime<Utc>) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        instant.year(),
        instant.month(),
        instant.day(),
        instant.hour(),
        instant.minute(),
        instant.second()
    )
}

/// Human-readable date shown under each playback frame, e.g. `Fri Mar 04 2005`.
pub fn date_label(instant: DateTime<Utc>) -> String {
    instant.format("%a %b %d %Y").to_string()
}

/// Parse a user-supplied instant: RFC 3339, `YYYY-MM-DDThh:mm:ss` (UTC) or
/// a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_instant(input: &str) -> Result<DateTime<Utc>, String> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("unrecognised date '{}' (expected YYYY-MM-DD or RFC 3339)", input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_encode_zero_pads_every_field() {
        let instant = Utc.with_ymd_and_hms(2005, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(encode(instant), "20050304050607");
        assert_eq!(encode(instant).len(), TIMESTAMP_WIDTH);
    }

    #[test]
    fn test_encode_ignores_subsecond_precision() {
        let instant = Utc.with_ymd_and_hms(2022, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::milliseconds(999);
        assert_eq!(encode(instant), "20221231235959");
    }

    #[test]
    fn test_encode_orders_like_instants() {
        let earlier = Utc.with_ymd_and_hms(2009, 12, 31, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap();
        assert!(encode(earlier) < encode(later));
    }

    #[test]
    fn test_parse_instant_forms() {
        let midnight = Utc.with_ymd_and_hms(2005, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_instant("2005-01-01").unwrap(), midnight);
        assert_eq!(parse_instant("2005-01-01T00:00:00").unwrap(), midnight);
        assert_eq!(parse_instant("2005-01-01T02:00:00+02:00").unwrap(), midnight);
        assert!(parse_instant("first of january").is_err());
    }

    #[test]
    fn test_date_label() {
        let instant = Utc.with_ymd_and_hms(2005, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(date_label(instant), "Fri Mar 04 2005");
    }
}
