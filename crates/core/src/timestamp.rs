//! RFC3339 timestamp codec.
//!
//! All timestamps in the data model are stored internally as whole UTC
//! seconds since the Unix epoch and serialised as `YYYY-MM-DDTHH:MM:SSZ`.
//! Parsing additionally accepts `±HH:MM` offsets and ignores a
//! fractional-second suffix.

use crate::error::{Error, Result};
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Format `epoch_secs` (UTC seconds since 1970-01-01) as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_rfc3339(epoch_secs: i64) -> String {
    let dt = Utc
        .timestamp_opt(epoch_secs, 0)
        .single()
        .expect("epoch_secs out of chrono's representable range");
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an RFC3339 timestamp, accepting `Z` or `±HH:MM` offsets and
/// discarding any fractional-second component.
pub fn parse_rfc3339(s: &str) -> Result<i64> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc).timestamp())
        .map_err(|_| Error::InvalidTimestamp(s.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_epoch_zero() {
        assert_eq!(format_rfc3339(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn parses_offset_and_fraction() {
        assert_eq!(parse_rfc3339("2024-01-15T10:30:00.500+02:00").unwrap(),
            parse_rfc3339("2024-01-15T08:30:00Z").unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_rfc3339("not-a-timestamp").is_err());
    }

    proptest! {
        #[test]
        fn roundtrips_over_representable_range(secs in -62_135_596_800i64..=253_402_300_799i64) {
            let formatted = format_rfc3339(secs);
            let parsed = parse_rfc3339(&formatted).unwrap();
            prop_assert_eq!(parsed, secs);
        }
    }
}
