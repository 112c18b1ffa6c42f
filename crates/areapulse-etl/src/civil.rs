//! Civil-time helpers for the pipeline's fixed timezone.
//!
//! All observation and processing timestamps are civil Asia/Seoul values at
//! second precision, carried as `NaiveDateTime` once converted. The two wire
//! formats are the upstream feed's compact form (`YYYYMMDD HHmm`) and the
//! normalized form (`YYYY-MM-DD HH:MM:SS`) used in the ledger document, the
//! identity hash, and the warehouse columns.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// The fixed civil timezone of the pipeline.
pub const PIPELINE_TZ: Tz = chrono_tz::Asia::Seoul;

/// Normalized second-precision timestamp format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Compact minute-precision format of the upstream feed's `CMRCL_TIME`.
pub const RAW_TIMESTAMP_FORMAT: &str = "%Y%m%d %H%M";

/// Converts an instant to the pipeline's civil time.
#[must_use]
pub fn to_civil(instant: DateTime<Utc>) -> NaiveDateTime {
    instant.with_timezone(&PIPELINE_TZ).naive_local()
}

/// Current wall-clock time as pipeline civil time.
#[must_use]
pub fn now() -> NaiveDateTime {
    to_civil(Utc::now())
}

/// Formats a timestamp in the normalized form.
#[must_use]
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parses the upstream feed's compact timestamp (`20250708 0930`).
///
/// Seconds are not part of the wire form and normalize to zero.
///
/// # Errors
///
/// Returns the chrono parse error; callers treat it as a skip condition.
pub fn parse_raw_timestamp(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, RAW_TIMESTAMP_FORMAT)
}

/// Serde adapter storing `NaiveDateTime` as a normalized timestamp string.
pub mod timestamp_string {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    use super::TIMESTAMP_FORMAT;

    /// Serializes as `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&ts.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Deserializes from `YYYY-MM-DD HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Fails on any string not in the normalized format.
    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveDateTime, D::Error> {
        let s = String::deserialize(de)?;
        NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    #[test]
    fn parse_raw_timestamp_normalizes_seconds() {
        let ts = parse_raw_timestamp("20250708 0930").unwrap();
        assert_eq!(format_timestamp(ts), "2025-07-08 09:30:00");
    }

    #[test]
    fn parse_raw_timestamp_rejects_garbage() {
        assert!(parse_raw_timestamp("not a time").is_err());
        assert!(parse_raw_timestamp("2025-07-08 09:30").is_err());
    }

    #[test]
    fn to_civil_applies_utc_offset() {
        // KST is UTC+9 year-round.
        let utc = Utc.with_ymd_and_hms(2025, 7, 8, 0, 35, 0).unwrap();
        let civil = to_civil(utc);
        let expected = NaiveDate::from_ymd_opt(2025, 7, 8)
            .unwrap()
            .and_hms_opt(9, 35, 0)
            .unwrap();
        assert_eq!(civil, expected);
    }
}
