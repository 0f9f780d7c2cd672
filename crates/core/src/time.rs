//! Flexible Time Parsing
//!
//! Models and users write dates in several shapes. Everything is normalized to
//! `DateTime<Utc>`; inputs without an offset are read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::{CoreError, CoreResult};

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y年%m月%d日"];

/// Parse a timestamp in any accepted format.
///
/// Accepted: RFC 3339, `YYYY-MM-DDTHH:MM:SS[Z]`, `YYYY-MM-DD HH:MM:SS`,
/// `YYYY-MM-DD`, `YYYY/MM/DD` and `YYYY年MM月DD日`. Date-only values become
/// midnight UTC.
pub fn parse_flexible(input: &str) -> CoreResult<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return Err(CoreError::parse("empty timestamp"));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = s.strip_suffix('Z').unwrap_or(s);
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc());
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    Err(CoreError::parse(format!("unrecognized timestamp: {}", s)))
}

/// Serde adapter for optional flexible timestamps.
///
/// `null`, a missing field and an empty string all deserialize to `None`.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_flexible(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
