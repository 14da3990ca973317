//! Time helpers: ISO 8601 rendering, resolution/duration summaries and
//! CF-convention (`<unit> since <reference>`) encoding.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{GridError, Result};

/// Units of the CF encoding used when writing time coordinates.
pub const CF_WRITE_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// Render a timestamp as ISO 8601 with a `Z` suffix.
pub fn to_datetime_string(dt: &DateTime<Utc>) -> String {
    if dt.timestamp_subsec_nanos() != 0 {
        dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

/// Step between the first two timestamps, expressed in the largest unit
/// (years, months, days, hours, minutes, seconds, milliseconds) that the
/// step reaches, e.g. `"1 days"` or `"6 hours"`.
pub fn time_resolution(times: &[DateTime<Utc>]) -> Option<String> {
    if times.len() < 2 {
        return None;
    }
    let ms = (times[1] - times[0]).num_milliseconds() as f64;

    const DAY_MS: f64 = 86_400_000.0;
    let units = [
        ("years", DAY_MS * 365.2425),
        ("months", DAY_MS * 30.436875),
        ("days", DAY_MS),
        ("hours", 3_600_000.0),
        ("minutes", 60_000.0),
        ("seconds", 1_000.0),
        ("milliseconds", 1.0),
    ];
    units
        .iter()
        .map(|(name, size)| ((ms / size).trunc() as i64, name))
        .find(|(count, _)| *count > 0)
        .map(|(count, name)| format!("{} {}", count, name))
}

/// Span between first and last timestamps as `"N days, N hours, N minutes, N seconds"`,
/// omitting zero parts.
pub fn time_coverage_duration(times: &[DateTime<Utc>]) -> String {
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return String::new();
    };
    let ms = (*last - *first).num_milliseconds();
    let seconds = ms / 1000;

    let parts = [
        ("days", seconds / 86_400),
        ("hours", (seconds / 3_600) % 24),
        ("minutes", (seconds / 60) % 60),
        ("seconds", seconds % 60),
    ];
    parts
        .iter()
        .filter(|(_, v)| *v > 0)
        .map(|(k, v)| format!("{} {}", v, k))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parsed CF time units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CfTimeUnits {
    /// Length of one unit in milliseconds.
    pub unit_ms: f64,
    /// Reference instant.
    pub reference: DateTime<Utc>,
}

impl CfTimeUnits {
    /// Parse `"<unit> since <reference>"`. Returns `None` when `units` is
    /// not a CF time unit string.
    pub fn parse(units: &str) -> Option<Self> {
        let (unit, reference) = units.split_once(" since ")?;
        let unit_ms = match unit.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => 86_400_000.0,
            "hours" | "hour" | "hr" | "h" => 3_600_000.0,
            "minutes" | "minute" | "min" => 60_000.0,
            "seconds" | "second" | "sec" | "s" => 1_000.0,
            "milliseconds" | "millisecond" | "ms" => 1.0,
            _ => return None,
        };
        let reference = parse_reference(reference.trim())?;
        Some(Self { unit_ms, reference })
    }

    /// Decode raw offsets into timestamps.
    pub fn decode(&self, values: &[f64]) -> Result<Vec<DateTime<Utc>>> {
        values
            .iter()
            .map(|v| {
                let ms = (v * self.unit_ms).round();
                if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
                    return Err(GridError::InvalidData(format!("time value {} out of range", v)));
                }
                Duration::try_milliseconds(ms as i64)
                    .and_then(|offset| self.reference.checked_add_signed(offset))
                    .ok_or_else(|| GridError::InvalidData(format!("time value {} out of range", v)))
            })
            .collect()
    }
}

/// Encode timestamps as seconds since the Unix epoch (see [`CF_WRITE_UNITS`]).
pub fn encode_cf_times(times: &[DateTime<Utc>]) -> Vec<f64> {
    times
        .iter()
        .map(|t| t.timestamp_millis() as f64 / 1000.0)
        .collect()
}

fn parse_reference(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    let trimmed = value.trim_end_matches(" UTC").trim_end_matches('Z');
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_to_datetime_string() {
        assert_eq!(to_datetime_string(&ts("2000-01-16T06:00:00Z")), "2000-01-16T06:00:00Z");
        assert_eq!(
            to_datetime_string(&ts("2000-01-16T06:00:00.5Z")),
            "2000-01-16T06:00:00.500000Z"
        );
    }

    #[test]
    fn test_time_resolution() {
        let daily = [ts("2000-01-01T00:00:00Z"), ts("2000-01-02T00:00:00Z")];
        assert_eq!(time_resolution(&daily).as_deref(), Some("1 days"));

        let six_hourly = [ts("2000-01-01T00:00:00Z"), ts("2000-01-01T06:00:00Z")];
        assert_eq!(time_resolution(&six_hourly).as_deref(), Some("6 hours"));

        let monthly = [ts("2000-01-16T00:00:00Z"), ts("2000-02-16T00:00:00Z")];
        assert_eq!(time_resolution(&monthly).as_deref(), Some("1 months"));

        assert_eq!(time_resolution(&daily[..1]), None);
    }

    #[test]
    fn test_time_coverage_duration() {
        let times = [ts("2000-01-01T00:00:00Z"), ts("2000-01-03T05:00:30Z")];
        assert_eq!(time_coverage_duration(&times), "2 days, 5 hours, 30 seconds");
        assert_eq!(time_coverage_duration(&times[..1]), "");
    }

    #[test]
    fn test_cf_units_decode() {
        let units = CfTimeUnits::parse("days since 1950-01-01 00:00:00").unwrap();
        let decoded = units.decode(&[0.0, 1.5]).unwrap();
        assert_eq!(decoded[0], ts("1950-01-01T00:00:00Z"));
        assert_eq!(decoded[1], ts("1950-01-02T12:00:00Z"));

        let hours = CfTimeUnits::parse("hours since 2000-01-01").unwrap();
        assert_eq!(hours.decode(&[24.0]).unwrap()[0], ts("2000-01-02T00:00:00Z"));

        assert!(CfTimeUnits::parse("degrees_north").is_none());
        assert!(CfTimeUnits::parse("fortnights since 2000-01-01").is_none());
        assert!(units.decode(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_cf_units_decode_out_of_range() {
        let units = CfTimeUnits::parse("days since 1970-01-01").unwrap();
        // unmasked NetCDF default fill value
        let err = units.decode(&[0.0, 9.969209968386869e36]).unwrap_err();
        assert!(matches!(err, GridError::InvalidData(_)));
        // fits in i64 milliseconds but not in a calendar date
        assert!(units.decode(&[1.0e11]).is_err());
        assert!(units.decode(&[f64::NEG_INFINITY]).is_err());
    }

    #[test]
    fn test_encode_roundtrip_through_write_units() {
        let times = vec![ts("2020-06-01T12:00:00Z")];
        let encoded = encode_cf_times(&times);
        let units = CfTimeUnits::parse(CF_WRITE_UNITS).unwrap();
        assert_eq!(units.decode(&encoded).unwrap(), times);
    }
}
