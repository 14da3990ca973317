//! Flux query construction and annotated CSV decoding.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use edr_protocol::{parse_instant, DateTimeQuery};

use crate::error::{ProviderError, Result};

/// Time window of a Flux `range()` call.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeRange {
    /// No bound: everything since the epoch.
    All,
    /// From an instant on.
    From(DateTime<Utc>),
    /// Up to an instant.
    Until(DateTime<Utc>),
    /// Between two instants (stop exclusive).
    Between(DateTime<Utc>, DateTime<Utc>),
    /// Relative window ending now, as a Flux duration (`12h`, `7d`).
    Since(String),
}

impl TimeRange {
    /// Window for an EDR `datetime` parameter.
    ///
    /// An instant covers the one second starting at it; open interval ends
    /// (`..`) leave that side unbounded.
    pub fn from_datetime(datetime: Option<&str>) -> Result<Self> {
        let Some(datetime) = datetime else {
            return Ok(TimeRange::All);
        };
        let instant = |s: &str| parse_instant(s).map_err(ProviderError::from);
        match DateTimeQuery::parse(datetime)?.ordered() {
            DateTimeQuery::Instant(t) => TimeRange::at(instant(&t)?),
            DateTimeQuery::Interval { start, end } => match (start, end) {
                (Some(s), Some(e)) => {
                    let (s, e) = (instant(&s)?, instant(&e)?);
                    // range() rejects a window whose stop equals its start
                    if s == e {
                        TimeRange::at(s)
                    } else {
                        Ok(TimeRange::Between(s, e))
                    }
                }
                (Some(s), None) => Ok(TimeRange::From(instant(&s)?)),
                (None, Some(e)) => Ok(TimeRange::Until(instant(&e)?)),
                (None, None) => Ok(TimeRange::All),
            },
            DateTimeQuery::List(_) => Err(ProviderError::Query(
                "datetime lists are not supported".to_string(),
            )),
        }
    }

    /// The one second starting at `t`.
    fn at(t: DateTime<Utc>) -> Result<Self> {
        t.checked_add_signed(Duration::seconds(1))
            .map(|stop| TimeRange::Between(t, stop))
            .ok_or_else(|| ProviderError::Query(format!("datetime out of range: {}", t)))
    }

    /// Relative window, validated as a Flux duration literal.
    pub fn since(duration: &str) -> Result<Self> {
        let valid = !duration.is_empty()
            && duration.starts_with(|c: char| c.is_ascii_digit())
            && duration.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid {
            return Err(ProviderError::Query(format!("invalid duration: {}", duration)));
        }
        Ok(TimeRange::Since(duration.to_string()))
    }

    /// The `range()` call.
    pub fn to_flux(&self) -> String {
        match self {
            TimeRange::All => "range(start: 0)".to_string(),
            TimeRange::From(s) => format!("range(start: {})", flux_time(s)),
            TimeRange::Until(e) => format!("range(start: 0, stop: {})", flux_time(e)),
            TimeRange::Between(s, e) => {
                format!("range(start: {}, stop: {})", flux_time(s), flux_time(e))
            }
            TimeRange::Since(d) => format!("range(start: -{})", d),
        }
    }
}

fn flux_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Query of one measurement, with one row per timestamp and one column
/// per field.
pub fn define_query(bucket: &str, measurement: &str, range: &TimeRange) -> String {
    format!(
        "from(bucket: \"{}\")\n  |> {}\n  |> filter(fn: (r) => r._measurement == \"{}\")\n  |> pivot(rowKey: [\"_time\"], columnKey: [\"_field\"], valueColumn: \"_value\")",
        escape(bucket),
        range.to_flux(),
        escape(measurement)
    )
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// One decoded row of a query result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluxRecord {
    values: BTreeMap<String, String>,
}

impl FluxRecord {
    /// Value of a column; empty cells read as `None`.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The `_time` column.
    pub fn time(&self) -> Option<&str> {
        self.get("_time")
    }

    /// Numeric value of a column.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(|v| v.parse().ok())
    }
}

/// Decode an InfluxDB CSV response.
///
/// Annotation rows (`#datatype`, `#group`, `#default`) are skipped. Every
/// table starts with a header row naming `result` and `table`; data rows
/// are keyed by the most recent header.
pub fn parse_annotated_csv(body: &str) -> Result<Vec<FluxRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(body.as_bytes());

    let mut header: Option<Vec<String>> = None;
    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|e| ProviderError::InvalidData(format!("flux csv: {}", e)))?;
        if is_header(&row) {
            header = Some(row.iter().map(str::to_string).collect());
            continue;
        }
        let columns = header
            .as_ref()
            .ok_or_else(|| ProviderError::InvalidData("flux csv: data row before header".to_string()))?;
        let values = columns
            .iter()
            .zip(row.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, value)| (name.clone(), value.to_string()))
            .collect();
        records.push(FluxRecord { values });
    }
    Ok(records)
}

fn is_header(row: &csv::StringRecord) -> bool {
    row.iter().any(|f| f == "result") && row.iter().any(|f| f == "table")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_range_variants() {
        let s = Utc.with_ymd_and_hms(2023, 5, 1, 2, 25, 0).unwrap();
        let e = Utc.with_ymd_and_hms(2023, 5, 1, 2, 30, 0).unwrap();
        assert_eq!(
            TimeRange::Between(s, e).to_flux(),
            "range(start: 2023-05-01T02:25:00Z, stop: 2023-05-01T02:30:00Z)"
        );
        assert_eq!(TimeRange::From(s).to_flux(), "range(start: 2023-05-01T02:25:00Z)");
        assert_eq!(
            TimeRange::Until(e).to_flux(),
            "range(start: 0, stop: 2023-05-01T02:30:00Z)"
        );
        assert_eq!(TimeRange::All.to_flux(), "range(start: 0)");
        assert_eq!(TimeRange::since("12h").unwrap().to_flux(), "range(start: -12h)");
    }

    #[test]
    fn test_range_from_datetime() {
        assert_eq!(TimeRange::from_datetime(None).unwrap(), TimeRange::All);
        assert_eq!(
            TimeRange::from_datetime(Some("2023-05-01T02:30:00Z")).unwrap().to_flux(),
            "range(start: 2023-05-01T02:30:00Z, stop: 2023-05-01T02:30:01Z)"
        );
        assert!(matches!(
            TimeRange::from_datetime(Some("../2023-05-01T12:00:00Z")).unwrap(),
            TimeRange::Until(_)
        ));
        assert!(matches!(
            TimeRange::from_datetime(Some("2023-05-01T12:00:00Z/..")).unwrap(),
            TimeRange::From(_)
        ));
        // reversed bounds are reordered
        let reversed = TimeRange::from_datetime(Some("2023-05-02T00:00:00Z/2023-05-01T00:00:00Z")).unwrap();
        assert_eq!(
            reversed.to_flux(),
            "range(start: 2023-05-01T00:00:00Z, stop: 2023-05-02T00:00:00Z)"
        );
        assert!(TimeRange::from_datetime(Some("2023-05-01,2023-05-02")).is_err());
    }

    #[test]
    fn test_zero_length_interval_is_an_instant() {
        assert_eq!(
            TimeRange::from_datetime(Some("2023-05-01T02:30:00Z/2023-05-01T02:30:00Z"))
                .unwrap()
                .to_flux(),
            "range(start: 2023-05-01T02:30:00Z, stop: 2023-05-01T02:30:01Z)"
        );
    }

    #[test]
    fn test_since_rejects_injection() {
        assert!(TimeRange::since("1h) |> drop(").is_err());
        assert!(TimeRange::since("").is_err());
        assert!(TimeRange::since("h1").is_err());
    }

    #[test]
    fn test_define_query() {
        let q = define_query("oceanlab", "ctd_temperature_munkholmen", &TimeRange::All);
        assert!(q.starts_with("from(bucket: \"oceanlab\")"));
        assert!(q.contains("|> range(start: 0)"));
        assert!(q.contains("r._measurement == \"ctd_temperature_munkholmen\""));
        assert!(q.ends_with("valueColumn: \"_value\")"));
    }

    #[test]
    fn test_parse_annotated_csv() {
        let body = "#datatype,string,long,dateTime:RFC3339,double,string\n\
                    #group,false,false,false,false,false\n\
                    #default,_result,,,,\n\
                    ,result,table,_time,temperature,approved\n\
                    ,,0,2023-05-01T02:30:00Z,8.5,yes\n\
                    ,,0,2023-05-01T02:31:00Z,,no\n\
                    \n\
                    ,result,table,_time,salinity\n\
                    ,,1,2023-05-01T02:30:00Z,33.1\n";
        let records = parse_annotated_csv(body).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].time(), Some("2023-05-01T02:30:00Z"));
        assert_eq!(records[0].number("temperature"), Some(8.5));
        assert_eq!(records[1].number("temperature"), None);
        assert_eq!(records[1].get("approved"), Some("no"));
        assert_eq!(records[2].number("salinity"), Some(33.1));
        assert_eq!(records[2].get("temperature"), None);
    }

    #[test]
    fn test_parse_rejects_rows_without_header() {
        assert!(parse_annotated_csv(",,0,2023-05-01T02:30:00Z,8.5\n").is_err());
        assert!(parse_annotated_csv("").unwrap().is_empty());
    }
}
