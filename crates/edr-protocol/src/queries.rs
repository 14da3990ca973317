//! Query parameter parsing for EDR and coverage endpoints.
//!
//! This module handles parsing and normalization of the request
//! parameters shared by the providers: WKT geometries (`coords`),
//! bounding boxes, datetime instants/intervals, parameter selection
//! and coverage `subset` expressions.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when parsing query parameters.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateParseError {
    /// Invalid WKT format.
    #[error("Invalid WKT format: {0}")]
    InvalidWkt(String),

    /// Invalid coordinate value.
    #[error("Invalid coordinate value: {0}")]
    InvalidCoordinate(String),

    /// Missing required coordinate.
    #[error("Missing required coordinate: {0}")]
    MissingCoordinate(String),

    /// Coordinate out of valid range.
    #[error("Coordinate out of range: {0}")]
    OutOfRange(String),

    /// Invalid datetime expression.
    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    /// A vertical (z) component was supplied where only 2D is supported.
    #[error("z-axis not supported")]
    ZAxisNotSupported,
}

/// A geometry parsed from a WKT `coords` parameter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum QueryGeometry {
    /// `POINT(x y)`
    Point { x: f64, y: f64 },
    /// `MULTIPOINT((x1 y1),(x2 y2))`
    MultiPoint(Vec<(f64, f64)>),
    /// `LINESTRING(x1 y1, x2 y2, ...)`
    LineString(Vec<(f64, f64)>),
    /// `POLYGON((x1 y1, ..., x1 y1))` (exterior ring only)
    Polygon(Vec<(f64, f64)>),
}

impl QueryGeometry {
    /// Parse a WKT geometry.
    ///
    /// Accepts `POINT`, `MULTIPOINT`, `LINESTRING` and `POLYGON`, with or
    /// without a space before the opening parenthesis. A third ordinate
    /// on any vertex is ignored.
    pub fn parse(wkt: &str) -> Result<Self, CoordinateParseError> {
        let wkt = wkt.trim();
        let upper = wkt.to_uppercase();

        if upper.starts_with("MULTIPOINT") {
            return parse_wkt_multipoint(wkt).map(QueryGeometry::MultiPoint);
        }
        if upper.starts_with("POINT") {
            let inner = outer_parens(wkt)?;
            let (x, y) = parse_vertex(inner)?;
            return Ok(QueryGeometry::Point { x, y });
        }
        if upper.starts_with("LINESTRING") {
            let points = parse_vertex_list(outer_parens(wkt)?)?;
            if points.len() < 2 {
                return Err(CoordinateParseError::InvalidWkt(
                    "LINESTRING must have at least 2 points".to_string(),
                ));
            }
            return Ok(QueryGeometry::LineString(points));
        }
        if upper.starts_with("POLYGON") {
            let start = wkt.find("((").ok_or_else(|| {
                CoordinateParseError::InvalidWkt("Missing opening parentheses".to_string())
            })?;
            let end = wkt.rfind("))").ok_or_else(|| {
                CoordinateParseError::InvalidWkt("Missing closing parentheses".to_string())
            })?;
            if end <= start {
                return Err(CoordinateParseError::InvalidWkt(
                    "Invalid parenthesis order".to_string(),
                ));
            }
            // Only the exterior ring is kept.
            let exterior = wkt[start + 2..end].split(')').next().unwrap_or("");
            let ring = parse_vertex_list(exterior)?;
            if ring.len() < 4 {
                return Err(CoordinateParseError::InvalidWkt(
                    "Polygon must have at least 4 points (including closing point)".to_string(),
                ));
            }
            return Ok(QueryGeometry::Polygon(ring));
        }

        Err(CoordinateParseError::InvalidWkt(format!(
            "Unsupported geometry '{}', expected POINT, MULTIPOINT, LINESTRING or POLYGON",
            wkt
        )))
    }

    /// Geometry type name as used in log output and dispatch.
    pub fn geom_type(&self) -> &'static str {
        match self {
            QueryGeometry::Point { .. } => "Point",
            QueryGeometry::MultiPoint(_) => "MultiPoint",
            QueryGeometry::LineString(_) => "LineString",
            QueryGeometry::Polygon(_) => "Polygon",
        }
    }

    /// All vertices of the geometry.
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        match self {
            QueryGeometry::Point { x, y } => vec![(*x, *y)],
            QueryGeometry::MultiPoint(p)
            | QueryGeometry::LineString(p)
            | QueryGeometry::Polygon(p) => p.clone(),
        }
    }

    /// Bounds as `[minx, miny, maxx, maxy]`.
    pub fn bounds(&self) -> [f64; 4] {
        let mut bounds = [
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        ];
        for (x, y) in self.vertices() {
            bounds[0] = bounds[0].min(x);
            bounds[1] = bounds[1].min(y);
            bounds[2] = bounds[2].max(x);
            bounds[3] = bounds[3].max(y);
        }
        bounds
    }

    /// Separate x and y ordinate lists.
    pub fn xy(&self) -> (Vec<f64>, Vec<f64>) {
        self.vertices().into_iter().unzip()
    }

    /// Convert into a `geo` geometry for spatial predicates.
    pub fn to_geo(&self) -> geo::Geometry<f64> {
        match self {
            QueryGeometry::Point { x, y } => geo::Geometry::Point(geo::Point::new(*x, *y)),
            QueryGeometry::MultiPoint(points) => geo::Geometry::MultiPoint(geo::MultiPoint(
                points.iter().map(|(x, y)| geo::Point::new(*x, *y)).collect(),
            )),
            QueryGeometry::LineString(points) => {
                geo::Geometry::LineString(geo::LineString::from(points.clone()))
            }
            QueryGeometry::Polygon(ring) => geo::Geometry::Polygon(geo::Polygon::new(
                geo::LineString::from(ring.clone()),
                vec![],
            )),
        }
    }
}

/// Extract the text between the first `(` and the last `)`.
fn outer_parens(wkt: &str) -> Result<&str, CoordinateParseError> {
    let start = wkt.find('(').ok_or_else(|| {
        CoordinateParseError::InvalidWkt("Missing opening parenthesis".to_string())
    })?;
    let end = wkt.rfind(')').ok_or_else(|| {
        CoordinateParseError::InvalidWkt("Missing closing parenthesis".to_string())
    })?;
    if end <= start {
        return Err(CoordinateParseError::InvalidWkt(
            "Invalid parenthesis order".to_string(),
        ));
    }
    Ok(wkt[start + 1..end].trim())
}

/// Parse `x y` or `x y z` into `(x, y)`.
fn parse_vertex(text: &str) -> Result<(f64, f64), CoordinateParseError> {
    let text = text.trim().trim_matches(|c: char| c == '(' || c == ')').trim();
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(CoordinateParseError::InvalidWkt(format!(
            "Expected 'x y' format, got '{}'",
            text
        )));
    }
    let x: f64 = parts[0]
        .parse()
        .map_err(|_| CoordinateParseError::InvalidCoordinate(parts[0].to_string()))?;
    let y: f64 = parts[1]
        .parse()
        .map_err(|_| CoordinateParseError::InvalidCoordinate(parts[1].to_string()))?;
    if !x.is_finite() || !y.is_finite() {
        return Err(CoordinateParseError::InvalidCoordinate(text.to_string()));
    }
    Ok((x, y))
}

fn parse_vertex_list(text: &str) -> Result<Vec<(f64, f64)>, CoordinateParseError> {
    text.split(',').map(parse_vertex).collect()
}

/// Parse a WKT MULTIPOINT, accepting both `((x y),(x y))` and `(x y, x y)`.
fn parse_wkt_multipoint(wkt: &str) -> Result<Vec<(f64, f64)>, CoordinateParseError> {
    let inner = outer_parens(wkt)?;

    let mut points = Vec::new();
    let mut depth = 0;
    let mut current = String::new();

    for ch in inner.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                points.push(parse_vertex(&current)?);
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        points.push(parse_vertex(&current)?);
    }

    if points.is_empty() {
        return Err(CoordinateParseError::InvalidWkt(
            "MULTIPOINT must contain at least one point".to_string(),
        ));
    }

    Ok(points)
}

/// Bounding box query parameters (for cube/coverage queries).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BboxQuery {
    /// Minimum x (western longitude).
    pub west: f64,

    /// Minimum y (southern latitude).
    pub south: f64,

    /// Maximum x (eastern longitude).
    pub east: f64,

    /// Maximum y (northern latitude).
    pub north: f64,
}

impl BboxQuery {
    /// Parse a bbox parameter.
    ///
    /// Format: `west,south,east,north`. Six values (a bbox with a
    /// vertical component) are rejected as unsupported.
    pub fn parse(bbox: &str) -> Result<Self, CoordinateParseError> {
        let values = bbox
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|_| CoordinateParseError::InvalidCoordinate(part.to_string()))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Self::from_values(&values)
    }

    /// Build a bbox from already-split values.
    pub fn from_values(values: &[f64]) -> Result<Self, CoordinateParseError> {
        match values.len() {
            4 => {}
            6 => return Err(CoordinateParseError::ZAxisNotSupported),
            n => {
                return Err(CoordinateParseError::InvalidCoordinate(format!(
                    "Expected 4 values for bbox, got {}",
                    n
                )))
            }
        }

        let (west, south, east, north) = (values[0], values[1], values[2], values[3]);

        if south > north {
            return Err(CoordinateParseError::OutOfRange(
                "South must be less than or equal to north".to_string(),
            ));
        }

        Ok(BboxQuery {
            west,
            south,
            east,
            north,
        })
    }

    /// Values as `[minx, miny, maxx, maxy]`.
    pub fn as_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Closed polygon ring covering the box.
    pub fn to_polygon(&self) -> QueryGeometry {
        QueryGeometry::Polygon(vec![
            (self.west, self.south),
            (self.east, self.south),
            (self.east, self.north),
            (self.west, self.north),
            (self.west, self.south),
        ])
    }
}

/// Parsed datetime query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum DateTimeQuery {
    /// A specific instant.
    Instant(String),

    /// Multiple specific instants (comma-separated list).
    List(Vec<String>),

    /// An interval with start and end; `None` is an open (`..`) end.
    Interval {
        start: Option<String>,
        end: Option<String>,
    },
}

impl DateTimeQuery {
    /// Normalize a raw datetime parameter: a trailing `Z` is dropped
    /// and `Z/` interval separators become `/`.
    pub fn normalize(datetime: &str) -> String {
        datetime.trim().trim_end_matches('Z').replace("Z/", "/")
    }

    /// Parse a datetime parameter.
    ///
    /// Accepts formats:
    /// - Instant: `2024-12-29T12:00:00Z`
    /// - List: `2024-12-29T12:00:00Z,2024-12-29T13:00:00Z`
    /// - Interval: `2024-12-29T00:00:00Z/2024-12-29T23:59:59Z`
    /// - Open start: `../2024-12-29T23:59:59Z`
    /// - Open end: `2024-12-29T00:00:00Z/..`
    pub fn parse(datetime: &str) -> Result<Self, CoordinateParseError> {
        let datetime = datetime.trim();
        if datetime.is_empty() {
            return Err(CoordinateParseError::InvalidDatetime(
                "empty datetime".to_string(),
            ));
        }

        if datetime.contains('/') && !datetime.contains(',') {
            let parts: Vec<&str> = datetime.split('/').collect();
            if parts.len() != 2 {
                return Err(CoordinateParseError::InvalidDatetime(
                    "Invalid datetime interval format".to_string(),
                ));
            }

            let bound = |s: &str| -> Result<Option<String>, CoordinateParseError> {
                let s = s.trim();
                if s == ".." || s.is_empty() {
                    Ok(None)
                } else {
                    parse_instant(s)?;
                    Ok(Some(s.to_string()))
                }
            };

            return Ok(DateTimeQuery::Interval {
                start: bound(parts[0])?,
                end: bound(parts[1])?,
            });
        }

        if datetime.contains(',') {
            let times: Vec<String> = datetime
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();

            for t in &times {
                parse_instant(t)?;
            }

            return match times.len() {
                1 => Ok(DateTimeQuery::Instant(times[0].clone())),
                _ => Ok(DateTimeQuery::List(times)),
            };
        }

        parse_instant(datetime)?;
        Ok(DateTimeQuery::Instant(datetime.to_string()))
    }

    /// Return the query with interval bounds in ascending order.
    pub fn ordered(self) -> Self {
        match self {
            DateTimeQuery::Interval {
                start: Some(start),
                end: Some(end),
            } => {
                let reversed = match (parse_instant(&start), parse_instant(&end)) {
                    (Ok(s), Ok(e)) => s > e,
                    _ => start > end,
                };
                if reversed {
                    DateTimeQuery::Interval {
                        start: Some(end),
                        end: Some(start),
                    }
                } else {
                    DateTimeQuery::Interval {
                        start: Some(start),
                        end: Some(end),
                    }
                }
            }
            other => other,
        }
    }
}

/// Parse a single datetime value.
///
/// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.f]` / `YYYY-MM-DD HH:MM:SS`
/// (taken as UTC) and bare dates (midnight UTC).
pub fn parse_instant(value: &str) -> Result<DateTime<Utc>, CoordinateParseError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = value.trim_end_matches('Z');
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }

    Err(CoordinateParseError::InvalidDatetime(format!(
        "Invalid datetime format '{}'. Expected ISO 8601 format (e.g., 2024-12-29T12:00:00Z)",
        value
    )))
}

/// Parse parameter-name / properties query parameter.
pub fn parse_parameter_names(param: &str) -> Vec<String> {
    param
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// A coverage `subset` expression such as `lat(10:20)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubsetQuery {
    /// Axis name.
    pub axis: String,
    /// Lower bound (as given).
    pub low: String,
    /// Upper bound (as given).
    pub high: String,
}

impl SubsetQuery {
    /// Parse `axis(low:high)`; a single value `axis(v)` is a degenerate range.
    pub fn parse(expr: &str) -> Result<Self, CoordinateParseError> {
        let expr = expr.trim();
        let open = expr.find('(').ok_or_else(|| {
            CoordinateParseError::InvalidCoordinate(format!("Invalid subset '{}'", expr))
        })?;
        if !expr.ends_with(')') || open == 0 {
            return Err(CoordinateParseError::InvalidCoordinate(format!(
                "Invalid subset '{}'",
                expr
            )));
        }
        let axis = expr[..open].trim().to_string();
        let raw = expr[open + 1..expr.len() - 1].trim();
        // Quoted bounds may contain ':' themselves (timestamps).
        let split = raw.split_once("\":\"").or_else(|| raw.split_once(':'));
        let (low, high) = match split {
            Some((l, h)) => (l.trim().trim_matches('"'), h.trim().trim_matches('"')),
            None => (raw.trim_matches('"'), raw.trim_matches('"')),
        };
        if low.is_empty() || high.is_empty() {
            return Err(CoordinateParseError::MissingCoordinate(format!(
                "subset bound for {}",
                axis
            )));
        }
        Ok(Self {
            axis,
            low: low.to_string(),
            high: high.to_string(),
        })
    }

    /// Parse a comma-separated list of subset expressions.
    pub fn parse_list(param: &str) -> Result<Vec<Self>, CoordinateParseError> {
        let mut subsets = Vec::new();
        let mut depth = 0;
        let mut current = String::new();
        for ch in param.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    if !current.trim().is_empty() {
                        subsets.push(Self::parse(&current)?);
                    }
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        if !current.trim().is_empty() {
            subsets.push(Self::parse(&current)?);
        }
        Ok(subsets)
    }

    /// Numeric bounds, if both parse as numbers.
    pub fn numeric(&self) -> Option<(f64, f64)> {
        Some((self.low.parse().ok()?, self.high.parse().ok()?))
    }
}
