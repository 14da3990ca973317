//! Axis discovery and coverage-level properties of a gridded dataset.

use chrono::{DateTime, Utc};
use edr_protocol::coverage_json::CRS84;
use edr_protocol::ReferenceSystemConnection;
use grid_dataset::{time_coverage_duration, time_resolution, to_datetime_string, Coordinate, Dataset};
use serde_json::Value;

use crate::config::XarrayConfig;
use crate::error::{ProviderError, Result};

const EPSG_PREFIX: &str = "http://www.opengis.net/def/crs/EPSG/0/";

/// Kind of coordinate reference system of the x/y axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsType {
    Geographic,
    Projected,
}

impl CrsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrsType::Geographic => "GeographicCRS",
            CrsType::Projected => "ProjectedCRS",
        }
    }
}

/// Names of the x, y and time coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisNames {
    pub x: String,
    pub y: String,
    pub time: Option<String>,
}

impl AxisNames {
    /// Discover axes from coordinate names and units, letting configured
    /// names take precedence.
    pub fn discover(ds: &Dataset, config: &XarrayConfig) -> Result<Self> {
        let mut x = None;
        let mut y = None;
        let mut time = None;

        for coord in &ds.coords {
            if coord.name.eq_ignore_ascii_case("time") {
                time.get_or_insert_with(|| coord.name.clone());
            }
            match coord.units() {
                Some("degrees_north") => {
                    y.get_or_insert_with(|| coord.name.clone());
                }
                Some("degrees_east") => {
                    x.get_or_insert_with(|| coord.name.clone());
                }
                _ => {}
            }
        }

        let x = config
            .x_field
            .clone()
            .or(x)
            .ok_or_else(|| ProviderError::Connection("could not determine x axis".to_string()))?;
        let y = config
            .y_field
            .clone()
            .or(y)
            .ok_or_else(|| ProviderError::Connection("could not determine y axis".to_string()))?;
        let time = config.time_field.clone().or(time);

        for name in [Some(&x), Some(&y), time.as_ref()].into_iter().flatten() {
            if ds.coord(name).is_none() {
                return Err(ProviderError::Connection(format!("coordinate {} not found", name)));
            }
        }

        Ok(Self { x, y, time })
    }
}

/// Summary of a dataset's grid used by metadata and query output.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageProperties {
    pub axes: AxisNames,
    /// `[minx, miny, maxx, maxy]` from first/last coordinate labels.
    pub bbox: [f64; 4],
    pub bbox_crs: String,
    pub bbox_units: String,
    pub crs_type: CrsType,
    pub inverse_flattening: Option<f64>,
    pub width: usize,
    pub height: usize,
    pub time_steps: usize,
    pub resx: f64,
    pub resy: f64,
    pub restime: Option<String>,
    pub time_range: Option<(String, String)>,
    pub time_duration: Option<String>,
    /// Variables with at least three dimensions.
    pub fields: Vec<String>,
}

impl CoverageProperties {
    pub fn from_dataset(ds: &Dataset, axes: AxisNames) -> Result<Self> {
        let x = numeric_coord(ds, &axes.x)?;
        let y = numeric_coord(ds, &axes.y)?;

        let mut props = Self {
            bbox: [first(&x), first(&y), last(&x), last(&y)],
            bbox_crs: CRS84.to_string(),
            bbox_units: "degrees".to_string(),
            crs_type: CrsType::Geographic,
            inverse_flattening: None,
            width: x.len(),
            height: y.len(),
            time_steps: 0,
            resx: first_step(&x),
            resy: first_step(&y),
            restime: None,
            time_range: None,
            time_duration: None,
            fields: fields_of(ds),
            axes,
        };

        if let Some(crs) = ds.variable("crs") {
            if let Some(code) = crs.attrs.get("epsg_code").and_then(epsg_number) {
                props.bbox_crs = format!("{}{}", EPSG_PREFIX, code);
                props.crs_type = CrsType::Projected;
                props.inverse_flattening = crs.attrs.get("inverse_flattening").and_then(Value::as_f64);
            }
        }

        if let Some(times) = props.axes.time.as_deref().and_then(|t| time_coord(ds, t)) {
            props.time_steps = times.len();
            props.restime = time_resolution(&times);
            if let (Some(begin), Some(end)) = (times.first(), times.last()) {
                props.time_range = Some((to_datetime_string(begin), to_datetime_string(end)));
                props.time_duration = Some(time_coverage_duration(&times));
            }
        }

        Ok(props)
    }

    /// Referencing of the x/y axes.
    pub fn referencing(&self) -> ReferenceSystemConnection {
        match self.crs_type {
            CrsType::Geographic => ReferenceSystemConnection::geographic(&self.bbox_crs),
            CrsType::Projected => ReferenceSystemConnection::projected(&self.bbox_crs),
        }
    }
}

/// Names of the variables with at least three dimensions.
pub fn fields_of(ds: &Dataset) -> Vec<String> {
    ds.data_vars
        .iter()
        .filter(|v| v.dims.len() >= 3)
        .map(|v| v.name.clone())
        .collect()
}

pub(crate) fn numeric_coord(ds: &Dataset, name: &str) -> Result<Vec<f64>> {
    ds.coord(name)
        .and_then(|c| c.values.as_numeric())
        .map(<[f64]>::to_vec)
        .ok_or_else(|| ProviderError::InvalidData(format!("{} is not a numeric coordinate", name)))
}

pub(crate) fn time_coord(ds: &Dataset, name: &str) -> Option<Vec<DateTime<Utc>>> {
    ds.coord(name)
        .and_then(|c: &Coordinate| c.values.as_time())
        .map(<[DateTime<Utc>]>::to_vec)
}

fn first(values: &[f64]) -> f64 {
    values.first().copied().unwrap_or(f64::NAN)
}

fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(f64::NAN)
}

fn first_step(values: &[f64]) -> f64 {
    match values {
        [a, b, ..] => (b - a).abs(),
        _ => 0.0,
    }
}

// "EPSG:32631", "32631" or 32631
fn epsg_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.rsplit(':').next()?.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_dataset::testdata;

    fn props(ds: &Dataset) -> CoverageProperties {
        let axes = AxisNames::discover(ds, &XarrayConfig::new("memory")).unwrap();
        CoverageProperties::from_dataset(ds, axes).unwrap()
    }

    #[test]
    fn test_discovers_axes_from_units_and_name() {
        let ds = testdata::ocean_grid();
        let axes = AxisNames::discover(&ds, &XarrayConfig::new("memory")).unwrap();
        assert_eq!(axes.x, "lon");
        assert_eq!(axes.y, "lat");
        assert_eq!(axes.time.as_deref(), Some("time"));
    }

    #[test]
    fn test_configured_axis_must_exist() {
        let ds = testdata::ocean_grid();
        let mut config = XarrayConfig::new("memory");
        config.x_field = Some("longitude".into());
        assert!(matches!(
            AxisNames::discover(&ds, &config),
            Err(ProviderError::Connection(_))
        ));
    }

    #[test]
    fn test_geographic_properties() {
        let p = props(&testdata::ocean_grid());
        assert_eq!(p.bbox, [-20.0, 30.0, 20.0, 0.0]);
        assert_eq!(p.bbox_crs, CRS84);
        assert_eq!(p.crs_type, CrsType::Geographic);
        assert_eq!((p.width, p.height, p.time_steps), (5, 4, 3));
        assert_eq!((p.resx, p.resy), (10.0, 10.0));
        assert_eq!(p.restime.as_deref(), Some("1 days"));
        assert_eq!(
            p.time_range,
            Some(("2000-01-01T00:00:00Z".to_string(), "2000-01-03T00:00:00Z".to_string()))
        );
        assert_eq!(p.time_duration.as_deref(), Some("2 days"));
        assert_eq!(p.fields, vec!["TEMP".to_string()]);
    }

    #[test]
    fn test_projected_crs_variable() {
        let p = props(&testdata::projected_grid());
        assert_eq!(p.crs_type, CrsType::Projected);
        assert_eq!(p.bbox_crs, "http://www.opengis.net/def/crs/EPSG/0/32631");
        assert_eq!(p.inverse_flattening, Some(298.257223563));
        assert_eq!(p.referencing().system, edr_protocol::ReferenceSystem::Projected {
            id: p.bbox_crs.clone()
        });
    }

    #[test]
    fn test_epsg_number() {
        assert_eq!(epsg_number(&Value::from("EPSG:4326")), Some(4326));
        assert_eq!(epsg_number(&Value::from(3857)), Some(3857));
        assert_eq!(epsg_number(&Value::Bool(true)), None);
    }
}
