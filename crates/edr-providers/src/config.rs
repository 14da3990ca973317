//! Provider definitions as written in resource configuration.
//!
//! A provider is selected by its `name`:
//!
//! ```yaml
//! name: xarray-edr
//! data: /data/ocean.zarr
//! x_field: lon
//! y_field: lat
//! format:
//!   name: zarr
//!   mimetype: application/zip
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Definition of one provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name")]
pub enum ProviderConfig {
    /// Coverage provider over a NetCDF/Zarr dataset.
    #[serde(rename = "xarray")]
    Xarray(XarrayConfig),
    /// EDR provider over a gridded NetCDF/Zarr dataset.
    #[serde(rename = "xarray-edr")]
    XarrayEdr(XarrayConfig),
    /// EDR provider over station time series.
    #[serde(rename = "xarray-edr-timeseries")]
    TimeSeries(TimeSeriesConfig),
    /// Observation features from InfluxDB measurements.
    #[serde(rename = "influx")]
    Influx(InfluxConfig),
    /// EDR provider over InfluxDB measurements.
    #[serde(rename = "influx-edr")]
    InfluxEdr(InfluxConfig),
    /// EDR provider proxying a WCS 2.0 endpoint.
    #[serde(rename = "wcs-edr")]
    Wcs(WcsConfig),
}

impl ProviderConfig {
    /// Provider name as used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ProviderConfig::Xarray(_) => "xarray",
            ProviderConfig::XarrayEdr(_) => "xarray-edr",
            ProviderConfig::TimeSeries(_) => "xarray-edr-timeseries",
            ProviderConfig::Influx(_) => "influx",
            ProviderConfig::InfluxEdr(_) => "influx-edr",
            ProviderConfig::Wcs(_) => "wcs-edr",
        }
    }

    /// Load a provider definition from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {:?}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse: {:?}", path))
    }
}

/// Native output format of a dataset.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FormatConfig {
    /// Format name (`zarr`, `netcdf`).
    pub name: String,
    #[serde(default)]
    pub mimetype: Option<String>,
}

/// Array dataset provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct XarrayConfig {
    /// Path of the dataset (`*.zarr` directory or NetCDF file).
    pub data: String,
    /// Name of the x coordinate; discovered from units when absent.
    #[serde(default)]
    pub x_field: Option<String>,
    /// Name of the y coordinate; discovered from units when absent.
    #[serde(default)]
    pub y_field: Option<String>,
    /// Name of the time coordinate; discovered by name when absent.
    #[serde(default)]
    pub time_field: Option<String>,
    #[serde(default)]
    pub format: Option<FormatConfig>,
}

impl XarrayConfig {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            x_field: None,
            y_field: None,
            time_field: None,
            format: None,
        }
    }
}

/// Station time-series provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeSeriesConfig {
    #[serde(flatten)]
    pub dataset: XarrayConfig,
    /// JSON-LD context advertised with responses.
    #[serde(default)]
    pub context: Option<String>,
    /// Configured station latitudes, used when the data has none.
    #[serde(default)]
    pub lat: Vec<f64>,
    /// Configured station longitudes, used when the data has none.
    #[serde(default)]
    pub lon: Vec<f64>,
    /// CoverageJSON domain type of the output.
    #[serde(default, rename = "domainType", alias = "domain_type")]
    pub domain_type: Option<String>,
}

/// InfluxDB provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    pub data: InfluxConnection,
    /// Measurement locations.
    #[serde(default)]
    pub locations: Vec<LocationConfig>,
    /// Parameter definitions keyed by parameter name.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterConfig>,
}

/// Connection settings for an InfluxDB v2 server.
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConnection {
    /// Server base URL.
    pub url: String,
    pub bucket: String,
    #[serde(default)]
    pub org: Option<String>,
    /// Name of the environment variable holding the API token.
    pub token_variable: String,
    /// Flux duration (`7d`) bounding queries that carry no datetime.
    #[serde(default)]
    pub since: Option<String>,
}

impl InfluxConnection {
    /// The API token, read from the configured environment variable.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_variable).ok()
    }
}

/// A named measurement location and the tables observed there.
#[derive(Debug, Clone, Deserialize)]
pub struct LocationConfig {
    pub name: String,
    pub geometry: LocationGeometry,
    /// Measurement name → (parameter name → column name).
    #[serde(default)]
    pub tables: BTreeMap<String, BTreeMap<String, String>>,
}

/// Location geometry: a point or a polygon ring.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LocationGeometry {
    Point(PointConfig),
    Polygon(Vec<[f64; 2]>),
}

/// A point written as `[x, y]` or `{x: .., y: ..}`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PointConfig {
    Pair([f64; 2]),
    Xy { x: f64, y: f64 },
}

impl PointConfig {
    pub fn xy(&self) -> (f64, f64) {
        match *self {
            PointConfig::Pair([x, y]) => (x, y),
            PointConfig::Xy { x, y } => (x, y),
        }
    }
}

/// Kind of a measured parameter.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
pub enum ParameterKind {
    /// Continuous values.
    #[default]
    Quantity,
    /// Labels mapped to integers by `categoryEncoding`.
    Category,
}

impl ParameterKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterKind::Quantity => "Quantity",
            ParameterKind::Category => "Category",
        }
    }
}

/// A category of a categorical parameter.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CategoryConfig {
    pub id: String,
    pub label: String,
    #[serde(default = "default_lang")]
    pub label_lang: String,
}

/// Metadata of a measured parameter.
///
/// The flat layout mirrors how parameters are catalogued for the
/// measurement database; `*_lang` fields default to `en`.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct ParameterConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: ParameterKind,
    /// Name used as the range type field id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub label_lang: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub description_lang: Option<String>,
    #[serde(default)]
    pub unit_label: Option<String>,
    #[serde(default)]
    pub unit_label_lang: Option<String>,
    #[serde(default)]
    pub unit_symbol: Option<String>,
    #[serde(default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub observed_property_id: Option<String>,
    #[serde(default)]
    pub observed_property_label: Option<String>,
    #[serde(default)]
    pub observed_property_label_lang: Option<String>,
    #[serde(default)]
    pub observed_property_description: Option<String>,
    #[serde(default)]
    pub observed_property_description_lang: Option<String>,
    #[serde(default)]
    pub observed_property_categories: Vec<CategoryConfig>,
    /// Category label or id → integer code.
    #[serde(default, rename = "categoryEncoding")]
    pub category_encoding: BTreeMap<String, i64>,
    #[serde(default)]
    pub properties: Option<serde_json::Value>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

/// Remote WCS provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct WcsConfig {
    /// WCS endpoint URL.
    pub base_url: String,
    /// Coverage id requested when the query names none.
    #[serde(default)]
    pub layer: Option<String>,
    #[serde(default)]
    pub x_field: Option<String>,
    #[serde(default)]
    pub y_field: Option<String>,
    #[serde(default)]
    pub time_field: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub(crate) fn default_lang() -> String {
    "en".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_xarray_edr() {
        let yaml = r#"
name: xarray-edr
data: /data/ocean.zarr
x_field: lon
format:
  name: zarr
  mimetype: application/zip
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        let ProviderConfig::XarrayEdr(c) = config else {
            panic!("wrong provider");
        };
        assert_eq!(c.data, "/data/ocean.zarr");
        assert_eq!(c.x_field.as_deref(), Some("lon"));
        assert_eq!(c.y_field, None);
        assert_eq!(c.format.unwrap().name, "zarr");
    }

    #[test]
    fn test_parse_timeseries_flattened() {
        let yaml = r#"
name: xarray-edr-timeseries
data: /data/stations.zarr
domainType: PointSeries
lat: [60.5]
lon: [4.5]
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        let ProviderConfig::TimeSeries(c) = config else {
            panic!("wrong provider");
        };
        assert_eq!(c.dataset.data, "/data/stations.zarr");
        assert_eq!(c.domain_type.as_deref(), Some("PointSeries"));
        assert_eq!(c.lat, vec![60.5]);
    }

    #[test]
    fn test_parse_influx() {
        let yaml = r#"
name: influx-edr
data:
  url: http://localhost:8086
  bucket: oceanlab
  org: sintef
  token_variable: INFLUX_TOKEN
locations:
  - name: munkholmen
    geometry:
      point: [10.39, 63.45]
    tables:
      ctd_temperature_munkholmen:
        sea_water_temperature: temperature
  - name: bay
    geometry:
      polygon: [[10, 63], [11, 63], [11, 64], [10, 64], [10, 63]]
parameters:
  sea_water_temperature:
    id: sea_water_temperature
    type: Quantity
    name: sea_water_temperature
    data_type: float
    unit_symbol: Cel
  approved:
    type: Category
    categoryEncoding:
      "yes": 1
      "no": 0
"#;
        let config: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        let ProviderConfig::InfluxEdr(c) = config else {
            panic!("wrong provider");
        };
        assert_eq!(c.data.bucket, "oceanlab");
        assert_eq!(c.locations.len(), 2);
        assert!(matches!(c.locations[0].geometry, LocationGeometry::Point(p) if p.xy() == (10.39, 63.45)));
        assert!(matches!(&c.locations[1].geometry, LocationGeometry::Polygon(r) if r.len() == 5));
        assert_eq!(c.parameters["approved"].kind, ParameterKind::Category);
        assert_eq!(c.parameters["approved"].category_encoding["yes"], 1);
        assert_eq!(
            c.locations[0].tables["ctd_temperature_munkholmen"]["sea_water_temperature"],
            "temperature"
        );
    }

    #[test]
    fn test_point_as_mapping() {
        let point: PointConfig = serde_yaml::from_str("{x: 1.5, y: 2.5}").unwrap();
        assert_eq!(point.xy(), (1.5, 2.5));
    }

    #[test]
    fn test_unknown_provider_is_rejected() {
        assert!(serde_yaml::from_str::<ProviderConfig>("name: rasterio\ndata: x.tif").is_err());
    }
}
