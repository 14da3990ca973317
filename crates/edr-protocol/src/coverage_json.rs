//! CoverageJSON types for EDR query responses.
//!
//! CoverageJSON is the primary response format for EDR data queries.
//! A document is either a single `Coverage` (domain, parameters and
//! ranges) or a `CoverageCollection` grouping several coverages that
//! share parameter definitions and referencing.
//!
//! See: <https://covjson.org/>

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::parameters::{I18nString, ObservedProperty, Unit};

/// Identifier of the OGC CRS84 geographic reference system.
pub const CRS84: &str = "http://www.opengis.net/def/crs/OGC/1.3/CRS84";

/// A CoverageJSON document containing coverage data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageJson {
    /// Document type (always "Coverage" for single coverage).
    #[serde(rename = "type")]
    pub type_: CoverageType,

    /// The domain defining the coverage's spatial/temporal extent.
    pub domain: Domain,

    /// Parameter definitions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, CovJsonParameter>>,

    /// Data ranges for each parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranges: Option<BTreeMap<String, NdArray>>,
}

impl CoverageJson {
    /// Create an empty coverage over the given domain.
    pub fn new(domain: Domain) -> Self {
        Self {
            type_: CoverageType::Coverage,
            domain,
            parameters: Some(BTreeMap::new()),
            ranges: Some(BTreeMap::new()),
        }
    }

    /// Create a new CoverageJSON document for a point series (time series at a point).
    pub fn point_series(x: f64, y: f64, t_values: Vec<String>) -> Self {
        Self::new(Domain::point_series(x, y, t_values))
    }

    /// Add a parameter definition without a range.
    pub fn with_parameter(mut self, name: &str, param: CovJsonParameter) -> Self {
        self.parameters
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), param);
        self
    }

    /// Add a range without a parameter definition.
    ///
    /// Used for coverages inside a collection, where the parameters
    /// are declared once at collection level.
    pub fn with_range(mut self, name: &str, range: NdArray) -> Self {
        self.ranges
            .get_or_insert_with(BTreeMap::new)
            .insert(name.to_string(), range);
        self
    }

    /// Add a parameter for a time series (1D array along time axis).
    pub fn with_time_series(
        self,
        name: &str,
        param: CovJsonParameter,
        values: Vec<Option<f64>>,
    ) -> Self {
        let shape = vec![values.len()];
        self.with_parameter(name, param).with_range(
            name,
            NdArray::with_missing(values, shape, vec!["t".to_string()]),
        )
    }

    /// Drop the per-coverage parameter map (set when the coverage is
    /// embedded in a collection that declares parameters itself).
    pub fn without_parameters(mut self) -> Self {
        self.parameters = None;
        self
    }

    /// Names of the parameters that carry a range.
    pub fn range_names(&self) -> Vec<&str> {
        self.ranges
            .as_ref()
            .map(|r| r.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Coverage type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CoverageType {
    /// Single coverage.
    Coverage,
    /// Collection of coverages.
    CoverageCollection,
}

/// A collection of coverages sharing parameters and referencing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoverageCollection {
    /// Document type (always "CoverageCollection").
    #[serde(rename = "type")]
    pub type_: CoverageType,

    /// Common domain type of the member coverages.
    #[serde(rename = "domainType", skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<DomainType>,

    /// Parameter definitions shared by the member coverages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<BTreeMap<String, CovJsonParameter>>,

    /// Referencing shared by the member coverages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencing: Option<Vec<ReferenceSystemConnection>>,

    /// Member coverages.
    pub coverages: Vec<CoverageJson>,
}

impl CoverageCollection {
    /// Create an empty collection of the given domain type.
    pub fn new(domain_type: DomainType) -> Self {
        Self {
            type_: CoverageType::CoverageCollection,
            domain_type: Some(domain_type),
            parameters: None,
            referencing: None,
            coverages: Vec::new(),
        }
    }

    /// Set the shared parameters.
    pub fn with_parameters(mut self, parameters: BTreeMap<String, CovJsonParameter>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set the shared referencing.
    pub fn with_referencing(mut self, referencing: Vec<ReferenceSystemConnection>) -> Self {
        self.referencing = Some(referencing);
        self
    }

    /// Append a coverage.
    pub fn push(&mut self, coverage: CoverageJson) {
        self.coverages.push(coverage);
    }

    /// Number of member coverages.
    pub fn len(&self) -> usize {
        self.coverages.len()
    }

    /// Check if the collection has no coverages.
    pub fn is_empty(&self) -> bool {
        self.coverages.is_empty()
    }
}

/// Either a single coverage or a coverage collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CoverageDocument {
    /// A single coverage.
    Coverage(CoverageJson),
    /// A collection of coverages.
    Collection(CoverageCollection),
}

impl From<CoverageJson> for CoverageDocument {
    fn from(value: CoverageJson) -> Self {
        CoverageDocument::Coverage(value)
    }
}

impl From<CoverageCollection> for CoverageDocument {
    fn from(value: CoverageCollection) -> Self {
        CoverageDocument::Collection(value)
    }
}

/// The domain of a coverage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Domain {
    /// Domain type (always "Domain").
    #[serde(rename = "type")]
    pub type_: String,

    /// The domain type (Point, Grid, etc.).
    #[serde(rename = "domainType")]
    pub domain_type: DomainType,

    /// Axis definitions.
    pub axes: BTreeMap<String, Axis>,

    /// Reference systems for axes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referencing: Option<Vec<ReferenceSystemConnection>>,
}

impl Domain {
    /// Create a domain without axes.
    pub fn new(domain_type: DomainType) -> Self {
        Self {
            type_: "Domain".to_string(),
            domain_type,
            axes: BTreeMap::new(),
            referencing: None,
        }
    }

    /// Add an axis.
    pub fn with_axis(mut self, name: &str, axis: Axis) -> Self {
        self.axes.insert(name.to_string(), axis);
        self
    }

    /// Add a reference system connection.
    pub fn with_referencing(mut self, connection: ReferenceSystemConnection) -> Self {
        self.referencing.get_or_insert_with(Vec::new).push(connection);
        self
    }

    /// Create a point series domain (time series at a single point) in CRS84.
    pub fn point_series(x: f64, y: f64, t_values: Vec<String>) -> Self {
        Self::new(DomainType::PointSeries)
            .with_axis("x", Axis::values_f64(vec![x]))
            .with_axis("y", Axis::values_f64(vec![y]))
            .with_axis("t", Axis::values_str(t_values))
            .with_referencing(ReferenceSystemConnection::geographic(CRS84))
            .with_referencing(ReferenceSystemConnection::temporal())
    }

    /// Create a grid domain with regular x/y axes and explicit time values.
    pub fn grid(x: Axis, y: Axis, t_values: Vec<String>) -> Self {
        Self::new(DomainType::Grid)
            .with_axis("x", x)
            .with_axis("y", y)
            .with_axis("t", Axis::values_str(t_values))
    }

    /// Get an axis by name.
    pub fn axis(&self, name: &str) -> Option<&Axis> {
        self.axes.get(name)
    }
}

/// Domain types supported by CoverageJSON.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DomainType {
    /// Point (0D).
    Point,
    /// Point series (time series at a point).
    PointSeries,
    /// Vertical profile at a point.
    VerticalProfile,
    /// Grid (2D or higher).
    Grid,
    /// Trajectory (1D path through space).
    Trajectory,
    /// Multi-point set.
    MultiPoint,
}

impl DomainType {
    /// Parse a domain type name as written in provider configuration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(Self::Point),
            "PointSeries" => Some(Self::PointSeries),
            "VerticalProfile" => Some(Self::VerticalProfile),
            "Grid" => Some(Self::Grid),
            "Trajectory" => Some(Self::Trajectory),
            "MultiPoint" => Some(Self::MultiPoint),
            _ => None,
        }
    }
}

/// An axis in the domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Axis {
    /// Explicit list of values.
    Values { values: Vec<AxisValue> },
    /// Regular axis defined by start, stop, and number of points.
    Regular { start: f64, stop: f64, num: usize },
}

impl Axis {
    /// Axis from numeric values.
    pub fn values_f64(values: Vec<f64>) -> Self {
        Axis::Values {
            values: values.into_iter().map(AxisValue::Float).collect(),
        }
    }

    /// Axis from string values (timestamps).
    pub fn values_str(values: Vec<String>) -> Self {
        Axis::Values {
            values: values.into_iter().map(AxisValue::String).collect(),
        }
    }

    /// Get the number of values in this axis.
    pub fn len(&self) -> usize {
        match self {
            Axis::Values { values } => values.len(),
            Axis::Regular { num, .. } => *num,
        }
    }

    /// Check if axis is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expand the axis into its individual values.
    ///
    /// Regular axes are expanded linearly; a single-point regular
    /// axis yields its start value.
    pub fn expand(&self) -> Vec<AxisValue> {
        match self {
            Axis::Values { values } => values.clone(),
            Axis::Regular { start, stop, num } => match *num {
                0 => Vec::new(),
                1 => vec![AxisValue::Float(*start)],
                n => {
                    let step = (stop - start) / (n - 1) as f64;
                    (0..n)
                        .map(|i| AxisValue::Float(start + step * i as f64))
                        .collect()
                }
            },
        }
    }
}

/// A value on an axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AxisValue {
    /// Floating-point value (coordinates, levels).
    Float(f64),
    /// String value (timestamps).
    String(String),
}

impl AxisValue {
    /// Numeric value, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AxisValue::Float(v) => Some(*v),
            AxisValue::String(_) => None,
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AxisValue::Float(v) => serde_json::json!(v),
            AxisValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

/// Connection between axes and their reference system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceSystemConnection {
    /// Axes that use this reference system.
    pub coordinates: Vec<String>,

    /// The reference system.
    pub system: ReferenceSystem,
}

impl ReferenceSystemConnection {
    /// x/y axes in a geographic CRS.
    pub fn geographic(id: impl Into<String>) -> Self {
        Self {
            coordinates: vec!["x".to_string(), "y".to_string()],
            system: ReferenceSystem::Geographic { id: id.into() },
        }
    }

    /// x/y axes in a projected CRS.
    pub fn projected(id: impl Into<String>) -> Self {
        Self {
            coordinates: vec!["x".to_string(), "y".to_string()],
            system: ReferenceSystem::Projected { id: id.into() },
        }
    }

    /// t axis in the Gregorian calendar.
    pub fn temporal() -> Self {
        Self {
            coordinates: vec!["t".to_string()],
            system: ReferenceSystem::Temporal {
                calendar: "Gregorian".to_string(),
            },
        }
    }
}

/// Reference system definitions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ReferenceSystem {
    /// Geographic coordinate reference system.
    #[serde(rename = "GeographicCRS")]
    Geographic {
        /// CRS identifier URI.
        id: String,
    },

    /// Projected coordinate reference system.
    #[serde(rename = "ProjectedCRS")]
    Projected {
        /// CRS identifier URI.
        id: String,
    },

    /// Temporal reference system.
    #[serde(rename = "TemporalRS")]
    Temporal {
        /// Calendar system (e.g., "Gregorian").
        calendar: String,
    },

    /// Vertical reference system.
    #[serde(rename = "VerticalCRS")]
    Vertical {
        /// CRS identifier URI.
        id: String,
    },

    /// Identifier-based reference system.
    #[serde(rename = "IdentifierRS")]
    Identifier {
        /// Target concept URI.
        #[serde(rename = "targetConcept")]
        target_concept: String,
    },
}

/// A parameter in CoverageJSON format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CovJsonParameter {
    /// Type (always "Parameter").
    #[serde(rename = "type")]
    pub type_: String,

    /// Parameter identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Human-readable label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<I18nString>,

    /// Description of the parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<I18nString>,

    /// The observed property.
    #[serde(rename = "observedProperty")]
    pub observed_property: ObservedProperty,

    /// Unit of measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,

    /// Mapping of category identifiers/labels to integer codes.
    #[serde(rename = "categoryEncoding", skip_serializing_if = "Option::is_none")]
    pub category_encoding: Option<BTreeMap<String, i64>>,

    /// Free-form extra properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl CovJsonParameter {
    /// Create a new CoverageJSON parameter.
    pub fn new(observed_property: ObservedProperty) -> Self {
        Self {
            type_: "Parameter".to_string(),
            id: None,
            label: None,
            description: None,
            observed_property,
            unit: None,
            category_encoding: None,
            properties: None,
        }
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the label.
    pub fn with_label(mut self, label: I18nString) -> Self {
        self.label = Some(label);
        self
    }

    /// Set the unit.
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, desc: I18nString) -> Self {
        self.description = Some(desc);
        self
    }

    /// Set the category encoding.
    pub fn with_category_encoding(mut self, encoding: BTreeMap<String, i64>) -> Self {
        self.category_encoding = Some(encoding);
        self
    }

    /// Set the extra properties.
    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = Some(properties);
        self
    }
}

/// N-dimensional array containing data values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NdArray {
    /// Type (always "NdArray").
    #[serde(rename = "type")]
    pub type_: String,

    /// Data type of values.
    #[serde(rename = "dataType")]
    pub data_type: String,

    /// Names of axes in order.
    #[serde(rename = "axisNames", skip_serializing_if = "Option::is_none")]
    pub axis_names: Option<Vec<String>>,

    /// Shape of the array.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,

    /// The data values (may contain null for missing data).
    pub values: Vec<Option<f64>>,
}

impl NdArray {
    /// Create an array with missing data support.
    pub fn with_missing(
        values: Vec<Option<f64>>,
        shape: Vec<usize>,
        axis_names: Vec<String>,
    ) -> Self {
        Self {
            type_: "NdArray".to_string(),
            data_type: "float".to_string(),
            axis_names: Some(axis_names),
            shape: Some(shape),
            values,
        }
    }

    /// Create an array from raw values where NaN marks missing data.
    pub fn from_nan_values(values: &[f64], shape: Vec<usize>, axis_names: Vec<String>) -> Self {
        let values = values
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        Self::with_missing(values, shape, axis_names)
    }

    /// Set the data type ("float" or "integer").
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self
    }

    /// Check that the value count equals the product of the shape.
    pub fn is_consistent(&self) -> bool {
        match &self.shape {
            Some(shape) => shape.iter().product::<usize>() == self.values.len(),
            None => self.values.len() <= 1,
        }
    }

    /// Flat index of a multi-dimensional position given by axis name.
    ///
    /// Axes of the array that are missing from `position` are taken at
    /// index 0.
    pub fn flat_index(&self, position: &[(&str, usize)]) -> Option<usize> {
        let (Some(names), Some(shape)) = (&self.axis_names, &self.shape) else {
            return if self.values.is_empty() { None } else { Some(0) };
        };
        let mut index = 0usize;
        for (name, len) in names.iter().zip(shape.iter()) {
            let i = position
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, i)| *i)
                .unwrap_or(0);
            if i >= *len {
                return None;
            }
            index = index * len + i;
        }
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temperature() -> CovJsonParameter {
        CovJsonParameter::new(ObservedProperty::new("Sea Water temperature").with_id("TEMP"))
            .with_unit(Unit::from_symbol("degC"))
            .with_description(I18nString::english("Sea Water temperature"))
    }

    #[test]
    fn test_point_series_coverage() {
        let cov = CoverageJson::point_series(
            -10.1,
            -40.2,
            vec!["2013-01-01".to_string(), "2013-01-02".to_string()],
        )
        .with_time_series("TEMP", temperature(), vec![Some(23.8), None]);

        assert_eq!(cov.type_, CoverageType::Coverage);
        assert_eq!(cov.domain.domain_type, DomainType::PointSeries);
        assert_eq!(cov.domain.axis("t").unwrap().len(), 2);

        let ranges = cov.ranges.as_ref().unwrap();
        assert_eq!(ranges["TEMP"].shape, Some(vec![2]));
        assert!(ranges["TEMP"].is_consistent());
    }

    #[test]
    fn test_coverage_serialization() {
        let cov = CoverageJson::point_series(-10.1, -40.2, vec!["2013-01-01".to_string()])
            .with_time_series("TEMP", temperature(), vec![Some(23.8)]);

        let json = serde_json::to_value(&cov).unwrap();

        assert_eq!(json["type"], "Coverage");
        assert_eq!(json["domain"]["domainType"], "PointSeries");
        assert_eq!(json["domain"]["axes"]["x"]["values"][0], -10.1);
        assert_eq!(json["domain"]["axes"]["t"]["values"][0], "2013-01-01");
        assert_eq!(json["domain"]["referencing"][0]["system"]["type"], "GeographicCRS");
        assert_eq!(json["domain"]["referencing"][0]["system"]["id"], CRS84);
        assert_eq!(json["domain"]["referencing"][1]["system"]["calendar"], "Gregorian");
        assert_eq!(json["parameters"]["TEMP"]["unit"]["symbol"], "degC");
        assert_eq!(json["ranges"]["TEMP"]["axisNames"][0], "t");
    }

    #[test]
    fn test_regular_axis_serialization() {
        let domain = Domain::grid(
            Axis::Regular { start: 0.0, stop: 2.0, num: 3 },
            Axis::Regular { start: 50.0, stop: 51.0, num: 2 },
            vec!["2024-01-01T00:00:00Z".to_string()],
        );

        let json = serde_json::to_value(&domain).unwrap();
        assert_eq!(json["axes"]["x"]["start"], 0.0);
        assert_eq!(json["axes"]["x"]["num"], 3);
        assert_eq!(json["axes"]["y"]["stop"], 51.0);
        assert_eq!(json["domainType"], "Grid");
    }

    #[test]
    fn test_axis_deserialize_both_forms() {
        let values: Axis = serde_json::from_str(r#"{"values": [1.0, 2.0]}"#).unwrap();
        assert_eq!(values.len(), 2);

        let regular: Axis = serde_json::from_str(r#"{"start": 0.0, "stop": 1.0, "num": 5}"#).unwrap();
        assert_eq!(regular.len(), 5);
    }

    #[test]
    fn test_regular_axis_expand() {
        let axis = Axis::Regular { start: 10.0, stop: 12.0, num: 3 };
        let values: Vec<f64> = axis.expand().iter().filter_map(|v| v.as_f64()).collect();
        assert_eq!(values, vec![10.0, 11.0, 12.0]);

        let single = Axis::Regular { start: 5.0, stop: 5.0, num: 1 };
        assert_eq!(single.expand(), vec![AxisValue::Float(5.0)]);
    }

    #[test]
    fn test_nan_values_become_null() {
        let arr = NdArray::from_nan_values(
            &[1.0, f64::NAN, 3.0],
            vec![1, 1, 3],
            vec!["x".into(), "y".into(), "t".into()],
        );
        assert_eq!(arr.values, vec![Some(1.0), None, Some(3.0)]);

        let json = serde_json::to_value(&arr).unwrap();
        assert!(json["values"][1].is_null());
    }

    #[test]
    fn test_flat_index() {
        let arr = NdArray::from_nan_values(
            &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
            vec![2, 3, 1],
            vec!["y".into(), "x".into(), "t".into()],
        );
        assert_eq!(arr.flat_index(&[("y", 1), ("x", 2), ("t", 0)]), Some(5));
        assert_eq!(arr.flat_index(&[("y", 0), ("x", 1)]), Some(1));
        assert_eq!(arr.flat_index(&[("y", 2), ("x", 0)]), None);
    }

    #[test]
    fn test_inconsistent_shape_detected() {
        let arr = NdArray::with_missing(vec![Some(1.0)], vec![2], vec!["t".into()]);
        assert!(!arr.is_consistent());
    }

    #[test]
    fn test_coverage_collection_serialization() {
        let mut parameters = BTreeMap::new();
        parameters.insert("TEMP".to_string(), temperature());

        let mut collection = CoverageCollection::new(DomainType::PointSeries)
            .with_parameters(parameters)
            .with_referencing(vec![
                ReferenceSystemConnection::geographic(CRS84),
                ReferenceSystemConnection::temporal(),
            ]);
        collection.push(
            CoverageJson::point_series(1.0, 2.0, vec!["2024-01-01".to_string()])
                .without_parameters()
                .with_range(
                    "TEMP",
                    NdArray::with_missing(vec![Some(4.0)], vec![1], vec!["t".into()]),
                ),
        );

        let doc: CoverageDocument = collection.into();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["type"], "CoverageCollection");
        assert_eq!(json["domainType"], "PointSeries");
        assert_eq!(json["coverages"].as_array().unwrap().len(), 1);
        assert!(json["coverages"][0].get("parameters").is_none());
        assert_eq!(json["parameters"]["TEMP"]["type"], "Parameter");
    }

    #[test]
    fn test_category_encoding_serialization() {
        let mut encoding = BTreeMap::new();
        encoding.insert("yes".to_string(), 1);
        encoding.insert("no".to_string(), 0);

        let param = CovJsonParameter::new(ObservedProperty::new("approved"))
            .with_id("measurement_approved")
            .with_category_encoding(encoding);

        let json = serde_json::to_value(&param).unwrap();
        assert_eq!(json["categoryEncoding"]["yes"], 1);
        assert_eq!(json["id"], "measurement_approved");
    }

    #[test]
    fn test_domain_type_from_name() {
        assert_eq!(DomainType::from_name("PointSeries"), Some(DomainType::PointSeries));
        assert_eq!(DomainType::from_name("Polygon"), None);
    }
}
