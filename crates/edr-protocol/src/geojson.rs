//! GeoJSON types for feature responses.
//!
//! GeoJSON is used for provider `items` responses (observations,
//! coverage footprints) and as the alternative `f=geojson` encoding of
//! EDR data queries, produced by flattening a CoverageJSON document into
//! one feature per spatial position.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::coverage_json::{AxisValue, CoverageDocument, CoverageJson, DomainType};
use crate::queries::QueryGeometry;

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Array of features.
    pub features: Vec<Feature>,

    /// Number of features matching the query before paging.
    #[serde(rename = "numberMatched", skip_serializing_if = "Option::is_none")]
    pub number_matched: Option<usize>,

    /// Number of features in this response.
    #[serde(rename = "numberReturned", skip_serializing_if = "Option::is_none")]
    pub number_returned: Option<usize>,
}

impl FeatureCollection {
    /// Create a new empty FeatureCollection.
    pub fn new() -> Self {
        Self {
            type_: "FeatureCollection".to_string(),
            features: Vec::new(),
            number_matched: None,
            number_returned: None,
        }
    }

    /// Add a feature to the collection.
    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Add multiple features to the collection.
    pub fn with_features(mut self, features: Vec<Feature>) -> Self {
        self.features.extend(features);
        self
    }

    /// Fill `numberMatched`/`numberReturned` from the current features.
    pub fn with_counts(mut self, matched: usize) -> Self {
        self.number_matched = Some(matched);
        self.number_returned = Some(self.features.len());
        self
    }
}

impl Default for FeatureCollection {
    fn default() -> Self {
        Self::new()
    }
}

/// A GeoJSON Feature.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    /// Type identifier (always "Feature").
    #[serde(rename = "type")]
    pub type_: String,

    /// Optional feature identifier (string or number).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// The geometry of this feature; `null` is allowed.
    pub geometry: Option<Geometry>,

    /// Feature properties.
    pub properties: Map<String, Value>,
}

impl Feature {
    /// Create a feature with the given geometry and no properties.
    pub fn new(geometry: Option<Geometry>) -> Self {
        Self {
            type_: "Feature".to_string(),
            id: None,
            geometry,
            properties: Map::new(),
        }
    }

    /// Set the feature ID.
    pub fn with_id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a property.
    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// String form of the feature id.
    pub fn id_string(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

/// GeoJSON geometry types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Geometry {
    /// A point geometry.
    Point {
        /// Coordinates as [x, y].
        coordinates: [f64; 2],
    },

    /// A multi-point geometry.
    MultiPoint {
        /// Array of [x, y] coordinate pairs.
        coordinates: Vec<[f64; 2]>,
    },

    /// A line string geometry.
    LineString {
        /// Array of [x, y] coordinate pairs.
        coordinates: Vec<[f64; 2]>,
    },

    /// A polygon geometry.
    Polygon {
        /// Linear rings (first is exterior, rest are holes).
        coordinates: Vec<Vec<[f64; 2]>>,
    },
}

impl Geometry {
    /// Create a point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point {
            coordinates: [x, y],
        }
    }

    /// Closed polygon covering `[minx, miny, maxx, maxy]`.
    pub fn bbox_polygon(bbox: [f64; 4]) -> Self {
        let [minx, miny, maxx, maxy] = bbox;
        Geometry::Polygon {
            coordinates: vec![vec![
                [minx, miny],
                [minx, maxy],
                [maxx, maxy],
                [maxx, miny],
                [minx, miny],
            ]],
        }
    }
}

impl From<&QueryGeometry> for Geometry {
    fn from(value: &QueryGeometry) -> Self {
        fn pairs(pts: &[(f64, f64)]) -> Vec<[f64; 2]> {
            pts.iter().map(|(x, y)| [*x, *y]).collect()
        }
        match value {
            QueryGeometry::Point { x, y } => Geometry::point(*x, *y),
            QueryGeometry::MultiPoint(p) => Geometry::MultiPoint {
                coordinates: pairs(p),
            },
            QueryGeometry::LineString(p) => Geometry::LineString {
                coordinates: pairs(p),
            },
            QueryGeometry::Polygon(p) => Geometry::Polygon {
                coordinates: vec![pairs(p)],
            },
        }
    }
}

impl From<&CoverageJson> for FeatureCollection {
    fn from(coverage: &CoverageJson) -> Self {
        FeatureCollection::new().with_features(coverage_features(coverage, ""))
    }
}

impl From<&CoverageDocument> for FeatureCollection {
    fn from(document: &CoverageDocument) -> Self {
        match document {
            CoverageDocument::Coverage(coverage) => coverage.into(),
            CoverageDocument::Collection(collection) => {
                let features = collection
                    .coverages
                    .iter()
                    .enumerate()
                    .flat_map(|(i, c)| coverage_features(c, &format!("c{}-", i)))
                    .collect();
                FeatureCollection::new().with_features(features)
            }
        }
    }
}

fn axis_values(coverage: &CoverageJson, name: &str) -> Vec<AxisValue> {
    coverage
        .domain
        .axis(name)
        .map(|a| a.expand())
        .unwrap_or_default()
}

fn range_value(coverage: &CoverageJson, name: &str, position: &[(&str, usize)]) -> Value {
    coverage
        .ranges
        .as_ref()
        .and_then(|ranges| ranges.get(name))
        .and_then(|range| {
            range
                .flat_index(position)
                .and_then(|i| range.values.get(i).copied().flatten())
        })
        .map(|v| serde_json::json!(v))
        .unwrap_or(Value::Null)
}

/// Flatten a coverage into features.
///
/// Point series become one feature per time step (`t{i}`); every other
/// domain becomes one feature per x/y position (`y{j}x{i}`) holding
/// the time series of each parameter when more than one step exists.
fn coverage_features(coverage: &CoverageJson, id_prefix: &str) -> Vec<Feature> {
    let xs = axis_values(coverage, "x");
    let ys = axis_values(coverage, "y");
    let ts = axis_values(coverage, "t");
    let names = coverage.range_names();

    let mut features = Vec::new();

    if coverage.domain.domain_type == DomainType::PointSeries {
        let (Some(x), Some(y)) = (
            xs.first().and_then(|v| v.as_f64()),
            ys.first().and_then(|v| v.as_f64()),
        ) else {
            return features;
        };
        for (ti, t) in ts.iter().enumerate() {
            let mut feature = Feature::new(Some(Geometry::point(x, y)))
                .with_id(format!("{}t{}", id_prefix, ti))
                .with_property("datetime", t.to_json());
            for name in &names {
                let value = range_value(coverage, name, &[("x", 0), ("y", 0), ("t", ti)]);
                feature = feature.with_property(name, value);
            }
            features.push(feature);
        }
        return features;
    }

    let steps = ts.len().max(1);
    for (yi, y) in ys.iter().enumerate() {
        for (xi, x) in xs.iter().enumerate() {
            let (Some(xv), Some(yv)) = (x.as_f64(), y.as_f64()) else {
                continue;
            };
            let mut feature = Feature::new(Some(Geometry::point(xv, yv)))
                .with_id(format!("{}y{}x{}", id_prefix, yi, xi));
            match ts.len() {
                0 => {}
                1 => feature = feature.with_property("datetime", ts[0].to_json()),
                _ => {
                    let times: Vec<Value> = ts.iter().map(|t| t.to_json()).collect();
                    feature = feature.with_property("datetime", times);
                }
            }
            for name in &names {
                let series: Vec<Value> = (0..steps)
                    .map(|ti| range_value(coverage, name, &[("x", xi), ("y", yi), ("t", ti)]))
                    .collect();
                let value = if steps == 1 {
                    series.into_iter().next().unwrap_or(Value::Null)
                } else {
                    Value::Array(series)
                };
                feature = feature.with_property(name, value);
            }
            features.push(feature);
        }
    }

    features
}
