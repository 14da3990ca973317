//! OGC Coverage Implementation Schema (CIS) metadata documents.
//!
//! Coverage providers describe their data through a *range type*
//! (what is measured, as a `DataRecord` of fields) and a *domain set*
//! (where it is measured, as a `GeneralGridCoverage`).

use serde::{Deserialize, Serialize};

/// Prefix for OGC data type definitions (`.../dataType/OGC/0/float64`).
pub const OGC_DATA_TYPE_PREFIX: &str = "http://www.opengis.net/def/dataType/OGC/0/";

/// Prefix for UCUM unit definitions.
pub const UCUM_PREFIX: &str = "http://www.opengis.net/def/uom/UCUM/";

/// Index CRS used for grid limits.
pub const INDEX_2D_CRS: &str = "http://www.opengis.net/def/crs/OGC/0/Index2D";

/// Coverage range type: the list of measured fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeType {
    /// Always "DataRecord".
    #[serde(rename = "type")]
    pub type_: String,

    /// Fields of the record.
    pub field: Vec<RangeField>,
}

impl Default for RangeType {
    fn default() -> Self {
        Self {
            type_: "DataRecord".to_string(),
            field: Vec::new(),
        }
    }
}

impl RangeType {
    /// Check whether a field with the given id is present.
    pub fn contains(&self, id: &str) -> bool {
        self.field.iter().any(|f| f.id == id)
    }

    /// Look up a field by id.
    pub fn get(&self, id: &str) -> Option<&RangeField> {
        self.field.iter().find(|f| f.id == id)
    }
}

/// A single field of a range type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RangeField {
    /// Field identifier.
    pub id: String,

    /// Field type (e.g. "Quantity").
    #[serde(rename = "type")]
    pub type_: String,

    /// Human-readable name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Encoding information.
    #[serde(rename = "encodingInfo")]
    pub encoding_info: EncodingInfo,

    /// No-data marker.
    pub nodata: String,

    /// Unit of measure.
    pub uom: UnitOfMeasure,

    /// Source attributes.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

/// Encoding information of a range field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EncodingInfo {
    /// Data type identifier.
    #[serde(rename = "dataType")]
    pub data_type: String,
}

/// Unit reference of a range field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitOfMeasure {
    /// Unit URI.
    pub id: String,

    /// Reference type.
    #[serde(rename = "type")]
    pub type_: String,

    /// Unit code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl UnitOfMeasure {
    /// UCUM unit reference for a unit code.
    pub fn ucum(code: Option<&str>) -> Self {
        Self {
            id: format!("{}{}", UCUM_PREFIX, code.unwrap_or("")),
            type_: "UnitReference".to_string(),
            code: code.map(str::to_string),
        }
    }
}

/// Free-form metadata wrapper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Meta {
    /// Source attributes.
    pub tags: serde_json::Value,
}

/// Coverage domain set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DomainSet {
    /// Always "DomainSet".
    #[serde(rename = "type")]
    pub type_: String,

    /// The grid description.
    #[serde(rename = "generalGrid")]
    pub general_grid: GeneralGrid,

    /// Source attributes.
    #[serde(rename = "_meta", skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
}

impl DomainSet {
    /// Wrap a grid description.
    pub fn new(general_grid: GeneralGrid) -> Self {
        Self {
            type_: "DomainSet".to_string(),
            general_grid,
            meta: None,
        }
    }
}

/// A general grid with labelled regular axes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralGrid {
    /// Always "GeneralGridCoverage".
    #[serde(rename = "type")]
    pub type_: String,

    /// CRS of the grid.
    #[serde(rename = "srsName")]
    pub srs_name: String,

    /// Axis labels in order.
    #[serde(rename = "axisLabels")]
    pub axis_labels: Vec<String>,

    /// Axis descriptions.
    pub axis: Vec<RegularAxis>,

    /// Index limits of the grid.
    #[serde(rename = "gridLimits")]
    pub grid_limits: GridLimits,
}

/// A regularly spaced axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegularAxis {
    /// Always "RegularAxis".
    #[serde(rename = "type")]
    pub type_: String,

    /// Axis label.
    #[serde(rename = "axisLabel")]
    pub axis_label: String,

    /// Lower bound (number or timestamp).
    #[serde(rename = "lowerBound")]
    pub lower_bound: serde_json::Value,

    /// Upper bound (number or timestamp).
    #[serde(rename = "upperBound")]
    pub upper_bound: serde_json::Value,

    /// Unit label of the bounds.
    #[serde(rename = "uomLabel", skip_serializing_if = "Option::is_none")]
    pub uom_label: Option<String>,

    /// Spacing between points.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<serde_json::Value>,
}

impl RegularAxis {
    /// Create a regular axis.
    pub fn new(
        label: impl Into<String>,
        lower: serde_json::Value,
        upper: serde_json::Value,
        uom_label: Option<String>,
        resolution: Option<serde_json::Value>,
    ) -> Self {
        Self {
            type_: "RegularAxis".to_string(),
            axis_label: label.into(),
            lower_bound: lower,
            upper_bound: upper,
            uom_label,
            resolution,
        }
    }
}

/// Index limits of a grid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GridLimits {
    /// Always "GridLimits".
    #[serde(rename = "type")]
    pub type_: String,

    /// Index CRS.
    #[serde(rename = "srsName")]
    pub srs_name: String,

    /// Index axis labels.
    #[serde(rename = "axisLabels")]
    pub axis_labels: Vec<String>,

    /// Index axes.
    pub axis: Vec<IndexAxis>,
}

impl GridLimits {
    /// Two-dimensional `i`/`j` limits for a `width` x `height` grid.
    pub fn index_2d(width: usize, height: usize) -> Self {
        Self {
            type_: "GridLimits".to_string(),
            srs_name: INDEX_2D_CRS.to_string(),
            axis_labels: vec!["i".to_string(), "j".to_string()],
            axis: vec![
                IndexAxis::new("i", width),
                IndexAxis::new("j", height),
            ],
        }
    }
}

/// An integer index axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexAxis {
    /// Always "IndexAxis".
    #[serde(rename = "type")]
    pub type_: String,

    /// Axis label.
    #[serde(rename = "axisLabel")]
    pub axis_label: String,

    /// Lower index.
    #[serde(rename = "lowerBound")]
    pub lower_bound: usize,

    /// Upper index.
    #[serde(rename = "upperBound")]
    pub upper_bound: usize,
}

impl IndexAxis {
    fn new(label: &str, upper: usize) -> Self {
        Self {
            type_: "IndexAxis".to_string(),
            axis_label: label.to_string(),
            lower_bound: 0,
            upper_bound: upper,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_type_serialization() {
        let rangetype = RangeType {
            field: vec![RangeField {
                id: "TEMP".to_string(),
                type_: "Quantity".to_string(),
                name: Some("Sea Water temperature".to_string()),
                encoding_info: EncodingInfo {
                    data_type: format!("{}float32", OGC_DATA_TYPE_PREFIX),
                },
                nodata: "null".to_string(),
                uom: UnitOfMeasure::ucum(Some("degC")),
                meta: Some(Meta {
                    tags: json!({"units": "degC"}),
                }),
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&rangetype).unwrap();
        assert_eq!(json["type"], "DataRecord");
        assert_eq!(json["field"][0]["encodingInfo"]["dataType"],
            "http://www.opengis.net/def/dataType/OGC/0/float32");
        assert_eq!(json["field"][0]["uom"]["id"], "http://www.opengis.net/def/uom/UCUM/degC");
        assert_eq!(json["field"][0]["_meta"]["tags"]["units"], "degC");
        assert!(rangetype.contains("TEMP"));
        assert!(!rangetype.contains("PSAL"));
    }

    #[test]
    fn test_domain_set_serialization() {
        let domainset = DomainSet::new(GeneralGrid {
            type_: "GeneralGridCoverage".to_string(),
            srs_name: crate::coverage_json::CRS84.to_string(),
            axis_labels: vec!["lon".into(), "lat".into(), "time".into()],
            axis: vec![
                RegularAxis::new("lon", json!(0.0), json!(2.0), Some("degrees".into()), Some(json!(1.0))),
                RegularAxis::new("lat", json!(50.0), json!(51.0), Some("degrees".into()), Some(json!(0.5))),
                RegularAxis::new(
                    "time",
                    json!("2024-01-01T00:00:00Z"),
                    json!("2024-01-03T00:00:00Z"),
                    Some("D".into()),
                    Some(json!("D")),
                ),
            ],
            grid_limits: GridLimits::index_2d(3, 3),
        });

        let json = serde_json::to_value(&domainset).unwrap();
        assert_eq!(json["generalGrid"]["type"], "GeneralGridCoverage");
        assert_eq!(json["generalGrid"]["axis"][2]["lowerBound"], "2024-01-01T00:00:00Z");
        assert_eq!(json["generalGrid"]["gridLimits"]["axis"][0]["upperBound"], 3);
        assert_eq!(json["generalGrid"]["gridLimits"]["srsName"], INDEX_2D_CRS);
        assert!(json.get("_meta").is_none());
    }
}
