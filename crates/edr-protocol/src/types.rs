//! Links and collection extents.

use serde::{Deserialize, Serialize};

/// Gregorian calendar in WKT, the only temporal reference served.
pub const GREGORIAN_TRS: &str =
    "TIMECRS[\"DateTime\",TDATUM[\"Gregorian Calendar\"],CS[TemporalDateTime,1],AXIS[\"Time (T)\",future]]";

/// CRS of a spatial extent when none is configured.
pub const DEFAULT_EXTENT_CRS: &str = "CRS:84";

/// A hyperlink to a related resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub href: String,
    pub rel: String,

    /// Media type of the target.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    pub fn new(href: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            rel: rel.into(),
            type_: None,
            title: None,
        }
    }

    pub fn with_type(mut self, type_: impl Into<String>) -> Self {
        self.type_ = Some(type_.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Spatial and temporal extent of a collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Extent {
    pub spatial: SpatialExtent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal: Option<TemporalExtent>,
}

impl Extent {
    /// Extent of a provider's bounds.
    ///
    /// `bbox` may list its corners in data order (a north-up grid starts at
    /// its northern edge); the published box is always
    /// `[west, south, east, north]`.
    pub fn from_bounds(bbox: [f64; 4], crs: Option<String>, time: Option<(String, String)>) -> Self {
        let [x0, y0, x1, y1] = bbox;
        Self {
            spatial: SpatialExtent {
                bbox: vec![vec![x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]],
                crs: crs.unwrap_or_else(|| DEFAULT_EXTENT_CRS.to_string()),
            },
            temporal: time.map(|(begin, end)| TemporalExtent {
                interval: vec![vec![Some(begin), Some(end)]],
                trs: GREGORIAN_TRS.to_string(),
            }),
        }
    }

    /// `[west, south, east, north]` of the first box.
    pub fn bbox(&self) -> Option<&[f64]> {
        self.spatial.bbox.first().map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpatialExtent {
    pub bbox: Vec<Vec<f64>>,
    pub crs: String,
}

/// Time intervals as ISO 8601 `[begin, end]` pairs; `null` leaves a side open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporalExtent {
    pub interval: Vec<Vec<Option<String>>>,
    pub trs: String,
}
