//! The provider contract shared by every backend.

use std::collections::BTreeMap;

use async_trait::async_trait;
use edr_protocol::{
    media_types, CoverageCollection, CoverageDocument, CoverageJson, DomainSet, Extent, Feature, FeatureCollection, QueryGeometry,
    RangeType, SubsetQuery,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, Result};

/// EDR query types a provider can register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Query at a point, line or polygon.
    Position,
    /// Query within a bounding box.
    Cube,
}

impl QueryType {
    /// Path segment / name of the query type.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Position => "position",
            QueryType::Cube => "cube",
        }
    }

    /// Parse a query type name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "position" => Some(QueryType::Position),
            "cube" => Some(QueryType::Cube),
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments of an EDR `position` or `cube` query.
#[derive(Debug, Clone, PartialEq)]
pub struct EdrQuery {
    pub query_type: QueryType,
    /// Query geometry (`coords`) for position queries.
    pub wkt: Option<QueryGeometry>,
    /// `[minx, miny, maxx, maxy]` for cube queries; kept unvalidated so
    /// providers can reject a vertical component themselves.
    pub bbox: Vec<f64>,
    /// Raw `datetime` parameter.
    pub datetime: Option<String>,
    /// Requested parameter names; empty means all.
    pub select_properties: Vec<String>,
    /// Vertical level(s).
    pub z: Option<String>,
    /// Instance identifier.
    pub instance: Option<String>,
    /// Requested output format.
    pub format: Option<String>,
    /// Maximum number of time steps/records.
    pub limit: Option<usize>,
}

impl EdrQuery {
    fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            wkt: None,
            bbox: Vec::new(),
            datetime: None,
            select_properties: Vec::new(),
            z: None,
            instance: None,
            format: None,
            limit: None,
        }
    }

    /// A position query at a geometry.
    pub fn position(wkt: QueryGeometry) -> Self {
        Self {
            wkt: Some(wkt),
            ..Self::new(QueryType::Position)
        }
    }

    /// A cube query over a bounding box.
    pub fn cube(bbox: Vec<f64>) -> Self {
        Self {
            bbox,
            ..Self::new(QueryType::Cube)
        }
    }

    pub fn with_datetime(mut self, datetime: impl Into<String>) -> Self {
        self.datetime = Some(datetime.into());
        self
    }

    pub fn with_properties<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.select_properties = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_z(mut self, z: impl Into<String>) -> Self {
        self.z = Some(z.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Arguments of an OGC API Coverages request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageQuery {
    /// Variables to return; empty means all fields.
    pub properties: Vec<String>,
    /// Per-axis subsets.
    pub subsets: Vec<SubsetQuery>,
    /// `[minx, miny, maxx, maxy]`, empty when not given.
    pub bbox: Vec<f64>,
    /// Raw `datetime` parameter.
    pub datetime: Option<String>,
    /// Output format name (`json`, `zarr`, `netcdf`); `None` means JSON.
    pub format: Option<String>,
}

impl CoverageQuery {
    /// True when CoverageJSON output is requested.
    pub fn wants_json(&self) -> bool {
        matches!(self.format.as_deref(), None | Some("json") | Some("covjson"))
    }

    /// The subset for an axis, if any.
    pub fn subset(&self, axis: &str) -> Option<&SubsetQuery> {
        self.subsets.iter().find(|s| s.axis == axis)
    }
}

/// Arguments of a feature `items` request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemsQuery {
    pub bbox: Vec<f64>,
    pub datetime: Option<String>,
    pub properties: Vec<String>,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Description of a provider field (variable).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    /// `float`, `integer` or a backend type name.
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "x-ogc-unit", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Field descriptions keyed by field name.
pub type Fields = BTreeMap<String, FieldInfo>;

/// Result of a data query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// A CoverageJSON coverage or coverage collection.
    Coverage(CoverageDocument),
    /// GeoJSON features.
    Features(FeatureCollection),
    /// Binary output in a native format.
    Native {
        bytes: Vec<u8>,
        media_type: String,
        filename: String,
    },
}

impl QueryOutput {
    /// Zipped Zarr store.
    pub fn zarr_zip(bytes: Vec<u8>) -> Self {
        QueryOutput::Native {
            bytes,
            media_type: media_types::ZIP.to_string(),
            filename: "data.zarr.zip".to_string(),
        }
    }

    /// Media type of the output.
    pub fn media_type(&self) -> &str {
        match self {
            QueryOutput::Coverage(_) => media_types::COVERAGE_JSON,
            QueryOutput::Features(_) => media_types::GEO_JSON,
            QueryOutput::Native { media_type, .. } => media_type,
        }
    }

    /// NetCDF file.
    pub fn netcdf(bytes: Vec<u8>) -> Self {
        QueryOutput::Native {
            bytes,
            media_type: media_types::NETCDF.to_string(),
            filename: "data.nc".to_string(),
        }
    }

    /// The coverage document, if this is one.
    pub fn as_coverage(&self) -> Option<&CoverageDocument> {
        match self {
            QueryOutput::Coverage(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<CoverageDocument> for QueryOutput {
    fn from(value: CoverageDocument) -> Self {
        QueryOutput::Coverage(value)
    }
}

impl From<CoverageJson> for QueryOutput {
    fn from(value: CoverageJson) -> Self {
        QueryOutput::Coverage(value.into())
    }
}

impl From<CoverageCollection> for QueryOutput {
    fn from(value: CoverageCollection) -> Self {
        QueryOutput::Coverage(value.into())
    }
}

/// A data provider adapting one backend to coverage/EDR responses.
///
/// Every operation has a default that returns
/// [`ProviderError::NotImplemented`]; providers override what their backend
/// supports and list their EDR operations in [`Provider::query_types`].
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name as used in configuration.
    fn name(&self) -> &str;

    /// Registered EDR query types.
    fn query_types(&self) -> &[QueryType] {
        &[]
    }

    /// Spatial/temporal extent of the data, when known up front.
    fn extent(&self) -> Option<Extent> {
        None
    }

    /// Field descriptions.
    fn get_fields(&self) -> Result<Fields> {
        Err(ProviderError::not_implemented("fields"))
    }

    /// CIS range type.
    fn get_coverage_rangetype(&self) -> Result<RangeType> {
        Err(ProviderError::not_implemented("rangetype"))
    }

    /// CIS domain set.
    fn get_coverage_domainset(&self) -> Result<DomainSet> {
        Err(ProviderError::not_implemented("domainset"))
    }

    /// Coverage query.
    async fn query(&self, _query: &CoverageQuery) -> Result<QueryOutput> {
        Err(ProviderError::not_implemented("coverage query"))
    }

    /// EDR position query.
    async fn position(&self, _query: &EdrQuery) -> Result<QueryOutput> {
        Err(ProviderError::not_implemented("position"))
    }

    /// EDR cube query.
    async fn cube(&self, _query: &EdrQuery) -> Result<QueryOutput> {
        Err(ProviderError::not_implemented("cube"))
    }

    /// Feature items.
    async fn items(&self, _query: &ItemsQuery) -> Result<FeatureCollection> {
        Err(ProviderError::not_implemented("items"))
    }

    /// A single feature by id.
    async fn get(&self, _id: &str) -> Result<Feature> {
        Err(ProviderError::not_implemented("items"))
    }
}

/// Run an EDR query, refusing query types the provider did not register.
pub async fn run_edr_query(provider: &dyn Provider, query: &EdrQuery) -> Result<QueryOutput> {
    if !provider.query_types().contains(&query.query_type) {
        return Err(ProviderError::NotImplemented(format!(
            "{} query not registered for provider {}",
            query.query_type,
            provider.name()
        )));
    }
    debug!(provider = provider.name(), query_type = %query.query_type, "Dispatching EDR query");
    match query.query_type {
        QueryType::Position => provider.position(query).await,
        QueryType::Cube => provider.cube(query).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CubeOnly;

    #[async_trait]
    impl Provider for CubeOnly {
        fn name(&self) -> &str {
            "cube-only"
        }

        fn query_types(&self) -> &[QueryType] {
            &[QueryType::Cube]
        }

        async fn cube(&self, _query: &EdrQuery) -> Result<QueryOutput> {
            Ok(QueryOutput::Features(FeatureCollection::new()))
        }
    }

    #[tokio::test]
    async fn test_unregistered_query_type_is_refused() {
        let provider = CubeOnly;
        let position = EdrQuery::position(QueryGeometry::Point { x: 0.0, y: 0.0 });
        let err = run_edr_query(&provider, &position).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotImplemented(_)));

        let cube = EdrQuery::cube(vec![0.0, 0.0, 1.0, 1.0]);
        assert!(run_edr_query(&provider, &cube).await.is_ok());
    }

    #[tokio::test]
    async fn test_defaults_are_not_implemented() {
        let provider = CubeOnly;
        assert!(matches!(provider.get_fields(), Err(ProviderError::NotImplemented(_))));
        assert!(matches!(
            provider.get("obs-1").await,
            Err(ProviderError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_coverage_query_format() {
        assert!(CoverageQuery::default().wants_json());
        let zarr = CoverageQuery {
            format: Some("zarr".into()),
            ..Default::default()
        };
        assert!(!zarr.wants_json());
    }

    #[test]
    fn test_query_type_names() {
        assert_eq!(QueryType::from_name("cube"), Some(QueryType::Cube));
        assert_eq!(QueryType::Position.to_string(), "position");
        assert_eq!(QueryType::from_name("radius"), None);
    }
}
