//! EDR `cube` queries answered by a remote WCS 2.0 server.

use std::time::Duration;

use async_trait::async_trait;
use edr_protocol::{CoverageJson, Feature, FeatureCollection, Geometry};
use grid_dataset::netcdf_from_bytes;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::{WcsConfig, XarrayConfig};
use crate::error::{ProviderError, Result};
use crate::provider::{CoverageQuery, EdrQuery, FieldInfo, Fields, Provider, QueryOutput, QueryType};
use crate::xarray::{bbox4, gen_covjson, OutMeta, XarrayProvider};

const QUERY_TYPES: &[QueryType] = &[QueryType::Cube];

/// Proxy to a WCS `GetCoverage` endpoint returning NetCDF.
#[derive(Debug, Clone)]
pub struct WcsEdrProvider {
    config: WcsConfig,
    client: Client,
}

impl WcsEdrProvider {
    pub fn new(config: WcsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Connection(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Fetch `coverage_id` within `bbox` (and at `time`) as CoverageJSON.
    ///
    /// Returns `None` when the server does not answer with 200.
    #[instrument(skip(self), fields(base_url = %self.config.base_url))]
    pub async fn get_coverage(
        &self,
        coverage_id: &str,
        bbox: [f64; 4],
        time: Option<&str>,
    ) -> Result<Option<CoverageJson>> {
        let [minx, miny, maxx, maxy] = bbox;
        let mut params = vec![
            ("service", "WCS".to_string()),
            ("version", "2.0.1".to_string()),
            ("request", "GetCoverage".to_string()),
            ("coverageid", coverage_id.to_string()),
            ("format", "application/netcdf".to_string()),
            ("subset", format!("Lat({},{})", miny, maxy)),
            ("subset", format!("Long({},{})", minx, maxx)),
        ];
        if let Some(time) = time {
            params.push(("subset", format!("ansi(\"{}\")", time)));
        }
        debug!(params = ?params, "Requesting coverage");

        let response = self.client.get(&self.config.base_url).query(&params).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), coverage_id, "GetCoverage failed");
            return Ok(None);
        }
        let bytes = response.bytes().await?;

        let data = netcdf_from_bytes(&bytes)?;
        let coverage = XarrayProvider::from_dataset(self.dataset_config(), data)?;
        let properties = coverage.properties();
        let meta = OutMeta::from_data(coverage.dataset(), &properties.axes)?;
        let covjson = gen_covjson(properties, &meta, coverage.dataset(), &properties.fields)?;
        Ok(Some(covjson))
    }

    fn dataset_config(&self) -> XarrayConfig {
        XarrayConfig {
            x_field: self.config.x_field.clone(),
            y_field: self.config.y_field.clone(),
            time_field: self.config.time_field.clone(),
            ..XarrayConfig::new(self.config.base_url.clone())
        }
    }

    /// Coverage id of a query: the first requested parameter, else the
    /// configured layer.
    fn layer<'a>(&'a self, select_properties: &'a [String]) -> Result<&'a str> {
        select_properties
            .first()
            .or(self.config.layer.as_ref())
            .map(String::as_str)
            .ok_or_else(|| ProviderError::Query("no coverage id: set layer or parameter-name".to_string()))
    }

    #[instrument(skip(self, query), fields(bbox = ?query.bbox, datetime = ?query.datetime))]
    pub async fn cube_query(&self, query: &EdrQuery) -> Result<QueryOutput> {
        let bbox = bbox4(&query.bbox, "z-axis not supported")?;
        let layer = self.layer(&query.select_properties)?;
        self.get_coverage(layer, bbox, query.datetime.as_deref())
            .await?
            .map(QueryOutput::from)
            .ok_or_else(ProviderError::no_data)
    }

    /// Footprint feature of a coverage request, with the coverage as its
    /// `coverage_data` property.
    pub async fn footprint(&self, query: &CoverageQuery) -> Result<FeatureCollection> {
        let bbox = bbox4(&query.bbox, "bbox must have four values")?;
        let layer = self.layer(&query.properties)?;
        let coverage = self
            .get_coverage(layer, bbox, query.datetime.as_deref())
            .await?
            .ok_or_else(ProviderError::no_data)?;
        let coverage = serde_json::to_value(coverage)
            .map_err(|e| ProviderError::InvalidData(e.to_string()))?;

        let feature = Feature::new(Some(Geometry::bbox_polygon(bbox))).with_property("coverage_data", coverage);
        Ok(FeatureCollection::new().with_feature(feature))
    }
}

#[async_trait]
impl Provider for WcsEdrProvider {
    fn name(&self) -> &str {
        "wcs-edr"
    }

    fn query_types(&self) -> &[QueryType] {
        QUERY_TYPES
    }

    fn get_fields(&self) -> Result<Fields> {
        Ok(self
            .config
            .layer
            .iter()
            .map(|layer| {
                let info = FieldInfo {
                    type_: "float".to_string(),
                    title: Some(layer.clone()),
                    unit: None,
                };
                (layer.clone(), info)
            })
            .collect())
    }

    async fn query(&self, query: &CoverageQuery) -> Result<QueryOutput> {
        Ok(QueryOutput::Features(self.footprint(query).await?))
    }

    async fn cube(&self, query: &EdrQuery) -> Result<QueryOutput> {
        self.cube_query(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::run_edr_query;
    use httpmock::prelude::*;

    fn provider(base_url: String) -> WcsEdrProvider {
        WcsEdrProvider::new(WcsConfig {
            base_url,
            layer: Some("TEMP".to_string()),
            x_field: Some("lon".to_string()),
            y_field: Some("lat".to_string()),
            time_field: None,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_non_200_is_none() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/wcs")
                    .query_param("service", "WCS")
                    .query_param("request", "GetCoverage")
                    .query_param("coverageid", "SALT")
                    .query_param("format", "application/netcdf");
                then.status(404);
            })
            .await;

        let wcs = provider(server.url("/wcs"));
        let coverage = wcs.get_coverage("SALT", [-10.0, 0.0, 10.0, 20.0], None).await.unwrap();
        mock.assert_async().await;
        assert!(coverage.is_none());
    }

    #[tokio::test]
    async fn test_cube_parameter_overrides_layer() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/wcs").query_param("coverageid", "SALT");
                then.status(500);
            })
            .await;

        let wcs = provider(server.url("/wcs"));
        let query = EdrQuery::cube(vec![-10.0, 0.0, 10.0, 20.0]).with_properties(["SALT"]);
        let result = run_edr_query(&wcs, &query).await;
        mock.assert_async().await;
        assert!(matches!(result, Err(ProviderError::NoData(_))));
    }

    #[tokio::test]
    async fn test_cube_rejects_vertical_bbox() {
        let wcs = provider("http://localhost:9/wcs".to_string());
        let query = EdrQuery::cube(vec![-10.0, 0.0, 0.0, 10.0, 20.0, 50.0]);
        let err = wcs.cube_query(&query).await.unwrap_err();
        assert_eq!(err.to_string(), "Query error: z-axis not supported");
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/wcs");
                then.status(200).body("<ows:ExceptionReport/>");
            })
            .await;

        let wcs = provider(server.url("/wcs"));
        assert!(wcs.get_coverage("TEMP", [-10.0, 0.0, 10.0, 20.0], None).await.is_err());
    }

    #[test]
    fn test_fields_list_the_layer() {
        let wcs = provider("http://localhost:9/wcs".to_string());
        let fields = wcs.get_fields().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["TEMP"]);
    }

    #[cfg(feature = "netcdf")]
    #[tokio::test]
    async fn test_footprint_embeds_coverage() {
        let payload = grid_dataset::netcdf_bytes(&grid_dataset::testdata::ocean_grid()).unwrap();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/wcs").query_param("coverageid", "TEMP");
                then.status(200).body(payload);
            })
            .await;

        let wcs = provider(server.url("/wcs"));
        let query = CoverageQuery {
            bbox: vec![-20.0, 0.0, 20.0, 30.0],
            ..Default::default()
        };
        let features = wcs.footprint(&query).await.unwrap();
        assert_eq!(features.features.len(), 1);
        let coverage = &features.features[0].properties["coverage_data"];
        assert_eq!(coverage["type"], "Coverage");
        assert_eq!(coverage["domain"]["domainType"], "Grid");
    }
}
