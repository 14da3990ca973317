//! Request tests for the EDR API router.
//!
//! Collections are backed by on-disk Zarr fixtures and a mocked InfluxDB
//! server; no external services are needed.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use httpmock::prelude::*;
use serde_json::Value;
use test_utils::{influx_provider_yaml, xarray_edr_provider_yaml, ZarrFixture, INFLUX_CSV};
use tower::ServiceExt;

use edr_api::config::{ApiConfig, ResourceConfig};
use edr_api::state::AppState;

const BASE_URL: &str = "http://localhost:8083";

fn resource(id: &str, provider_yaml: &str) -> ResourceConfig {
    ResourceConfig {
        id: id.to_string(),
        title: Some(format!("{} collection", id)),
        description: None,
        keywords: Vec::new(),
        provider: serde_yaml::from_str(provider_yaml).unwrap(),
    }
}

fn app(resources: Vec<ResourceConfig>) -> Router {
    let mut config = ApiConfig::default();
    for r in resources {
        config.add(r).unwrap();
    }
    let state = AppState::from_config(config, BASE_URL).unwrap();
    edr_api::router(Arc::new(state))
}

fn ocean_app(fixture: &ZarrFixture) -> Router {
    app(vec![resource("ocean", &xarray_edr_provider_yaml(&fixture.data()))])
}

async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn get_with_accept(app: Router, uri: &str, accept: &str) -> Response {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .header(header::ACCEPT, accept)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn content_type(response: &Response) -> &str {
    response.headers()[header::CONTENT_TYPE].to_str().unwrap()
}

// ============================================================================
// Metadata
// ============================================================================

#[tokio::test]
async fn test_landing_and_conformance() {
    let fixture = ZarrFixture::ocean_grid();

    let response = get(ocean_app(&fixture), "/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let landing = body_json(response).await;
    assert_eq!(landing["links"][0]["href"], BASE_URL);

    let response = get(ocean_app(&fixture), "/conformance").await;
    let conformance = body_json(response).await;
    assert!(conformance["conformsTo"]
        .as_array()
        .unwrap()
        .contains(&Value::from("http://www.opengis.net/spec/ogcapi-edr-1/1.1/conf/cube")));
}

#[tokio::test]
async fn test_metadata_not_acceptable() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get_with_accept(ocean_app(&fixture), "/collections", "text/html").await;
    assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn test_collections() {
    let fixture = ZarrFixture::ocean_grid();

    let response = get(ocean_app(&fixture), "/collections").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=300");
    let list = body_json(response).await;
    assert_eq!(list["collections"][0]["id"], "ocean");
    assert_eq!(
        list["collections"][0]["data_queries"]["position"]["link"]["href"],
        "http://localhost:8083/collections/ocean/position"
    );

    let response = get(ocean_app(&fixture), "/collections/land").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let exception = body_json(response).await;
    assert_eq!(exception["status"], 404);
}

#[tokio::test]
async fn test_health() {
    let response = get(app(Vec::new()), "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["collections"], 0);
}

// ============================================================================
// EDR queries
// ============================================================================

#[tokio::test]
async fn test_position_covjson() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(
        ocean_app(&fixture),
        "/collections/ocean/position?coords=POINT(11%2019)&datetime=2000-01-02T00:00:00Z",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/vnd.cov+json");
    let coverage = body_json(response).await;
    assert_eq!(coverage["type"], "Coverage");
    assert_eq!(coverage["ranges"]["TEMP"]["values"][0], 113.0);
}

#[tokio::test]
async fn test_position_geojson() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(
        ocean_app(&fixture),
        "/collections/ocean/position?coords=POINT(11%2019)&datetime=2000-01-02T00:00:00Z&f=geojson",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/geo+json");
    let features = body_json(response).await;
    assert_eq!(features["type"], "FeatureCollection");
    assert!(!features["features"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_position_requires_coords() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(ocean_app(&fixture), "/collections/ocean/position").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let exception = body_json(response).await;
    assert!(exception["detail"].as_str().unwrap().contains("coords"));
}

#[tokio::test]
async fn test_cube() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(
        ocean_app(&fixture),
        "/collections/ocean/cube?bbox=-10,0,10,20&datetime=2000-01-01T00:00:00Z/..&parameter-name=TEMP",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let coverage = body_json(response).await;
    assert_eq!(coverage["ranges"]["TEMP"]["shape"], serde_json::json!([3, 3, 3]));
}

#[tokio::test]
async fn test_cube_vertical_bbox_is_bad_request() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(ocean_app(&fixture), "/collections/ocean/cube?bbox=-10,0,0,10,20,100").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_parameter_is_not_found() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(
        ocean_app(&fixture),
        "/collections/ocean/position?coords=POINT(0%200)&parameter-name=SALINITY",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Coverages
// ============================================================================

#[tokio::test]
async fn test_coverage_rangetype_and_domainset() {
    let fixture = ZarrFixture::ocean_grid();

    let response = get(ocean_app(&fixture), "/collections/ocean/coverage/rangetype").await;
    assert_eq!(response.status(), StatusCode::OK);
    let rangetype = body_json(response).await;
    assert_eq!(rangetype["type"], "DataRecord");

    let response = get(ocean_app(&fixture), "/collections/ocean/coverage/domainset").await;
    assert_eq!(response.status(), StatusCode::OK);
    let domainset = body_json(response).await;
    assert_eq!(domainset["type"], "DomainSet");
}

#[tokio::test]
async fn test_coverage_exclusive_subsets() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(
        ocean_app(&fixture),
        "/collections/ocean/coverage?bbox=-10,0,10,20&subset=lat(0:20)&subset=lon(-10:10)",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_coverage_zarr_download() {
    let fixture = ZarrFixture::ocean_grid();
    let response = get(ocean_app(&fixture), "/collections/ocean/coverage?f=zarr").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/zip");
    assert!(response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("data.zarr.zip"));
}

// ============================================================================
// InfluxDB observations
// ============================================================================

async fn influx_app() -> (MockServer, Router) {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v2/query");
            then.status(200).header("Content-Type", "text/csv").body(INFLUX_CSV);
        })
        .await;
    let app = app(vec![resource(
        "munkholmen",
        &influx_provider_yaml(&server.base_url()),
    )]);
    (server, app)
}

#[tokio::test]
async fn test_items_and_item() {
    let (_server, router) = influx_app().await;

    let response = get(router.clone(), "/collections/munkholmen/items?bbox=10.3,63.4,10.5,63.5&limit=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(content_type(&response), "application/geo+json");
    let items = body_json(response).await;
    assert_eq!(items["features"].as_array().unwrap().len(), 1);

    let response = get(
        router.clone(),
        "/collections/munkholmen/items/munkholmen/approved/2023-05-01T02:31:00Z",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let item = body_json(response).await;
    assert_eq!(item["properties"]["value"], "no");

    let response = get(router, "/collections/munkholmen/items/munkholmen/approved").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_influx_position() {
    let (_server, router) = influx_app().await;
    let response = get(router, "/collections/munkholmen/position?coords=POINT(10.38%2063.45)").await;
    assert_eq!(response.status(), StatusCode::OK);
    let collection = body_json(response).await;
    assert_eq!(collection["type"], "CoverageCollection");
}

#[tokio::test]
async fn test_influx_unreachable_is_bad_gateway() {
    let router = app(vec![resource("munkholmen", &influx_provider_yaml("http://127.0.0.1:9"))]);
    let response = get(router, "/collections/munkholmen/items").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
