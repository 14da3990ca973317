//! EDR `position` and `cube` query handlers.

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::Response,
};
use edr_protocol::{parse_parameter_names, QueryGeometry};
use edr_providers::{run_edr_query, EdrQuery};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use super::{parse_numbers, record_query, render_output};
use crate::content_negotiation::negotiate_format;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters shared by the EDR query endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct EdrQueryParams {
    /// WKT geometry. Required for position queries.
    pub coords: Option<String>,

    /// `minx,miny,maxx,maxy`. Required for cube queries.
    pub bbox: Option<String>,

    /// Datetime instant or interval.
    pub datetime: Option<String>,

    /// Parameter name(s) to retrieve.
    #[serde(rename = "parameter-name")]
    pub parameter_name: Option<String>,

    /// Vertical level(s).
    pub z: Option<String>,

    /// Maximum number of records.
    pub limit: Option<usize>,

    /// Output format.
    pub f: Option<String>,
}

/// GET /collections/:collection_id/position
pub async fn position_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    Query(params): Query<EdrQueryParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let coords = required(params.coords.as_deref(), "coords")?;
    let query = EdrQuery::position(QueryGeometry::parse(coords)?);
    edr_query(&state, &collection_id, query, params, &headers).await
}

/// GET /collections/:collection_id/cube
pub async fn cube_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    Query(params): Query<EdrQueryParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let bbox = required(params.bbox.as_deref(), "bbox")?;
    let query = EdrQuery::cube(parse_numbers("bbox", bbox)?);
    edr_query(&state, &collection_id, query, params, &headers).await
}

fn required<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_parameter(format!("Missing required parameter: {}", name)))
}

async fn edr_query(
    state: &AppState,
    collection_id: &str,
    mut query: EdrQuery,
    params: EdrQueryParams,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let format = negotiate_format(headers, params.f.as_deref())?;
    let entry = state.collection(collection_id)?;

    query.datetime = params.datetime.filter(|d| !d.is_empty());
    if let Some(names) = &params.parameter_name {
        query.select_properties = parse_parameter_names(names);
    }
    query.z = params.z.filter(|z| !z.is_empty());
    query.limit = params.limit;
    query.format = Some(format.provider_format().to_string());

    tracing::debug!(
        collection = collection_id,
        query_type = %query.query_type,
        datetime = ?query.datetime,
        parameters = ?query.select_properties,
        "EDR query"
    );

    let started = Instant::now();
    let result = run_edr_query(entry.provider.as_ref(), &query).await;
    record_query(collection_id, query.query_type.as_str(), started, &result);

    render_output(result?, format)
}
