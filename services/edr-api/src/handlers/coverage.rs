//! OGC API - Coverages handlers: coverage data, domain set and range type.

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::Response,
};
use edr_protocol::{parse_parameter_names, SubsetQuery};
use edr_providers::CoverageQuery;
use std::sync::Arc;
use std::time::Instant;

use super::{metadata_response, parse_numbers, record_query, render_output};
use crate::content_negotiation::{check_metadata_accept, negotiate_format};
use crate::error::ApiError;
use crate::state::AppState;

/// Build a coverage query from raw query pairs.
///
/// `subset` may repeat or carry a comma-separated list; the `f` value is
/// returned separately for negotiation.
pub fn parse_coverage_query(pairs: &[(String, String)]) -> Result<(CoverageQuery, Option<String>), ApiError> {
    let mut query = CoverageQuery::default();
    let mut f = None;

    for (key, value) in pairs {
        match key.as_str() {
            "properties" | "parameter-name" => query.properties.extend(parse_parameter_names(value)),
            "subset" => query.subsets.extend(SubsetQuery::parse_list(value)?),
            "bbox" if !value.is_empty() => query.bbox = parse_numbers("bbox", value)?,
            "datetime" if !value.is_empty() => query.datetime = Some(value.clone()),
            "f" => f = Some(value.clone()),
            _ => {}
        }
    }
    Ok((query, f))
}

/// GET /collections/:collection_id/coverage
pub async fn coverage_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (mut query, f) = parse_coverage_query(&pairs)?;
    let format = negotiate_format(&headers, f.as_deref())?;
    let entry = state.collection(&collection_id)?;
    query.format = Some(format.provider_format().to_string());

    tracing::debug!(
        collection = %collection_id,
        properties = ?query.properties,
        subsets = ?query.subsets,
        bbox = ?query.bbox,
        datetime = ?query.datetime,
        "Coverage query"
    );

    let started = Instant::now();
    let result = entry.provider.query(&query).await;
    record_query(&collection_id, "coverage", started, &result);

    render_output(result?, format)
}

/// GET /collections/:collection_id/coverage/domainset
pub async fn domainset_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;
    let entry = state.collection(&collection_id)?;
    metadata_response(&entry.provider.get_coverage_domainset()?)
}

/// GET /collections/:collection_id/coverage/rangetype
pub async fn rangetype_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;
    let entry = state.collection(&collection_id)?;
    metadata_response(&entry.provider.get_coverage_rangetype()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_repeated_and_listed_subsets() {
        let (query, f) = parse_coverage_query(&pairs(&[
            ("subset", "lat(0:10),lon(-5:5)"),
            ("subset", "time(\"2000-01-16T00:00:00Z\")"),
            ("properties", "TEMP, SALT"),
            ("f", "zarr"),
        ]))
        .unwrap();

        assert_eq!(query.subsets.len(), 3);
        assert_eq!(query.subsets[2].low, "2000-01-16T00:00:00Z");
        assert_eq!(query.properties, vec!["TEMP", "SALT"]);
        assert_eq!(f.as_deref(), Some("zarr"));
    }

    #[test]
    fn test_empty_values_are_ignored() {
        let (query, _) = parse_coverage_query(&pairs(&[("bbox", ""), ("datetime", "")])).unwrap();
        assert!(query.bbox.is_empty());
        assert!(query.datetime.is_none());
    }

    #[test]
    fn test_bad_bbox_is_rejected() {
        let err = parse_coverage_query(&pairs(&[("bbox", "a,b,c,d")])).unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
