//! Feature item handlers.

use axum::{
    extract::{Extension, Path, Query},
    http::HeaderMap,
    response::Response,
};
use edr_protocol::{media_types, parse_parameter_names};
use edr_providers::ItemsQuery;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;

use super::{json_response, parse_numbers, record_query};
use crate::content_negotiation::check_metadata_accept;
use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Default, Deserialize)]
pub struct ItemsParams {
    pub bbox: Option<String>,
    pub datetime: Option<String>,
    pub properties: Option<String>,
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ItemsParams {
    fn to_query(&self) -> Result<ItemsQuery, ApiError> {
        let bbox = match self.bbox.as_deref() {
            Some(b) if !b.is_empty() => parse_numbers("bbox", b)?,
            _ => Vec::new(),
        };
        Ok(ItemsQuery {
            bbox,
            datetime: self.datetime.clone().filter(|d| !d.is_empty()),
            properties: self
                .properties
                .as_deref()
                .map(parse_parameter_names)
                .unwrap_or_default(),
            offset: self.offset,
            limit: Some(self.limit.unwrap_or(DEFAULT_LIMIT)),
        })
    }
}

/// GET /collections/:collection_id/items
pub async fn items_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    Query(params): Query<ItemsParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;
    let entry = state.collection(&collection_id)?;
    let query = params.to_query()?;

    let started = Instant::now();
    let result = entry.provider.items(&query).await;
    record_query(&collection_id, "items", started, &result);

    json_response(&result?, media_types::GEO_JSON)
}

/// GET /collections/:collection_id/items/*item_id
///
/// Item ids may contain `/`.
pub async fn item_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((collection_id, item_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;
    let entry = state.collection(&collection_id)?;
    let item_id = item_id.trim_start_matches('/');

    let started = Instant::now();
    let result = entry.provider.get(item_id).await;
    record_query(&collection_id, "item", started, &result);

    json_response(&result?, media_types::GEO_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limit() {
        let query = ItemsParams::default().to_query().unwrap();
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));
        assert!(query.bbox.is_empty());
    }

    #[test]
    fn test_params_to_query() {
        let params = ItemsParams {
            bbox: Some("10,63,11,64".to_string()),
            datetime: Some("2023-05-01T00:00:00Z/..".to_string()),
            properties: Some("sea_water_temperature".to_string()),
            offset: 2,
            limit: Some(5),
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.bbox, vec![10.0, 63.0, 11.0, 64.0]);
        assert_eq!(query.properties, vec!["sea_water_temperature"]);
        assert_eq!((query.offset, query.limit), (2, Some(5)));
    }
}
