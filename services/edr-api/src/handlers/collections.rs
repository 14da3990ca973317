//! Collections endpoint handlers.

use axum::{
    extract::{Extension, Path},
    http::HeaderMap,
    response::Response,
};
use edr_protocol::{Collection, CollectionList, DataQueries, Parameter, Unit};
use edr_providers::{ProviderConfig, QueryType};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::metadata_response;
use crate::content_negotiation::check_metadata_accept;
use crate::error::ApiError;
use crate::state::{AppState, CollectionEntry};

/// Describe a configured collection from its provider.
pub fn describe_collection(entry: &CollectionEntry, base_url: &str) -> Collection {
    let resource = &entry.resource;
    let provider = &entry.provider;

    let mut collection = Collection::new(&resource.id);
    collection.title = resource.title.clone();
    collection.description = resource.description.clone();
    if !resource.keywords.is_empty() {
        collection = collection.with_keywords(resource.keywords.clone());
    }
    if let Some(extent) = provider.extent() {
        collection = collection.with_extent(extent);
    }

    let query_types: Vec<&str> = provider.query_types().iter().map(QueryType::as_str).collect();
    if !query_types.is_empty() {
        collection = collection
            .with_data_queries(DataQueries::for_query_types(base_url, &resource.id, &query_types))
            .with_output_formats(vec!["CoverageJSON".to_string(), "GeoJSON".to_string()]);
    }

    match provider.get_fields() {
        Ok(fields) => {
            let parameters: BTreeMap<String, Parameter> = fields
                .into_iter()
                .map(|(name, info)| {
                    let label = info.title.clone().unwrap_or_else(|| name.clone());
                    let mut parameter = Parameter::new(&name, label);
                    if let Some(unit) = info.unit {
                        parameter = parameter.with_unit(Unit::from_symbol(unit));
                    }
                    (name, parameter)
                })
                .collect();
            collection = collection.with_parameters(parameters);
        }
        Err(e) => tracing::debug!(collection = %resource.id, "No field description: {}", e),
    }

    let coverage = provider.get_coverage_domainset().is_ok();
    let items = matches!(
        resource.provider,
        ProviderConfig::Influx(_) | ProviderConfig::InfluxEdr(_)
    );
    collection.build_links(base_url, coverage, items);
    collection
}

/// GET /collections
pub async fn list_collections_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;

    let collections = state
        .collections
        .values()
        .map(|entry| describe_collection(entry, &state.base_url))
        .collect();
    metadata_response(&CollectionList::new(collections, &state.base_url))
}

/// GET /collections/:collection_id
pub async fn get_collection_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(collection_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;

    let entry = state.collection(&collection_id)?;
    metadata_response(&describe_collection(entry, &state.base_url))
}
