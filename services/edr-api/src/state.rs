//! Application state for the EDR API.

use anyhow::{Context, Result};
use edr_providers::{build_provider, Provider};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{ApiConfig, ResourceConfig, ServerInfo};
use crate::error::ApiError;

/// A configured collection and its provider.
pub struct CollectionEntry {
    pub resource: ResourceConfig,
    pub provider: Arc<dyn Provider>,
}

/// Shared application state.
pub struct AppState {
    /// Landing page metadata.
    pub server: ServerInfo,

    /// Collections by id.
    pub collections: BTreeMap<String, CollectionEntry>,

    /// Base URL for building links.
    pub base_url: String,

    /// Prometheus exporter, when installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create the state from a configuration directory and environment.
    pub async fn new(config_dir: &str, metrics: Option<PrometheusHandle>) -> Result<Self> {
        let base_url =
            std::env::var("EDR_BASE_URL").unwrap_or_else(|_| "http://localhost:8083".to_string());
        let config = ApiConfig::load_from_dir(config_dir)?;

        // Opening datasets reads from disk.
        let mut state = tokio::task::spawn_blocking(move || Self::from_config(config, &base_url))
            .await
            .context("Provider initialization panicked")??;
        state.metrics = metrics;
        Ok(state)
    }

    /// Build every configured provider.
    pub fn from_config(config: ApiConfig, base_url: &str) -> Result<Self> {
        let mut collections = BTreeMap::new();
        for resource in config.resources {
            let provider = build_provider(&resource.provider).with_context(|| {
                format!(
                    "Failed to build {} provider for collection {}",
                    resource.provider.name(),
                    resource.id
                )
            })?;
            tracing::info!(
                collection = %resource.id,
                provider = provider.name(),
                query_types = ?provider.query_types(),
                "Collection ready"
            );
            collections.insert(resource.id.clone(), CollectionEntry { resource, provider });
        }

        Ok(Self {
            server: config.server,
            collections,
            base_url: base_url.trim_end_matches('/').to_string(),
            metrics: None,
        })
    }

    /// Look up a collection.
    pub fn collection(&self, id: &str) -> Result<&CollectionEntry, ApiError> {
        self.collections
            .get(id)
            .ok_or_else(|| ApiError::collection_not_found(id))
    }
}
