//! EDR API Service Library
//!
//! HTTP surface of the configured data providers: OGC API - EDR
//! (`position`, `cube`), OGC API - Coverages and observation items.

pub mod config;
pub mod content_negotiation;
pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use state::AppState;

/// Routes of the API, without middleware.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::landing::landing_handler))
        .route("/conformance", get(handlers::conformance::conformance_handler))
        .route("/collections", get(handlers::collections::list_collections_handler))
        .route(
            "/collections/:collection_id",
            get(handlers::collections::get_collection_handler),
        )
        // EDR queries
        .route(
            "/collections/:collection_id/position",
            get(handlers::edr::position_handler),
        )
        .route("/collections/:collection_id/cube", get(handlers::edr::cube_handler))
        // Coverages
        .route(
            "/collections/:collection_id/coverage",
            get(handlers::coverage::coverage_handler),
        )
        .route(
            "/collections/:collection_id/coverage/domainset",
            get(handlers::coverage::domainset_handler),
        )
        .route(
            "/collections/:collection_id/coverage/rangetype",
            get(handlers::coverage::rangetype_handler),
        )
        // Features
        .route("/collections/:collection_id/items", get(handlers::items::items_handler))
        .route(
            "/collections/:collection_id/items/*item_id",
            get(handlers::items::item_handler),
        )
        // Health and metrics
        .route("/health", get(handlers::health::health_handler))
        .route("/metrics", get(handlers::health::metrics_handler))
        .layer(Extension(state))
}
