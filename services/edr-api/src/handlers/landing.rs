//! Landing page handler.

use axum::{extract::Extension, http::HeaderMap, response::Response};
use edr_protocol::LandingPage;
use std::sync::Arc;

use super::metadata_response;
use crate::content_negotiation::check_metadata_accept;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /
pub async fn landing_handler(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;

    let landing = LandingPage::new(&state.server.title, &state.server.description, &state.base_url);
    metadata_response(&landing)
}
