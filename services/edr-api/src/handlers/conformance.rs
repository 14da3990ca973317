//! Conformance handler.

use axum::{http::HeaderMap, response::Response};
use edr_protocol::{conformance, ConformanceClasses};

use super::metadata_response;
use crate::content_negotiation::check_metadata_accept;
use crate::error::ApiError;

/// GET /conformance
pub async fn conformance_handler(headers: HeaderMap) -> Result<Response, ApiError> {
    check_metadata_accept(&headers)?;
    let classes: ConformanceClasses = conformance::DECLARED.iter().copied().collect();
    metadata_response(&classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_declares_edr_and_coverages() {
        let response = conformance_handler(HeaderMap::new()).await.unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let classes: ConformanceClasses = serde_json::from_slice(&bytes).unwrap();
        assert!(classes.contains(conformance::CORE));
        assert!(classes.contains(conformance::CUBE));
        assert!(classes.contains(conformance::COVERAGES_CORE));
        assert!(classes.contains(conformance::FEATURES_CORE));
    }
}
