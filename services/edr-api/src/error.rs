//! HTTP error responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use edr_protocol::{CoordinateParseError, EdrError, ExceptionResponse};
use edr_providers::ProviderError;
use thiserror::Error;

/// Errors returned by request handlers, rendered as OGC exception bodies.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Edr(#[from] EdrError),

    /// Content negotiation failed.
    #[error("{0}")]
    NotAcceptable(String),
}

impl ApiError {
    pub fn collection_not_found(id: &str) -> Self {
        ApiError::Edr(EdrError::CollectionNotFound(id.to_string()))
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        ApiError::Edr(EdrError::InvalidParameter(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Edr(err) => {
                StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
        }
    }

    fn exception(&self) -> ExceptionResponse {
        match self {
            ApiError::Edr(err) => err.exception(),
            ApiError::NotAcceptable(msg) => ExceptionResponse::for_status(406, msg.clone()),
        }
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::Edr(err.into())
    }
}

impl From<CoordinateParseError> for ApiError {
    fn from(err: CoordinateParseError) -> Self {
        ApiError::Edr(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{}", self);
        } else {
            tracing::debug!(status = status.as_u16(), "{}", self);
        }
        error_response(status, &self.exception())
    }
}

/// JSON response carrying an exception body.
pub fn error_response(status: StatusCode, exc: &ExceptionResponse) -> Response {
    let json = serde_json::to_string(exc).unwrap_or_default();
    (status, [(header::CONTENT_TYPE, "application/json")], json).into_response()
}
