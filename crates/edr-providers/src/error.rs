//! Error types for provider operations.

use edr_protocol::EdrError;
use grid_dataset::GridError;
use thiserror::Error;

/// Errors raised by data providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend could not be opened or reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The query is invalid for this provider.
    #[error("Query error: {0}")]
    Query(String),

    /// The query matched no data.
    #[error("No data: {0}")]
    NoData(String),

    /// A requested item does not exist.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// The provider does not implement the operation.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// The backend returned data that could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Result type for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// `NoData` with the default message.
    pub fn no_data() -> Self {
        ProviderError::NoData("No data found".to_string())
    }

    /// `NotImplemented` for an operation name.
    pub fn not_implemented(operation: &str) -> Self {
        ProviderError::NotImplemented(format!("{} is not supported by this provider", operation))
    }
}

impl From<GridError> for ProviderError {
    fn from(err: GridError) -> Self {
        if err.is_missing_data() {
            ProviderError::NoData(err.to_string())
        } else if matches!(err, GridError::Unsupported(_)) {
            ProviderError::NotImplemented(err.to_string())
        } else {
            ProviderError::Query(err.to_string())
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Connection(err.to_string())
    }
}

impl From<edr_protocol::CoordinateParseError> for ProviderError {
    fn from(err: edr_protocol::CoordinateParseError) -> Self {
        ProviderError::Query(err.to_string())
    }
}

impl From<ProviderError> for EdrError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Connection(msg) => EdrError::BackendUnavailable(msg),
            ProviderError::Query(msg) => EdrError::InvalidParameter(msg),
            ProviderError::NoData(msg) => EdrError::NoData(msg),
            ProviderError::ItemNotFound(msg) => EdrError::ItemNotFound(msg),
            ProviderError::NotImplemented(msg) => EdrError::NotImplemented(msg),
            ProviderError::InvalidData(msg) => EdrError::InvalidData(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_errors_map_to_no_data_or_query() {
        let missing: ProviderError = GridError::MissingVariable("SST".into()).into();
        assert!(matches!(missing, ProviderError::NoData(_)));

        let label: ProviderError = GridError::label_not_found("time", "2001-01-01").into();
        assert!(matches!(label, ProviderError::NoData(_)));

        let dim: ProviderError = GridError::MissingDimension("depth".into()).into();
        assert!(matches!(dim, ProviderError::Query(_)));
    }

    #[test]
    fn test_edr_status_mapping() {
        let cases = [
            (ProviderError::Connection("down".into()), 502),
            (ProviderError::Query("bad".into()), 400),
            (ProviderError::no_data(), 404),
            (ProviderError::ItemNotFound("x".into()), 404),
            (ProviderError::not_implemented("cube"), 400),
            (ProviderError::InvalidData("csv".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(EdrError::from(err).status(), status);
        }
    }
}
