//! Request errors and their HTTP statuses.

use thiserror::Error;

use crate::queries::CoordinateParseError;
use crate::responses::ExceptionResponse;

#[derive(Debug, Error)]
pub enum EdrError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Coordinate(#[from] CoordinateParseError),

    /// The query is valid but selects nothing.
    #[error("No data: {0}")]
    NoData(String),

    /// The provider does not serve this query type or output.
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// The backing store answered with data that could not be read.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// InfluxDB, WCS or a dataset location could not be reached.
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EdrError {
    pub fn status(&self) -> u16 {
        match self {
            EdrError::CollectionNotFound(_) | EdrError::ItemNotFound(_) | EdrError::NoData(_) => 404,
            EdrError::InvalidParameter(_)
            | EdrError::Coordinate(_)
            | EdrError::NotImplemented(_) => 400,
            EdrError::BackendUnavailable(_) => 502,
            EdrError::InvalidData(_) | EdrError::Internal(_) => 500,
        }
    }

    /// Exception body carrying the error message as detail.
    pub fn exception(&self) -> ExceptionResponse {
        ExceptionResponse::for_status(self.status(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_exception() {
        let err = EdrError::CollectionNotFound("ocean".to_string());
        assert_eq!(err.status(), 404);
        let exc = err.exception();
        assert_eq!(exc.status, 404);
        assert_eq!(exc.detail, "Collection not found: ocean");

        assert_eq!(EdrError::NotImplemented("cube".into()).status(), 400);
        assert_eq!(EdrError::InvalidData("csv".into()).status(), 500);
        assert_eq!(EdrError::BackendUnavailable("influx".into()).exception().title, "Bad Gateway");
    }

    #[test]
    fn test_z_axis_message_survives() {
        let err: EdrError = CoordinateParseError::ZAxisNotSupported.into();
        assert_eq!(err.status(), 400);
        assert!(err.exception().detail.contains("z-axis not supported"));
    }
}
