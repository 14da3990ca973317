//! Error types for dataset access and selection.

use thiserror::Error;

/// Errors that can occur while loading or subsetting a dataset.
#[derive(Error, Debug)]
pub enum GridError {
    /// A requested variable does not exist.
    #[error("variable not found: {0}")]
    MissingVariable(String),

    /// A requested dimension does not exist.
    #[error("dimension not found: {0}")]
    MissingDimension(String),

    /// A label could not be found in a dimension's index.
    #[error("label {label} not found in dimension {dim}")]
    LabelNotFound { dim: String, label: String },

    /// The selector does not apply to the dimension's index.
    #[error("invalid selector for {dim}: {reason}")]
    InvalidSelector { dim: String, reason: String },

    /// The source is not supported.
    #[error("unsupported source: {0}")]
    Unsupported(String),

    /// Failed to open the data source.
    #[error("failed to open dataset: {0}")]
    OpenFailed(String),

    /// Failed to read data from the source.
    #[error("failed to read dataset: {0}")]
    ReadFailed(String),

    /// Failed to write data.
    #[error("failed to write dataset: {0}")]
    WriteFailed(String),

    /// Inconsistent dataset contents.
    #[error("invalid dataset: {0}")]
    InvalidData(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl GridError {
    /// Create a LabelNotFound error.
    pub fn label_not_found(dim: impl Into<String>, label: impl ToString) -> Self {
        Self::LabelNotFound {
            dim: dim.into(),
            label: label.to_string(),
        }
    }

    /// Create an InvalidSelector error.
    pub fn invalid_selector(dim: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            dim: dim.into(),
            reason: reason.into(),
        }
    }

    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create a WriteFailed error.
    pub fn write_failed(msg: impl Into<String>) -> Self {
        Self::WriteFailed(msg.into())
    }

    /// True when the error means the requested data is simply absent.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, Self::MissingVariable(_) | Self::LabelNotFound { .. })
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidData(err.to_string())
    }
}

impl From<zip::result::ZipError> for GridError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::WriteFailed(err.to_string())
    }
}

/// Result type for dataset operations.
pub type Result<T> = std::result::Result<T, GridError>;
