//! Error taxonomy for the export workflow.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExportError>;

/// Everything that can go wrong between loading an ensemble and writing
/// its artifacts. Upload failures never surface here; they are logged.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Seed metadata is unreadable or lacks a required key.
    #[error("configuration error in {path}: {reason}")]
    Configuration { path: PathBuf, reason: String },

    /// Nothing matched where input was expected.
    #[error("discovery error: {0}")]
    Discovery(String),

    /// A column the workflow relies on is absent from the table.
    #[error("table has no column {0}")]
    MissingColumn(String),

    /// Writing a table or its sidecar failed.
    #[error("failed to export {name}: {reason}")]
    Export { name: String, reason: String },

    /// The sidecar metadata file was not where the export said it would be.
    #[error("metadata file not found: {0}")]
    MetadataNotFound(PathBuf),

    /// Some artifacts of a run could not be exported.
    #[error("{failed} of {total} exports failed")]
    ExportsFailed { failed: usize, total: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl ExportError {
    pub(crate) fn export(name: &str, reason: impl ToString) -> Self {
        ExportError::Export {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn config(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ExportError::Configuration {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
