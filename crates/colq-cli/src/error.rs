//! CLI error type.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reported by the `colq` binary.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Protocol(#[from] colq_proto::Error),

    #[error(transparent)]
    Core(#[from] colq_core::Error),

    #[error("this command needs fixture data (--data)")]
    MissingData,
}

impl From<colq_proto::CodecError> for CliError {
    fn from(err: colq_proto::CodecError) -> Self {
        CliError::Protocol(err.into())
    }
}

impl From<colq_core::CatalogError> for CliError {
    fn from(err: colq_core::CatalogError) -> Self {
        CliError::Core(err.into())
    }
}

impl From<colq_core::BackendError> for CliError {
    fn from(err: colq_core::BackendError) -> Self {
        CliError::Core(err.into())
    }
}
