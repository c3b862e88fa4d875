//! Protocol error types.

use thiserror::Error;

pub use crate::codec::CodecError;
pub use crate::validate::ValidationError;

/// Errors raised before a query reaches a backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The query is structurally invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The encoded query string is malformed.
    #[error("decode error: {0}")]
    Codec(#[from] CodecError),
}
