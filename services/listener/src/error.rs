//! Error types for batch processing.

use thiserror::Error;

use crate::analytics::SinkError;
use crate::identity::IdentityError;
use crate::mapping::MappingError;
use crate::privilege::AuthError;

/// Result type for listener operations.
pub type ListenerResult<T> = Result<T, ListenerError>;

/// Errors surfaced while processing an event batch.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// System credentials could not be acquired; nothing in the batch was processed.
    #[error("failed to acquire system credentials: {0}")]
    Authentication(#[from] AuthError),

    /// The directory has no entry for the event's principal.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    #[error("identity lookup failed: {0}")]
    Identity(#[from] IdentityError),

    #[error("mapper {mapper} failed: {source}")]
    Mapping {
        mapper: String,
        #[source]
        source: MappingError,
    },

    #[error("analytics call failed: {0}")]
    Sink(#[from] SinkError),
}
