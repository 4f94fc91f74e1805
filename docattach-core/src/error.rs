//! Error types and result types for attachment operations.
//!
//! Errors fall into two groups. Guard errors are raised by this crate before any
//! store interaction happens; store errors come from the driver and carry the
//! driver's own error value untouched. A missing field or a missing document is
//! never an error.

use std::{error::Error as StdError, time::Duration};

use bson::error::Error as BsonError;
use thiserror::Error;

/// Boxed driver error as produced by a [`StoreDriver`](crate::driver::StoreDriver).
pub type DriverError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when using an attached document or collection.
#[derive(Error, Debug)]
pub enum AttachError {
    /// An empty match was passed to a remove without explicit confirmation.
    #[error("Refusing to remove every document in {0} without confirmation")]
    UnconfirmedRemoveAll(String),
    /// The requested operation or result mode is deliberately not implemented.
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),
    /// A document proxy was requested for a model instance that has no primary key yet.
    #[error("Model {0} has no primary key; save it before accessing its document")]
    MissingPrimaryKey(&'static str),
    /// The update document is neither a pure operator document nor a pure replacement,
    /// or a replacement was combined with a multi-document update.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// An index specification without keys.
    #[error("Invalid index: {0}")]
    InvalidIndex(String),
    /// The process-wide store settings are invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// The connector could not produce a driver handle for an endpoint.
    #[error("Connection error: {0}")]
    Connection(String),
    /// A store call did not complete within the configured bound.
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    /// Serialization/deserialization error when converting values to or from BSON.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error reported by the underlying document-store driver.
    #[error("Driver error: {0}")]
    Driver(#[source] DriverError),
}

impl AttachError {
    /// Wraps a driver error without altering it.
    pub fn driver<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        AttachError::Driver(Box::new(err))
    }

    /// Returns the driver error as a concrete type if it is one.
    pub fn driver_error<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        match self {
            AttachError::Driver(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Whether this error was raised before any store interaction.
    pub fn is_guard(&self) -> bool {
        matches!(
            self,
            AttachError::UnconfirmedRemoveAll(_)
                | AttachError::Unsupported(_)
                | AttachError::MissingPrimaryKey(_)
                | AttachError::InvalidUpdate(_)
                | AttachError::InvalidIndex(_)
        )
    }
}

/// A specialized `Result` type for attachment operations.
pub type AttachResult<T> = Result<T, AttachError>;

impl From<BsonError> for AttachError {
    fn from(err: BsonError) -> Self {
        AttachError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Debug, Error)]
    #[error("server said no")]
    struct ServerRejected;

    #[rstest]
    #[case(AttachError::UnconfirmedRemoveAll("app.widgets".into()), true)]
    #[case(AttachError::Unsupported("pop_item"), true)]
    #[case(AttachError::MissingPrimaryKey("widget"), true)]
    #[case(AttachError::InvalidUpdate("mixed".into()), true)]
    #[case(AttachError::Timeout(Duration::from_secs(1)), false)]
    #[case(AttachError::driver(ServerRejected), false)]
    fn test_guard_classification(#[case] err: AttachError, #[case] guard: bool) {
        assert_eq!(err.is_guard(), guard);
    }

    #[rstest]
    fn test_driver_error_is_kept_intact() {
        let err = AttachError::driver(ServerRejected);

        assert!(err.driver_error::<ServerRejected>().is_some());
        assert_eq!(err.to_string(), "Driver error: server said no");
        assert!(StdError::source(&err).is_some());
    }
}
