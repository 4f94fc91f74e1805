//! Errors reported by the in-memory store.
//!
//! These reach callers wrapped in [`AttachError::Driver`], the same way a real driver's
//! errors do, so tests can assert on them with
//! [`AttachError::driver_error`](docattach_core::error::AttachError::driver_error).

use bson::Bson;
use thiserror::Error;

use docattach_core::error::AttachError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MemoryStoreError {
    /// An insert or upsert reused an `_id` already present in the collection.
    #[error("duplicate key error collection: {namespace} dup key: {{ _id: {id} }}")]
    DuplicateKey { namespace: String, id: Bson },
    /// A query or update operator the store does not understand.
    #[error("unknown operator: {0}")]
    UnknownOperator(String),
    #[error("no such command: '{0}'")]
    NoSuchCommand(String),
    #[error("performing an update on the path '_id' would modify the immutable field '_id'")]
    ImmutableId,
    /// An operator was applied to a value of the wrong type.
    #[error("bad value: {0}")]
    BadValue(String),
}

pub type MemoryStoreResult<T> = Result<T, MemoryStoreError>;

impl From<MemoryStoreError> for AttachError {
    fn from(err: MemoryStoreError) -> Self {
        AttachError::driver(err)
    }
}
