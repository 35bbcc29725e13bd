//! Errors returned by typed value access.
//!
//! The dictionary and skip list never fail; "not found" and "already
//! exists" are ordinary return values there. Errors only appear once a
//! caller asks for a specific kind of value under a key.

use crate::storage::ObjectType;
use thiserror::Error;

/// Errors from typed operations on a [`RedisDb`](crate::storage::RedisDb).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The key holds a different kind of value
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value (expected {expected}, found {found})")]
    WrongType {
        expected: ObjectType,
        found: ObjectType,
    },

    /// The key does not exist
    #[error("ERR no such key")]
    NoSuchKey,
}

/// Result alias for typed storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
