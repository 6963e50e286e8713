//! Error types for pqbind.
//!
//! Every failure is returned to the immediate caller. Nothing here retries.

use thiserror::Error;

use crate::types::{Oid, PgType};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PqError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Query failed: {message}")]
    QueryFailed { message: String },

    #[error("Unknown type OID {oid}")]
    UnknownType { oid: Oid },

    #[error("Cannot decode {raw_text:?} as {oid}")]
    DecodeError { oid: Oid, raw_text: String },

    #[error("Type mismatch: expected {expected}, column is {actual}")]
    TypeMismatch { expected: PgType, actual: PgType },

    #[error("Unexpected NULL for non-nullable {oid}")]
    UnexpectedNull { oid: Oid },

    #[error("Cannot encode {oid} parameter: {message}")]
    EncodeError { oid: Oid, message: String },

    #[error("{what} contains an interior NUL byte")]
    InteriorNul { what: &'static str },

    #[error("Connection is closed")]
    ConnectionClosed,

    #[error("Row index {index} out of range (row count {count})")]
    RowOutOfRange { index: usize, count: usize },

    #[error("Column index {index} out of range (field count {count})")]
    ColumnOutOfRange { index: usize, count: usize },

    #[error("No column named {name:?}")]
    ColumnNotFound { name: String },
}

impl PqError {
    /// Build a decode error for `oid`, keeping the offending text.
    pub(crate) fn decode(oid: Oid, raw_text: impl Into<String>) -> Self {
        PqError::DecodeError {
            oid,
            raw_text: raw_text.into(),
        }
    }

    /// True for the registry miss that callers may recover from by reading
    /// the raw cell instead.
    pub fn is_unknown_type(&self) -> bool {
        matches!(self, PqError::UnknownType { .. })
    }
}

pub type PqResult<T> = std::result::Result<T, PqError>;
