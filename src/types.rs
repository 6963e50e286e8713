//! Type registry.
//!
//! Maps server type OIDs onto the closed set of types this crate can encode
//! and decode. The table is static; there is no runtime registration.
//! Reference: https://www.postgresql.org/docs/current/catalog-pg-type.html

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PqError, PqResult};

// ============================================================================
// Type OIDs
// ============================================================================

/// A raw server type identifier, as reported by `PQftype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid(pub u32);

impl Oid {
    pub const BOOL: Oid = Oid(16);
    pub const BYTEA: Oid = Oid(17);
    pub const INT8: Oid = Oid(20);
    pub const INT2: Oid = Oid(21);
    pub const INT4: Oid = Oid(23);
    pub const TEXT: Oid = Oid(25);
    pub const FLOAT4: Oid = Oid(700);
    pub const FLOAT8: Oid = Oid(701);
    pub const VARCHAR: Oid = Oid(1043);
    pub const TIMESTAMP: Oid = Oid(1114);
    pub const UUID: Oid = Oid(2950);

    /// Get the raw value
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match PgType::from_oid(*self) {
            Ok(ty) => write!(f, "{} ({})", ty, self.0),
            Err(_) => write!(f, "{}", self.0),
        }
    }
}

impl From<u32> for Oid {
    fn from(raw: u32) -> Self {
        Oid(raw)
    }
}

// ============================================================================
// Registered types
// ============================================================================

/// A server type this crate knows how to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PgType {
    Bool,
    Bytea,
    Int2,
    Int4,
    Int8,
    Text,
    Varchar,
    Float4,
    Float8,
    Timestamp,
    Uuid,
}

impl PgType {
    /// Every registered type, in OID order.
    pub const ALL: [PgType; 11] = [
        PgType::Bool,
        PgType::Bytea,
        PgType::Int8,
        PgType::Int2,
        PgType::Int4,
        PgType::Text,
        PgType::Float4,
        PgType::Float8,
        PgType::Varchar,
        PgType::Timestamp,
        PgType::Uuid,
    ];

    /// Look up a raw identifier.
    ///
    /// A miss is recoverable: the caller may still read the cell's raw bytes.
    pub fn from_oid(oid: Oid) -> PqResult<Self> {
        match oid {
            Oid::BOOL => Ok(PgType::Bool),
            Oid::BYTEA => Ok(PgType::Bytea),
            Oid::INT8 => Ok(PgType::Int8),
            Oid::INT2 => Ok(PgType::Int2),
            Oid::INT4 => Ok(PgType::Int4),
            Oid::TEXT => Ok(PgType::Text),
            Oid::FLOAT4 => Ok(PgType::Float4),
            Oid::FLOAT8 => Ok(PgType::Float8),
            Oid::VARCHAR => Ok(PgType::Varchar),
            Oid::TIMESTAMP => Ok(PgType::Timestamp),
            Oid::UUID => Ok(PgType::Uuid),
            _ => Err(PqError::UnknownType { oid }),
        }
    }

    pub fn oid(self) -> Oid {
        match self {
            PgType::Bool => Oid::BOOL,
            PgType::Bytea => Oid::BYTEA,
            PgType::Int2 => Oid::INT2,
            PgType::Int4 => Oid::INT4,
            PgType::Int8 => Oid::INT8,
            PgType::Text => Oid::TEXT,
            PgType::Varchar => Oid::VARCHAR,
            PgType::Float4 => Oid::FLOAT4,
            PgType::Float8 => Oid::FLOAT8,
            PgType::Timestamp => Oid::TIMESTAMP,
            PgType::Uuid => Oid::UUID,
        }
    }

    /// The server's name for this type.
    pub fn name(self) -> &'static str {
        match self {
            PgType::Bool => "bool",
            PgType::Bytea => "bytea",
            PgType::Int2 => "int2",
            PgType::Int4 => "int4",
            PgType::Int8 => "int8",
            PgType::Text => "text",
            PgType::Varchar => "varchar",
            PgType::Float4 => "float4",
            PgType::Float8 => "float8",
            PgType::Timestamp => "timestamp",
            PgType::Uuid => "uuid",
        }
    }

    /// Check if this is a text-like type
    pub fn is_text_like(self) -> bool {
        matches!(self, PgType::Text | PgType::Varchar)
    }
}

impl fmt::Display for PgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Wire formats
// ============================================================================

/// Wire encoding for parameters and result columns within one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Text = 0,
    Binary = 1,
}

impl Format {
    /// The format code the client library expects.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oid_table_values() {
        assert_eq!(Oid::BOOL.as_u32(), 16);
        assert_eq!(Oid::INT2.as_u32(), 21);
        assert_eq!(Oid::INT4.as_u32(), 23);
        assert_eq!(Oid::INT8.as_u32(), 20);
        assert_eq!(Oid::TEXT.as_u32(), 25);
        assert_eq!(Oid::VARCHAR.as_u32(), 1043);
        assert_eq!(Oid::FLOAT4.as_u32(), 700);
        assert_eq!(Oid::FLOAT8.as_u32(), 701);
        assert_eq!(Oid::TIMESTAMP.as_u32(), 1114);
        assert_eq!(Oid::UUID.as_u32(), 2950);
    }

    #[test]
    fn test_lookup_is_inverse_of_oid() {
        for ty in PgType::ALL {
            assert_eq!(PgType::from_oid(ty.oid()).unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_oid_is_recoverable() {
        let err = PgType::from_oid(Oid(114)).unwrap_err();
        assert_eq!(err, PqError::UnknownType { oid: Oid(114) });
        assert!(err.is_unknown_type());
    }

    #[test]
    fn test_display() {
        assert_eq!(PgType::Varchar.to_string(), "varchar");
        assert_eq!(Oid::UUID.to_string(), "uuid (2950)");
        assert_eq!(Oid(3802).to_string(), "3802");
    }

    #[test]
    fn test_format_codes() {
        assert_eq!(Format::Text.code(), 0);
        assert_eq!(Format::Binary.code(), 1);
        assert_eq!(Format::default(), Format::Text);
    }
}
