//! Value codec.
//!
//! Converts native values to and from the two wire encodings:
//! - text: what `psql` would print (`t`/`f`, decimal digits, `yyyy-MM-dd HH:mm:ss.SSS`)
//! - binary: big-endian fixed width for numbers, raw bytes for variable-length types
//!
//! Reference: https://www.postgresql.org/docs/current/protocol-overview.html#PROTOCOL-FORMAT-CODES

use std::fmt;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use crate::error::{PqError, PqResult};
use crate::types::{Format, Oid, PgType};

/// Emitted timestamp text, always millisecond precision.
const TIMESTAMP_OUT: &str = "%Y-%m-%d %H:%M:%S%.3f";
/// Accepted timestamp text. `%.f` also matches an absent fraction.
const TIMESTAMP_IN: &str = "%Y-%m-%d %H:%M:%S%.f";
/// Microseconds between the Unix epoch and 2000-01-01 00:00:00.
const PG_EPOCH_MICROS: i64 = 946_684_800_000_000;
/// 4714-11-24 00:00:00 BC, relative to the server epoch.
const PG_MIN_MICROS: i64 = -211_813_488_000_000_000;

// ============================================================================
// Conversion traits
// ============================================================================

/// Whether an encoded parameter carries a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsNull {
    Yes,
    No,
}

/// Declares the canonical server type of a native type.
pub trait SqlType {
    const TYPE: PgType;

    /// Whether a column of type `ty` can be read as this type.
    fn accepts(ty: PgType) -> bool {
        ty == Self::TYPE
    }
}

/// A value that can be bound as a statement parameter.
pub trait ToSql {
    fn sql_type(&self) -> PgType;

    /// Append the wire form of `self` to `out`.
    ///
    /// Returns `IsNull::Yes` (writing nothing) for an absent value.
    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull>;
}

/// A value that can be read from a result cell.
pub trait FromSql: SqlType + Sized {
    /// Decode a non-null cell.
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self>;

    /// Decode a cell that may be NULL (`None`).
    fn from_sql_nullable(format: Format, raw: Option<&[u8]>) -> PqResult<Self> {
        match raw {
            Some(raw) => Self::from_sql(format, raw),
            None => Err(PqError::UnexpectedNull {
                oid: Self::TYPE.oid(),
            }),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Render a cell for error messages: lossy UTF-8 for text, `\x` hex for binary.
pub(crate) fn raw_text(format: Format, raw: &[u8]) -> String {
    match format {
        Format::Text => String::from_utf8_lossy(raw).into_owned(),
        Format::Binary => to_hex(raw),
    }
}

fn decode_err(oid: Oid, format: Format, raw: &[u8]) -> PqError {
    PqError::decode(oid, raw_text(format, raw))
}

fn utf8(oid: Oid, format: Format, raw: &[u8]) -> PqResult<&str> {
    std::str::from_utf8(raw).map_err(|_| decode_err(oid, format, raw))
}

fn fixed<const N: usize>(oid: Oid, raw: &[u8]) -> PqResult<[u8; N]> {
    raw.try_into()
        .map_err(|_| decode_err(oid, Format::Binary, raw))
}

fn to_hex(raw: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(2 + raw.len() * 2);
    out.push_str("\\x");
    for b in raw {
        out.push(DIGITS[(b >> 4) as usize] as char);
        out.push(DIGITS[(b & 0x0f) as usize] as char);
    }
    out
}

fn from_hex(text: &str) -> Option<Vec<u8>> {
    let digits = text.strip_prefix("\\x")?.as_bytes();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}

// ============================================================================
// Integers
// ============================================================================

macro_rules! integer_sql {
    ($t:ty, $pg:expr) => {
        impl SqlType for $t {
            const TYPE: PgType = $pg;
        }

        impl ToSql for $t {
            fn sql_type(&self) -> PgType {
                $pg
            }

            fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
                match format {
                    Format::Text => out.put_slice(self.to_string().as_bytes()),
                    Format::Binary => out.put_slice(&self.to_be_bytes()),
                }
                Ok(IsNull::No)
            }
        }

        impl FromSql for $t {
            fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
                let oid = $pg.oid();
                match format {
                    Format::Text => utf8(oid, format, raw)?
                        .parse::<$t>()
                        .map_err(|_| decode_err(oid, format, raw)),
                    Format::Binary => fixed(oid, raw).map(<$t>::from_be_bytes),
                }
            }
        }
    };
}

integer_sql!(i16, PgType::Int2);
integer_sql!(i32, PgType::Int4);
integer_sql!(i64, PgType::Int8);

// ============================================================================
// Floats
// ============================================================================

macro_rules! float_sql {
    ($t:ty, $pg:expr) => {
        impl SqlType for $t {
            const TYPE: PgType = $pg;
        }

        impl ToSql for $t {
            fn sql_type(&self) -> PgType {
                $pg
            }

            fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
                match format {
                    Format::Text => {
                        let text = if self.is_nan() {
                            "NaN".to_string()
                        } else if *self == <$t>::INFINITY {
                            "Infinity".to_string()
                        } else if *self == <$t>::NEG_INFINITY {
                            "-Infinity".to_string()
                        } else {
                            self.to_string()
                        };
                        out.put_slice(text.as_bytes());
                    }
                    Format::Binary => out.put_slice(&self.to_be_bytes()),
                }
                Ok(IsNull::No)
            }
        }

        impl FromSql for $t {
            fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
                let oid = $pg.oid();
                match format {
                    // Rust's parser accepts NaN, Infinity and -Infinity as the server prints them
                    Format::Text => utf8(oid, format, raw)?
                        .parse::<$t>()
                        .map_err(|_| decode_err(oid, format, raw)),
                    Format::Binary => fixed(oid, raw).map(<$t>::from_be_bytes),
                }
            }
        }
    };
}

float_sql!(f32, PgType::Float4);
float_sql!(f64, PgType::Float8);

// ============================================================================
// Boolean
// ============================================================================

impl SqlType for bool {
    const TYPE: PgType = PgType::Bool;
}

impl ToSql for bool {
    fn sql_type(&self) -> PgType {
        PgType::Bool
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        match format {
            Format::Text => out.put_u8(if *self { b't' } else { b'f' }),
            Format::Binary => out.put_u8(u8::from(*self)),
        }
        Ok(IsNull::No)
    }
}

impl FromSql for bool {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        match (format, raw) {
            (Format::Text, b"t") => Ok(true),
            (Format::Text, b"f") => Ok(false),
            (Format::Binary, [b]) => Ok(*b != 0),
            _ => Err(decode_err(Oid::BOOL, format, raw)),
        }
    }
}

// ============================================================================
// Strings
// ============================================================================

impl SqlType for str {
    const TYPE: PgType = PgType::Text;

    fn accepts(ty: PgType) -> bool {
        ty.is_text_like()
    }
}

impl ToSql for str {
    fn sql_type(&self) -> PgType {
        PgType::Text
    }

    fn to_sql(&self, _format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        // Identical in both encodings
        out.put_slice(self.as_bytes());
        Ok(IsNull::No)
    }
}

impl SqlType for String {
    const TYPE: PgType = PgType::Text;

    fn accepts(ty: PgType) -> bool {
        ty.is_text_like()
    }
}

impl ToSql for String {
    fn sql_type(&self) -> PgType {
        PgType::Text
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        self.as_str().to_sql(format, out)
    }
}

impl FromSql for String {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        utf8(Oid::TEXT, format, raw).map(str::to_owned)
    }
}

// ============================================================================
// Byte buffers
// ============================================================================

impl SqlType for [u8] {
    const TYPE: PgType = PgType::Bytea;
}

impl ToSql for [u8] {
    fn sql_type(&self) -> PgType {
        PgType::Bytea
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        match format {
            Format::Text => out.put_slice(to_hex(self).as_bytes()),
            Format::Binary => out.put_slice(self),
        }
        Ok(IsNull::No)
    }
}

impl SqlType for Vec<u8> {
    const TYPE: PgType = PgType::Bytea;
}

impl ToSql for Vec<u8> {
    fn sql_type(&self) -> PgType {
        PgType::Bytea
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        self.as_slice().to_sql(format, out)
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        match format {
            Format::Text => utf8(Oid::BYTEA, format, raw)
                .ok()
                .and_then(from_hex)
                .ok_or_else(|| decode_err(Oid::BYTEA, format, raw)),
            Format::Binary => Ok(raw.to_vec()),
        }
    }
}

// ============================================================================
// Timestamps
// ============================================================================

impl SqlType for NaiveDateTime {
    const TYPE: PgType = PgType::Timestamp;
}

impl ToSql for NaiveDateTime {
    fn sql_type(&self) -> PgType {
        PgType::Timestamp
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        match format {
            Format::Text => out.put_slice(self.format(TIMESTAMP_OUT).to_string().as_bytes()),
            Format::Binary => {
                let micros = self.and_utc().timestamp_micros() - PG_EPOCH_MICROS;
                if micros < PG_MIN_MICROS {
                    return Err(PqError::EncodeError {
                        oid: Oid::TIMESTAMP,
                        message: format!("{} is before the earliest server timestamp", self),
                    });
                }
                out.put_i64(micros);
            }
        }
        Ok(IsNull::No)
    }
}

impl FromSql for NaiveDateTime {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        let oid = Oid::TIMESTAMP;
        match format {
            Format::Text => {
                let text = utf8(oid, format, raw)?;
                NaiveDateTime::parse_from_str(text, TIMESTAMP_IN)
                    .map_err(|_| decode_err(oid, format, raw))
            }
            Format::Binary => {
                let micros = i64::from_be_bytes(fixed(oid, raw)?);
                // infinity/-infinity travel as i64::MAX/MIN and land here
                micros
                    .checked_add(PG_EPOCH_MICROS)
                    .and_then(DateTime::from_timestamp_micros)
                    .map(|dt| dt.naive_utc())
                    .ok_or_else(|| decode_err(oid, format, raw))
            }
        }
    }
}

impl SqlType for DateTime<Utc> {
    const TYPE: PgType = PgType::Timestamp;
}

impl ToSql for DateTime<Utc> {
    fn sql_type(&self) -> PgType {
        PgType::Timestamp
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        self.naive_utc().to_sql(format, out)
    }
}

impl FromSql for DateTime<Utc> {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        NaiveDateTime::from_sql(format, raw).map(|naive| naive.and_utc())
    }
}

// ============================================================================
// UUID
// ============================================================================

impl SqlType for Uuid {
    const TYPE: PgType = PgType::Uuid;
}

impl ToSql for Uuid {
    fn sql_type(&self) -> PgType {
        PgType::Uuid
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        match format {
            Format::Text => out.put_slice(self.hyphenated().to_string().as_bytes()),
            Format::Binary => out.put_slice(self.as_bytes()),
        }
        Ok(IsNull::No)
    }
}

impl FromSql for Uuid {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        let oid = Oid::UUID;
        match format {
            Format::Text => {
                Uuid::try_parse(utf8(oid, format, raw)?).map_err(|_| decode_err(oid, format, raw))
            }
            Format::Binary => fixed(oid, raw).map(Uuid::from_bytes),
        }
    }
}

// ============================================================================
// Nullable and borrowed wrappers
// ============================================================================

impl<T: SqlType> SqlType for Option<T> {
    const TYPE: PgType = T::TYPE;

    fn accepts(ty: PgType) -> bool {
        T::accepts(ty)
    }
}

impl<T: ToSql + SqlType> ToSql for Option<T> {
    fn sql_type(&self) -> PgType {
        T::TYPE
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        match self {
            Some(v) => v.to_sql(format, out),
            None => Ok(IsNull::Yes),
        }
    }
}

impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(format: Format, raw: &[u8]) -> PqResult<Self> {
        T::from_sql(format, raw).map(Some)
    }

    fn from_sql_nullable(format: Format, raw: Option<&[u8]>) -> PqResult<Self> {
        match raw {
            Some(raw) => Self::from_sql(format, raw),
            None => Ok(None),
        }
    }
}

impl<T: SqlType + ?Sized> SqlType for &T {
    const TYPE: PgType = T::TYPE;

    fn accepts(ty: PgType) -> bool {
        T::accepts(ty)
    }
}

impl<T: ToSql + ?Sized> ToSql for &T {
    fn sql_type(&self) -> PgType {
        (**self).sql_type()
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        (**self).to_sql(format, out)
    }
}

// ============================================================================
// Dynamic values
// ============================================================================

/// A value of any registered type, for callers that only learn the type at
/// runtime (e.g. printing an arbitrary result set).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL of a known type
    Null(PgType),
    Bool(bool),
    Bytea(Vec<u8>),
    Int2(i16),
    Int4(i32),
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
}

impl Value {
    /// Check if this value is NULL
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    /// Decode a cell of registered type `ty`.
    pub fn decode(ty: PgType, format: Format, raw: Option<&[u8]>) -> PqResult<Self> {
        let Some(raw) = raw else {
            return Ok(Value::Null(ty));
        };
        Ok(match ty {
            PgType::Bool => Value::Bool(bool::from_sql(format, raw)?),
            PgType::Bytea => Value::Bytea(Vec::from_sql(format, raw)?),
            PgType::Int2 => Value::Int2(i16::from_sql(format, raw)?),
            PgType::Int4 => Value::Int4(i32::from_sql(format, raw)?),
            PgType::Int8 => Value::Int8(i64::from_sql(format, raw)?),
            PgType::Float4 => Value::Float4(f32::from_sql(format, raw)?),
            PgType::Float8 => Value::Float8(f64::from_sql(format, raw)?),
            PgType::Text | PgType::Varchar => Value::Text(String::from_sql(format, raw)?),
            PgType::Timestamp => Value::Timestamp(NaiveDateTime::from_sql(format, raw)?),
            PgType::Uuid => Value::Uuid(Uuid::from_sql(format, raw)?),
        })
    }
}

impl ToSql for Value {
    fn sql_type(&self) -> PgType {
        match self {
            Value::Null(ty) => *ty,
            Value::Bool(_) => PgType::Bool,
            Value::Bytea(_) => PgType::Bytea,
            Value::Int2(_) => PgType::Int2,
            Value::Int4(_) => PgType::Int4,
            Value::Int8(_) => PgType::Int8,
            Value::Float4(_) => PgType::Float4,
            Value::Float8(_) => PgType::Float8,
            Value::Text(_) => PgType::Text,
            Value::Timestamp(_) => PgType::Timestamp,
            Value::Uuid(_) => PgType::Uuid,
        }
    }

    fn to_sql(&self, format: Format, out: &mut BytesMut) -> PqResult<IsNull> {
        match self {
            Value::Null(_) => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(format, out),
            Value::Bytea(v) => v.to_sql(format, out),
            Value::Int2(v) => v.to_sql(format, out),
            Value::Int4(v) => v.to_sql(format, out),
            Value::Int8(v) => v.to_sql(format, out),
            Value::Float4(v) => v.to_sql(format, out),
            Value::Float8(v) => v.to_sql(format, out),
            Value::Text(v) => v.to_sql(format, out),
            Value::Timestamp(v) => v.to_sql(format, out),
            Value::Uuid(v) => v.to_sql(format, out),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => f.write_str("NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Bytea(v) => f.write_str(&to_hex(v)),
            Value::Int2(v) => write!(f, "{}", v),
            Value::Int4(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Float4(v) => write!(f, "{}", v),
            Value::Float8(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
            Value::Timestamp(v) => write!(f, "{}", v.format(TIMESTAMP_OUT)),
            Value::Uuid(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! value_from {
    ($t:ty => $variant:ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v)
            }
        }
    };
}

value_from!(bool => Bool);
value_from!(Vec<u8> => Bytea);
value_from!(i16 => Int2);
value_from!(i32 => Int4);
value_from!(i64 => Int8);
value_from!(f32 => Float4);
value_from!(f64 => Float8);
value_from!(String => Text);
value_from!(NaiveDateTime => Timestamp);
value_from!(Uuid => Uuid);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v.naive_utc())
    }
}
