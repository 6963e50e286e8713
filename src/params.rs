//! Encoded statement parameters.
//!
//! All parameters of one call are encoded into a single contiguous buffer in
//! one format. The buffer is owned by the execute call and dropped when it
//! returns, after the client library has copied what it needs.

use std::os::raw::{c_char, c_int};

use bytes::{BufMut, BytesMut};
use smallvec::SmallVec;

use crate::codec::{IsNull, ToSql};
use crate::error::{PqError, PqResult};
use crate::types::{Format, Oid};

/// Most statements bind only a handful of parameters.
const INLINE_PARAMS: usize = 8;

/// The parameter arrays handed to `PQexecParams`.
#[derive(Debug)]
pub struct ParamBuffer {
    format: Format,
    types: SmallVec<[u32; INLINE_PARAMS]>,
    /// (offset, length) into `data`; `None` for NULL
    spans: SmallVec<[Option<(usize, usize)>; INLINE_PARAMS]>,
    data: BytesMut,
}

impl ParamBuffer {
    /// Encode `params` in order, all in `format`.
    pub fn encode(params: &[&dyn ToSql], format: Format) -> PqResult<Self> {
        let mut buf = Self {
            format,
            types: SmallVec::with_capacity(params.len()),
            spans: SmallVec::with_capacity(params.len()),
            data: BytesMut::with_capacity(params.len() * 16),
        };

        for param in params {
            let oid = param.sql_type().oid();
            let start = buf.data.len();

            let span = match param.to_sql(format, &mut buf.data)? {
                IsNull::Yes => {
                    buf.data.truncate(start);
                    None
                }
                IsNull::No => {
                    let len = buf.data.len() - start;
                    if c_int::try_from(len).is_err() {
                        return Err(PqError::EncodeError {
                            oid,
                            message: format!("value of {} bytes is too large", len),
                        });
                    }
                    // Text values are read as C strings by the library
                    if format == Format::Text {
                        if buf.data[start..].contains(&0) {
                            return Err(PqError::EncodeError {
                                oid,
                                message: "text value contains a NUL byte".to_string(),
                            });
                        }
                        buf.data.put_u8(0);
                    }
                    Some((start, len))
                }
            };

            buf.types.push(oid.as_u32());
            buf.spans.push(span);
        }

        Ok(buf)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// Declared type of parameter `index`.
    pub fn oid(&self, index: usize) -> Option<Oid> {
        self.types.get(index).map(|raw| Oid(*raw))
    }

    pub fn types(&self) -> &[u32] {
        &self.types
    }

    /// Encoded bytes of parameter `index` (without any terminator), or
    /// `None` if it is NULL or out of range.
    pub fn value(&self, index: usize) -> Option<&[u8]> {
        let (start, len) = (*self.spans.get(index)?)?;
        Some(&self.data[start..start + len])
    }

    /// Pointers into the buffer, null for NULL parameters.
    ///
    /// Valid only while `self` is borrowed and unmodified.
    pub fn value_ptrs(&self) -> SmallVec<[*const c_char; INLINE_PARAMS]> {
        let base = self.data.as_ptr();
        self.spans
            .iter()
            .map(|span| match span {
                // SAFETY: every span was produced by `encode` and lies inside `data`
                Some((start, _)) => unsafe { base.add(*start) as *const c_char },
                None => std::ptr::null(),
            })
            .collect()
    }

    pub fn lengths(&self) -> SmallVec<[c_int; INLINE_PARAMS]> {
        self.spans
            .iter()
            // Lengths were checked against c_int in `encode`
            .map(|span| span.map_or(0, |(_, len)| len as c_int))
            .collect()
    }

    pub fn formats(&self) -> SmallVec<[c_int; INLINE_PARAMS]> {
        SmallVec::from_elem(self.format.code(), self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_params_are_nul_terminated() {
        let buf = ParamBuffer::encode(&[&42i32, &"abc"], Format::Text).unwrap();

        assert_eq!(buf.len(), 2);
        assert_eq!(buf.types(), &[23, 25]);
        assert_eq!(buf.value(0), Some(&b"42"[..]));
        assert_eq!(buf.value(1), Some(&b"abc"[..]));
        assert_eq!(&buf.lengths()[..], &[2, 3]);
        assert_eq!(&buf.formats()[..], &[0, 0]);

        // The byte after each value is the terminator the library reads up to
        let ptrs = buf.value_ptrs();
        let first = unsafe { std::ffi::CStr::from_ptr(ptrs[0]) };
        assert_eq!(first.to_bytes(), b"42");
    }

    #[test]
    fn test_binary_params_are_length_delimited() {
        let buf = ParamBuffer::encode(&[&7i64, &true], Format::Binary).unwrap();

        assert_eq!(buf.value(0), Some(&7i64.to_be_bytes()[..]));
        assert_eq!(buf.value(1), Some(&[1u8][..]));
        assert_eq!(&buf.lengths()[..], &[8, 1]);
        assert_eq!(&buf.formats()[..], &[1, 1]);
    }

    #[test]
    fn test_null_param() {
        let absent: Option<i32> = None;
        let buf = ParamBuffer::encode(&[&absent, &1i32], Format::Text).unwrap();

        assert_eq!(buf.value(0), None);
        assert_eq!(buf.oid(0), Some(Oid::INT4));
        assert!(buf.value_ptrs()[0].is_null());
        assert!(!buf.value_ptrs()[1].is_null());
        assert_eq!(buf.lengths()[0], 0);
    }

    #[test]
    fn test_nul_byte_rejected_in_text_mode() {
        let err = ParamBuffer::encode(&[&"a\0b"], Format::Text).unwrap_err();
        assert!(matches!(err, PqError::EncodeError { oid: Oid::TEXT, .. }));

        // Binary mode carries explicit lengths, so the same bytes are fine
        let buf = ParamBuffer::encode(&[&"a\0b"], Format::Binary).unwrap();
        assert_eq!(buf.value(0), Some(&b"a\0b"[..]));
    }

    #[test]
    fn test_empty() {
        let buf = ParamBuffer::encode(&[], Format::Text).unwrap();
        assert!(buf.is_empty());
        assert!(buf.value_ptrs().is_empty());
    }
}
