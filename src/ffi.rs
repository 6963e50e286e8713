//! The seam between safe types and the client library.
//!
//! `Session` and `ResultHandle` cover the fixed set of library calls this
//! crate makes: connect, execute with parameters, read status and
//! diagnostics, read field metadata and cell bytes. Releasing a handle is
//! the implementor's `Drop`; owners free a handle by dropping it, which the
//! type system allows exactly once.

use std::borrow::Cow;
use std::ffi::CStr;

use crate::params::ParamBuffer;
use crate::types::{Format, Oid};

/// Outcome status of one command, as reported by the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecStatus {
    /// Command completed with no rows (INSERT, UPDATE, DDL, ...)
    CommandOk,
    /// Rows are available
    TuplesOk,
    EmptyQuery,
    BadResponse,
    NonfatalError,
    FatalError,
    /// Any other status (COPY, pipeline, ...)
    Other(i32),
}

/// An exclusively owned handle to a live database session.
pub trait Session: Sized {
    type Result: ResultHandle;

    /// Allocate a session for `conninfo`, blocking until the attempt finishes.
    ///
    /// `None` only if the library could not allocate a handle at all; a
    /// failed attempt still returns a handle whose `is_ok` is false.
    fn connect(conninfo: &CStr) -> Option<Self>;

    /// Whether the session reached the connected state.
    fn is_ok(&self) -> bool;

    /// The library's most recent diagnostic for this session.
    fn error_message(&self) -> String;

    /// Run `sql` with `params`, requesting results in `result_format`.
    ///
    /// `None` if the library did not produce a result buffer.
    fn exec_params(
        &mut self,
        sql: &CStr,
        params: &ParamBuffer,
        result_format: Format,
    ) -> Option<Self::Result>;
}

/// An exclusively owned result buffer.
///
/// Row and column arguments are range-checked by the caller.
pub trait ResultHandle {
    fn status(&self) -> ExecStatus;

    /// Diagnostic attached to this result; empty on success.
    fn error_message(&self) -> String;

    fn ntuples(&self) -> usize;

    fn nfields(&self) -> usize;

    fn field_name(&self, column: usize) -> Cow<'_, str>;

    fn field_type(&self, column: usize) -> Oid;

    /// Cell bytes, exactly `PQgetlength` long.
    fn value(&self, row: usize, column: usize) -> &[u8];

    fn is_null(&self, row: usize, column: usize) -> bool;
}

/// Trim the trailing newline the library appends to diagnostics.
pub(crate) fn clean_message(raw: Cow<'_, str>) -> String {
    raw.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_message() {
        let raw = Cow::Borrowed("ERROR:  syntax error at or near \"selec\"\n");
        assert_eq!(clean_message(raw), "ERROR:  syntax error at or near \"selec\"");
    }
}
