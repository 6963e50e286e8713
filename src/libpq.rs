//! libpq implementation of the session seam, over `pq-sys`.

use std::borrow::Cow;
use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::ptr::{self, NonNull};

use pq_sys::{ConnStatusType, ExecStatusType, PGconn, PGresult};

use crate::ffi::{clean_message, ExecStatus, ResultHandle, Session};
use crate::params::ParamBuffer;
use crate::types::{Format, Oid};

/// Borrow a C string the library owns. Null becomes empty.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string that outlives `'a`.
unsafe fn borrowed_str<'a>(ptr: *const c_char) -> Cow<'a, str> {
    if ptr.is_null() {
        Cow::Borrowed("")
    } else {
        CStr::from_ptr(ptr).to_string_lossy()
    }
}

/// Row and column indices come from counts the library reported, which are
/// themselves `c_int`.
#[inline]
fn idx(i: usize) -> c_int {
    i as c_int
}

// ============================================================================
// Session
// ============================================================================

/// An owned `PGconn`, finished on drop.
#[derive(Debug)]
pub struct PqSession {
    conn: NonNull<PGconn>,
}

// A PGconn may move between threads but must not be used from two at once,
// which `&mut self` on every call already rules out.
unsafe impl Send for PqSession {}

impl Session for PqSession {
    type Result = PqResultHandle;

    fn connect(conninfo: &CStr) -> Option<Self> {
        // SAFETY: conninfo is a valid C string for the duration of the call
        let raw = unsafe { pq_sys::PQconnectdb(conninfo.as_ptr()) };
        NonNull::new(raw).map(|conn| Self { conn })
    }

    fn is_ok(&self) -> bool {
        // SAFETY: conn is a live handle owned by self
        let status = unsafe { pq_sys::PQstatus(self.conn.as_ptr()) };
        matches!(status, ConnStatusType::CONNECTION_OK)
    }

    fn error_message(&self) -> String {
        // SAFETY: the message is owned by conn and copied before returning
        clean_message(unsafe { borrowed_str(pq_sys::PQerrorMessage(self.conn.as_ptr())) })
    }

    fn exec_params(
        &mut self,
        sql: &CStr,
        params: &ParamBuffer,
        result_format: Format,
    ) -> Option<Self::Result> {
        let values = params.value_ptrs();
        let lengths = params.lengths();
        let formats = params.formats();

        let (types, values, lengths, formats) = if params.is_empty() {
            (ptr::null(), ptr::null(), ptr::null(), ptr::null())
        } else {
            (
                params.types().as_ptr(),
                values.as_ptr(),
                lengths.as_ptr(),
                formats.as_ptr(),
            )
        };

        // SAFETY: every array holds params.len() entries and, together with
        // the buffer the value pointers reference, outlives the call.
        let raw = unsafe {
            pq_sys::PQexecParams(
                self.conn.as_ptr(),
                sql.as_ptr(),
                params.len() as c_int,
                types,
                values,
                lengths,
                formats,
                result_format.code(),
            )
        };
        NonNull::new(raw).map(|res| PqResultHandle { res })
    }
}

impl Drop for PqSession {
    fn drop(&mut self) {
        tracing::trace!("finishing libpq connection");
        // SAFETY: conn is owned by self and this is its only release path
        unsafe { pq_sys::PQfinish(self.conn.as_ptr()) }
    }
}

// ============================================================================
// Result buffer
// ============================================================================

/// An owned `PGresult`, cleared on drop.
#[derive(Debug)]
pub struct PqResultHandle {
    res: NonNull<PGresult>,
}

// A PGresult is immutable once returned and does not reference its
// connection, so it may be read from any thread.
unsafe impl Send for PqResultHandle {}
unsafe impl Sync for PqResultHandle {}

impl PqResultHandle {
    #[inline]
    fn raw(&self) -> *const PGresult {
        self.res.as_ptr()
    }
}

impl ResultHandle for PqResultHandle {
    fn status(&self) -> ExecStatus {
        // SAFETY: res is a live handle owned by self
        match unsafe { pq_sys::PQresultStatus(self.raw()) } {
            ExecStatusType::PGRES_COMMAND_OK => ExecStatus::CommandOk,
            ExecStatusType::PGRES_TUPLES_OK => ExecStatus::TuplesOk,
            ExecStatusType::PGRES_EMPTY_QUERY => ExecStatus::EmptyQuery,
            ExecStatusType::PGRES_BAD_RESPONSE => ExecStatus::BadResponse,
            ExecStatusType::PGRES_NONFATAL_ERROR => ExecStatus::NonfatalError,
            ExecStatusType::PGRES_FATAL_ERROR => ExecStatus::FatalError,
            other => ExecStatus::Other(other as i32),
        }
    }

    fn error_message(&self) -> String {
        // SAFETY: the message is owned by res and copied before returning
        clean_message(unsafe { borrowed_str(pq_sys::PQresultErrorMessage(self.raw())) })
    }

    fn ntuples(&self) -> usize {
        // SAFETY: res is live; the count is never negative
        unsafe { pq_sys::PQntuples(self.raw()) }.max(0) as usize
    }

    fn nfields(&self) -> usize {
        // SAFETY: res is live; the count is never negative
        unsafe { pq_sys::PQnfields(self.raw()) }.max(0) as usize
    }

    fn field_name(&self, column: usize) -> Cow<'_, str> {
        // SAFETY: the name lives as long as res, which self borrows
        unsafe { borrowed_str(pq_sys::PQfname(self.raw(), idx(column))) }
    }

    fn field_type(&self, column: usize) -> Oid {
        // SAFETY: res is live; out-of-range columns yield InvalidOid (0)
        Oid(unsafe { pq_sys::PQftype(self.raw(), idx(column)) })
    }

    fn value(&self, row: usize, column: usize) -> &[u8] {
        // SAFETY: res is live; the value pointer is valid for exactly
        // PQgetlength bytes for as long as res is
        unsafe {
            let data = pq_sys::PQgetvalue(self.raw(), idx(row), idx(column));
            let len = pq_sys::PQgetlength(self.raw(), idx(row), idx(column));
            if data.is_null() || len <= 0 {
                &[]
            } else {
                std::slice::from_raw_parts(data as *const u8, len as usize)
            }
        }
    }

    fn is_null(&self, row: usize, column: usize) -> bool {
        // SAFETY: res is live
        unsafe { pq_sys::PQgetisnull(self.raw(), idx(row), idx(column)) == 1 }
    }
}

impl Drop for PqResultHandle {
    fn drop(&mut self) {
        tracing::trace!("clearing libpq result");
        // SAFETY: res is owned by self and this is its only release path
        unsafe { pq_sys::PQclear(self.res.as_ptr()) }
    }
}
