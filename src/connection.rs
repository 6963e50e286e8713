//! Database connections.
//!
//! A `Connection` owns one session handle. Every call blocks until the
//! library finishes the round trip. A failed connect or execute never leaks
//! a handle: whatever the library allocated is dropped before the error is
//! returned.

use std::ffi::CString;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::codec::ToSql;
use crate::config::ConnInfo;
use crate::error::{PqError, PqResult};
use crate::ffi::{ExecStatus, ResultHandle, Session};
use crate::libpq::{PqResultHandle, PqSession};
use crate::params::ParamBuffer;
use crate::result::ResultSet;
use crate::types::Format;

/// Lifecycle of a `Connection`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

/// Successful outcome of `execute`.
#[derive(Debug)]
pub enum QueryResult<R: ResultHandle = PqResultHandle> {
    /// The command completed without returning rows.
    Ok,
    /// Rows are available.
    Tuples(ResultSet<R>),
}

impl<R: ResultHandle> QueryResult<R> {
    /// The result set, if the command returned rows.
    pub fn into_tuples(self) -> Option<ResultSet<R>> {
        match self {
            QueryResult::Tuples(set) => Some(set),
            QueryResult::Ok => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, QueryResult::Ok)
    }
}

/// A connection to a database server.
pub struct Connection<S: Session = PqSession> {
    /// `None` once closed
    session: Option<S>,
}

impl Connection {
    /// Open a connection through libpq.
    ///
    /// `conninfo` is passed through verbatim, either as keyword/value pairs
    /// (`host=localhost port=5432 dbname=mydb connect_timeout=10`) or as a
    /// URI (`postgresql://host:5432/db?connect_timeout=10`).
    pub fn open(conninfo: &str) -> PqResult<Self> {
        Self::open_with(conninfo)
    }

    /// Open a connection described by a `ConnInfo`.
    pub fn connect(info: &ConnInfo) -> PqResult<Self> {
        Self::open_with(&info.to_conninfo())
    }
}

impl<S: Session> Connection<S> {
    /// Open a connection through a specific session implementation.
    pub fn open_with(conninfo: &str) -> PqResult<Self> {
        let conninfo = CString::new(conninfo).map_err(|_| PqError::InteriorNul {
            what: "connection string",
        })?;

        let session = S::connect(&conninfo).ok_or_else(|| PqError::ConnectionFailed {
            message: "out of memory allocating connection".to_string(),
        })?;

        if !session.is_ok() {
            let message = session.error_message();
            warn!(error = %message, "connection failed");
            // `session` is dropped here, releasing the half-open handle
            return Err(PqError::ConnectionFailed { message });
        }

        debug!("connection established");
        Ok(Self {
            session: Some(session),
        })
    }

    pub fn state(&self) -> ConnectionState {
        if self.session.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Execute `sql` with text-encoded parameters and results.
    ///
    /// Placeholders are `$1`, `$2`, ... and are bound to `params` in order.
    pub fn execute(
        &mut self,
        sql: &str,
        params: &[&dyn ToSql],
    ) -> PqResult<QueryResult<S::Result>> {
        self.execute_with(sql, params, Format::Text)
    }

    /// Execute `sql`, encoding every parameter and result column in `format`.
    ///
    /// A placeholder/parameter count mismatch is reported by the server as
    /// `QueryFailed`. After any failure the connection stays open.
    pub fn execute_with(
        &mut self,
        sql: &str,
        params: &[&dyn ToSql],
        format: Format,
    ) -> PqResult<QueryResult<S::Result>> {
        let session = self.session.as_mut().ok_or(PqError::ConnectionClosed)?;

        let sql_c = CString::new(sql).map_err(|_| PqError::InteriorNul { what: "SQL text" })?;
        let buffer = ParamBuffer::encode(params, format)?;

        debug!(params = buffer.len(), format = ?format, "executing statement");
        trace!(sql, "statement text");

        let Some(result) = session.exec_params(&sql_c, &buffer, format) else {
            let message = session.error_message();
            warn!(error = %message, "execution produced no result");
            return Err(PqError::QueryFailed { message });
        };

        match result.status() {
            ExecStatus::CommandOk => {
                debug!("command completed");
                Ok(QueryResult::Ok)
            }
            ExecStatus::TuplesOk => {
                let set = ResultSet::new(result, format);
                debug!(
                    rows = set.row_count(),
                    fields = set.field_count(),
                    "tuples available"
                );
                Ok(QueryResult::Tuples(set))
            }
            status => {
                let mut message = result.error_message();
                if message.is_empty() {
                    message = session.error_message();
                }
                if message.is_empty() {
                    message = format!("unexpected result status {:?}", status);
                }
                warn!(?status, error = %message, "query failed");
                // `result` is dropped here, freeing the failed call's buffer
                Err(PqError::QueryFailed { message })
            }
        }
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("connection closed");
        }
    }
}

impl<S: Session> Drop for Connection<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: Session> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .finish()
    }
}
