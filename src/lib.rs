//! pqbind - a thin, memory-safe binding over libpq.
//!
//! Open a [`Connection`], run parameterized SQL, and read typed cells out of
//! the returned [`ResultSet`]:
//!
//! ```no_run
//! use pqbind::{Connection, QueryResult};
//!
//! let mut conn = Connection::open("host=localhost dbname=mydb connect_timeout=10")?;
//! if let QueryResult::Tuples(users) = conn.execute("select id, name from users where id = $1", &[&42i32])? {
//!     for row in users.rows() {
//!         let name: String = row.get_by_name("name")?;
//!         println!("{}", name);
//!     }
//! }
//! # Ok::<(), pqbind::PqError>(())
//! ```
//!
//! Architecture:
//! - `types`: server type OIDs and the registry of supported types
//! - `codec`: text/binary encoding and decoding of native values
//! - `params`: the per-call parameter buffer
//! - `ffi`: the seam over the client library calls, `libpq`: its implementation
//! - `connection`, `result`: the owning handle types

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod ffi;
pub mod libpq;
pub mod params;
pub mod result;
pub mod types;


pub use codec::{FromSql, IsNull, SqlType, ToSql, Value};
pub use config::ConnInfo;
pub use connection::{Connection, ConnectionState, QueryResult};
pub use error::{PqError, PqResult};
pub use result::{Cell, ResultSet, Row, Rows};
pub use types::{Format, Oid, PgType};
