//! Connection configuration.
//!
//! `Connection::open` takes a connection string verbatim. `ConnInfo` is a
//! typed alternative that renders libpq's keyword/value syntax, and can be
//! deserialized from an application's own config file.
//! Reference: https://www.postgresql.org/docs/current/libpq-connect.html#LIBPQ-CONNSTRING

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Connection parameters understood by the client library.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnInfo {
    /// Hostname, IP address or socket directory
    pub host: Option<String>,
    /// Port number (library default: 5432)
    pub port: Option<u16>,
    /// Database name
    pub dbname: Option<String>,
    /// Username
    pub user: Option<String>,
    /// Password (optional)
    pub password: Option<String>,
    /// Seconds to wait while connecting
    pub connect_timeout: Option<u64>,
    /// Application name reported to the server
    pub application_name: Option<String>,
    /// Any further keyword/value pairs, passed through in order
    pub options: Vec<(String, String)>,
}

impl ConnInfo {
    /// Create an empty configuration; the library fills in its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the database name.
    pub fn dbname(mut self, dbname: impl Into<String>) -> Self {
        self.dbname = Some(dbname.into());
        self
    }

    /// Set the username.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the connect timeout. The library works in whole seconds.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout.as_secs());
        self
    }

    /// Set the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Add an arbitrary keyword/value pair (e.g. `sslmode`, `require`).
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.push((key.into(), value.into()));
        self
    }

    /// Render as a keyword/value connection string.
    pub fn to_conninfo(&self) -> String {
        let port = self.port.map(|p| p.to_string());
        let timeout = self.connect_timeout.map(|t| t.to_string());

        let known = [
            ("host", self.host.as_deref()),
            ("port", port.as_deref()),
            ("dbname", self.dbname.as_deref()),
            ("user", self.user.as_deref()),
            ("password", self.password.as_deref()),
            ("connect_timeout", timeout.as_deref()),
            ("application_name", self.application_name.as_deref()),
        ];

        let pairs = known
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key, v)))
            .chain(self.options.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let mut out = String::new();
        for (key, value) in pairs {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(key);
            out.push('=');
            push_value(&mut out, value);
        }
        out
    }
}

/// Append `value`, single-quoted if it is empty or contains whitespace,
/// quotes or backslashes.
fn push_value(out: &mut String, value: &str) {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        out.push_str(value);
        return;
    }
    out.push('\'');
    for c in value.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
}

impl fmt::Debug for ConnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnInfo")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("connect_timeout", &self.connect_timeout)
            .field("application_name", &self.application_name)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keyword_pairs() {
        let info = ConnInfo::new()
            .host("localhost")
            .port(5432)
            .dbname("mydb")
            .connect_timeout(Duration::from_secs(10));

        assert_eq!(
            info.to_conninfo(),
            "host=localhost port=5432 dbname=mydb connect_timeout=10"
        );
    }

    #[test]
    fn test_render_quotes_values() {
        let info = ConnInfo::new()
            .password("it's a secret")
            .option("options", "")
            .option("sslrootcert", "C:\\certs\\root.crt");

        assert_eq!(
            info.to_conninfo(),
            r"password='it\'s a secret' options='' sslrootcert='C:\\certs\\root.crt'"
        );
    }

    #[test]
    fn test_empty_renders_empty() {
        assert_eq!(ConnInfo::new().to_conninfo(), "");
    }

    #[test]
    fn test_debug_redacts_password() {
        let info = ConnInfo::new().user("app").password("hunter2");
        let rendered = format!("{:?}", info);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_from_json() {
        let info: ConnInfo = serde_json::from_str(
            r#"{"host": "db.internal", "port": 6432, "dbname": "app", "connect_timeout": 5}"#,
        )
        .unwrap();

        assert_eq!(info.port, Some(6432));
        assert!(info.options.is_empty());
        assert_eq!(
            info.to_conninfo(),
            "host=db.internal port=6432 dbname=app connect_timeout=5"
        );
    }
}
