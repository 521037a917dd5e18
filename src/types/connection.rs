use serde::{Deserialize, Serialize};
use std::fmt;

/// Target database a summary is synchronized from.
///
/// Every field decodes to its empty value when absent so the handler can report
/// exactly which required fields are missing instead of rejecting the body.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default)]
    pub dbname: String,
}

impl ConnectionDetails {
    /// Names of the required fields that are absent or empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.port.is_none() {
            missing.push("port");
        }
        if self.user.trim().is_empty() {
            missing.push("user");
        }
        if self.dbname.trim().is_empty() {
            missing.push("dbname");
        }
        missing
    }

    /// Copy of these details with the password cleared.
    pub fn sanitized(&self) -> Self {
        Self {
            password: String::new(),
            ..self.clone()
        }
    }
}

impl fmt::Debug for ConnectionDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.is_empty() {
            ""
        } else {
            "<redacted>"
        };
        f.debug_struct("ConnectionDetails")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &password)
            .field("dbname", &self.dbname)
            .finish()
    }
}
