//! Configuration type definitions.

use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::kind::DbKind;
use crate::error::Result;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database to introspect.
    pub database: ConnectionConfig,

    /// Metadata scan behavior.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Connection parameters for one database target.
///
/// Key names follow the connection mapping consumed by the wider tooling
/// (`host_address`, `port_number`, ...), so an existing mapping deserializes
/// as-is. The password is never serialized and is redacted from `Debug`.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database type: oracle, mssql, azure, mysql, postgres, db2.
    #[serde(alias = "type")]
    pub db_type: String,

    /// Database host.
    pub host_address: String,

    /// Database port; integer or numeric string. Defaults per dialect.
    #[serde(default, deserialize_with = "deserialize_port")]
    pub port_number: Option<u16>,

    /// Database (Oracle service name, MySQL default schema).
    #[serde(default)]
    pub database_name: String,

    /// Username.
    pub username: String,

    /// Password.
    #[serde(default, skip_serializing)]
    pub password: String,

    /// Schema used when no source schema is set (SQL Server, PostgreSQL).
    #[serde(default)]
    pub schema_name: Option<String>,

    /// Foreign schema to read from instead of the login's own.
    #[serde(default)]
    pub source_schema: Option<String>,

    /// Encrypt the SQL Server connection (default: true). Azure SQL always encrypts.
    #[serde(default = "default_true")]
    pub encrypt: bool,

    /// Trust the SQL Server certificate without validation (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,

    /// PostgreSQL SSL mode: disable, require, verify-ca, verify-full (default: disable).
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// DB2 ODBC driver name (default: "IBM DB2 ODBC DRIVER").
    #[serde(default)]
    pub odbc_driver: Option<String>,
}

impl ConnectionConfig {
    /// Parsed dialect tag.
    pub fn kind(&self) -> Result<DbKind> {
        DbKind::from_db_type(&self.db_type)
    }

    /// Configured port or the dialect default.
    pub fn port(&self, kind: DbKind) -> u16 {
        self.port_number.unwrap_or_else(|| kind.default_port())
    }

    /// Source schema, ignoring blank values.
    pub fn source_schema(&self) -> Option<&str> {
        non_blank(self.source_schema.as_deref())
    }

    /// Schema name, ignoring blank values.
    pub fn schema_name(&self) -> Option<&str> {
        non_blank(self.schema_name.as_deref())
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("db_type", &self.db_type)
            .field("host_address", &self.host_address)
            .field("port_number", &self.port_number)
            .field("database_name", &self.database_name)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("schema_name", &self.schema_name)
            .field("source_schema", &self.source_schema)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("ssl_mode", &self.ssl_mode)
            .field("odbc_driver", &self.odbc_driver)
            .finish()
    }
}

/// Metadata scan configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Independent connections used to describe tables (default: 1).
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn deserialize_port<'de, D>(deserializer: D) -> std::result::Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u64),
        Text(String),
    }

    match Option::<PortValue>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PortValue::Number(n)) => u16::try_from(n)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port_number out of range: {}", n))),
        Some(PortValue::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(PortValue::Text(s)) => s
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("port_number is not a valid port: '{}'", s))),
    }
}

fn default_true() -> bool {
    true
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_workers() -> usize {
    1
}
