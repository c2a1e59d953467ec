//! Error types for the introspection library.

use thiserror::Error;

/// Main error type for catalog probing operations.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Configuration error (invalid YAML, missing fields, bad identifiers, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configured database type is not one of the supported dialects.
    #[error("Unknown database type '{0}'. Valid values: oracle, mssql, azure, mysql, postgres, db2")]
    UnknownDialect(String),

    /// Session could not be established. Never retried.
    #[error("Connection to {dialect} failed: {message}")]
    Connection { dialect: String, message: String },

    /// Engine-neutral query failure (unexpected result shape, missing column)
    #[error("Query failed: {0}")]
    Query(String),

    /// SQL Server / Azure SQL query error
    #[error("SQL Server query failed: {0}")]
    Mssql(#[from] tiberius::error::Error),

    /// PostgreSQL query error
    #[error("PostgreSQL query failed: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL query error
    #[cfg(feature = "mysql")]
    #[error("MySQL query failed: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// Oracle query error
    #[cfg(feature = "oracle")]
    #[error("Oracle query failed: {0}")]
    Oracle(#[from] oracle::Error),

    /// ODBC (DB2) query error
    #[cfg(feature = "db2")]
    #[error("ODBC query failed: {0}")]
    Odbc(#[from] odbc_api::Error),

    /// Operation attempted on a connection that was already closed
    #[error("Connection to {0} is closed")]
    ConnectionClosed(String),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProbeError {
    /// Create a Connection error for the given dialect.
    pub fn connection(dialect: impl Into<String>, message: impl ToString) -> Self {
        ProbeError::Connection {
            dialect: dialect.into(),
            message: message.to_string(),
        }
    }

    /// Create an engine-neutral Query error.
    pub fn query(message: impl Into<String>) -> Self {
        ProbeError::Query(message.into())
    }

    /// True for every query execution failure, whichever client raised it.
    pub fn is_query_error(&self) -> bool {
        match self {
            ProbeError::Query(_) | ProbeError::Mssql(_) | ProbeError::Postgres(_) => true,
            #[cfg(feature = "mysql")]
            ProbeError::Mysql(_) => true,
            #[cfg(feature = "oracle")]
            ProbeError::Oracle(_) => true,
            #[cfg(feature = "db2")]
            ProbeError::Odbc(_) => true,
            _ => false,
        }
    }

    /// Process exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            ProbeError::Config(_)
            | ProbeError::UnknownDialect(_)
            | ProbeError::Yaml(_)
            | ProbeError::Json(_) => 1,
            ProbeError::Connection { .. } => 2,
            ProbeError::ConnectionClosed(_) => 4,
            ProbeError::Io(_) => 7,
            _ => 3,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for catalog probing operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ProbeError::Config("x".into()).exit_code(), 1);
        assert_eq!(ProbeError::UnknownDialect("sybase".into()).exit_code(), 1);
        assert_eq!(ProbeError::connection("oracle", "refused").exit_code(), 2);
        assert_eq!(ProbeError::query("bad").exit_code(), 3);
        assert_eq!(ProbeError::ConnectionClosed("mysql".into()).exit_code(), 4);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(ProbeError::from(io).exit_code(), 7);
    }

    #[test]
    fn test_query_classification() {
        assert!(ProbeError::query("x").is_query_error());
        assert!(!ProbeError::connection("db2", "x").is_query_error());
        assert!(!ProbeError::ConnectionClosed("db2".into()).is_query_error());
    }

    #[test]
    fn test_format_detailed_walks_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "config.yaml");
        let err = ProbeError::from(io);
        let text = err.format_detailed();
        assert!(text.starts_with("Error: IO error: config.yaml"));
    }
}
