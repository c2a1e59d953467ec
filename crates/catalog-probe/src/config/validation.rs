//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::core::identifier::validate_identifier;
use crate::core::kind::DbKind;
use crate::drivers::common::SslMode;
use crate::error::{ProbeError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection(&config.database)?;

    if config.scan.workers == 0 {
        return Err(ProbeError::Config("scan.workers must be at least 1".into()));
    }

    Ok(())
}

/// Validate one connection mapping.
pub fn validate_connection(conn: &ConnectionConfig) -> Result<()> {
    let kind = conn.kind()?;

    if conn.host_address.trim().is_empty() {
        return Err(ProbeError::Config("database.host_address is required".into()));
    }
    if conn.username.trim().is_empty() {
        return Err(ProbeError::Config("database.username is required".into()));
    }
    if conn.port_number == Some(0) {
        return Err(ProbeError::Config("database.port_number must not be 0".into()));
    }

    // MySQL can fall back to the source schema as its default database.
    let needs_database = match kind {
        DbKind::Mysql => conn.source_schema().is_none(),
        _ => true,
    };
    if needs_database && conn.database_name.trim().is_empty() {
        return Err(ProbeError::Config(format!(
            "database.database_name is required for {}",
            kind.display_name()
        )));
    }

    if let Some(schema) = conn.source_schema() {
        validate_identifier(schema)
            .map_err(|e| ProbeError::Config(format!("database.source_schema: {}", e)))?;
    }
    if let Some(schema) = conn.schema_name() {
        validate_identifier(schema)
            .map_err(|e| ProbeError::Config(format!("database.schema_name: {}", e)))?;
    }

    SslMode::parse(&conn.ssl_mode)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;

    fn valid_config() -> Config {
        Config {
            database: ConnectionConfig {
                db_type: "mssql".to_string(),
                host_address: "localhost".to_string(),
                port_number: Some(1433),
                database_name: "sales".to_string(),
                username: "sa".to_string(),
                password: "password".to_string(),
                schema_name: Some("dbo".to_string()),
                source_schema: None,
                encrypt: false,
                trust_server_cert: true,
                ssl_mode: "disable".to_string(),
                odbc_driver: None,
            },
            scan: ScanConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_unknown_db_type() {
        let mut config = valid_config();
        config.database.db_type = "sybase".to_string();
        assert!(matches!(
            validate(&config),
            Err(ProbeError::UnknownDialect(_))
        ));
    }

    #[test]
    fn test_missing_host() {
        let mut config = valid_config();
        config.database.host_address = " ".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_missing_username() {
        let mut config = valid_config();
        config.database.username = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_port() {
        let mut config = valid_config();
        config.database.port_number = Some(0);
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_database_name_required_except_mysql_with_schema() {
        let mut config = valid_config();
        config.database.database_name = String::new();
        assert!(validate(&config).is_err());

        config.database.db_type = "mysql".to_string();
        assert!(validate(&config).is_err());

        config.database.source_schema = Some("shop".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_bad_schema_identifier() {
        let mut config = valid_config();
        config.database.source_schema = Some("hr\0".to_string());
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_ssl_mode() {
        let mut config = valid_config();
        config.database.ssl_mode = "sometimes".to_string();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_workers() {
        let mut config = valid_config();
        config.scan.workers = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = valid_config();
        config.database.password = "super_secret_password_123".to_string();
        let debug_output = format!("{:?}", config.database);
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_password_123"));
    }
}
