//! Dialect tags and their static properties.

use std::fmt;

use crate::error::{ProbeError, Result};

/// The six supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbKind {
    Oracle,
    Mssql,
    Azure,
    Mysql,
    Postgres,
    Db2,
}

impl DbKind {
    pub const ALL: [DbKind; 6] = [
        DbKind::Oracle,
        DbKind::Mssql,
        DbKind::Azure,
        DbKind::Mysql,
        DbKind::Postgres,
        DbKind::Db2,
    ];

    /// Parse a configured database type, accepting common aliases.
    pub fn from_db_type(db_type: &str) -> Result<Self> {
        match db_type.trim().to_lowercase().as_str() {
            "oracle" | "ora" => Ok(DbKind::Oracle),
            "mssql" | "sqlserver" | "sql_server" => Ok(DbKind::Mssql),
            "azure" | "azuresql" | "azure_sql" => Ok(DbKind::Azure),
            "mysql" | "mariadb" => Ok(DbKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DbKind::Postgres),
            "db2" | "ibmdb2" | "ibm_db2" => Ok(DbKind::Db2),
            _ => Err(ProbeError::UnknownDialect(db_type.to_string())),
        }
    }

    /// Canonical tag.
    pub fn name(&self) -> &'static str {
        match self {
            DbKind::Oracle => "oracle",
            DbKind::Mssql => "mssql",
            DbKind::Azure => "azure",
            DbKind::Mysql => "mysql",
            DbKind::Postgres => "postgres",
            DbKind::Db2 => "db2",
        }
    }

    /// Human readable engine name for logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            DbKind::Oracle => "Oracle",
            DbKind::Mssql => "SQL Server",
            DbKind::Azure => "Azure SQL",
            DbKind::Mysql => "MySQL",
            DbKind::Postgres => "PostgreSQL",
            DbKind::Db2 => "DB2",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            DbKind::Oracle => 1521,
            DbKind::Mssql | DbKind::Azure => 1433,
            DbKind::Mysql => 3306,
            DbKind::Postgres => 5432,
            DbKind::Db2 => 50000,
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
