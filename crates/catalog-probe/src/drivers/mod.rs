//! Database driver implementations.
//!
//! This module provides database-specific implementations of the core traits:
//!
//! - [`oracle`]: Oracle driver (feature `oracle`)
//! - [`mssql`]: Microsoft SQL Server driver
//! - [`azure`]: Azure SQL, served by the SQL Server driver
//! - [`mysql`]: MySQL/MariaDB driver (feature `mysql`)
//! - [`postgres`]: PostgreSQL driver
//! - [`db2`]: IBM DB2 driver over ODBC (feature `db2`)
//! - [`common`]: Shared utilities (TLS, blocking client calls)
//!
//! # Architecture
//!
//! Each driver module provides a `Dialect`, a `Session` over the vendor
//! client and a catalog type implementing [`Database`]. [`DatabaseImpl`]
//! wraps the catalogs in one enum so callers can hold any of them without a
//! trait object; [`connect`] picks the variant from `db_type`.
//!
//! # Adding New Databases
//!
//! 1. Create a new module under `drivers/` with dialect, session and catalog
//! 2. Add a variant to `DbKind` and to `DatabaseImpl`
//! 3. Gate the driver with a feature flag in `Cargo.toml` if its client
//!    needs native libraries

pub mod azure;
pub mod common;
#[cfg(feature = "db2")]
pub mod db2;
pub mod mssql;
#[cfg(feature = "mysql")]
pub mod mysql;
#[cfg(feature = "oracle")]
pub mod oracle;
pub mod postgres;

pub use common::SslMode;

#[cfg(feature = "db2")]
pub use db2::Db2Catalog;
pub use mssql::MssqlCatalog;
#[cfg(feature = "mysql")]
pub use mysql::MysqlCatalog;
#[cfg(feature = "oracle")]
pub use oracle::OracleCatalog;
pub use postgres::PostgresCatalog;

use async_trait::async_trait;
use tracing::info;

use crate::config::ConnectionConfig;
use crate::core::connection::ConnectionState;
use crate::core::kind::DbKind;
use crate::core::metadata::{
    ColumnMetadata, ConstraintEntry, DdlOutcome, DdlRequest, IndexEntry, MinMax, PartitionEntry,
    TableSpace,
};
use crate::core::traits::{CatalogReader, Database, DdlExecutor, SchemaScope, Validator};
use crate::error::{ProbeError, Result};

/// Enum-based static dispatch over the connected catalogs.
///
/// The compiler generates a match per call instead of going through a
/// vtable. SQL Server and Azure SQL share a catalog type; the connection's
/// kind tells them apart.
pub enum DatabaseImpl {
    #[cfg(feature = "oracle")]
    Oracle(OracleCatalog),
    Mssql(MssqlCatalog),
    Azure(MssqlCatalog),
    #[cfg(feature = "mysql")]
    Mysql(MysqlCatalog),
    Postgres(PostgresCatalog),
    #[cfg(feature = "db2")]
    Db2(Db2Catalog),
}

macro_rules! dispatch {
    ($self:ident, $db:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "oracle")]
            DatabaseImpl::Oracle($db) => $body,
            DatabaseImpl::Mssql($db) | DatabaseImpl::Azure($db) => $body,
            #[cfg(feature = "mysql")]
            DatabaseImpl::Mysql($db) => $body,
            DatabaseImpl::Postgres($db) => $body,
            #[cfg(feature = "db2")]
            DatabaseImpl::Db2($db) => $body,
        }
    };
}

#[async_trait]
impl CatalogReader for DatabaseImpl {
    fn scope(&self, schema_override: Option<&str>) -> SchemaScope {
        dispatch!(self, db => db.scope(schema_override))
    }

    async fn table_names(&mut self, scope: &SchemaScope) -> Result<Vec<String>> {
        dispatch!(self, db => db.table_names(scope).await)
    }

    async fn fetch_columns(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<ColumnMetadata>> {
        dispatch!(self, db => db.fetch_columns(scope, table).await)
    }

    async fn fetch_constraints(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<ConstraintEntry>> {
        dispatch!(self, db => db.fetch_constraints(scope, table).await)
    }

    async fn fetch_indexes(&mut self, scope: &SchemaScope, table: &str) -> Result<Vec<IndexEntry>> {
        dispatch!(self, db => db.fetch_indexes(scope, table).await)
    }

    async fn fetch_partitions(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<PartitionEntry>> {
        dispatch!(self, db => db.fetch_partitions(scope, table).await)
    }
}

#[async_trait]
impl Validator for DatabaseImpl {
    async fn find_table(&mut self, table: &str) -> Result<bool> {
        dispatch!(self, db => db.find_table(table).await)
    }

    async fn table_count(&mut self, table: &str, where_clause: Option<&str>) -> Result<i64> {
        dispatch!(self, db => db.table_count(table, where_clause).await)
    }

    async fn find_min_max(&mut self, table: &str, column: &str) -> Result<Option<MinMax>> {
        dispatch!(self, db => db.find_min_max(table, column).await)
    }

    async fn table_space(&mut self, table: &str) -> Result<TableSpace> {
        dispatch!(self, db => db.table_space(table).await)
    }

    async fn calculate_checksum(&mut self, sql: &str) -> Result<Vec<String>> {
        dispatch!(self, db => db.calculate_checksum(sql).await)
    }
}

#[async_trait]
impl DdlExecutor for DatabaseImpl {
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome> {
        dispatch!(self, db => db.create_table(request, is_ddl).await)
    }

    async fn delete_table(&mut self, sql: &str) -> Result<()> {
        dispatch!(self, db => db.delete_table(sql).await)
    }
}

#[async_trait]
impl Database for DatabaseImpl {
    fn kind(&self) -> DbKind {
        dispatch!(self, db => db.kind())
    }

    fn state(&self) -> ConnectionState {
        dispatch!(self, db => db.state())
    }

    async fn ping(&mut self) -> Result<()> {
        dispatch!(self, db => db.ping().await)
    }

    async fn close(&mut self) -> Result<()> {
        dispatch!(self, db => Database::close(db).await)
    }
}

/// Error for a dialect whose client was left out at build time.
#[allow(dead_code)]
fn not_compiled(kind: DbKind, feature: &str) -> ProbeError {
    ProbeError::Config(format!(
        "{} support is not compiled in (enable the '{}' feature)",
        kind.display_name(),
        feature
    ))
}

/// Connect to the database described by `config`.
///
/// # Errors
///
/// Returns [`ProbeError::UnknownDialect`] for an unrecognised `db_type` and
/// [`ProbeError::Connection`] when the session cannot be established.
pub async fn connect(config: &ConnectionConfig) -> Result<DatabaseImpl> {
    let kind = config.kind()?;

    let db = match kind {
        #[cfg(feature = "oracle")]
        DbKind::Oracle => DatabaseImpl::Oracle(OracleCatalog::connect(config).await?),
        #[cfg(not(feature = "oracle"))]
        DbKind::Oracle => return Err(not_compiled(kind, "oracle")),
        DbKind::Mssql => DatabaseImpl::Mssql(MssqlCatalog::connect(config).await?),
        DbKind::Azure => DatabaseImpl::Azure(azure::connect(config).await?),
        #[cfg(feature = "mysql")]
        DbKind::Mysql => DatabaseImpl::Mysql(MysqlCatalog::connect(config).await?),
        #[cfg(not(feature = "mysql"))]
        DbKind::Mysql => return Err(not_compiled(kind, "mysql")),
        DbKind::Postgres => DatabaseImpl::Postgres(PostgresCatalog::connect(config).await?),
        #[cfg(feature = "db2")]
        DbKind::Db2 => DatabaseImpl::Db2(Db2Catalog::connect(config).await?),
        #[cfg(not(feature = "db2"))]
        DbKind::Db2 => return Err(not_compiled(kind, "db2")),
    };

    info!(
        "Connected to {}: {}:{}/{}",
        kind.display_name(),
        config.host_address,
        config.port(kind),
        config.database_name
    );
    Ok(db)
}
