//! # catalog-probe
//!
//! Cross-dialect relational metadata introspection and validation.
//!
//! One contract, six engines: Oracle, SQL Server, Azure SQL, MySQL,
//! PostgreSQL and DB2. Every engine produces the same metadata document
//! and answers the same validation primitives:
//!
//! - **Metadata**: columns, primary/unique/check/foreign key constraints,
//!   unique indexes and range partitions per table
//! - **Validation**: existence, row counts, min/max bounds, table size and
//!   checksum collection
//! - **DDL**: single statements or best-effort statement lists with a
//!   per-statement report
//! - **Concurrent scans** over independent connections
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_probe::{drivers, CatalogReader, Config, Database};
//!
//! #[tokio::main]
//! async fn main() -> catalog_probe::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let mut db = drivers::connect(&config.database).await?;
//!     let tables = db.metadata_details(None).await?;
//!     println!("{}", serde_json::to_string_pretty(&tables)?);
//!     db.close().await
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod scan;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-exports for convenient access
pub use config::{Config, ConnectionConfig, ScanConfig};
pub use core::{
    CatalogReader, CatalogValue, ColumnMetadata, Connection, ConnectionState, ConstraintEntry,
    Database, DbKind, DdlExecutor, DdlOutcome, DdlRequest, Dialect, IndexEntry, MinMax,
    PartitionEntry, Row, SchemaScope, Session, StatementReport, TableMetadata, TableSpace,
    Validator,
};
pub use drivers::{connect, DatabaseImpl};
pub use error::{ProbeError, Result};
pub use scan::scan_database;
