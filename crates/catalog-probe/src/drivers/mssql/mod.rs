//! Microsoft SQL Server driver.
//!
//! - [`MssqlDialect`]: SQL syntax strategy for T-SQL
//! - [`MssqlSession`]: Tiberius session
//! - [`MssqlCatalog`]: catalog reader, validation primitives and DDL executor
//!
//! Azure SQL reuses all three; see [`crate::drivers::azure`].

mod catalog;
mod dialect;
mod session;

pub use catalog::MssqlCatalog;
pub use dialect::MssqlDialect;
pub use session::MssqlSession;
