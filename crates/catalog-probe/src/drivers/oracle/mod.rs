//! Oracle driver.
//!
//! - [`OracleDialect`]: SQL syntax strategy for Oracle
//! - [`OracleSession`]: session over the `oracle` (ODPI-C) client
//! - [`OracleCatalog`]: catalog reader, validation primitives and DDL executor

mod catalog;
mod dialect;
mod session;

pub use catalog::OracleCatalog;
pub use dialect::OracleDialect;
pub use session::OracleSession;
