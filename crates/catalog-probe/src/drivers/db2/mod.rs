//! IBM DB2 driver (ODBC).

mod catalog;
mod dialect;
mod session;

pub use catalog::Db2Catalog;
pub use dialect::Db2Dialect;
pub use session::Db2Session;
