//! MySQL/MariaDB driver.

mod catalog;
mod dialect;
mod session;

pub use catalog::MysqlCatalog;
pub use dialect::MysqlDialect;
pub use session::MysqlSession;
