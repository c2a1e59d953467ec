//! PostgreSQL driver.

mod catalog;
mod dialect;
mod session;

pub use catalog::PostgresCatalog;
pub use dialect::PostgresDialect;
pub use session::PostgresSession;
