//! Utilities shared across database drivers.
//!
//! - [`tls`]: `ssl_mode` handling for the PostgreSQL and MySQL sessions
//! - [`blocking`]: run a synchronous client call on tokio's blocking pool

pub mod tls;

pub use tls::SslMode;

#[cfg(any(feature = "oracle", feature = "db2"))]
use crate::error::{ProbeError, Result};

/// Run a blocking client call (ODPI-C, ODBC) off the async worker threads.
#[cfg(any(feature = "oracle", feature = "db2"))]
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ProbeError::query(format!("blocking worker task failed: {}", e)))?
}
