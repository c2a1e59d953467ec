//! DB2 session over ODBC (IBM Data Server Driver).
//!
//! The ODBC environment is process-wide and created on first use. ODBC calls
//! block, so each one runs on tokio's blocking pool; results are fetched as
//! text and typed from the cursor's column metadata.

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use odbc_api::buffers::TextRowSet;
use odbc_api::{
    ConnectionOptions, Cursor, DataType, Environment, IntoParameter, ResultSetMetadata,
};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::core::kind::DbKind;
use crate::core::traits::Session;
use crate::core::value::{CatalogValue, Row};
use crate::drivers::common::blocking;
use crate::error::{ProbeError, Result};

const DEFAULT_DRIVER: &str = "IBM DB2 ODBC DRIVER";

/// Rows fetched per round trip.
const BATCH_SIZE: usize = 1000;

/// Upper bound for one text cell; catalog text columns are far shorter.
const MAX_TEXT_LEN: usize = 4096;

static ENVIRONMENT: OnceLock<Environment> = OnceLock::new();

fn environment() -> Result<&'static Environment> {
    if let Some(env) = ENVIRONMENT.get() {
        return Ok(env);
    }
    let env = Environment::new().map_err(|e| {
        ProbeError::connection(
            "db2",
            format!(
                "Failed to create ODBC environment: {}. \
                 Make sure the IBM Data Server Driver for ODBC is installed.",
                e
            ),
        )
    })?;
    Ok(ENVIRONMENT.get_or_init(|| env))
}

/// ODBC connection string for DB2 over TCP/IP.
pub(crate) fn connection_string(config: &ConnectionConfig) -> String {
    format!(
        "DRIVER={{{}}};DATABASE={};HOSTNAME={};PORT={};PROTOCOL=TCPIP;UID={};PWD={}",
        config.odbc_driver.as_deref().unwrap_or(DEFAULT_DRIVER),
        config.database_name,
        config.host_address,
        config.port(DbKind::Db2),
        config.username,
        config.password
    )
}

/// The connection string with the `PWD=` value masked.
pub(crate) fn redacted(connection_string: &str) -> String {
    connection_string
        .split(';')
        .map(|part| match part.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("PWD") => format!("{}=****", key),
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// A live DB2 session.
pub struct Db2Session {
    conn: Arc<Mutex<odbc_api::Connection<'static>>>,
}

impl Db2Session {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let connection_string = connection_string(config);
        debug!("ODBC connection string: {}", redacted(&connection_string));

        let conn = blocking(move || {
            environment()?
                .connect_with_connection_string(&connection_string, ConnectionOptions::default())
                .map_err(|e| ProbeError::connection("db2", e))
        })
        .await?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&odbc_api::Connection<'static>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| ProbeError::query("DB2 session lock poisoned"))?;
            f(&guard)
        })
        .await
    }
}

#[async_trait]
impl Session for Db2Session {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();

        self.with_connection(move |conn| {
            let binds: Vec<_> = params.iter().map(|p| p.as_str().into_parameter()).collect();
            match conn.execute(&sql, &binds[..])? {
                Some(cursor) => fetch_all(cursor),
                None => Ok(Vec::new()),
            }
        })
        .await
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // ODBC connections start in autocommit mode.
        let sql = sql.to_string();
        self.with_connection(move |conn| {
            conn.execute(&sql, ())?;
            Ok(())
        })
        .await
    }

    async fn close(self) -> Result<()> {
        // The ODBC handle disconnects on drop.
        drop(self.conn);
        Ok(())
    }
}

fn fetch_all(mut cursor: impl Cursor) -> Result<Vec<Row>> {
    let num_cols = cursor.num_result_cols()? as u16;
    let numeric = (1..=num_cols)
        .map(|col| Ok(is_numeric(cursor.col_data_type(col)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut buffers = TextRowSet::for_cursor(BATCH_SIZE, &mut cursor, Some(MAX_TEXT_LEN))?;
    let mut row_cursor = cursor.bind_buffer(&mut buffers)?;

    let mut rows = Vec::new();
    while let Some(batch) = row_cursor.fetch()? {
        for row_idx in 0..batch.num_rows() {
            let values = numeric
                .iter()
                .enumerate()
                .map(|(col_idx, &numeric)| text_value(batch.at(col_idx, row_idx), numeric))
                .collect();
            rows.push(Row::new(values));
        }
    }
    Ok(rows)
}

fn is_numeric(data_type: DataType) -> bool {
    matches!(
        data_type,
        DataType::SmallInt
            | DataType::Integer
            | DataType::BigInt
            | DataType::TinyInt
            | DataType::Decimal { .. }
            | DataType::Numeric { .. }
            | DataType::Real
            | DataType::Double
            | DataType::Float { .. }
    )
}

fn text_value(cell: Option<&[u8]>, numeric: bool) -> CatalogValue {
    match cell {
        None => CatalogValue::Null,
        Some(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if numeric {
                CatalogValue::from_numeric_text(&text)
            } else {
                CatalogValue::Text(text.into_owned())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(driver: Option<&str>) -> ConnectionConfig {
        ConnectionConfig {
            db_type: "db2".into(),
            host_address: "db2.local".into(),
            port_number: None,
            database_name: "SAMPLE".into(),
            username: "db2inst1".into(),
            password: "s3cret".into(),
            schema_name: None,
            source_schema: None,
            encrypt: false,
            trust_server_cert: false,
            ssl_mode: "disable".into(),
            odbc_driver: driver.map(str::to_string),
        }
    }

    #[test]
    fn test_connection_string() {
        assert_eq!(
            connection_string(&config(None)),
            "DRIVER={IBM DB2 ODBC DRIVER};DATABASE=SAMPLE;HOSTNAME=db2.local;PORT=50000;\
             PROTOCOL=TCPIP;UID=db2inst1;PWD=s3cret"
        );
        assert!(connection_string(&config(Some("DB2"))).starts_with("DRIVER={DB2};"));
    }

    #[test]
    fn test_redacted_masks_password_only() {
        let masked = redacted(&connection_string(&config(None)));
        assert!(!masked.contains("s3cret"));
        assert!(masked.ends_with("UID=db2inst1;PWD=****"));
        assert!(masked.contains("HOSTNAME=db2.local"));
    }

    #[test]
    fn test_text_values_typed_by_metadata() {
        assert_eq!(text_value(Some(b"42"), true), CatalogValue::Int(42));
        assert_eq!(text_value(Some(b"42"), false), CatalogValue::Text("42".into()));
        assert_eq!(text_value(Some(b"12.50"), true).to_string(), "12.50");
        assert_eq!(text_value(None, true), CatalogValue::Null);
    }

    #[test]
    fn test_numeric_types() {
        assert!(is_numeric(DataType::Integer));
        assert!(is_numeric(DataType::Decimal {
            precision: 10,
            scale: 2
        }));
        assert!(!is_numeric(DataType::Date));
    }
}
