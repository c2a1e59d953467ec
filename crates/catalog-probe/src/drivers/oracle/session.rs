//! Oracle session over the blocking `oracle` client.
//!
//! ODPI-C calls block, so every call runs on tokio's blocking pool. The
//! connection handle is shared with that pool through an `Arc`, but only one
//! call is ever in flight because [`Session`] methods take `&mut self`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use oracle::sql_type::{OracleType, ToSql};
use tracing::debug;

use crate::config::ConnectionConfig;
use crate::core::kind::DbKind;
use crate::core::traits::Session;
use crate::core::value::{CatalogValue, Row};
use crate::drivers::common::blocking;
use crate::error::{ProbeError, Result};

/// A live Oracle session.
pub struct OracleSession {
    conn: Arc<oracle::Connection>,
}

impl OracleSession {
    /// Connect with an easy-connect string `host:port/service`.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let connect_string = format!(
            "{}:{}/{}",
            config.host_address,
            config.port(DbKind::Oracle),
            config.database_name
        );
        debug!("Connecting to Oracle at {} as {}", connect_string, config.username);

        let username = config.username.clone();
        let password = config.password.clone();
        let conn = blocking(move || {
            oracle::Connection::connect(&username, &password, &connect_string)
                .map_err(|e| ProbeError::connection("oracle", e))
        })
        .await?;

        Ok(Self {
            conn: Arc::new(conn),
        })
    }
}

#[async_trait]
impl Session for OracleSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();

        blocking(move || {
            let binds: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
            let mut rows = Vec::new();
            for row in conn.query(&sql, &binds)? {
                rows.push(convert_row(&row?)?);
            }
            Ok(rows)
        })
        .await
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let sql = sql.to_string();
        blocking(move || {
            conn.execute(&sql, &[])?;
            conn.commit()?;
            Ok(())
        })
        .await
    }

    async fn close(self) -> Result<()> {
        let conn = self.conn;
        blocking(move || Ok(conn.close()?)).await
    }
}

fn convert_row(row: &oracle::Row) -> Result<Row> {
    let mut values = Vec::with_capacity(row.column_info().len());
    for (idx, info) in row.column_info().iter().enumerate() {
        values.push(convert_value(row, idx, info.oracle_type())?);
    }
    Ok(Row::new(values))
}

fn convert_value(row: &oracle::Row, idx: usize, oracle_type: &OracleType) -> Result<CatalogValue> {
    let value = match oracle_type {
        // NUMBER keeps its exact text form; narrowing happens afterwards.
        OracleType::Number(_, _)
        | OracleType::Float(_)
        | OracleType::BinaryFloat
        | OracleType::BinaryDouble
        | OracleType::Int64
        | OracleType::UInt64 => row
            .get::<usize, Option<String>>(idx)?
            .map(|s| CatalogValue::from_numeric_text(&s)),
        OracleType::Date | OracleType::Timestamp(_) => row
            .get::<usize, Option<NaiveDateTime>>(idx)?
            .map(CatalogValue::DateTime),
        OracleType::TimestampTZ(_) | OracleType::TimestampLTZ(_) => row
            .get::<usize, Option<DateTime<FixedOffset>>>(idx)?
            .map(CatalogValue::DateTimeOffset),
        OracleType::Raw(_) | OracleType::LongRaw | OracleType::BLOB => row
            .get::<usize, Option<Vec<u8>>>(idx)?
            .map(CatalogValue::Bytes),
        OracleType::Boolean => row.get::<usize, Option<bool>>(idx)?.map(CatalogValue::Bool),
        _ => row.get::<usize, Option<String>>(idx)?.map(CatalogValue::Text),
    };
    Ok(value.unwrap_or(CatalogValue::Null))
}
