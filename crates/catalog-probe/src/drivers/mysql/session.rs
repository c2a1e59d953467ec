//! MySQL session over `mysql_async`.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use mysql_async::consts::ColumnType;
use mysql_async::prelude::*;
use mysql_async::{Column, Conn, OptsBuilder, Value};
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::core::kind::DbKind;
use crate::core::traits::Session;
use crate::core::value::{CatalogValue, Row};
use crate::drivers::common::SslMode;
use crate::error::{ProbeError, Result};

/// `character_set` id of binary strings.
const BINARY_CHARSET: u16 = 63;

/// A live MySQL session.
pub struct MysqlSession {
    conn: Conn,
}

impl MysqlSession {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;
        let port = config.port(DbKind::Mysql);
        let database = (!config.database_name.is_empty()).then_some(config.database_name.as_str());

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host_address.as_str())
            .tcp_port(port)
            .db_name(database)
            .user(Some(config.username.as_str()))
            .pass(Some(config.password.as_str()))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        match ssl_mode.mysql_ssl_opts() {
            Some(ssl) => builder = builder.ssl_opts(ssl),
            None => warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext."),
        }

        debug!("Connecting to MySQL at {}:{}", config.host_address, port);
        let conn = Conn::new(builder)
            .await
            .map_err(|e| ProbeError::connection("mysql", e))?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl Session for MysqlSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        // Unparameterized statements use the text protocol; not every
        // statement can be prepared.
        let rows: Vec<mysql_async::Row> = if params.is_empty() {
            self.conn.query(sql).await?
        } else {
            let binds: Vec<Value> = params.iter().map(|p| Value::from(*p)).collect();
            self.conn.exec(sql, binds).await?
        };
        Ok(rows.into_iter().map(convert_row).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // Autocommit is on for every session.
        self.conn.query_drop(sql).await?;
        debug!("rows affected: {}", self.conn.affected_rows());
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.conn.disconnect().await?;
        Ok(())
    }
}

fn convert_row(row: mysql_async::Row) -> Row {
    let columns = row.columns();
    let values = row.unwrap();
    Row::new(
        values
            .into_iter()
            .zip(columns.iter())
            .map(|(value, column)| convert_value(value, column))
            .collect(),
    )
}

fn convert_value(value: Value, column: &Column) -> CatalogValue {
    match value {
        Value::NULL => CatalogValue::Null,
        Value::Int(v) => CatalogValue::Int(v),
        Value::UInt(v) => match i64::try_from(v) {
            Ok(v) => CatalogValue::Int(v),
            Err(_) => CatalogValue::Decimal(v.into()),
        },
        Value::Float(v) => CatalogValue::Float(f64::from(v)),
        Value::Double(v) => CatalogValue::Float(v),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let Some(date) = NaiveDate::from_ymd_opt(year.into(), month.into(), day.into()) else {
                return CatalogValue::Null;
            };
            if column.column_type() == ColumnType::MYSQL_TYPE_DATE {
                return CatalogValue::Date(date);
            }
            date.and_hms_micro_opt(hour.into(), minute.into(), second.into(), micros)
                .map(CatalogValue::DateTime)
                .unwrap_or(CatalogValue::Date(date))
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            if !negative && days == 0 {
                if let Some(t) =
                    NaiveTime::from_hms_micro_opt(hours.into(), minutes.into(), seconds.into(), micros)
                {
                    return CatalogValue::Time(t);
                }
            }
            // TIME spans -838:59:59..838:59:59; render as MySQL prints it.
            let total_hours = u64::from(days) * 24 + u64::from(hours);
            CatalogValue::Text(format!(
                "{}{:02}:{:02}:{:02}",
                if negative { "-" } else { "" },
                total_hours,
                minutes,
                seconds
            ))
        }
        Value::Bytes(bytes) => convert_bytes(bytes, column),
    }
}

/// Text-protocol cells and binary-protocol strings arrive as bytes.
fn convert_bytes(bytes: Vec<u8>, column: &Column) -> CatalogValue {
    use ColumnType::*;

    match column.column_type() {
        MYSQL_TYPE_TINY | MYSQL_TYPE_SHORT | MYSQL_TYPE_INT24 | MYSQL_TYPE_LONG
        | MYSQL_TYPE_LONGLONG | MYSQL_TYPE_YEAR | MYSQL_TYPE_DECIMAL | MYSQL_TYPE_NEWDECIMAL
        | MYSQL_TYPE_FLOAT | MYSQL_TYPE_DOUBLE => {
            CatalogValue::from_numeric_text(&String::from_utf8_lossy(&bytes))
        }
        MYSQL_TYPE_BIT | MYSQL_TYPE_GEOMETRY => CatalogValue::Bytes(bytes),
        _ if column.character_set() == BINARY_CHARSET => CatalogValue::Bytes(bytes),
        _ => match String::from_utf8(bytes) {
            Ok(text) => CatalogValue::Text(text),
            Err(e) => CatalogValue::Bytes(e.into_bytes()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(column_type: ColumnType) -> Column {
        Column::new(column_type)
    }

    #[test]
    fn test_numeric_text_cells() {
        let decimal = column(ColumnType::MYSQL_TYPE_NEWDECIMAL).with_character_set(BINARY_CHARSET);
        assert_eq!(
            convert_value(Value::Bytes(b"1234.50".to_vec()), &decimal).to_string(),
            "1234.50"
        );
        let int = column(ColumnType::MYSQL_TYPE_LONG).with_character_set(BINARY_CHARSET);
        assert_eq!(
            convert_value(Value::Bytes(b"42".to_vec()), &int),
            CatalogValue::Int(42)
        );
    }

    #[test]
    fn test_strings_and_blobs() {
        let text = column(ColumnType::MYSQL_TYPE_VAR_STRING).with_character_set(45);
        assert_eq!(
            convert_value(Value::Bytes(b"orders".to_vec()), &text),
            CatalogValue::Text("orders".into())
        );
        let blob = column(ColumnType::MYSQL_TYPE_BLOB).with_character_set(BINARY_CHARSET);
        assert_eq!(
            convert_value(Value::Bytes(vec![0xde, 0xad]), &blob),
            CatalogValue::Bytes(vec![0xde, 0xad])
        );
    }

    #[test]
    fn test_binary_protocol_dates() {
        let date = column(ColumnType::MYSQL_TYPE_DATE);
        assert_eq!(
            convert_value(Value::Date(2024, 1, 31, 0, 0, 0, 0), &date).to_string(),
            "2024-01-31"
        );
        let ts = column(ColumnType::MYSQL_TYPE_DATETIME);
        assert_eq!(
            convert_value(Value::Date(2024, 1, 31, 8, 30, 0, 0), &ts).to_string(),
            "2024-01-31 08:30:00"
        );
        assert_eq!(convert_value(Value::NULL, &ts), CatalogValue::Null);
    }

    #[test]
    fn test_long_time_renders_hours() {
        let time = column(ColumnType::MYSQL_TYPE_TIME);
        assert_eq!(
            convert_value(Value::Time(true, 1, 2, 3, 4, 0), &time).to_string(),
            "-26:03:04"
        );
    }
}
