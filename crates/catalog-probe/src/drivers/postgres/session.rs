//! PostgreSQL session over `tokio-postgres`.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tokio_postgres::types::{FromSql, ToSql, Type};
use tokio_postgres::{Client, Config as PgConfig, NoTls};
use tracing::{debug, error, warn};

use crate::config::ConnectionConfig;
use crate::core::kind::DbKind;
use crate::core::traits::Session;
use crate::core::value::{CatalogValue, Row};
use crate::drivers::common::SslMode;
use crate::error::{ProbeError, Result};

/// A live PostgreSQL session. The protocol connection runs on its own task.
pub struct PostgresSession {
    client: Client,
}

impl PostgresSession {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let pg_config = build_config(config);
        let ssl_mode = SslMode::parse(&config.ssl_mode)?;

        let client = match ssl_mode.postgres_connector()? {
            None => {
                warn!("PostgreSQL TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(|e| ProbeError::connection("postgres", e))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
            Some(tls) => {
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| ProbeError::connection("postgres", e))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("PostgreSQL connection error: {}", e);
                    }
                });
                client
            }
        };

        Ok(Self { client })
    }
}

fn build_config(config: &ConnectionConfig) -> PgConfig {
    let mut pg_config = PgConfig::new();
    pg_config.host(&config.host_address);
    pg_config.port(config.port(DbKind::Postgres));
    pg_config.dbname(&config.database_name);
    pg_config.user(&config.username);
    pg_config.password(&config.password);
    pg_config.application_name("catalog-probe");
    pg_config
}

#[async_trait]
impl Session for PostgresSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let binds: Vec<&(dyn ToSql + Sync)> =
            params.iter().map(|p| p as &(dyn ToSql + Sync)).collect();
        let rows = self.client.query(sql, &binds).await?;
        rows.iter().map(convert_row).collect()
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // Each batch runs in its own implicit transaction.
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    async fn close(self) -> Result<()> {
        // Dropping the client ends the connection task.
        debug!("closing PostgreSQL client");
        drop(self.client);
        Ok(())
    }
}

fn convert_row(row: &tokio_postgres::Row) -> Result<Row> {
    (0..row.len())
        .map(|idx| convert_value(row, idx))
        .collect::<Result<Vec<_>>>()
        .map(Row::new)
}

fn get<'a, T: FromSql<'a>>(row: &'a tokio_postgres::Row, idx: usize) -> Result<Option<T>> {
    Ok(row.try_get::<_, Option<T>>(idx)?)
}

fn convert_value(row: &tokio_postgres::Row, idx: usize) -> Result<CatalogValue> {
    let ty = row.columns()[idx].type_().clone();
    let value: CatalogValue = match ty {
        Type::BOOL => get::<bool>(row, idx)?.into_value(CatalogValue::Bool),
        Type::INT2 => get::<i16>(row, idx)?.into_value(|v| CatalogValue::Int(v.into())),
        Type::INT4 => get::<i32>(row, idx)?.into_value(|v| CatalogValue::Int(v.into())),
        Type::INT8 => get::<i64>(row, idx)?.into_value(CatalogValue::Int),
        Type::OID => get::<u32>(row, idx)?.into_value(|v| CatalogValue::Int(v.into())),
        Type::FLOAT4 => get::<f32>(row, idx)?.into_value(|v| CatalogValue::Float(v.into())),
        Type::FLOAT8 => get::<f64>(row, idx)?.into_value(CatalogValue::Float),
        Type::NUMERIC => get::<Decimal>(row, idx)?.into_value(CatalogValue::Decimal),
        Type::DATE => get::<NaiveDate>(row, idx)?.into_value(CatalogValue::Date),
        Type::TIME => get::<NaiveTime>(row, idx)?.into_value(CatalogValue::Time),
        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx)?.into_value(CatalogValue::DateTime),
        Type::TIMESTAMPTZ => {
            get::<DateTime<FixedOffset>>(row, idx)?.into_value(CatalogValue::DateTimeOffset)
        }
        Type::UUID => get::<uuid::Uuid>(row, idx)?.into_value(|u| CatalogValue::Text(u.to_string())),
        Type::BYTEA => get::<Vec<u8>>(row, idx)?.into_value(CatalogValue::Bytes),
        _ if <String as FromSql>::accepts(&ty) => {
            get::<String>(row, idx)?.into_value(CatalogValue::Text)
        }
        other => {
            return Err(ProbeError::query(format!(
                "column {} has unsupported type {}; cast it to text",
                idx, other
            )))
        }
    };
    Ok(value)
}

trait IntoValue<T> {
    fn into_value(self, f: impl FnOnce(T) -> CatalogValue) -> CatalogValue;
}

impl<T> IntoValue<T> for Option<T> {
    fn into_value(self, f: impl FnOnce(T) -> CatalogValue) -> CatalogValue {
        self.map(f).unwrap_or(CatalogValue::Null)
    }
}
