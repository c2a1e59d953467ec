//! Tiberius session for SQL Server and Azure SQL.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use tiberius::{AuthMethod, Client, ColumnData, Config, EncryptionLevel, FromSql, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use crate::config::ConnectionConfig;
use crate::core::kind::DbKind;
use crate::core::traits::Session;
use crate::core::value::{CatalogValue, Row};
use crate::error::{ProbeError, Result};

/// Maximum TDS packet size (32767 bytes, ~32KB).
const TDS_MAX_PACKET_SIZE: u32 = 32767;

/// A live TDS session.
pub struct MssqlSession {
    client: Client<Compat<TcpStream>>,
}

impl MssqlSession {
    /// Connect to SQL Server (`DbKind::Mssql`) or Azure SQL (`DbKind::Azure`).
    pub async fn connect(config: &ConnectionConfig, kind: DbKind) -> Result<Self> {
        let tds = build_config(config, kind);
        let client = open(tds, kind).await?;
        Ok(Self { client })
    }
}

fn build_config(config: &ConnectionConfig, kind: DbKind) -> Config {
    let mut tds = Config::new();
    tds.host(&config.host_address);
    tds.port(config.port(kind));
    tds.database(&config.database_name);
    tds.authentication(AuthMethod::sql_server(&config.username, &config.password));

    // Azure SQL rejects unencrypted sessions.
    if config.encrypt || kind == DbKind::Azure {
        if config.trust_server_cert {
            tds.trust_cert();
        }
        tds.encryption(EncryptionLevel::Required);
    } else {
        tds.encryption(EncryptionLevel::NotSupported);
    }

    tds.packet_size(TDS_MAX_PACKET_SIZE);
    tds
}

async fn open(mut tds: Config, kind: DbKind) -> Result<Client<Compat<TcpStream>>> {
    let tcp = TcpStream::connect(tds.get_addr())
        .await
        .map_err(|e| ProbeError::connection(kind.name(), e))?;
    tcp.set_nodelay(true).ok();

    match Client::connect(tds.clone(), tcp.compat_write()).await {
        Ok(client) => Ok(client),
        // Azure gateways redirect to the node hosting the database.
        Err(tiberius::error::Error::Routing { host, port }) => {
            info!("{} redirected the session to {}:{}", kind.display_name(), host, port);
            tds.host(&host);
            tds.port(port);
            let tcp = TcpStream::connect(tds.get_addr())
                .await
                .map_err(|e| ProbeError::connection(kind.name(), e))?;
            tcp.set_nodelay(true).ok();
            Client::connect(tds, tcp.compat_write())
                .await
                .map_err(|e| ProbeError::connection(kind.name(), e))
        }
        Err(e) => Err(ProbeError::connection(kind.name(), e)),
    }
}

#[async_trait]
impl Session for MssqlSession {
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let binds: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();
        let stream = self.client.query(sql, &binds).await?;
        let rows = stream.into_first_result().await?;
        rows.into_iter().map(convert_row).collect()
    }

    async fn execute(&mut self, sql: &str) -> Result<()> {
        // Sessions run in autocommit mode.
        let result = self.client.execute(sql, &[]).await?;
        debug!("rows affected: {:?}", result.rows_affected());
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }
}

fn convert_row(row: tiberius::Row) -> Result<Row> {
    row.into_iter()
        .map(convert_value)
        .collect::<Result<Vec<_>>>()
        .map(Row::new)
}

fn convert_value(data: ColumnData<'static>) -> Result<CatalogValue> {
    let value = match &data {
        ColumnData::U8(v) => v.map(|v| CatalogValue::Int(i64::from(v))),
        ColumnData::I16(v) => v.map(|v| CatalogValue::Int(i64::from(v))),
        ColumnData::I32(v) => v.map(|v| CatalogValue::Int(i64::from(v))),
        ColumnData::I64(v) => v.map(CatalogValue::Int),
        ColumnData::F32(v) => v.map(|v| CatalogValue::Float(f64::from(v))),
        ColumnData::F64(v) => v.map(CatalogValue::Float),
        ColumnData::Bit(v) => v.map(CatalogValue::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| CatalogValue::Text(s.to_string())),
        ColumnData::Guid(v) => v.map(|g| CatalogValue::Text(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| CatalogValue::Bytes(b.to_vec())),
        ColumnData::Xml(v) => v.as_ref().map(|xml| {
            let text: &str = (**xml).as_ref();
            CatalogValue::Text(text.to_string())
        }),
        ColumnData::Numeric(_) => Decimal::from_sql(&data)?.map(CatalogValue::Decimal),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(&data)?.map(CatalogValue::DateTime)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(&data)?.map(CatalogValue::Date),
        ColumnData::Time(_) => NaiveTime::from_sql(&data)?.map(CatalogValue::Time),
        ColumnData::DateTimeOffset(_) => {
            DateTime::<FixedOffset>::from_sql(&data)?.map(CatalogValue::DateTimeOffset)
        }
    };
    Ok(value.unwrap_or(CatalogValue::Null))
}
