//! Validation and DDL routines shared by every dialect.
//!
//! Dialects only build SQL; the row handling, NULL normalization and the
//! best-effort statement-list policy are implemented once here.

use tracing::{error, info};

use super::connection::Connection;
use super::metadata::{DdlOutcome, DdlRequest, MinMax, StatementReport, TableSpace};
use super::traits::Session;
use super::value::CatalogValue;
use crate::error::{ProbeError, Result};

/// First column of the first row, `None` for an empty result.
pub async fn scalar<S: Session>(
    conn: &mut Connection<S>,
    sql: &str,
    params: &[&str],
) -> Result<Option<CatalogValue>> {
    let rows = conn.query(sql, params).await?;
    match rows.first() {
        Some(row) => Ok(Some(row.value(0)?)),
        None => Ok(None),
    }
}

/// Integer result of a `count(...)` query. An empty result is an error.
pub async fn count<S: Session>(conn: &mut Connection<S>, sql: &str, params: &[&str]) -> Result<i64> {
    let rows = conn.query(sql, params).await?;
    let row = rows
        .first()
        .ok_or_else(|| ProbeError::query(format!("count query returned no rows: {}", sql.trim())))?;
    row.integer(0)
}

/// True when the existence probe counts zero rows.
pub async fn table_missing<S: Session>(
    conn: &mut Connection<S>,
    sql: &str,
    params: &[&str],
) -> Result<bool> {
    Ok(count(conn, sql, params).await? == 0)
}

/// Stringified min/max from a two-column aggregate query.
pub async fn min_max<S: Session>(conn: &mut Connection<S>, sql: &str) -> Result<Option<MinMax>> {
    let rows = conn.query(sql, &[]).await?;
    rows.last().map(MinMax::from_row).transpose()
}

/// First column of every row, stringified.
pub async fn checksum<S: Session>(conn: &mut Connection<S>, sql: &str) -> Result<Vec<String>> {
    let rows = conn.query(sql, &[]).await?;
    rows.iter().map(|row| row.text(0)).collect()
}

/// Kilobyte total; no row or NULL means zero.
pub async fn kilobytes<S: Session>(
    conn: &mut Connection<S>,
    sql: &str,
    params: &[&str],
) -> Result<TableSpace> {
    let value = scalar(conn, sql, params).await?.unwrap_or_default();
    if value.is_null() {
        return Ok(TableSpace::Kilobytes(0.0));
    }
    value
        .as_f64()
        .map(TableSpace::Kilobytes)
        .ok_or_else(|| ProbeError::query(format!("table size is not numeric: '{}'", value)))
}

/// Page total; no row or NULL means zero.
pub async fn pages<S: Session>(
    conn: &mut Connection<S>,
    sql: &str,
    params: &[&str],
) -> Result<TableSpace> {
    let value = scalar(conn, sql, params).await?.unwrap_or_default();
    if value.is_null() {
        return Ok(TableSpace::Pages(0));
    }
    value
        .as_i64()
        .map(TableSpace::Pages)
        .ok_or_else(|| ProbeError::query(format!("page count is not numeric: '{}'", value)))
}

/// Execute a DDL request.
///
/// A failing single statement propagates. In a list each failure is logged
/// and recorded, and execution moves on to the next statement; only a
/// closed connection stops the list.
pub async fn create_table<S: Session>(
    conn: &mut Connection<S>,
    request: DdlRequest,
    is_ddl: bool,
) -> Result<DdlOutcome> {
    match request {
        DdlRequest::Single(sql) if is_ddl => {
            conn.execute(&sql).await?;
            Ok(DdlOutcome::Committed)
        }
        DdlRequest::Single(sql) => {
            let value = scalar(conn, &sql, &[]).await?.ok_or_else(|| {
                ProbeError::query(format!("statement returned no rows: {}", sql.trim()))
            })?;
            Ok(DdlOutcome::Scalar(value))
        }
        DdlRequest::Many(statements) => {
            let mut reports = Vec::with_capacity(statements.len());
            for statement in statements {
                let error = match conn.execute(&statement).await {
                    Ok(()) => {
                        info!("Executed: {}", statement.trim());
                        None
                    }
                    Err(e @ ProbeError::ConnectionClosed(_)) => return Err(e),
                    Err(e) => {
                        error!("Statement failed, continuing: {} ({})", statement.trim(), e);
                        Some(e.to_string())
                    }
                };
                reports.push(StatementReport { statement, error });
            }
            Ok(DdlOutcome::Batch(reports))
        }
    }
}

/// Execute a drop/delete statement and commit.
pub async fn delete_table<S: Session>(conn: &mut Connection<S>, sql: &str) -> Result<()> {
    conn.execute(sql).await
}
