//! Concurrent metadata scan over independent connections.
//!
//! Sessions are never shared: table names are discovered on one connection,
//! then split into contiguous chunks, each described sequentially on a
//! connection of its own. Results keep discovery order.

use std::future::Future;
use std::time::Instant;

use futures::future::try_join_all;
use tracing::{debug, info};

use crate::core::metadata::TableMetadata;
use crate::core::traits::{Database, SchemaScope};
use crate::error::Result;

/// Describe every table visible in the scope using up to `workers`
/// connections, each obtained from `open`.
///
/// With one worker (or at most one table) the discovery connection does
/// all the work, which is the plain sequential scan. Otherwise it is closed
/// after discovery and each worker opens, uses and closes its own
/// connection. The first failure aborts the scan; sessions of workers
/// still in flight are dropped.
pub async fn scan_database<D, F, Fut>(
    open: F,
    schema_override: Option<&str>,
    workers: usize,
) -> Result<Vec<TableMetadata>>
where
    D: Database,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<D>>,
{
    let start = Instant::now();
    let mut db = open().await?;
    let scope = db.scope(schema_override);

    let names = match db.table_names(&scope).await {
        Ok(names) => names,
        Err(e) => {
            db.close().await?;
            return Err(e);
        }
    };

    let workers = workers.clamp(1, names.len().max(1));
    if workers == 1 {
        let result = describe_chunk(&mut db, &scope, &names).await;
        db.close().await?;
        let tables = result?;
        info!(
            "Scanned {} tables in {} in {:.1}s",
            tables.len(),
            scope.table_schema,
            start.elapsed().as_secs_f64()
        );
        return Ok(tables);
    }
    db.close().await?;

    let chunk_size = names.len().div_ceil(workers);
    info!(
        "Scanning {} tables in {} with {} workers",
        names.len(),
        scope.table_schema,
        workers
    );

    let scope = &scope;
    let open = &open;
    let tasks = names.chunks(chunk_size).enumerate().map(|(worker, chunk)| async move {
        let mut db = open().await?;
        let result = describe_chunk(&mut db, scope, chunk).await;
        db.close().await?;
        debug!("Worker {} described {} tables", worker, chunk.len());
        result
    });

    let tables: Vec<TableMetadata> = try_join_all(tasks).await?.into_iter().flatten().collect();
    info!(
        "Scanned {} tables in {} in {:.1}s",
        tables.len(),
        scope.table_schema,
        start.elapsed().as_secs_f64()
    );
    Ok(tables)
}

async fn describe_chunk<D: Database>(
    db: &mut D,
    scope: &SchemaScope,
    names: &[String],
) -> Result<Vec<TableMetadata>> {
    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        tables.push(db.describe_table(scope, name).await?);
    }
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::config::ConnectionConfig;
    use crate::core::connection::Connection;
    use crate::core::kind::DbKind;
    use crate::drivers::PostgresCatalog;
    use crate::error::ProbeError;
    use crate::testing::{text_row, Call, FakeSession};

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            db_type: "postgres".into(),
            host_address: "localhost".into(),
            port_number: None,
            database_name: "shop".into(),
            username: "probe".into(),
            password: String::new(),
            schema_name: Some("sales".into()),
            source_schema: None,
            encrypt: false,
            trust_server_cert: false,
            ssl_mode: "disable".into(),
            odbc_driver: None,
        }
    }

    fn session(tables: &[&str]) -> FakeSession {
        FakeSession::new()
            .with_rows(
                "ORDER BY table_name",
                tables.iter().map(|t| text_row(&[Some(*t)])).collect(),
            )
            .with_rows(
                "information_schema.columns",
                vec![text_row(&[
                    Some("id"),
                    Some("integer"),
                    Some("NO"),
                    None,
                    None,
                    Some("32"),
                    Some("0"),
                    Some("PRI"),
                ])],
            )
    }

    fn closes(session: &FakeSession) -> usize {
        session
            .journal()
            .calls()
            .iter()
            .filter(|c| **c == Call::Close)
            .count()
    }

    // =========================================================================
    // Scan tests
    // =========================================================================

    #[tokio::test]
    async fn test_parallel_scan_keeps_discovery_order() {
        let fake = session(&["a", "b", "c", "d", "e"]);
        let opened = AtomicUsize::new(0);
        let config = config();

        let tables = scan_database(
            || {
                opened.fetch_add(1, Ordering::SeqCst);
                let conn = Connection::established(DbKind::Postgres, fake.clone());
                let catalog = PostgresCatalog::new(conn, &config);
                async move { Ok::<_, ProbeError>(catalog) }
            },
            None,
            2,
        )
        .await
        .unwrap();

        let names: Vec<_> = tables.iter().map(|t| t.table_name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
        assert!(tables.iter().all(|t| t.table_schema == "sales"));
        assert_eq!(tables[0].column_detail.len(), 1);

        // Discovery connection plus one per worker, all closed.
        assert_eq!(opened.load(Ordering::SeqCst), 3);
        assert_eq!(closes(&fake), 3);
    }

    #[tokio::test]
    async fn test_single_worker_reuses_discovery_connection() {
        let fake = session(&["a", "b"]);
        let opened = AtomicUsize::new(0);
        let config = config();

        let tables = scan_database(
            || {
                opened.fetch_add(1, Ordering::SeqCst);
                let conn = Connection::established(DbKind::Postgres, fake.clone());
                let catalog = PostgresCatalog::new(conn, &config);
                async move { Ok::<_, ProbeError>(catalog) }
            },
            Some("archive"),
            1,
        )
        .await
        .unwrap();

        assert_eq!(tables.len(), 2);
        assert_eq!(tables[1].table_schema, "archive");
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert_eq!(closes(&fake), 1);
    }

    #[tokio::test]
    async fn test_workers_capped_by_table_count() {
        let fake = session(&["only"]);
        let opened = AtomicUsize::new(0);
        let config = config();

        let tables = scan_database(
            || {
                opened.fetch_add(1, Ordering::SeqCst);
                let conn = Connection::established(DbKind::Postgres, fake.clone());
                let catalog = PostgresCatalog::new(conn, &config);
                async move { Ok::<_, ProbeError>(catalog) }
            },
            None,
            8,
        )
        .await
        .unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_schema_scans_nothing() {
        let fake = FakeSession::new();
        let config = config();
        let tables = scan_database(
            || {
                let conn = Connection::established(DbKind::Postgres, fake.clone());
                let catalog = PostgresCatalog::new(conn, &config);
                async move { Ok::<_, ProbeError>(catalog) }
            },
            None,
            4,
        )
        .await
        .unwrap();
        assert!(tables.is_empty());
        assert_eq!(closes(&fake), 1);
    }

    #[tokio::test]
    async fn test_catalog_failure_propagates() {
        let fake = session(&["a", "b", "c"]).failing_on("information_schema.columns");
        let config = config();
        let result = scan_database(
            || {
                let conn = Connection::established(DbKind::Postgres, fake.clone());
                let catalog = PostgresCatalog::new(conn, &config);
                async move { Ok::<_, ProbeError>(catalog) }
            },
            None,
            3,
        )
        .await;
        assert!(result.unwrap_err().is_query_error());
    }
}
