//! PostgreSQL catalog reader, validation primitives and DDL execution.
//!
//! Columns come from `information_schema`; constraints and indexes from
//! `pg_catalog`, whose array-valued key columns are unnested with their
//! ordinality. Every projected column is cast so that domain types such as
//! `sql_identifier` reach the session as plain text or integers.
//!
//! Declarative partitions are not reported.

use async_trait::async_trait;

use super::dialect::PostgresDialect;
use super::session::PostgresSession;
use crate::config::ConnectionConfig;
use crate::core::connection::{Connection, ConnectionState};
use crate::core::kind::DbKind;
use crate::core::metadata::{
    ColumnMetadata, ConstraintEntry, DdlOutcome, DdlRequest, IndexEntry, MinMax, TableSpace,
};
use crate::core::normalize::PrecisionRules;
use crate::core::ops;
use crate::core::traits::{
    CatalogReader, Database, DdlExecutor, Dialect, SchemaScope, Session, Validator,
};
use crate::error::{ProbeError, Result};

const DEFAULT_SCHEMA: &str = "public";

const TABLES_SQL: &str = "
SELECT table_name::text
FROM information_schema.tables
WHERE table_schema = $1::text AND table_type = 'BASE TABLE'
ORDER BY table_name";

// A table-level CHECK has no conkey; it is reported once with an empty
// column at position 1.
const KEY_CONSTRAINTS_SQL: &str = "
SELECT cl.relname::text, COALESCE(a.attname::text, ''), COALESCE(k.ord, 1)::int,
       NULL::text AS status,
       n.nspname::text, con.conname::text,
       CASE con.contype WHEN 'p' THEN 'PRIMARY KEY' WHEN 'u' THEN 'UNIQUE' ELSE 'CHECK' END,
       CASE WHEN con.contype = 'c' THEN pg_get_constraintdef(con.oid) END AS search_condition
FROM pg_constraint con
JOIN pg_class cl ON cl.oid = con.conrelid
JOIN pg_namespace n ON n.oid = cl.relnamespace
LEFT JOIN LATERAL unnest(con.conkey) WITH ORDINALITY AS k(attnum, ord) ON true
LEFT JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
WHERE n.nspname = $1::text AND cl.relname = $2::text
  AND con.contype IN ('p', 'u', 'c')
ORDER BY 1, 3, 6";

// conkey and confkey are unnested together, pairing columns by position.
const FOREIGN_KEYS_SQL: &str = "
SELECT con.conname::text, cl.relname::text, a.attname::text, n.nspname::text,
       rcl.relname::text, ra.attname::text, rn.nspname::text,
       'FOREIGN KEY'::text, k.ord::int
FROM pg_constraint con
JOIN pg_class cl ON cl.oid = con.conrelid
JOIN pg_namespace n ON n.oid = cl.relnamespace
JOIN pg_class rcl ON rcl.oid = con.confrelid
JOIN pg_namespace rn ON rn.oid = rcl.relnamespace
CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, rattnum, ord)
JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
JOIN pg_attribute ra ON ra.attrelid = con.confrelid AND ra.attnum = k.rattnum
WHERE n.nspname = $1::text AND cl.relname = $2::text
  AND con.contype = 'f'
ORDER BY con.conname, k.ord";

const UNIQUE_INDEXES_SQL: &str = "
SELECT n.nspname::text, t.relname::text, a.attname::text, i.relname::text, am.amname::text
FROM pg_index x
JOIN pg_class t ON t.oid = x.indrelid
JOIN pg_class i ON i.oid = x.indexrelid
JOIN pg_namespace n ON n.oid = t.relnamespace
JOIN pg_am am ON am.oid = i.relam
CROSS JOIN LATERAL unnest(x.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE x.indisunique AND k.ord <= x.indnkeyatts
  AND n.nspname = $1::text AND t.relname = $2::text
ORDER BY i.relname, k.ord";

const FIND_TABLE_SQL: &str = "
SELECT count(1)
FROM information_schema.tables
WHERE table_schema = $1::text AND table_name = $2::text";

const TABLE_SPACE_SQL: &str = "
SELECT pg_size_pretty(pg_total_relation_size(format('%I.%I', $1::text, $2::text)::regclass)) AS size";

// column_key follows MySQL: PRI for primary key columns, UNI for columns of
// a unique constraint, empty otherwise.
fn columns_sql() -> String {
    format!(
        "
SELECT c.column_name::text, c.data_type::text, c.is_nullable::text, c.column_default::text,
       ({})::int AS data_length,
       c.numeric_precision::int AS data_precision,
       c.numeric_scale::int AS data_scale,
       (SELECT COALESCE(min(CASE con.contype WHEN 'p' THEN 'PRI' ELSE 'UNI' END), '')
          FROM pg_constraint con
          JOIN pg_class cl ON cl.oid = con.conrelid
          JOIN pg_namespace n ON n.oid = cl.relnamespace
          JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = ANY (con.conkey)
         WHERE con.contype IN ('p', 'u')
           AND n.nspname = c.table_schema::text
           AND cl.relname = c.table_name::text
           AND a.attname = c.column_name::text) AS column_key
FROM information_schema.columns c
WHERE c.table_schema = $1::text AND c.table_name = $2::text
ORDER BY c.ordinal_position",
        PrecisionRules::POSTGRES.length_case()
    )
}

/// PostgreSQL implementation of the catalog contract.
pub struct PostgresCatalog<S: Session = PostgresSession> {
    conn: Connection<S>,
    dialect: PostgresDialect,
    schema: String,
}

impl PostgresCatalog<PostgresSession> {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let session = PostgresSession::connect(config).await?;
        Ok(Self::new(Connection::established(DbKind::Postgres, session), config))
    }
}

impl<S: Session> PostgresCatalog<S> {
    pub fn new(conn: Connection<S>, config: &ConnectionConfig) -> Self {
        let schema = config
            .source_schema()
            .or(config.schema_name())
            .unwrap_or(DEFAULT_SCHEMA)
            .to_string();
        Self {
            conn,
            dialect: PostgresDialect::new(),
            schema,
        }
    }

    pub fn dialect(&self) -> &PostgresDialect {
        &self.dialect
    }

    fn target(&self, table: &str) -> Result<(String, String)> {
        let (schema, name) = self.dialect.catalog_target(table)?;
        Ok((schema.unwrap_or_else(|| self.schema.clone()), name))
    }
}

#[async_trait]
impl<S: Session> CatalogReader for PostgresCatalog<S> {
    fn scope(&self, schema_override: Option<&str>) -> SchemaScope {
        let schema = schema_override.unwrap_or(&self.schema);
        SchemaScope::new(schema, schema)
    }

    async fn table_names(&mut self, scope: &SchemaScope) -> Result<Vec<String>> {
        let rows = self.conn.query(TABLES_SQL, &[scope.owner.as_str()]).await?;
        rows.iter().map(|row| row.text(0)).collect()
    }

    async fn fetch_columns(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<ColumnMetadata>> {
        let rows = self
            .conn
            .query(&columns_sql(), &[scope.owner.as_str(), table])
            .await?;
        rows.iter().map(ColumnMetadata::from_row_with_key).collect()
    }

    async fn fetch_constraints(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<ConstraintEntry>> {
        let params = [scope.owner.as_str(), table];
        let keys = self.conn.query(KEY_CONSTRAINTS_SQL, &params).await?;
        let foreign = self.conn.query(FOREIGN_KEYS_SQL, &params).await?;

        keys.iter()
            .map(ConstraintEntry::key_from_row)
            .chain(foreign.iter().map(ConstraintEntry::foreign_key_from_row))
            .collect()
    }

    async fn fetch_indexes(&mut self, scope: &SchemaScope, table: &str) -> Result<Vec<IndexEntry>> {
        let rows = self
            .conn
            .query(UNIQUE_INDEXES_SQL, &[scope.owner.as_str(), table])
            .await?;
        rows.iter().map(IndexEntry::from_row).collect()
    }
}

#[async_trait]
impl<S: Session> Validator for PostgresCatalog<S> {
    async fn find_table(&mut self, table: &str) -> Result<bool> {
        let (schema, name) = self.target(table)?;
        ops::table_missing(&mut self.conn, FIND_TABLE_SQL, &[schema.as_str(), name.as_str()]).await
    }

    async fn table_count(&mut self, table: &str, where_clause: Option<&str>) -> Result<i64> {
        let sql = self.dialect.count_sql(table, where_clause)?;
        ops::count(&mut self.conn, &sql, &[]).await
    }

    async fn find_min_max(&mut self, table: &str, column: &str) -> Result<Option<MinMax>> {
        let sql = self.dialect.min_max_sql(table, column)?;
        ops::min_max(&mut self.conn, &sql).await
    }

    async fn table_space(&mut self, table: &str) -> Result<TableSpace> {
        let (schema, name) = self.target(table)?;
        let value = ops::scalar(&mut self.conn, TABLE_SPACE_SQL, &[schema.as_str(), name.as_str()])
            .await?
        .ok_or_else(|| ProbeError::query("pg_size_pretty returned no rows"))?;
        Ok(TableSpace::Pretty(value.to_string()))
    }

    async fn calculate_checksum(&mut self, sql: &str) -> Result<Vec<String>> {
        ops::checksum(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> DdlExecutor for PostgresCatalog<S> {
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome> {
        ops::create_table(&mut self.conn, request, is_ddl).await
    }

    async fn delete_table(&mut self, sql: &str) -> Result<()> {
        ops::delete_table(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> Database for PostgresCatalog<S> {
    fn kind(&self) -> DbKind {
        DbKind::Postgres
    }

    fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn.query(self.dialect.ping_sql(), &[]).await.map(|_| ())
    }

    async fn close(&mut self) -> Result<()> {
        self.conn.close().await
    }
}
