//! Oracle catalog reader, validation primitives and DDL execution.
//!
//! Catalog queries read the `ALL_*` views bound to one owner, so the login's
//! own schema and a foreign source schema go through the same SQL.

use async_trait::async_trait;

use super::dialect::OracleDialect;
use super::session::OracleSession;
use crate::config::ConnectionConfig;
use crate::core::connection::{Connection, ConnectionState};
use crate::core::kind::DbKind;
use crate::core::metadata::{
    ColumnMetadata, ConstraintEntry, DdlOutcome, DdlRequest, IndexEntry, MinMax, PartitionEntry,
    TableSpace,
};
use crate::core::ops;
use crate::core::traits::{
    CatalogReader, Database, DdlExecutor, Dialect, SchemaScope, Session, Validator,
};
use crate::error::Result;

const TABLES_SQL: &str = "SELECT table_name FROM all_tables WHERE owner = :1 ORDER BY table_name";

const COLUMNS_SQL: &str = "
SELECT column_name, data_type, nullable, data_default, data_length, data_precision, data_scale
FROM all_tab_columns
WHERE owner = :1 AND table_name = :2
ORDER BY column_id";

const KEY_CONSTRAINTS_SQL: &str = "
SELECT cols.table_name,
       cols.column_name,
       cols.position,
       cons.status,
       cons.owner,
       cons.constraint_name,
       cons.constraint_type,
       CASE WHEN cons.search_condition IS NULL THEN '' END AS search_condition
FROM all_constraints cons
JOIN all_cons_columns cols
  ON cons.constraint_name = cols.constraint_name
 AND cons.owner = cols.owner
WHERE cons.owner = :1
  AND cons.table_name = :2
  AND cons.constraint_type != 'R'
ORDER BY cols.table_name, cols.position";

// The referenced key's columns are matched on ordinal position.
const FOREIGN_KEYS_SQL: &str = "
SELECT a.constraint_name,
       a.table_name,
       a.column_name,
       c.owner,
       c_pk.table_name AS r_table_name,
       b.column_name AS r_column_name,
       c_pk.owner AS r_owner,
       c.constraint_type,
       a.position
FROM all_cons_columns a
JOIN all_constraints c
  ON a.owner = c.owner
 AND a.constraint_name = c.constraint_name
JOIN all_constraints c_pk
  ON c.r_owner = c_pk.owner
 AND c.r_constraint_name = c_pk.constraint_name
JOIN all_cons_columns b
  ON c_pk.owner = b.owner
 AND c_pk.constraint_name = b.constraint_name
 AND b.position = a.position
WHERE c.constraint_type = 'R'
  AND c.owner = :1
  AND a.table_name = :2
ORDER BY a.constraint_name, a.position";

const UNIQUE_INDEXES_SQL: &str = "
SELECT ind.table_owner,
       ind.table_name,
       ind_col.column_name,
       ind.index_name,
       ind.index_type
FROM all_indexes ind
JOIN all_ind_columns ind_col
  ON ind.owner = ind_col.index_owner
 AND ind.index_name = ind_col.index_name
WHERE ind.uniqueness = 'UNIQUE'
  AND ind.owner = :1
  AND ind.table_name = :2
ORDER BY ind.index_name, ind_col.column_position";

// min_value is the previous partition's boundary. A multi-column key is
// reported as one comma-separated column list per partition.
const PARTITIONS_SQL: &str = "
SELECT p1.table_owner,
       p1.table_name,
       p1.partition_name,
       p1.partition_position,
       (SELECT LISTAGG(c.column_name, ',') WITHIN GROUP (ORDER BY c.column_position)
          FROM all_part_key_columns c
         WHERE c.owner = p1.table_owner
           AND c.name = p1.table_name
           AND c.object_type = 'TABLE') AS column_name,
       t.partitioning_type,
       p1.tablespace_name,
       (SELECT COUNT(*)
          FROM all_tab_partitions apt
         WHERE apt.table_owner = p1.table_owner
           AND apt.table_name = p1.table_name) AS partition_count,
       p1.high_value,
       p2.high_value AS min_value,
       p1.high_value AS max_value
FROM all_tab_partitions p1
LEFT JOIN all_tab_partitions p2
  ON p1.partition_position = p2.partition_position + 1
 AND p1.table_owner = p2.table_owner
 AND p1.table_name = p2.table_name
JOIN all_part_tables t
  ON p1.table_owner = t.owner
 AND p1.table_name = t.table_name
WHERE p1.table_owner = :1
  AND p1.table_name = :2
ORDER BY p1.partition_position";

const FIND_TABLE_SQL: &str = "SELECT count(1) FROM all_tables WHERE owner = :1 AND table_name = :2";

const TABLE_SPACE_SQL: &str =
    "SELECT Nvl(SUM(bytes)/1024,0) FROM all_segments WHERE owner = :1 AND segment_name = :2";

/// Oracle implementation of the catalog contract.
pub struct OracleCatalog<S: Session = OracleSession> {
    conn: Connection<S>,
    dialect: OracleDialect,
    username: String,
    source_schema: Option<String>,
}

impl OracleCatalog<OracleSession> {
    /// Open a session and wrap it.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let session = OracleSession::connect(config).await?;
        Ok(Self::new(
            Connection::established(DbKind::Oracle, session),
            config,
        ))
    }
}

impl<S: Session> OracleCatalog<S> {
    pub fn new(conn: Connection<S>, config: &ConnectionConfig) -> Self {
        Self {
            conn,
            dialect: OracleDialect::new(),
            username: config.username.clone(),
            source_schema: config.source_schema().map(str::to_string),
        }
    }

    pub fn dialect(&self) -> &OracleDialect {
        &self.dialect
    }

    /// Owner and stored name for a caller-supplied table; an unqualified
    /// name resolves in the configured scope.
    fn target(&self, table: &str) -> Result<(String, String)> {
        let (owner, name) = self.dialect.catalog_target(table)?;
        Ok((owner.unwrap_or_else(|| self.scope(None).owner), name))
    }
}

#[async_trait]
impl<S: Session> CatalogReader for OracleCatalog<S> {
    fn scope(&self, schema_override: Option<&str>) -> SchemaScope {
        let owner = schema_override
            .or(self.source_schema.as_deref())
            .unwrap_or(&self.username);
        SchemaScope::new(owner.to_uppercase(), owner.to_lowercase())
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
        let rows = self.conn.query(COLUMNS_SQL, &[scope.owner.as_str(), table]).await?;
        rows.iter().map(ColumnMetadata::from_row).collect()
    }

    async fn fetch_constraints(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<ConstraintEntry>> {
        let params = [scope.owner.as_str(), table];
        let keys = self.conn.query(KEY_CONSTRAINTS_SQL, &params).await?;
        let foreign = self.conn.query(FOREIGN_KEYS_SQL, &params).await?;

        let mut entries = keys
            .iter()
            .map(ConstraintEntry::key_from_row)
            .collect::<Result<Vec<_>>>()?;
        for row in &foreign {
            entries.push(ConstraintEntry::foreign_key_from_row(row)?);
        }
        Ok(entries)
    }

    async fn fetch_indexes(&mut self, scope: &SchemaScope, table: &str) -> Result<Vec<IndexEntry>> {
        let rows = self
            .conn
            .query(UNIQUE_INDEXES_SQL, &[scope.owner.as_str(), table])
            .await?;
        rows.iter().map(IndexEntry::from_row).collect()
    }

    async fn fetch_partitions(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<PartitionEntry>> {
        let rows = self.conn.query(PARTITIONS_SQL, &[scope.owner.as_str(), table]).await?;
        rows.iter().map(PartitionEntry::from_row).collect()
    }
}

#[async_trait]
impl<S: Session> Validator for OracleCatalog<S> {
    async fn find_table(&mut self, table: &str) -> Result<bool> {
        let (owner, name) = self.target(table)?;
        ops::table_missing(&mut self.conn, FIND_TABLE_SQL, &[owner.as_str(), name.as_str()]).await
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
        let (owner, name) = self.target(table)?;
        ops::kilobytes(&mut self.conn, TABLE_SPACE_SQL, &[owner.as_str(), name.as_str()]).await
    }

    async fn calculate_checksum(&mut self, sql: &str) -> Result<Vec<String>> {
        ops::checksum(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> DdlExecutor for OracleCatalog<S> {
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome> {
        ops::create_table(&mut self.conn, request, is_ddl).await
    }

    async fn delete_table(&mut self, sql: &str) -> Result<()> {
        ops::delete_table(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> Database for OracleCatalog<S> {
    fn kind(&self) -> DbKind {
        DbKind::Oracle
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
