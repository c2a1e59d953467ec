//! DB2 catalog reader, validation primitives and DDL execution.
//!
//! Reads the `SYSCAT` views. Catalog text columns that DB2 stores as CLOB
//! (check text, partition expressions) are cast to VARCHAR so they come back
//! through the text row buffer. Range partitions carry explicit low and high
//! values, so no self-join is needed for the minimum.

use async_trait::async_trait;

use super::dialect::Db2Dialect;
use super::session::Db2Session;
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

const TABLES_SQL: &str =
    "SELECT TABNAME FROM SYSCAT.TABLES WHERE TABSCHEMA = ? AND TYPE = 'T' ORDER BY TABNAME";

const COLUMNS_SQL: &str = "
SELECT COLNAME, TYPENAME, NULLS, DEFAULT, LENGTH,
       CASE WHEN TYPENAME IN ('DECIMAL', 'NUMERIC', 'DECFLOAT') THEN LENGTH END AS DATA_PRECISION,
       SCALE
FROM SYSCAT.COLUMNS
WHERE TABSCHEMA = ? AND TABNAME = ?
ORDER BY COLNO";

const KEY_CONSTRAINTS_SQL: &str = "
SELECT tc.TABNAME, k.COLNAME, k.COLSEQ, tc.ENFORCED, tc.TABSCHEMA, tc.CONSTNAME,
       CASE tc.TYPE WHEN 'P' THEN 'PRIMARY KEY' ELSE 'UNIQUE' END,
       CAST(NULL AS VARCHAR(2000))
FROM SYSCAT.TABCONST tc
JOIN SYSCAT.KEYCOLUSE k
  ON k.TABSCHEMA = tc.TABSCHEMA AND k.TABNAME = tc.TABNAME AND k.CONSTNAME = tc.CONSTNAME
WHERE tc.TABSCHEMA = ? AND tc.TABNAME = ? AND tc.TYPE IN ('P', 'U')
UNION ALL
SELECT tc.TABNAME, COALESCE(cc.COLNAME, ''), 1, tc.ENFORCED, tc.TABSCHEMA, tc.CONSTNAME,
       'CHECK', CAST(ch.TEXT AS VARCHAR(2000))
FROM SYSCAT.TABCONST tc
JOIN SYSCAT.CHECKS ch
  ON ch.TABSCHEMA = tc.TABSCHEMA AND ch.TABNAME = tc.TABNAME AND ch.CONSTNAME = tc.CONSTNAME
LEFT JOIN SYSCAT.COLCHECKS cc
  ON cc.TABSCHEMA = ch.TABSCHEMA AND cc.TABNAME = ch.TABNAME AND cc.CONSTNAME = ch.CONSTNAME
WHERE tc.TABSCHEMA = ? AND tc.TABNAME = ? AND tc.TYPE = 'K'
ORDER BY 1, 3, 6";

// Referencing and referenced key columns are paired on COLSEQ.
const FOREIGN_KEYS_SQL: &str = "
SELECT r.CONSTNAME, r.TABNAME, fk.COLNAME, r.TABSCHEMA,
       r.REFTABNAME, pk.COLNAME, r.REFTABSCHEMA, 'FOREIGN KEY', fk.COLSEQ
FROM SYSCAT.REFERENCES r
JOIN SYSCAT.KEYCOLUSE fk
  ON fk.TABSCHEMA = r.TABSCHEMA AND fk.TABNAME = r.TABNAME AND fk.CONSTNAME = r.CONSTNAME
JOIN SYSCAT.KEYCOLUSE pk
  ON pk.TABSCHEMA = r.REFTABSCHEMA AND pk.TABNAME = r.REFTABNAME
 AND pk.CONSTNAME = r.REFKEYNAME AND pk.COLSEQ = fk.COLSEQ
WHERE r.TABSCHEMA = ? AND r.TABNAME = ?
ORDER BY r.CONSTNAME, fk.COLSEQ";

const UNIQUE_INDEXES_SQL: &str = "
SELECT i.TABSCHEMA, i.TABNAME, ic.COLNAME, i.INDNAME,
       CASE i.UNIQUERULE WHEN 'P' THEN 'PRIMARY' ELSE 'UNIQUE' END
FROM SYSCAT.INDEXES i
JOIN SYSCAT.INDEXCOLUSE ic ON ic.INDSCHEMA = i.INDSCHEMA AND ic.INDNAME = i.INDNAME
WHERE i.TABSCHEMA = ? AND i.TABNAME = ?
  AND i.UNIQUERULE IN ('P', 'U') AND ic.COLORDER <> 'I'
ORDER BY i.INDNAME, ic.COLSEQ";

// SEQNO is zero-based.
const PARTITIONS_SQL: &str = "
SELECT dp.TABSCHEMA, dp.TABNAME, dp.DATAPARTITIONNAME, dp.SEQNO + 1,
       CAST(dpe.DATAPARTITIONEXPRESSION AS VARCHAR(512)), 'RANGE', ts.TBSPACE,
       (SELECT COUNT(*) FROM SYSCAT.DATAPARTITIONS c
         WHERE c.TABSCHEMA = dp.TABSCHEMA AND c.TABNAME = dp.TABNAME),
       dp.HIGHVALUE, dp.LOWVALUE, dp.HIGHVALUE
FROM SYSCAT.DATAPARTITIONS dp
JOIN SYSCAT.DATAPARTITIONEXPRESSION dpe
  ON dpe.TABSCHEMA = dp.TABSCHEMA AND dpe.TABNAME = dp.TABNAME AND dpe.DATAPARTITIONKEYSEQ = 1
LEFT JOIN SYSCAT.TABLESPACES ts ON ts.TBSPACEID = dp.TBSPACEID
WHERE dp.TABSCHEMA = ? AND dp.TABNAME = ?
ORDER BY dp.SEQNO";

const FIND_TABLE_SQL: &str =
    "SELECT COUNT(1) FROM SYSCAT.TABLES WHERE TABSCHEMA = ? AND TABNAME = ?";

const TABLE_SPACE_SQL: &str = "
SELECT SUM(DATA_OBJECT_P_SIZE + INDEX_OBJECT_P_SIZE + LONG_OBJECT_P_SIZE
           + LOB_OBJECT_P_SIZE + XML_OBJECT_P_SIZE) AS TOTAL_SIZE_IN_KB
FROM SYSIBMADM.ADMINTABINFO
WHERE TABSCHEMA = ? AND TABNAME = ?";

/// DB2 implementation of the catalog contract.
pub struct Db2Catalog<S: Session = Db2Session> {
    conn: Connection<S>,
    dialect: Db2Dialect,
    username: String,
    source_schema: Option<String>,
}

impl Db2Catalog<Db2Session> {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let session = Db2Session::connect(config).await?;
        Ok(Self::new(Connection::established(DbKind::Db2, session), config))
    }
}

impl<S: Session> Db2Catalog<S> {
    pub fn new(conn: Connection<S>, config: &ConnectionConfig) -> Self {
        Self {
            conn,
            dialect: Db2Dialect::new(),
            username: config.username.clone(),
            source_schema: config.source_schema().map(str::to_string),
        }
    }

    pub fn dialect(&self) -> &Db2Dialect {
        &self.dialect
    }

    fn target(&self, table: &str) -> Result<(String, String)> {
        let (owner, name) = self.dialect.catalog_target(table)?;
        Ok((owner.unwrap_or_else(|| self.scope(None).owner), name))
    }
}

#[async_trait]
impl<S: Session> CatalogReader for Db2Catalog<S> {
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
        let owner = scope.owner.as_str();
        let keys = self
            .conn
            .query(KEY_CONSTRAINTS_SQL, &[owner, table, owner, table])
            .await?;
        let foreign = self.conn.query(FOREIGN_KEYS_SQL, &[owner, table]).await?;

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

    async fn fetch_partitions(
        &mut self,
        scope: &SchemaScope,
        table: &str,
    ) -> Result<Vec<PartitionEntry>> {
        let rows = self
            .conn
            .query(PARTITIONS_SQL, &[scope.owner.as_str(), table])
            .await?;
        rows.iter().map(PartitionEntry::from_row).collect()
    }
}

#[async_trait]
impl<S: Session> Validator for Db2Catalog<S> {
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
impl<S: Session> DdlExecutor for Db2Catalog<S> {
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome> {
        ops::create_table(&mut self.conn, request, is_ddl).await
    }

    async fn delete_table(&mut self, sql: &str) -> Result<()> {
        ops::delete_table(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> Database for Db2Catalog<S> {
    fn kind(&self) -> DbKind {
        DbKind::Db2
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
