//! SQL Server / Azure SQL catalog reader, validation primitives and DDL.
//!
//! Columns, keys and foreign keys come from `INFORMATION_SCHEMA`; unique
//! indexes, partitions and space usage need the `sys.*` views.

use async_trait::async_trait;

use super::dialect::MssqlDialect;
use super::session::MssqlSession;
use crate::config::ConnectionConfig;
use crate::core::connection::{Connection, ConnectionState};
use crate::core::kind::DbKind;
use crate::core::metadata::{
    ColumnMetadata, ConstraintEntry, DdlOutcome, DdlRequest, IndexEntry, MinMax, PartitionEntry,
    TableSpace,
};
use crate::core::normalize::{reformat_mssql_boundary, PrecisionRules};
use crate::core::ops;
use crate::core::traits::{
    CatalogReader, Database, DdlExecutor, Dialect, SchemaScope, Session, Validator,
};
use crate::core::value::{Row, NULL_SENTINEL};
use crate::error::Result;

const TABLES_SQL: &str = "
SELECT TABLE_NAME
FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_CATALOG = @P1 AND TABLE_SCHEMA = @P2 AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME";

const KEY_CONSTRAINTS_SQL: &str = "
SELECT tc.TABLE_NAME, kcu.COLUMN_NAME, kcu.ORDINAL_POSITION, NULL AS STATUS,
       tc.CONSTRAINT_SCHEMA, tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, NULL AS SEARCH_CONDITION
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
  ON tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
 AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
WHERE tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
  AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
UNION ALL
SELECT tc.TABLE_NAME, ccu.COLUMN_NAME, 1, NULL,
       tc.CONSTRAINT_SCHEMA, tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, cc.CHECK_CLAUSE
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
JOIN INFORMATION_SCHEMA.CHECK_CONSTRAINTS cc
  ON tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA
 AND tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME
JOIN INFORMATION_SCHEMA.CONSTRAINT_COLUMN_USAGE ccu
  ON tc.CONSTRAINT_SCHEMA = ccu.CONSTRAINT_SCHEMA
 AND tc.CONSTRAINT_NAME = ccu.CONSTRAINT_NAME
WHERE tc.TABLE_SCHEMA = @P1 AND tc.TABLE_NAME = @P2
  AND tc.CONSTRAINT_TYPE = 'CHECK'
ORDER BY 1, 3";

// Referencing and referenced key columns are paired on ordinal position.
const FOREIGN_KEYS_SQL: &str = "
SELECT rc.CONSTRAINT_NAME, fk.TABLE_NAME, fk.COLUMN_NAME, fk.TABLE_SCHEMA,
       pk.TABLE_NAME AS R_TABLE_NAME, pk.COLUMN_NAME AS R_COLUMN_NAME,
       pk.TABLE_SCHEMA AS R_OWNER, 'FOREIGN KEY', fk.ORDINAL_POSITION
FROM INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE fk
  ON fk.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA
 AND fk.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE pk
  ON pk.CONSTRAINT_SCHEMA = rc.UNIQUE_CONSTRAINT_SCHEMA
 AND pk.CONSTRAINT_NAME = rc.UNIQUE_CONSTRAINT_NAME
 AND pk.ORDINAL_POSITION = fk.ORDINAL_POSITION
WHERE fk.TABLE_SCHEMA = @P1 AND fk.TABLE_NAME = @P2
ORDER BY rc.CONSTRAINT_NAME, fk.ORDINAL_POSITION";

const UNIQUE_INDEXES_SQL: &str = "
SELECT s.name, t.name, c.name, i.name, i.type_desc
FROM sys.indexes i
JOIN sys.tables t ON t.object_id = i.object_id
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
WHERE i.is_unique = 1 AND ic.is_included_column = 0
  AND s.name = @P1 AND t.name = @P2
ORDER BY i.name, ic.key_ordinal";

// One row per partition of the heap or clustered index. Boundary N is the
// high value of partition N; boundary N-1 is its implicit minimum.
const PARTITIONS_SQL: &str = "
SELECT s.name, t.name,
       ps.name + '_' + CAST(p.partition_number AS VARCHAR(10)) AS partition_name,
       p.partition_number, c.name, pf.type_desc, fg.name, pf.fanout,
       CAST(hi.value AS VARCHAR(MAX)) AS high_value,
       CAST(lo.value AS VARCHAR(MAX)) AS min_value,
       CAST(hi.value AS VARCHAR(MAX)) AS max_value,
       ps.name AS partition_scheme, pf.name AS partition_function
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id
JOIN sys.indexes i ON i.object_id = t.object_id AND i.index_id IN (0, 1)
JOIN sys.partition_schemes ps ON ps.data_space_id = i.data_space_id
JOIN sys.partition_functions pf ON pf.function_id = ps.function_id
JOIN sys.partitions p ON p.object_id = t.object_id AND p.index_id = i.index_id
JOIN sys.index_columns ic
  ON ic.object_id = i.object_id AND ic.index_id = i.index_id AND ic.partition_ordinal > 0
JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
LEFT JOIN sys.destination_data_spaces dds
  ON dds.partition_scheme_id = ps.data_space_id AND dds.destination_id = p.partition_number
LEFT JOIN sys.filegroups fg ON fg.data_space_id = dds.data_space_id
LEFT JOIN sys.partition_range_values hi
  ON hi.function_id = pf.function_id AND hi.boundary_id = p.partition_number
LEFT JOIN sys.partition_range_values lo
  ON lo.function_id = pf.function_id AND lo.boundary_id = p.partition_number - 1
WHERE s.name = @P1 AND t.name = @P2
ORDER BY p.partition_number";

const FIND_TABLE_SQL: &str =
    "SELECT count(1) FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_CATALOG = @P1 AND TABLE_NAME = @P2";

const FIND_QUALIFIED_TABLE_SQL: &str = "
SELECT count(1) FROM INFORMATION_SCHEMA.TABLES
WHERE TABLE_CATALOG = @P1 AND TABLE_SCHEMA = @P2 AND TABLE_NAME = @P3";

const TABLE_SPACE_SQL: &str = "
SELECT SUM(a.total_pages) AS total_pages
FROM sys.tables t
JOIN sys.indexes i ON t.object_id = i.object_id
JOIN sys.partitions p ON i.object_id = p.object_id AND i.index_id = p.index_id
JOIN sys.allocation_units a ON p.partition_id = a.container_id
JOIN sys.schemas s ON t.schema_id = s.schema_id
WHERE s.name = @P1 AND t.name = @P2
  AND t.is_ms_shipped = 0
  AND i.object_id > 255";

fn columns_sql() -> String {
    format!(
        "
SELECT c.COLUMN_NAME, c.DATA_TYPE, c.IS_NULLABLE, c.COLUMN_DEFAULT,
       {} AS DATA_LENGTH,
       c.NUMERIC_PRECISION AS DATA_PRECISION,
       c.NUMERIC_SCALE AS DATA_SCALE
FROM INFORMATION_SCHEMA.COLUMNS c
WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
ORDER BY c.ORDINAL_POSITION",
        PrecisionRules::MSSQL.length_case()
    )
}

fn partition_from_row(row: &Row) -> Result<PartitionEntry> {
    let mut partition = PartitionEntry::from_row(row)?;
    for bound in [
        &mut partition.high_value,
        &mut partition.min_value,
        &mut partition.max_value,
    ] {
        if bound.as_str() != NULL_SENTINEL {
            *bound = reformat_mssql_boundary(bound);
        }
    }
    partition.partition_scheme = Some(row.text(11)?);
    partition.partition_function = Some(row.text(12)?);
    Ok(partition)
}

/// SQL Server and Azure SQL implementation of the catalog contract.
pub struct MssqlCatalog<S: Session = MssqlSession> {
    conn: Connection<S>,
    dialect: MssqlDialect,
    catalog: String,
    schema: String,
}

impl MssqlCatalog<MssqlSession> {
    /// Open a session to SQL Server.
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        Self::connect_as(config, DbKind::Mssql).await
    }

    /// Open a session to SQL Server or Azure SQL.
    pub async fn connect_as(config: &ConnectionConfig, kind: DbKind) -> Result<Self> {
        let session = MssqlSession::connect(config, kind).await?;
        Ok(Self::new(Connection::established(kind, session), config))
    }
}

impl<S: Session> MssqlCatalog<S> {
    /// Wrap an established connection; the connection's kind selects the
    /// SQL Server or Azure SQL dialect.
    pub fn new(conn: Connection<S>, config: &ConnectionConfig) -> Self {
        let dialect = match conn.kind() {
            DbKind::Azure => MssqlDialect::azure(),
            _ => MssqlDialect::new(),
        };
        let schema = config
            .source_schema()
            .or(config.schema_name())
            .unwrap_or("dbo")
            .to_string();
        Self {
            conn,
            dialect,
            catalog: config.database_name.to_uppercase(),
            schema,
        }
    }

    pub fn dialect(&self) -> &MssqlDialect {
        &self.dialect
    }
}

#[async_trait]
impl<S: Session> CatalogReader for MssqlCatalog<S> {
    fn scope(&self, schema_override: Option<&str>) -> SchemaScope {
        let owner = schema_override.unwrap_or(&self.schema);
        SchemaScope::new(owner, owner.to_lowercase())
    }

    async fn table_names(&mut self, scope: &SchemaScope) -> Result<Vec<String>> {
        let rows = self
            .conn
            .query(TABLES_SQL, &[self.catalog.as_str(), scope.owner.as_str()])
            .await?;
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
        rows.iter().map(partition_from_row).collect()
    }
}

#[async_trait]
impl<S: Session> Validator for MssqlCatalog<S> {
    async fn find_table(&mut self, table: &str) -> Result<bool> {
        let catalog = self.catalog.as_str();
        match self.dialect.catalog_target(table)? {
            (Some(schema), name) => {
                let params = [catalog, schema.as_str(), name.as_str()];
                ops::table_missing(&mut self.conn, FIND_QUALIFIED_TABLE_SQL, &params).await
            }
            (None, name) => {
                ops::table_missing(&mut self.conn, FIND_TABLE_SQL, &[catalog, name.as_str()]).await
            }
        }
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
        let (schema, name) = self.dialect.catalog_target(table)?;
        let schema = schema.unwrap_or_else(|| self.schema.clone());
        ops::pages(&mut self.conn, TABLE_SPACE_SQL, &[schema.as_str(), name.as_str()]).await
    }

    async fn calculate_checksum(&mut self, sql: &str) -> Result<Vec<String>> {
        ops::checksum(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> DdlExecutor for MssqlCatalog<S> {
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome> {
        ops::create_table(&mut self.conn, request, is_ddl).await
    }

    async fn delete_table(&mut self, sql: &str) -> Result<()> {
        ops::delete_table(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> Database for MssqlCatalog<S> {
    fn kind(&self) -> DbKind {
        self.dialect.kind()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::CatalogValue;
    use crate::testing::{int_row, text_row, FakeSession};

    fn config(schema_name: Option<&str>, source_schema: Option<&str>) -> ConnectionConfig {
        ConnectionConfig {
            db_type: "mssql".into(),
            host_address: "sql".into(),
            port_number: None,
            database_name: "Sales".into(),
            username: "sa".into(),
            password: "pw".into(),
            schema_name: schema_name.map(str::to_string),
            source_schema: source_schema.map(str::to_string),
            encrypt: false,
            trust_server_cert: false,
            ssl_mode: "disable".into(),
            odbc_driver: None,
        }
    }

    fn catalog(session: FakeSession) -> MssqlCatalog<FakeSession> {
        MssqlCatalog::new(
            Connection::established(DbKind::Mssql, session),
            &config(None, None),
        )
    }

    fn partition_row(number: i64, high: Option<&str>, low: Option<&str>) -> Row {
        Row::new(vec![
            "dbo".into(),
            "sales".into(),
            format!("ps_sales_{}", number).into(),
            CatalogValue::Int(number),
            "sale_date".into(),
            "RANGE".into(),
            "PRIMARY".into(),
            CatalogValue::Int(3),
            high.into(),
            low.into(),
            high.into(),
            "ps_sales".into(),
            "pf_sales".into(),
        ])
    }

    // =========================================================================
    // Scope tests
    // =========================================================================

    #[test]
    fn test_schema_fallback_chain() {
        let c = catalog(FakeSession::new());
        assert_eq!(c.scope(None), SchemaScope::new("dbo", "dbo"));

        let c = MssqlCatalog::new(
            Connection::established(DbKind::Mssql, FakeSession::new()),
            &config(Some("Sales"), None),
        );
        assert_eq!(c.scope(None), SchemaScope::new("Sales", "sales"));

        let c = MssqlCatalog::new(
            Connection::established(DbKind::Mssql, FakeSession::new()),
            &config(Some("Sales"), Some("staging")),
        );
        assert_eq!(c.scope(None).owner, "staging");
        assert_eq!(c.scope(Some("audit")).owner, "audit");
    }

    // =========================================================================
    // Catalog reader tests
    // =========================================================================

    #[tokio::test]
    async fn test_table_names_bind_upper_catalog() {
        let session = FakeSession::new().with_rows(
            "INFORMATION_SCHEMA.TABLES",
            vec![text_row(&[Some("customers")]), text_row(&[Some("orders")])],
        );
        let journal = session.journal();
        let mut c = catalog(session);
        let scope = c.scope(None);

        let names = c.table_names(&scope).await.unwrap();
        assert_eq!(names, vec!["customers", "orders"]);
        assert_eq!(journal.queries()[0].1, vec!["SALES", "dbo"]);
    }

    #[tokio::test]
    async fn test_orders_columns() {
        let session = FakeSession::new().with_rows(
            "INFORMATION_SCHEMA.COLUMNS",
            vec![
                Row::new(vec![
                    "id".into(),
                    "int".into(),
                    "NO".into(),
                    CatalogValue::Null,
                    CatalogValue::Null,
                    CatalogValue::Int(10),
                    CatalogValue::Int(0),
                ]),
                Row::new(vec![
                    "total".into(),
                    "decimal".into(),
                    "YES".into(),
                    "((0))".into(),
                    CatalogValue::Int(10),
                    CatalogValue::Int(10),
                    CatalogValue::Int(2),
                ]),
            ],
        );
        let mut c = catalog(session);
        let scope = c.scope(None);

        let columns = c.fetch_columns(&scope, "orders").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].data_length, CatalogValue::Null);
        assert!(!columns[0].nullable());
        assert_eq!(columns[1].data_precision, CatalogValue::Int(10));
        assert_eq!(columns[1].data_scale, CatalogValue::Int(2));
        assert!(columns_sql().contains("WHEN c.DATA_TYPE IN ('decimal', 'numeric')"));
    }

    #[tokio::test]
    async fn test_partition_boundaries_are_reformatted() {
        let session = FakeSession::new().with_rows(
            "sys.partition_schemes",
            vec![
                partition_row(2, Some("Jan  1 2025 12:00AM"), Some("Jan  1 2024 12:00AM")),
                partition_row(1, Some("Jan  1 2024 12:00AM"), None),
                partition_row(3, None, Some("Jan  1 2025 12:00AM")),
            ],
        );
        let mut c = catalog(session);
        let scope = c.scope(None);

        let table = c.describe_table(&scope, "sales").await.unwrap();
        let parts = &table.partition_json;
        assert_eq!(
            parts.iter().map(|p| p.partition_position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(parts[0].high_value, "2024-01-01");
        assert_eq!(parts[0].min_value, "null");
        assert_eq!(parts[1].min_value, "2024-01-01");
        assert_eq!(parts[1].max_value, "2025-01-01");
        assert_eq!(parts[2].high_value, "null");
        assert_eq!(parts[0].partition_function.as_deref(), Some("pf_sales"));
    }

    // =========================================================================
    // Validator tests
    // =========================================================================

    #[tokio::test]
    async fn test_find_table_strips_brackets() {
        let session = FakeSession::new().with_rows("count(1)", vec![int_row(1)]);
        let journal = session.journal();
        let mut c = catalog(session);

        assert!(!c.find_table("[Order Details]").await.unwrap());
        assert_eq!(journal.queries()[0].1, vec!["SALES", "Order Details"]);
    }

    #[tokio::test]
    async fn test_find_table_filters_on_schema_qualifier() {
        let session = FakeSession::new().with_rows("count(1)", vec![int_row(1)]);
        let journal = session.journal();
        let mut c = catalog(session);

        assert!(!c.find_table("[dbo].[Order Details]").await.unwrap());
        let (sql, params) = &journal.queries()[0];
        assert!(sql.contains("TABLE_SCHEMA = @P2 AND TABLE_NAME = @P3"));
        assert_eq!(params, &vec!["SALES", "dbo", "Order Details"]);
    }

    #[tokio::test]
    async fn test_table_space_reports_pages() {
        let session = FakeSession::new().with_rows("total_pages", vec![int_row(24)]);
        let mut c = catalog(session);
        assert_eq!(c.table_space("orders").await.unwrap(), TableSpace::Pages(24));

        let mut empty = catalog(FakeSession::new().with_rows(
            "total_pages",
            vec![Row::new(vec![CatalogValue::Null])],
        ));
        assert_eq!(empty.table_space("empty_table").await.unwrap(), TableSpace::Pages(0));
    }

    #[tokio::test]
    async fn test_checksum_returns_first_column() {
        let session = FakeSession::new().with_rows(
            "HASHBYTES",
            vec![text_row(&[Some("a1"), Some("x")]), text_row(&[Some("b2"), Some("y")])],
        );
        let mut c = catalog(session);
        let hashes = c
            .calculate_checksum("SELECT HASHBYTES('MD5', name), id FROM t")
            .await
            .unwrap();
        assert_eq!(hashes, vec!["a1", "b2"]);
    }
}
