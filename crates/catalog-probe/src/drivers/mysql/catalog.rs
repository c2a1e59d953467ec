//! MySQL catalog reader, validation primitives and DDL execution.
//!
//! In MySQL a schema and a database are the same thing; every catalog query
//! is bound to the schema resolved from `source_schema` or `database_name`.

use async_trait::async_trait;

use super::dialect::MysqlDialect;
use super::session::MysqlSession;
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

const TABLES_SQL: &str = "
SELECT TABLE_NAME
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
ORDER BY TABLE_NAME";

const COLUMNS_SQL: &str = "
SELECT COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_DEFAULT,
       CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION, NUMERIC_SCALE, COLUMN_KEY
FROM information_schema.COLUMNS
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
ORDER BY ORDINAL_POSITION";

// CHECK constraints are table-level in MySQL; the catalog records no column.
const KEY_CONSTRAINTS_SQL: &str = "
SELECT kcu.TABLE_NAME, kcu.COLUMN_NAME, kcu.ORDINAL_POSITION, NULL AS STATUS,
       tc.CONSTRAINT_SCHEMA, tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, NULL AS SEARCH_CONDITION
FROM information_schema.TABLE_CONSTRAINTS tc
JOIN information_schema.KEY_COLUMN_USAGE kcu
  ON kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
 AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
 AND kcu.TABLE_NAME = tc.TABLE_NAME
WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
  AND tc.CONSTRAINT_TYPE IN ('PRIMARY KEY', 'UNIQUE')
UNION ALL
SELECT tc.TABLE_NAME, '', 1, NULL,
       tc.CONSTRAINT_SCHEMA, tc.CONSTRAINT_NAME, tc.CONSTRAINT_TYPE, cc.CHECK_CLAUSE
FROM information_schema.TABLE_CONSTRAINTS tc
JOIN information_schema.CHECK_CONSTRAINTS cc
  ON cc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
 AND cc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
WHERE tc.TABLE_SCHEMA = ? AND tc.TABLE_NAME = ?
  AND tc.CONSTRAINT_TYPE = 'CHECK'
ORDER BY 1, 3, 6";

// KEY_COLUMN_USAGE already pairs each referencing column with its
// referenced column by position.
const FOREIGN_KEYS_SQL: &str = "
SELECT CONSTRAINT_NAME, TABLE_NAME, COLUMN_NAME, TABLE_SCHEMA,
       REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME, REFERENCED_TABLE_SCHEMA,
       'FOREIGN KEY', ORDINAL_POSITION
FROM information_schema.KEY_COLUMN_USAGE
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
  AND REFERENCED_TABLE_NAME IS NOT NULL
ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION";

const UNIQUE_INDEXES_SQL: &str = "
SELECT TABLE_SCHEMA, TABLE_NAME, COLUMN_NAME, INDEX_NAME, INDEX_TYPE
FROM information_schema.STATISTICS
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND NON_UNIQUE = 0
ORDER BY INDEX_NAME, SEQ_IN_INDEX";

// Subpartitions repeat their parent's row; only the first one is kept.
const PARTITIONS_SQL: &str = "
SELECT p1.TABLE_SCHEMA, p1.TABLE_NAME, p1.PARTITION_NAME, p1.PARTITION_ORDINAL_POSITION,
       p1.PARTITION_EXPRESSION, p1.PARTITION_METHOD, p1.TABLESPACE_NAME,
       (SELECT COUNT(DISTINCT c.PARTITION_NAME)
          FROM information_schema.PARTITIONS c
         WHERE c.TABLE_SCHEMA = p1.TABLE_SCHEMA AND c.TABLE_NAME = p1.TABLE_NAME) AS PARTITION_COUNT,
       p1.PARTITION_DESCRIPTION AS HIGH_VALUE,
       p2.PARTITION_DESCRIPTION AS MIN_VALUE,
       p1.PARTITION_DESCRIPTION AS MAX_VALUE
FROM information_schema.PARTITIONS p1
LEFT JOIN information_schema.PARTITIONS p2
  ON p2.TABLE_SCHEMA = p1.TABLE_SCHEMA
 AND p2.TABLE_NAME = p1.TABLE_NAME
 AND p1.PARTITION_ORDINAL_POSITION = p2.PARTITION_ORDINAL_POSITION + 1
 AND COALESCE(p2.SUBPARTITION_ORDINAL_POSITION, 1) = 1
WHERE p1.TABLE_SCHEMA = ? AND p1.TABLE_NAME = ?
  AND p1.PARTITION_NAME IS NOT NULL
  AND COALESCE(p1.SUBPARTITION_ORDINAL_POSITION, 1) = 1
ORDER BY p1.PARTITION_ORDINAL_POSITION";

const FIND_TABLE_SQL: &str =
    "SELECT count(1) FROM information_schema.TABLES WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?";

const TABLE_SPACE_SQL: &str = "
SELECT ROUND((DATA_LENGTH + INDEX_LENGTH) / 1024) AS size_kb
FROM information_schema.TABLES
WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?";

/// MySQL implementation of the catalog contract.
pub struct MysqlCatalog<S: Session = MysqlSession> {
    conn: Connection<S>,
    dialect: MysqlDialect,
    schema: String,
}

impl MysqlCatalog<MysqlSession> {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self> {
        let session = MysqlSession::connect(config).await?;
        Ok(Self::new(Connection::established(DbKind::Mysql, session), config))
    }
}

impl<S: Session> MysqlCatalog<S> {
    pub fn new(conn: Connection<S>, config: &ConnectionConfig) -> Self {
        let schema = config
            .source_schema()
            .unwrap_or(&config.database_name)
            .to_string();
        Self {
            conn,
            dialect: MysqlDialect::new(),
            schema,
        }
    }

    pub fn dialect(&self) -> &MysqlDialect {
        &self.dialect
    }

    fn target(&self, table: &str) -> Result<(String, String)> {
        let (schema, name) = self.dialect.catalog_target(table)?;
        Ok((schema.unwrap_or_else(|| self.schema.clone()), name))
    }
}

#[async_trait]
impl<S: Session> CatalogReader for MysqlCatalog<S> {
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
        let rows = self.conn.query(COLUMNS_SQL, &[scope.owner.as_str(), table]).await?;
        rows.iter().map(ColumnMetadata::from_row_with_key).collect()
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
impl<S: Session> Validator for MysqlCatalog<S> {
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
        ops::kilobytes(&mut self.conn, TABLE_SPACE_SQL, &[schema.as_str(), name.as_str()]).await
    }

    async fn calculate_checksum(&mut self, sql: &str) -> Result<Vec<String>> {
        ops::checksum(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> DdlExecutor for MysqlCatalog<S> {
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome> {
        ops::create_table(&mut self.conn, request, is_ddl).await
    }

    async fn delete_table(&mut self, sql: &str) -> Result<()> {
        ops::delete_table(&mut self.conn, sql).await
    }
}

#[async_trait]
impl<S: Session> Database for MysqlCatalog<S> {
    fn kind(&self) -> DbKind {
        DbKind::Mysql
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
    use crate::core::value::{CatalogValue, Row};
    use crate::testing::{int_row, text_row, FakeSession};

    fn config(source_schema: Option<&str>) -> ConnectionConfig {
        ConnectionConfig {
            db_type: "mysql".into(),
            host_address: "mysql".into(),
            port_number: Some(3306),
            database_name: "shop".into(),
            username: "app".into(),
            password: "pw".into(),
            schema_name: None,
            source_schema: source_schema.map(str::to_string),
            encrypt: false,
            trust_server_cert: false,
            ssl_mode: "disable".into(),
            odbc_driver: None,
        }
    }

    fn catalog(session: FakeSession, source_schema: Option<&str>) -> MysqlCatalog<FakeSession> {
        MysqlCatalog::new(
            Connection::established(DbKind::Mysql, session),
            &config(source_schema),
        )
    }

    fn partition_row(name: &str, position: i64, high: &str, min: Option<&str>) -> Row {
        Row::new(vec![
            "shop".into(),
            "orders".into(),
            name.into(),
            CatalogValue::Int(position),
            "year(created_at)".into(),
            "RANGE".into(),
            CatalogValue::Null,
            CatalogValue::Int(3),
            high.into(),
            min.into(),
            high.into(),
        ])
    }

    // =========================================================================
    // Scope tests
    // =========================================================================

    #[test]
    fn test_scope_uses_database_then_source_schema() {
        assert_eq!(
            catalog(FakeSession::new(), None).scope(None),
            SchemaScope::new("shop", "shop")
        );
        assert_eq!(
            catalog(FakeSession::new(), Some("Archive")).scope(None),
            SchemaScope::new("Archive", "Archive")
        );
    }

    // =========================================================================
    // Catalog reader tests
    // =========================================================================

    #[tokio::test]
    async fn test_columns_carry_column_key() {
        let session = FakeSession::new().with_rows(
            "information_schema.COLUMNS",
            vec![Row::new(vec![
                "id".into(),
                "int".into(),
                "NO".into(),
                CatalogValue::Null,
                CatalogValue::Null,
                CatalogValue::Int(10),
                CatalogValue::Int(0),
                "PRI".into(),
            ])],
        );
        let mut c = catalog(session, None);
        let scope = c.scope(None);

        let columns = c.fetch_columns(&scope, "orders").await.unwrap();
        assert_eq!(columns[0].column_key, Some(CatalogValue::Text("PRI".into())));
    }

    #[tokio::test]
    async fn test_constraints_bind_schema_twice_for_union() {
        let session = FakeSession::new()
            .with_rows(
                "REFERENCED_TABLE_NAME IS NOT NULL",
                vec![text_row(&[
                    Some("fk_orders_customer"),
                    Some("orders"),
                    Some("customer_id"),
                    Some("shop"),
                    Some("customers"),
                    Some("id"),
                    Some("shop"),
                    Some("FOREIGN KEY"),
                    Some("1"),
                ])],
            )
            .with_rows(
                "TABLE_CONSTRAINTS",
                vec![text_row(&[
                    Some("orders"),
                    Some("id"),
                    Some("1"),
                    None,
                    Some("shop"),
                    Some("PRIMARY"),
                    Some("PRIMARY KEY"),
                    None,
                ])],
            );
        let journal = session.journal();
        let mut c = catalog(session, None);
        let scope = c.scope(None);

        let constraints = c.fetch_constraints(&scope, "orders").await.unwrap();
        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0].constraint_type, "PRIMARY KEY");
        assert!(constraints[1].is_foreign_key());
        assert_eq!(constraints[1].r_table_name.as_deref(), Some("customers"));

        let queries = journal.queries();
        assert_eq!(queries[0].1, vec!["shop", "orders", "shop", "orders"]);
        assert_eq!(queries[1].1, vec!["shop", "orders"]);
    }

    #[tokio::test]
    async fn test_key_constraints_ordered_by_table_then_position() {
        let key = |column: &str, position: &str| {
            text_row(&[
                Some("orders"),
                Some(column),
                Some(position),
                None,
                Some("shop"),
                Some("PRIMARY"),
                Some("PRIMARY KEY"),
                None,
            ])
        };
        let session = FakeSession::new()
            .with_rows("TABLE_CONSTRAINTS", vec![key("id", "1"), key("region", "2")]);
        let journal = session.journal();
        let mut c = catalog(session, None);
        let scope = c.scope(None);

        let constraints = c.fetch_constraints(&scope, "orders").await.unwrap();
        let positions: Vec<String> = constraints.iter().map(|k| k.position.to_string()).collect();
        assert_eq!(positions, vec!["1", "2"]);
        let sql = &journal.queries()[0].0;
        assert!(sql.trim_end().ends_with("ORDER BY 1, 3, 6"), "{}", sql);
    }

    #[tokio::test]
    async fn test_find_table_uses_schema_qualifier() {
        let session = FakeSession::new().with_rows("count(1)", vec![int_row(1)]);
        let journal = session.journal();
        let mut c = catalog(session, None);

        assert!(!c.find_table("archive.orders").await.unwrap());
        assert_eq!(journal.queries()[0].1, vec!["archive", "orders"]);
    }

    #[tokio::test]
    async fn test_partitions_ordered_with_previous_boundary() {
        let session = FakeSession::new().with_rows(
            "information_schema.PARTITIONS",
            vec![
                partition_row("p2024", 2, "2025", Some("2024")),
                partition_row("p2023", 1, "2024", None),
                partition_row("pmax", 3, "MAXVALUE", Some("2025")),
            ],
        );
        let mut c = catalog(session, None);
        let scope = c.scope(None);

        let table = c.describe_table(&scope, "orders").await.unwrap();
        let names: Vec<_> = table
            .partition_json
            .iter()
            .map(|p| p.partition_name.as_str())
            .collect();
        assert_eq!(names, vec!["p2023", "p2024", "pmax"]);
        assert_eq!(table.partition_json[0].min_value, "null");
        assert_eq!(table.partition_json[2].min_value, "2025");
        assert!(table.partition_json.iter().all(|p| !p.selected && !p.dropped));
    }

    // =========================================================================
    // Validator tests
    // =========================================================================

    #[tokio::test]
    async fn test_table_space_in_kilobytes() {
        let session = FakeSession::new().with_rows(
            "size_kb",
            vec![Row::new(vec![CatalogValue::Decimal(64.into())])],
        );
        let journal = session.journal();
        let mut c = catalog(session, None);

        assert_eq!(c.table_space("orders").await.unwrap(), TableSpace::Kilobytes(64.0));
        assert_eq!(journal.queries()[0].1, vec!["shop", "orders"]);
    }

    #[tokio::test]
    async fn test_count_has_no_hint() {
        let session = FakeSession::new().with_rows("count(1)", vec![text_row(&[Some("12")])]);
        let journal = session.journal();
        let mut c = catalog(session, None);

        assert_eq!(c.table_count("orders", Some("WHERE total > 0")).await.unwrap(), 12);
        assert_eq!(
            journal.queries()[0].0,
            "select count(1) from orders\n WHERE total > 0"
        );
    }
}
