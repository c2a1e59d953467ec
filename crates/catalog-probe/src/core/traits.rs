//! Core traits for cross-dialect catalog introspection.
//!
//! - [`Session`]: the execution surface of one live database session
//! - [`Dialect`]: SQL syntax strategy (quoting, placeholders, probe queries)
//! - [`CatalogReader`]: catalog queries producing the normalized metadata model
//! - [`Validator`]: row counts, existence, min/max, size and checksum primitives
//! - [`DdlExecutor`]: create/drop statement execution
//! - [`Database`]: everything above plus lifecycle, implemented per dialect
//!
//! # Design Patterns
//!
//! - **Strategy**: `Dialect` carries the per-engine SQL differences
//! - **Template Method**: `CatalogReader::describe_table` and
//!   `CatalogReader::list_tables` assemble a table from the per-part fetches

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;

use super::connection::ConnectionState;
use super::identifier::{
    catalog_name, catalog_target, render_qualified, validate_where_clause, Folding, QuoteStyle,
};
use super::kind::DbKind;
use super::metadata::{
    ColumnMetadata, ConstraintEntry, DdlOutcome, DdlRequest, IndexEntry, MinMax, PartitionEntry,
    TableMetadata, TableSpace,
};
use super::normalize::finish_partitions;
use super::value::Row;

/// One live session with a database engine.
///
/// A session is used by exactly one caller at a time; `&mut self` on every
/// method makes concurrent use a compile error rather than a runtime race.
#[async_trait]
pub trait Session: Send {
    /// Run a query with positional text parameters and collect all rows.
    async fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>>;

    /// Run a statement and commit it.
    async fn execute(&mut self, sql: &str) -> Result<()>;

    /// Release the session. In-flight work is abandoned.
    async fn close(self) -> Result<()>;
}

/// SQL syntax strategy for a database engine.
pub trait Dialect: Send + Sync {
    /// Dialect identifier (e.g., "oracle", "mssql").
    fn name(&self) -> &str;

    /// Identifier quoting convention.
    fn quote_style(&self) -> QuoteStyle;

    /// Get a parameter placeholder for the given 1-based index.
    ///
    /// - Oracle: `:1`
    /// - SQL Server: `@P1`
    /// - PostgreSQL: `$1`
    /// - MySQL, DB2: `?`
    fn param_placeholder(&self, index: usize) -> String;

    /// Case folding of unquoted identifiers.
    fn folding(&self) -> Folding {
        Folding::Preserve
    }

    /// Characters beyond `[A-Za-z0-9_]` the engine accepts in an unquoted
    /// identifier.
    fn identifier_symbols(&self) -> &'static [char] {
        &[]
    }

    /// A caller-supplied table name as the catalog views store it.
    fn catalog_name(&self, name: &str) -> Result<String> {
        catalog_name(self.quote_style(), name, self.folding())
    }

    /// A possibly qualified table name split into the stored schema (if the
    /// caller named one) and the stored table name.
    fn catalog_target(&self, name: &str) -> Result<(Option<String>, String)> {
        catalog_target(self.quote_style(), name, self.folding())
    }

    /// Optimizer hint placed after `select` in count queries.
    fn count_hint(&self) -> &str {
        ""
    }

    /// Cheapest statement proving the session is alive.
    fn ping_sql(&self) -> &str {
        "SELECT 1"
    }

    /// Render a caller-supplied (possibly qualified) table or column name.
    fn render_name(&self, name: &str) -> Result<String> {
        render_qualified(self.quote_style(), name, self.identifier_symbols())
    }

    /// `select count(1) from <table>` with an optional filter fragment on
    /// the following line.
    fn count_sql(&self, table: &str, where_clause: Option<&str>) -> Result<String> {
        let mut sql = format!(
            "select {}count(1) from {}",
            self.count_hint(),
            self.render_name(table)?
        );
        if let Some(fragment) = where_clause {
            validate_where_clause(fragment)?;
            sql.push_str("\n ");
            sql.push_str(fragment);
        }
        Ok(sql)
    }

    /// `SELECT min(c), max(c) FROM t`.
    fn min_max_sql(&self, table: &str, column: &str) -> Result<String> {
        Ok(format!(
            "SELECT min({col}) AS min_value, max({col}) AS max_value FROM {table}",
            col = self.render_name(column)?,
            table = self.render_name(table)?
        ))
    }
}

/// Namespace a catalog call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaScope {
    /// Owner/schema value bound into catalog queries, already case-folded
    /// the way the engine stores it.
    pub owner: String,
    /// Value reported as `table_schema` in the metadata document.
    pub table_schema: String,
}

impl SchemaScope {
    pub fn new(owner: impl Into<String>, table_schema: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            table_schema: table_schema.into(),
        }
    }
}

/// Read the normalized metadata model from a dialect's catalog.
#[async_trait]
pub trait CatalogReader: Send {
    /// Resolve the namespace for a call, preferring `schema_override`.
    fn scope(&self, schema_override: Option<&str>) -> SchemaScope;

    /// Names of all tables visible in the scope, in catalog order.
    async fn table_names(&mut self, scope: &SchemaScope) -> Result<Vec<String>>;

    /// Column details in ordinal order.
    async fn fetch_columns(&mut self, scope: &SchemaScope, table: &str)
        -> Result<Vec<ColumnMetadata>>;

    /// Primary/unique/check constraints followed by foreign keys.
    async fn fetch_constraints(
        &mut self,
        _scope: &SchemaScope,
        _table: &str,
    ) -> Result<Vec<ConstraintEntry>> {
        Ok(Vec::new())
    }

    /// Columns of uniqueness-enforcing indexes.
    async fn fetch_indexes(&mut self, _scope: &SchemaScope, _table: &str) -> Result<Vec<IndexEntry>> {
        Ok(Vec::new())
    }

    /// Range partitions; empty for unpartitioned tables and dialects without
    /// partition support.
    async fn fetch_partitions(
        &mut self,
        _scope: &SchemaScope,
        _table: &str,
    ) -> Result<Vec<PartitionEntry>> {
        Ok(Vec::new())
    }

    /// Assemble the full document for one table.
    ///
    /// This is a template method: columns, constraints, indexes and
    /// partitions are fetched one after the other on the same session.
    async fn describe_table(&mut self, scope: &SchemaScope, table: &str) -> Result<TableMetadata> {
        let mut metadata = TableMetadata::new(scope.table_schema.clone(), table);
        metadata.column_detail = self.fetch_columns(scope, table).await?;
        metadata.constraint_details = self.fetch_constraints(scope, table).await?;
        metadata.index_details = self.fetch_indexes(scope, table).await?;
        metadata.partition_json = finish_partitions(self.fetch_partitions(scope, table).await?);
        Ok(metadata)
    }

    /// Discover every table in the scope and describe each, sequentially.
    async fn list_tables(&mut self, schema_override: Option<&str>) -> Result<Vec<TableMetadata>> {
        let scope = self.scope(schema_override);
        let names = self.table_names(&scope).await?;
        let mut tables = Vec::with_capacity(names.len());
        for name in &names {
            tables.push(self.describe_table(&scope, name).await?);
        }
        info!("Described {} tables in {}", tables.len(), scope.table_schema);
        Ok(tables)
    }

    /// All tables of the configured scope, or just `table_name`.
    async fn metadata_details(&mut self, table_name: Option<&str>) -> Result<Vec<TableMetadata>> {
        match table_name {
            None => self.list_tables(None).await,
            Some(table) => {
                let scope = self.scope(None);
                Ok(vec![self.describe_table(&scope, table).await?])
            }
        }
    }
}

/// Lightweight validation primitives scoped to one table.
#[async_trait]
pub trait Validator: Send {
    /// True when the table does **not** exist (zero matching catalog rows).
    async fn find_table(&mut self, table: &str) -> Result<bool>;

    /// Row count, optionally filtered by a trusted `WHERE ...` fragment.
    async fn table_count(&mut self, table: &str, where_clause: Option<&str>) -> Result<i64>;

    /// Stringified bounds of a column; `None` when the query yields no row.
    async fn find_min_max(&mut self, table: &str, column: &str) -> Result<Option<MinMax>>;

    /// Storage used by the table in the dialect's natural unit.
    async fn table_space(&mut self, table: &str) -> Result<TableSpace>;

    /// Run a caller-supplied query projecting one hash per row and return
    /// the first column of every row, in order.
    async fn calculate_checksum(&mut self, sql: &str) -> Result<Vec<String>>;
}

/// Create/drop statement execution.
#[async_trait]
pub trait DdlExecutor: Send {
    /// Run one statement or an ordered list.
    ///
    /// - single statement, `is_ddl`: run and commit
    /// - single statement, not `is_ddl`: run as a query and return the first
    ///   column of its first row
    /// - list: run each statement and commit, continuing past failures; the
    ///   outcome carries one report per statement
    async fn create_table(&mut self, request: DdlRequest, is_ddl: bool) -> Result<DdlOutcome>;

    /// Run a drop/delete statement and commit.
    async fn delete_table(&mut self, sql: &str) -> Result<()>;
}

/// A connected dialect implementation.
#[async_trait]
pub trait Database: CatalogReader + Validator + DdlExecutor {
    fn kind(&self) -> DbKind;

    fn state(&self) -> ConnectionState;

    /// Run the dialect's trivial probe query.
    async fn ping(&mut self) -> Result<()>;

    /// Close the session. The connection is unusable afterwards.
    async fn close(&mut self) -> Result<()>;
}
