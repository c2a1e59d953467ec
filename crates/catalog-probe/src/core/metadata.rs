//! Normalized metadata document produced by every dialect.
//!
//! Field names on the wire are part of the contract consumed by downstream
//! comparison tooling, hence the mixed-case serde renames. Catalog attributes
//! that may be NULL are held as [`CatalogValue`] so they serialize as the
//! `"null"` sentinel rather than disappearing.
//!
//! Row mappers (`from_*_row`) fix the projection order each dialect's catalog
//! SQL must follow; keeping the order here means the per-dialect code only
//! differs in the SQL text.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::value::{CatalogValue, Row};
use crate::error::Result;

/// Metadata for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMetadata {
    pub table_schema: String,
    pub table_name: String,
    pub column_detail: Vec<ColumnMetadata>,
    pub constraint_details: Vec<ConstraintEntry>,
    pub index_details: Vec<IndexEntry>,
    pub partition_json: Vec<PartitionEntry>,
}

impl TableMetadata {
    /// Empty document for a table, filled in by the catalog reader.
    pub fn new(table_schema: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            table_schema: table_schema.into(),
            table_name: table_name.into(),
            column_detail: Vec::new(),
            constraint_details: Vec::new(),
            index_details: Vec::new(),
            partition_json: Vec::new(),
        }
    }

    /// SHA-256 over the structural parts of the document.
    ///
    /// Partitions are left out since their `selected`/`dropped` flags are
    /// owned by the caller. Two scans of an unchanged table hash equal.
    pub fn fingerprint(&self) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(self.table_schema.as_bytes());
        hasher.update(b".");
        hasher.update(self.table_name.as_bytes());
        hasher.update(serde_json::to_vec(&self.column_detail)?);
        hasher.update(serde_json::to_vec(&self.constraint_details)?);
        hasher.update(serde_json::to_vec(&self.index_details)?);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Column entry by name (exact match).
    pub fn column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.column_detail.iter().find(|c| c.column_name == name)
    }
}

/// One column as reported by the dialect's catalog.
///
/// Projection order: name, type, nullable, default, length, precision, scale,
/// and optionally the column key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMetadata {
    pub column_name: String,
    #[serde(rename = "DATA_TYPE")]
    pub data_type: String,
    pub is_nullable: CatalogValue,
    #[serde(rename = "COLUMN_DEFAULT")]
    pub column_default: CatalogValue,
    #[serde(rename = "DATA_LENGTH")]
    pub data_length: CatalogValue,
    #[serde(rename = "DATA_PRECISION")]
    pub data_precision: CatalogValue,
    #[serde(rename = "DATA_SCALE")]
    pub data_scale: CatalogValue,
    #[serde(rename = "COLUMN_KEY", skip_serializing_if = "Option::is_none")]
    pub column_key: Option<CatalogValue>,
}

impl ColumnMetadata {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            column_name: row.text(0)?,
            data_type: row.text(1)?,
            is_nullable: row.value(2)?,
            column_default: row.value(3)?,
            data_length: row.value(4)?,
            data_precision: row.value(5)?,
            data_scale: row.value(6)?,
            column_key: None,
        })
    }

    /// Same as [`from_row`](Self::from_row) plus a column-key value at index 7.
    pub fn from_row_with_key(row: &Row) -> Result<Self> {
        let mut column = Self::from_row(row)?;
        column.column_key = Some(row.value(7)?);
        Ok(column)
    }

    /// Whether the catalog flags the column nullable (`Y`, `YES`, `TRUE`).
    pub fn nullable(&self) -> bool {
        matches!(
            self.is_nullable.to_string().to_ascii_uppercase().as_str(),
            "Y" | "YES" | "TRUE" | "1"
        )
    }
}

/// One column of a primary key, unique, check or foreign key constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintEntry {
    pub constraint_name: String,
    pub constraint_type: String,
    pub table_name: String,
    pub column_name: String,
    pub position: CatalogValue,
    pub owner: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CatalogValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_condition: Option<CatalogValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_table_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_column_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r_owner: Option<String>,
}

impl ConstraintEntry {
    /// Primary/unique/check row.
    ///
    /// Projection order: table, column, position, status, owner,
    /// constraint name, constraint type, search condition.
    pub fn key_from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            table_name: row.text(0)?,
            column_name: row.text(1)?,
            position: row.value(2)?,
            status: Some(row.value(3)?),
            owner: row.text(4)?,
            constraint_name: row.text(5)?,
            constraint_type: row.text(6)?,
            search_condition: Some(row.value(7)?),
            r_table_name: None,
            r_column_name: None,
            r_owner: None,
        })
    }

    /// Foreign key row.
    ///
    /// Projection order: constraint name, table, column, owner, referenced
    /// table, referenced column, referenced owner, constraint type, position.
    pub fn foreign_key_from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            constraint_name: row.text(0)?,
            table_name: row.text(1)?,
            column_name: row.text(2)?,
            owner: row.text(3)?,
            r_table_name: Some(row.text(4)?),
            r_column_name: Some(row.text(5)?),
            r_owner: Some(row.text(6)?),
            constraint_type: row.text(7)?,
            position: row.value(8)?,
            status: None,
            search_condition: None,
        })
    }

    pub fn is_foreign_key(&self) -> bool {
        self.r_table_name.is_some()
    }
}

/// One column of a uniqueness-enforcing index.
///
/// Projection order: owner, table, column, index name, index type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexEntry {
    pub table_owner: String,
    pub table_name: String,
    pub column_name: String,
    pub index_name: String,
    pub index_type: String,
}

impl IndexEntry {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            table_owner: row.text(0)?,
            table_name: row.text(1)?,
            column_name: row.text(2)?,
            index_name: row.text(3)?,
            index_type: row.text(4)?,
        })
    }
}

/// One range partition.
///
/// `min_value` is the previous partition's boundary (or the explicit low
/// value where the catalog stores one); `max_value` equals `high_value`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionEntry {
    pub table_owner: String,
    pub table_name: String,
    pub partition_name: String,
    pub partition_position: i64,
    pub column_name: String,
    pub partition_type: String,
    pub tablespace_name: CatalogValue,
    pub partition_count: CatalogValue,
    pub high_value: String,
    pub min_value: String,
    pub max_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partition_function: Option<String>,
    /// Set by the caller's workflow; always false on return.
    pub selected: bool,
    /// Set by the caller's workflow; always false on return.
    pub dropped: bool,
}

impl PartitionEntry {
    /// Projection order: owner, table, partition name, position, column,
    /// type, tablespace, partition count, high value, min value, max value.
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            table_owner: row.text(0)?,
            table_name: row.text(1)?,
            partition_name: row.text(2)?,
            partition_position: row.integer(3)?,
            column_name: row.text(4)?,
            partition_type: row.text(5)?,
            tablespace_name: row.value(6)?,
            partition_count: row.value(7)?,
            high_value: row.text(8)?,
            min_value: row.text(9)?,
            max_value: row.text(10)?,
            partition_scheme: None,
            partition_function: None,
            selected: false,
            dropped: false,
        })
    }
}

/// Stringified bounds of one column. Both values are always strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinMax {
    pub min_value: String,
    pub max_value: String,
}

impl MinMax {
    pub fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            min_value: row.text(0)?,
            max_value: row.text(1)?,
        })
    }

    /// Both bounds NULL: the column has rows but no values.
    pub fn is_null(&self) -> bool {
        self.min_value == super::value::NULL_SENTINEL && self.max_value == super::value::NULL_SENTINEL
    }
}

/// Storage used by a table, in the dialect's natural unit.
///
/// Units differ across dialects and are deliberately not converted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableSpace {
    /// Kilobyte sum (Oracle segments, MySQL data+index, DB2 admin info).
    Kilobytes(f64),
    /// Allocation pages (SQL Server / Azure SQL `total_pages`).
    Pages(i64),
    /// Human readable size (PostgreSQL `pg_size_pretty`).
    Pretty(String),
}

impl TableSpace {
    pub fn unit(&self) -> &'static str {
        match self {
            TableSpace::Kilobytes(_) => "kB",
            TableSpace::Pages(_) => "pages",
            TableSpace::Pretty(_) => "pretty",
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            TableSpace::Kilobytes(v) => *v == 0.0,
            TableSpace::Pages(v) => *v == 0,
            TableSpace::Pretty(s) => s.trim_start().starts_with('0'),
        }
    }
}

impl std::fmt::Display for TableSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableSpace::Kilobytes(v) => write!(f, "{} kB", CatalogValue::Float(*v)),
            TableSpace::Pages(v) => write!(f, "{} pages", v),
            TableSpace::Pretty(s) => f.write_str(s),
        }
    }
}

/// Statement(s) handed to the DDL executor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum DdlRequest {
    Single(String),
    Many(Vec<String>),
}

impl From<&str> for DdlRequest {
    fn from(sql: &str) -> Self {
        DdlRequest::Single(sql.to_string())
    }
}

impl From<String> for DdlRequest {
    fn from(sql: String) -> Self {
        DdlRequest::Single(sql)
    }
}

impl From<Vec<String>> for DdlRequest {
    fn from(sqls: Vec<String>) -> Self {
        DdlRequest::Many(sqls)
    }
}

impl From<Vec<&str>> for DdlRequest {
    fn from(sqls: Vec<&str>) -> Self {
        DdlRequest::Many(sqls.into_iter().map(str::to_string).collect())
    }
}

/// Result of one statement inside a statement list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementReport {
    pub statement: String,
    pub error: Option<String>,
}

impl StatementReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// What the DDL executor did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum DdlOutcome {
    /// Single statement run and committed.
    Committed,
    /// Single statement run as a query; first column of its first row.
    Scalar(CatalogValue),
    /// Statement list, one report per statement in order.
    Batch(Vec<StatementReport>),
}

impl DdlOutcome {
    /// Failed statements of a batch; empty for single statements.
    pub fn failures(&self) -> Vec<&StatementReport> {
        match self {
            DdlOutcome::Batch(reports) => reports.iter().filter(|r| !r.succeeded()).collect(),
            _ => Vec::new(),
        }
    }
}
