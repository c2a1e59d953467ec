//! Normalization shared by every dialect.
//!
//! The length/precision/scale mapping and partition post-processing live here
//! so each dialect states only its catalog SQL and never re-derives these
//! rules.

use chrono::NaiveDate;

use super::metadata::PartitionEntry;
use super::value::NULL_SENTINEL;

/// Which catalog column feeds `DATA_LENGTH` for a given type family.
///
/// Rendered into a SQL `CASE` expression, e.g. for `INFORMATION_SCHEMA`:
///
/// ```text
/// CASE
///     WHEN DATA_TYPE IN ('decimal', 'numeric') THEN NUMERIC_PRECISION
///     WHEN DATA_TYPE IN ('datetime2', 'time', 'datetimeoffset') THEN DATETIME_PRECISION
///     ELSE CHARACTER_MAXIMUM_LENGTH
/// END
/// ```
#[derive(Debug, Clone)]
pub struct PrecisionRules {
    pub type_column: &'static str,
    pub numeric_types: &'static [&'static str],
    pub numeric_precision_column: &'static str,
    pub temporal_types: &'static [&'static str],
    pub temporal_precision_column: &'static str,
    pub length_column: &'static str,
}

impl PrecisionRules {
    /// SQL Server and Azure SQL `INFORMATION_SCHEMA.COLUMNS`.
    pub const MSSQL: PrecisionRules = PrecisionRules {
        type_column: "c.DATA_TYPE",
        numeric_types: &["decimal", "numeric"],
        numeric_precision_column: "c.NUMERIC_PRECISION",
        temporal_types: &["datetime2", "time", "datetimeoffset"],
        temporal_precision_column: "c.DATETIME_PRECISION",
        length_column: "c.CHARACTER_MAXIMUM_LENGTH",
    };

    /// PostgreSQL `information_schema.columns`.
    pub const POSTGRES: PrecisionRules = PrecisionRules {
        type_column: "c.data_type",
        numeric_types: &["numeric", "decimal"],
        numeric_precision_column: "c.numeric_precision",
        temporal_types: &[
            "time without time zone",
            "time with time zone",
            "timestamp without time zone",
            "timestamp with time zone",
            "interval",
        ],
        temporal_precision_column: "c.datetime_precision",
        length_column: "c.character_maximum_length",
    };

    /// The `CASE` expression selecting the length column.
    pub fn length_case(&self) -> String {
        format!(
            "CASE WHEN {ty} IN ({numeric}) THEN {np} WHEN {ty} IN ({temporal}) THEN {tp} ELSE {len} END",
            ty = self.type_column,
            numeric = sql_list(self.numeric_types),
            np = self.numeric_precision_column,
            temporal = sql_list(self.temporal_types),
            tp = self.temporal_precision_column,
            len = self.length_column,
        )
    }
}

fn sql_list(items: &[&str]) -> String {
    items
        .iter()
        .map(|item| format!("'{}'", item.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map an absent or empty string to the NULL sentinel.
pub fn null_or(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NULL_SENTINEL.to_string(),
    }
}

/// Finalize a partition list: stable sort by position, keep the first row
/// per position, reset workflow flags.
///
/// Catalog SQL already orders by position; sorting again guarantees the
/// ordering even where a dialect's join can reorder or repeat rows.
pub fn finish_partitions(mut partitions: Vec<PartitionEntry>) -> Vec<PartitionEntry> {
    partitions.sort_by_key(|p| p.partition_position);
    partitions.dedup_by_key(|p| p.partition_position);
    for partition in &mut partitions {
        partition.selected = false;
        partition.dropped = false;
    }
    partitions
}

/// Reformat a SQL Server boundary rendered as `Jan 01 2024` (the default
/// `CAST(datetime AS VARCHAR)` style) to `2024-01-01`. Other values are
/// returned unchanged.
pub fn reformat_mssql_boundary(value: &str) -> String {
    let trimmed = value.trim();
    // CAST renders a trailing time component ("Jan  1 2024 12:00AM").
    let date_part: String = trimmed
        .split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ");
    match NaiveDate::parse_from_str(&date_part, "%b %d %Y") {
        Ok(date) if trimmed.split_whitespace().count() <= 4 => date.format("%Y-%m-%d").to_string(),
        _ => value.to_string(),
    }
}
