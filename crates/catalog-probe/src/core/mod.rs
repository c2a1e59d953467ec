//! Core abstractions for cross-dialect introspection.
//!
//! This module provides the foundational types and traits used throughout
//! the library:
//!
//! - [`metadata`]: the normalized metadata document (tables, columns, constraints, ...)
//! - [`value`]: dialect-neutral cell values and rows
//! - [`traits`]: session, dialect, catalog reader, validator and DDL traits
//! - [`connection`]: the connection state machine
//! - [`ops`]: validation and DDL routines shared by every dialect
//! - [`normalize`]: NULL sentinel, precision CASE mapping, partition finishing
//! - [`identifier`]: identifier validation and quoting
//!
//! # Architecture
//!
//! The core module is database-agnostic; driver modules (`drivers/oracle`,
//! `drivers/mssql`, ...) implement the traits against each engine's catalog.
//! Drivers are generic over [`Session`], so every catalog query can be
//! exercised against a scripted session in tests.

pub mod connection;
pub mod identifier;
pub mod kind;
pub mod metadata;
pub mod normalize;
pub mod ops;
pub mod traits;
pub mod value;

pub use connection::{Connection, ConnectionState};
pub use kind::DbKind;
pub use metadata::{
    ColumnMetadata, ConstraintEntry, DdlOutcome, DdlRequest, IndexEntry, MinMax, PartitionEntry,
    StatementReport, TableMetadata, TableSpace,
};
pub use traits::{
    CatalogReader, Database, DdlExecutor, Dialect, SchemaScope, Session, Validator,
};
pub use value::{CatalogValue, Row};
