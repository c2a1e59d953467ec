//! SQL Server dialect (Strategy pattern).
//!
//! Azure SQL speaks the same T-SQL, so one dialect type serves both engines
//! and only reports a different name.

use crate::core::identifier::QuoteStyle;
use crate::core::kind::DbKind;
use crate::core::traits::Dialect;

/// Microsoft SQL Server / Azure SQL dialect.
#[derive(Debug, Clone)]
pub struct MssqlDialect {
    kind: DbKind,
}

impl MssqlDialect {
    /// On-premises SQL Server.
    pub fn new() -> Self {
        Self { kind: DbKind::Mssql }
    }

    /// Azure SQL Database.
    pub fn azure() -> Self {
        Self { kind: DbKind::Azure }
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }
}

impl Default for MssqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl Dialect for MssqlDialect {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Bracket
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("@P{}", index)
    }

    fn identifier_symbols(&self) -> &'static [char] {
        &['$', '#']
    }
}
