//! Oracle SQL dialect.

use crate::core::identifier::{Folding, QuoteStyle};
use crate::core::traits::Dialect;

/// Oracle SQL dialect.
#[derive(Debug, Clone, Default)]
pub struct OracleDialect;

impl OracleDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for OracleDialect {
    fn name(&self) -> &str {
        "oracle"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!(":{}", index)
    }

    fn folding(&self) -> Folding {
        Folding::Upper
    }

    fn identifier_symbols(&self) -> &'static [char] {
        &['$', '#']
    }

    fn count_hint(&self) -> &str {
        "/*+ parallel(16)*/ "
    }

    fn ping_sql(&self) -> &str {
        "SELECT 1 FROM dual"
    }
}
