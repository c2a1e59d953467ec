//! IBM DB2 dialect.

use crate::core::identifier::{Folding, QuoteStyle};
use crate::core::traits::Dialect;

/// DB2 for LUW dialect.
#[derive(Debug, Clone, Default)]
pub struct Db2Dialect;

impl Db2Dialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for Db2Dialect {
    fn name(&self) -> &str {
        "db2"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    fn folding(&self) -> Folding {
        Folding::Upper
    }

    fn identifier_symbols(&self) -> &'static [char] {
        &['$', '#']
    }

    fn ping_sql(&self) -> &str {
        "SELECT 1 FROM SYSIBM.SYSDUMMY1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_and_folding() {
        let d = Db2Dialect::new();
        assert_eq!(d.ping_sql(), "SELECT 1 FROM SYSIBM.SYSDUMMY1");
        assert_eq!(d.catalog_name("employee").unwrap(), "EMPLOYEE");
        assert_eq!(d.catalog_name("\"Employee\"").unwrap(), "Employee");
    }

    #[test]
    fn test_hash_column_stays_unquoted() {
        assert_eq!(Db2Dialect::new().render_name("EMP#NO").unwrap(), "EMP#NO");
    }

    #[test]
    fn test_count_sql() {
        assert_eq!(
            Db2Dialect::new().count_sql("hr.employee", None).unwrap(),
            "select count(1) from hr.employee"
        );
    }
}
