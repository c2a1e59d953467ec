//! PostgreSQL dialect.

use crate::core::identifier::{Folding, QuoteStyle};
use crate::core::traits::Dialect;

/// PostgreSQL dialect. Unquoted identifiers fold to lower case.
#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &str {
        "postgres"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::DoubleQuote
    }

    fn param_placeholder(&self, index: usize) -> String {
        format!("${}", index)
    }

    fn folding(&self) -> Folding {
        Folding::Lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder() {
        assert_eq!(PostgresDialect::new().param_placeholder(2), "$2");
    }

    #[test]
    fn test_catalog_name_folds_lower() {
        let d = PostgresDialect::new();
        assert_eq!(d.catalog_name("Orders").unwrap(), "orders");
        assert_eq!(d.catalog_name("\"Orders\"").unwrap(), "Orders");
    }

    #[test]
    fn test_count_sql_has_no_hint() {
        assert_eq!(
            PostgresDialect::new().count_sql("public.orders", None).unwrap(),
            "select count(1) from public.orders"
        );
    }

    #[test]
    fn test_hash_and_dollar_are_quoted() {
        let d = PostgresDialect::new();
        assert_eq!(
            d.min_max_sql("t", "a#b").unwrap(),
            "SELECT min(\"a#b\") AS min_value, max(\"a#b\") AS max_value FROM t"
        );
        assert_eq!(d.render_name("cost$").unwrap(), "\"cost$\"");
    }
}
