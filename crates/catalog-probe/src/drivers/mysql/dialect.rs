//! MySQL/MariaDB dialect.

use crate::core::identifier::QuoteStyle;
use crate::core::traits::Dialect;

/// MySQL dialect. Table names keep their case, as on case-sensitive
/// file systems.
#[derive(Debug, Clone, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }
}

impl Dialect for MysqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_style(&self) -> QuoteStyle {
        QuoteStyle::Backtick
    }

    fn param_placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_positional() {
        let d = MysqlDialect::new();
        assert_eq!(d.param_placeholder(1), "?");
        assert_eq!(d.param_placeholder(2), "?");
    }

    #[test]
    fn test_backtick_quoting() {
        let d = MysqlDialect::new();
        assert_eq!(
            d.min_max_sql("order items", "unit-price").unwrap(),
            "SELECT min(`unit-price`) AS min_value, max(`unit-price`) AS max_value FROM `order items`"
        );
        assert_eq!(d.catalog_name("`Orders`").unwrap(), "Orders");
        assert_eq!(d.catalog_name("Orders").unwrap(), "Orders");
    }

    #[test]
    fn test_hash_is_quoted_not_a_comment() {
        let d = MysqlDialect::new();
        assert_eq!(
            d.count_sql("orders#old", None).unwrap(),
            "select count(1) from `orders#old`"
        );
        assert_eq!(
            d.min_max_sql("t", "a#b").unwrap(),
            "SELECT min(`a#b`) AS min_value, max(`a#b`) AS max_value FROM t"
        );
    }
}
