//! Azure SQL Database driver.
//!
//! Azure SQL serves the same catalog views as SQL Server, so it runs the
//! SQL Server catalog reader over a session that always encrypts and follows
//! gateway redirects.

use crate::config::ConnectionConfig;
use crate::core::kind::DbKind;
use crate::drivers::mssql::{MssqlCatalog, MssqlSession};
use crate::error::Result;

/// Catalog reader for Azure SQL; a [`MssqlCatalog`] opened with
/// [`DbKind::Azure`].
pub type AzureCatalog<S = MssqlSession> = MssqlCatalog<S>;

/// Open an encrypted session to Azure SQL.
pub async fn connect(config: &ConnectionConfig) -> Result<AzureCatalog> {
    MssqlCatalog::connect_as(config, DbKind::Azure).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connection::Connection;
    use crate::core::metadata::TableSpace;
    use crate::core::traits::{CatalogReader, Database, Dialect, Validator};
    use crate::testing::{int_row, FakeSession};

    fn config() -> ConnectionConfig {
        ConnectionConfig {
            db_type: "azure".into(),
            host_address: "probe.database.windows.net".into(),
            port_number: None,
            database_name: "inventory".into(),
            username: "reader".into(),
            password: "pw".into(),
            schema_name: None,
            source_schema: Some("stock".into()),
            encrypt: false,
            trust_server_cert: false,
            ssl_mode: "disable".into(),
            odbc_driver: None,
        }
    }

    fn catalog(session: FakeSession) -> AzureCatalog<FakeSession> {
        MssqlCatalog::new(Connection::established(DbKind::Azure, session), &config())
    }

    #[test]
    fn test_reports_azure_kind() {
        let c = catalog(FakeSession::new());
        assert_eq!(c.kind(), DbKind::Azure);
        assert_eq!(c.dialect().name(), "azure");
        assert_eq!(c.scope(None).owner, "stock");
    }

    #[tokio::test]
    async fn test_table_space_uses_allocation_pages() {
        let session = FakeSession::new().with_rows("sys.allocation_units", vec![int_row(16)]);
        let journal = session.journal();
        let mut c = catalog(session);

        assert_eq!(c.table_space("items").await.unwrap(), TableSpace::Pages(16));
        let (sql, params) = &journal.queries()[0];
        assert!(sql.contains("total_pages"));
        assert_eq!(params, &vec!["stock".to_string(), "items".to_string()]);
    }

    #[tokio::test]
    async fn test_table_listing_binds_upper_catalog() {
        let session = FakeSession::new();
        let journal = session.journal();
        let mut c = catalog(session);

        assert!(c.list_tables(None).await.unwrap().is_empty());
        assert_eq!(journal.queries()[0].1, vec!["INVENTORY", "stock"]);
    }
}
