//! Contract tests driving the public API through scripted sessions.

use catalog_probe::drivers::{MssqlCatalog, PostgresCatalog};
use catalog_probe::testing::{int_row, text_row, FakeSession};
use catalog_probe::{
    CatalogReader, CatalogValue, Connection, ConnectionConfig, Database, DbKind, DdlExecutor,
    DdlOutcome, Row, TableSpace, Validator,
};

fn config(db_type: &str) -> ConnectionConfig {
    ConnectionConfig::from_json(&format!(
        r#"{{"db_type": "{}", "host_address": "db.local", "database_name": "shop",
            "username": "probe", "password": "secret"}}"#,
        db_type
    ))
    .unwrap()
}

fn mssql(session: FakeSession) -> MssqlCatalog<FakeSession> {
    MssqlCatalog::new(
        Connection::established(DbKind::Mssql, session),
        &config("mssql"),
    )
}

fn postgres(session: FakeSession) -> PostgresCatalog<FakeSession> {
    PostgresCatalog::new(
        Connection::established(DbKind::Postgres, session),
        &config("postgres"),
    )
}

fn orders_columns() -> Vec<Row> {
    vec![
        Row::new(vec![
            "id".into(),
            "int".into(),
            "NO".into(),
            CatalogValue::Null,
            CatalogValue::Null,
            CatalogValue::Int(10),
            CatalogValue::Int(0),
        ]),
        Row::new(vec![
            "total".into(),
            "decimal".into(),
            "YES".into(),
            "0".into(),
            CatalogValue::Int(10),
            CatalogValue::Int(10),
            CatalogValue::Int(2),
        ]),
    ]
}

// =============================================================================
// Metadata document
// =============================================================================

#[tokio::test]
async fn test_orders_column_detail() {
    let session = FakeSession::new()
        .with_rows("INFORMATION_SCHEMA.TABLES", vec![text_row(&[Some("orders")])])
        .with_rows("INFORMATION_SCHEMA.COLUMNS", orders_columns());
    let mut db = mssql(session);

    let tables = db.metadata_details(None).await.unwrap();
    assert_eq!(tables.len(), 1);
    let orders = &tables[0];
    assert_eq!(orders.table_schema, "dbo");
    assert_eq!(orders.table_name, "orders");
    assert_eq!(orders.column_detail.len(), 2);

    let total = orders.column("total").unwrap();
    assert_eq!(total.data_precision, CatalogValue::Int(10));
    assert_eq!(total.data_scale, CatalogValue::Int(2));
    assert_eq!(total.column_default.to_string(), "0");

    let json = serde_json::to_value(orders).unwrap();
    assert_eq!(json["column_detail"][0]["COLUMN_DEFAULT"], "null");
    assert_eq!(json["column_detail"][1]["DATA_PRECISION"], 10);
    assert!(json["constraint_details"].as_array().unwrap().is_empty());
    assert!(json["partition_json"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_column_fetch_is_idempotent() {
    let session = FakeSession::new().with_rows("INFORMATION_SCHEMA.COLUMNS", orders_columns());
    let mut db = mssql(session);
    let scope = db.scope(None);

    let first = db.fetch_columns(&scope, "orders").await.unwrap();
    let second = db.fetch_columns(&scope, "orders").await.unwrap();
    assert_eq!(
        serde_json::to_vec(&first).unwrap(),
        serde_json::to_vec(&second).unwrap()
    );
}

#[tokio::test]
async fn test_foreign_keys_pair_on_ordinal_position() {
    let key = Row::new(vec![
        "order_lines".into(),
        "order_id".into(),
        CatalogValue::Int(1),
        CatalogValue::Null,
        "public".into(),
        "order_lines_pkey".into(),
        "PRIMARY KEY".into(),
        CatalogValue::Null,
    ]);
    let fk = |pos: i64, col: &str, r_col: &str| {
        Row::new(vec![
            "order_lines_order_fk".into(),
            "order_lines".into(),
            col.into(),
            "public".into(),
            "orders".into(),
            r_col.into(),
            "public".into(),
            "FOREIGN KEY".into(),
            CatalogValue::Int(pos),
        ])
    };
    let session = FakeSession::new()
        .with_rows("con.contype IN ('p', 'u', 'c')", vec![key])
        .with_rows(
            "con.contype = 'f'",
            vec![fk(1, "order_id", "id"), fk(2, "region", "region")],
        );
    let mut db = postgres(session);
    let scope = db.scope(None);

    let constraints = db.fetch_constraints(&scope, "order_lines").await.unwrap();
    assert_eq!(constraints.len(), 3);
    assert!(!constraints[0].is_foreign_key());
    assert!(constraints[1..].iter().all(|c| c.is_foreign_key()));
    assert_eq!(constraints[1].position, CatalogValue::Int(1));
    assert_eq!(constraints[1].r_column_name.as_deref(), Some("id"));
    assert_eq!(constraints[2].r_column_name.as_deref(), Some("region"));
}

#[tokio::test]
async fn test_partitions_ascend_by_position() {
    let partition = |n: i64, high: &str| {
        Row::new(vec![
            "dbo".into(),
            "sales".into(),
            format!("ps_{}", n).into(),
            CatalogValue::Int(n),
            "sold_on".into(),
            "RANGE".into(),
            "PRIMARY".into(),
            CatalogValue::Int(3),
            high.into(),
            CatalogValue::Null,
            high.into(),
            "ps".into(),
            "pf".into(),
        ])
    };
    let session = FakeSession::new().with_rows(
        "sys.partition_schemes",
        vec![
            partition(3, "Mar  1 2024 12:00AM"),
            partition(1, "Jan  1 2024 12:00AM"),
            partition(2, "Feb  1 2024 12:00AM"),
        ],
    );
    let mut db = mssql(session);
    let scope = db.scope(None);

    let table = db.describe_table(&scope, "sales").await.unwrap();
    let positions: Vec<i64> = table
        .partition_json
        .iter()
        .map(|p| p.partition_position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3]);
    assert!(table.partition_json.iter().all(|p| !p.selected && !p.dropped));
}

// =============================================================================
// Validation primitives
// =============================================================================

#[tokio::test]
async fn test_find_table_is_true_when_missing() {
    let mut missing = postgres(FakeSession::new().with_rows("count(1)", vec![int_row(0)]));
    assert!(missing.find_table("ghost").await.unwrap());

    let mut present = postgres(FakeSession::new().with_rows("count(1)", vec![int_row(1)]));
    assert!(!present.find_table("orders").await.unwrap());
}

#[tokio::test]
async fn test_find_table_matches_count_for_qualified_names() {
    for table in ["sales.orders", "\"sales\".orders"] {
        let mut db = postgres(FakeSession::new().with_rows("count(1)", vec![int_row(3)]));
        assert_eq!(db.table_count(table, None).await.unwrap(), 3);
        assert!(!db.find_table(table).await.unwrap());
    }

    let session = FakeSession::new().with_rows("count(1)", vec![int_row(2)]);
    let journal = session.journal();
    let mut db = mssql(session);
    assert!(!db.find_table("dbo.orders").await.unwrap());
    assert_eq!(journal.queries()[0].1, vec!["SHOP", "dbo", "orders"]);
}

#[tokio::test]
async fn test_min_max_empty_table_vs_null_column() {
    let mut empty = postgres(FakeSession::new());
    assert_eq!(empty.find_min_max("orders", "total").await.unwrap(), None);

    let mut nulls = postgres(
        FakeSession::new().with_rows("min(total)", vec![text_row(&[None, None])]),
    );
    let bounds = nulls.find_min_max("orders", "total").await.unwrap().unwrap();
    assert_eq!(bounds.min_value, "null");
    assert_eq!(bounds.max_value, "null");
    assert_eq!(
        serde_json::to_string(&bounds).unwrap(),
        r#"{"min_value":"null","max_value":"null"}"#
    );
}

#[tokio::test]
async fn test_empty_table_space_is_zero() {
    let mut db = mssql(
        FakeSession::new().with_rows("total_pages", vec![Row::new(vec![CatalogValue::Null])]),
    );
    let space = db.table_space("empty_table").await.unwrap();
    assert_eq!(space, TableSpace::Pages(0));
    assert!(space.is_zero());
}

#[tokio::test]
async fn test_count_with_where_fragment() {
    let session = FakeSession::new().with_rows("count(1)", vec![int_row(7)]);
    let journal = session.journal();
    let mut db = postgres(session);

    let count = db
        .table_count("orders", Some("where total > 100"))
        .await
        .unwrap();
    assert_eq!(count, 7);
    assert_eq!(
        journal.queries()[0].0,
        "select count(1) from orders\n where total > 100"
    );
}

// =============================================================================
// DDL executor
// =============================================================================

#[tokio::test]
async fn test_ddl_list_continues_past_invalid_statement() {
    let session = FakeSession::new().failing_on("INVALID SQL");
    let journal = session.journal();
    let mut db = mssql(session);

    let outcome = db
        .create_table(
            vec!["CREATE TABLE t(id int)", "INVALID SQL"].into(),
            true,
        )
        .await
        .unwrap();

    match &outcome {
        DdlOutcome::Batch(reports) => {
            assert_eq!(reports.len(), 2);
            assert!(reports[0].succeeded());
            assert!(!reports[1].succeeded());
        }
        other => panic!("expected a batch outcome, got {:?}", other),
    }
    assert_eq!(journal.executed(), vec!["CREATE TABLE t(id int)"]);
}

#[tokio::test]
async fn test_closed_connection_is_terminal() {
    let session = FakeSession::new();
    let journal = session.journal();
    let mut db = postgres(session);

    db.ping().await.unwrap();
    Database::close(&mut db).await.unwrap();
    assert!(journal.closed());

    let err = db.table_count("orders", None).await.unwrap_err();
    assert_eq!(err.exit_code(), 4);
    assert!(db.delete_table("DROP TABLE t").await.is_err());
}
