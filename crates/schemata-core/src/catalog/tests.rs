//! Tests for catalog decoding and the information-schema lookups

use super::ansi::*;
use super::*;
use crate::testing::MockRowSource;
use crate::{Column, Row, SchemataError, Value, collect_tables};
use std::collections::HashMap;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn row(columns: &[&str], values: Vec<Value>) -> Row {
    let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect();
    Row::new(columns, values)
}

const PK_COLUMNS: &[&str] = &["table_schema", "table_name", "ordinal_position", "column_name"];
const FK_COLUMNS: &[&str] = &[
    "constraint_name",
    "ordinal_position",
    "foreign_schema",
    "foreign_table",
    "foreign_column",
    "primary_schema",
    "primary_table",
    "primary_column",
];

fn fk_values(name: &str, ordinal: i32, foreign: &str, primary: &str) -> Vec<Value> {
    vec![
        name.into(),
        Value::Int32(ordinal),
        "dbo".into(),
        "OrderLines".into(),
        foreign.into(),
        "dbo".into(),
        "Orders".into(),
        primary.into(),
    ]
}

#[test]
fn test_decode_accepts_requested_kinds() {
    let r = row(
        &["s", "n", "i", "b", "none"],
        vec!["x".into(), Value::Int16(7), Value::Int32(-1), Value::Bool(true), Value::Null],
    );
    let row = CatalogRow::new("q", &r);

    assert_eq!(row.string("s").unwrap(), "x");
    assert_eq!(row.int("n").unwrap(), 7);
    assert_eq!(row.opt_int("i").unwrap(), Some(-1));
    assert!(row.flag("b").unwrap());
    assert_eq!(row.opt_string("none").unwrap(), None);
    assert_eq!(row.opt_int("none").unwrap(), None);
}

#[test]
fn test_decode_rejects_unexpected_kind() {
    let r = row(&["n"], vec![Value::String("42".into())]);
    let err = CatalogRow::new("columns", &r).int("n").unwrap_err();
    match err {
        SchemataError::TypeMismatch { query, column, expected, found } => {
            assert_eq!((query, column, expected, found), ("columns", "n", "integer", "string"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let r = row(&["flag"], vec![Value::Int32(1)]);
    assert!(CatalogRow::new("columns", &r).flag("flag").unwrap_err().is_catalog_error());

    let r = row(&["s"], vec![Value::Null]);
    assert!(CatalogRow::new("columns", &r).string("s").is_err());
}

#[test]
fn test_decode_missing_column() {
    let r = row(&["a"], vec![Value::Int64(1)]);
    let err = CatalogRow::new("tables", &r).string("b").unwrap_err();
    assert!(matches!(err, SchemataError::MissingColumn { query: "tables", column: "b" }));
}

#[test]
fn test_ordinal_is_zero_based() {
    let r = row(&["ordinal_position", "bad"], vec![Value::Int32(3), Value::Int32(0)]);
    let row = CatalogRow::new("q", &r);
    assert_eq!(row.ordinal("ordinal_position").unwrap(), 2);
    assert!(row.ordinal("bad").is_err());
}

#[test]
fn test_primary_key_lookup_groups_by_table() {
    let rows = vec![
        row(PK_COLUMNS, vec!["public".into(), "users".into(), Value::Int32(1), "id".into()]),
        row(PK_COLUMNS, vec!["public".into(), "memberships".into(), Value::Int32(2), "group_id".into()]),
        row(PK_COLUMNS, vec!["public".into(), "memberships".into(), Value::Int32(1), "user_id".into()]),
    ];
    let lookup = primary_key_lookup(&rows).unwrap();

    assert_eq!(lookup.len(), 2);
    let memberships = &lookup[&TableKey::new("public", "memberships")];
    assert_eq!(memberships["user_id"], 0);
    assert_eq!(memberships["group_id"], 1);
    assert_eq!(lookup[&TableKey::new("public", "users")]["id"], 0);
}

#[test]
fn test_foreign_key_lookup_keys_by_referencing_table() {
    let rows = vec![
        row(FK_COLUMNS, fk_values("FK_Lines_Orders", 1, "OrderId", "Id")),
        row(FK_COLUMNS, fk_values("FK_Lines_Orders", 2, "TenantId", "TenantId")),
    ];
    let lookup = foreign_key_lookup(&rows).unwrap();
    let lines = &lookup[&TableKey::new("dbo", "OrderLines")];

    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        ForeignKeyRow {
            constraint_name: "FK_Lines_Orders".to_string(),
            ordinal: 1,
            foreign_column: "TenantId".to_string(),
            primary_schema: "dbo".to_string(),
            primary_table: "Orders".to_string(),
            primary_column: "TenantId".to_string(),
        }
    );
}

#[test]
fn test_same_constraint_name_on_two_tables() {
    let mut invoices = fk_values("fk_parent", 1, "OrderId", "Id");
    invoices[3] = "Invoices".into();
    let rows = vec![
        row(FK_COLUMNS, fk_values("fk_parent", 1, "OrderId", "Id")),
        row(FK_COLUMNS, invoices),
    ];
    let lookup = foreign_key_lookup(&rows).unwrap();

    assert_eq!(lookup.len(), 2);
    assert_eq!(lookup[&TableKey::new("dbo", "OrderLines")].len(), 1);
    assert_eq!(lookup[&TableKey::new("dbo", "Invoices")].len(), 1);
    assert!(FOREIGN_KEYS_SQL.contains("fk.TABLE_NAME = tc.TABLE_NAME"));
    assert!(FOREIGN_KEYS_SQL.contains("fk.TABLE_SCHEMA = tc.TABLE_SCHEMA"));
}

#[tokio::test]
async fn test_load_lookups_through_row_source() {
    let source = MockRowSource::new()
        .on(
            "'PRIMARY KEY'",
            PK_COLUMNS,
            vec![vec!["dbo".into(), "Orders".into(), Value::Int32(1), "Id".into()]],
        )
        .on(
            "'FOREIGN KEY'",
            FK_COLUMNS,
            vec![fk_values("FK_Lines_Orders", 1, "OrderId", "Id")],
        );

    let pks = load_primary_keys(&source).await.unwrap();
    let fks = load_foreign_keys(&source).await.unwrap();

    assert_eq!(pks[&TableKey::new("dbo", "Orders")]["Id"], 0);
    assert_eq!(fks[&TableKey::new("dbo", "OrderLines")][0].primary_column, "Id");
    assert_eq!(source.calls().len(), 2);
}

#[tokio::test]
async fn test_load_primary_keys_propagates_type_mismatch() {
    let source = MockRowSource::new().on(
        "'PRIMARY KEY'",
        PK_COLUMNS,
        vec![vec!["dbo".into(), "Orders".into(), Value::Decimal("1".into()), "Id".into()]],
    );
    let err = load_primary_keys(&source).await.unwrap_err();
    assert!(matches!(err, SchemataError::TypeMismatch { found: "decimal", .. }));
}

#[tokio::test]
async fn test_snapshot_builds_tables_in_listing_order() {
    let users = TableKey::new("public", "users");
    let empty = TableKey::new("public", "empty");
    let snapshot = AnsiSnapshot {
        tables: vec![users.clone(), empty.clone()],
        columns: HashMap::from([(
            users.clone(),
            vec![Column::new("id", "INT4"), Column::new("email", "TEXT")],
        )]),
        primary_keys: HashMap::from([(users.clone(), HashMap::from([("id".to_string(), 0)]))]),
        foreign_keys: HashMap::new(),
    };

    let mut decorated = Vec::new();
    let stream = snapshot.into_tables(|key, columns| {
        decorated.push(key.name.clone());
        columns.push(Column {
            nullable: false,
            is_computed: true,
            is_concurrency_token: true,
            ..Column::new("xmin", "XID")
        });
    });
    let err = collect_tables(stream).await.unwrap_err();

    assert!(err.to_string().contains("public.empty: table has no columns"));
    assert_eq!(decorated, vec!["users".to_string()]);
}
