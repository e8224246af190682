//! Tests for PostgreSQL catalog extraction against canned catalog rows

use crate::{PostgresExtractor, PostgresNaming, XMIN_COLUMN};
use futures::StreamExt;
use pretty_assertions::assert_eq;
use schemata_core::testing::MockRowSource;
use schemata_core::{
    ExtractOptions, NamingStrategy, SchemaExtractor, SchemataError, Value, collect_tables,
};

const TABLE_COLUMNS: &[&str] = &["table_schema", "table_name"];
const COLUMN_COLUMNS: &[&str] = &[
    "table_schema",
    "table_name",
    "column_name",
    "udt_name",
    "character_maximum_length",
    "nullable",
    "column_default",
    "is_generated",
    "is_identity",
];
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

struct ColumnRow<'a> {
    table: &'a str,
    name: &'a str,
    udt: &'a str,
    length: Option<i32>,
    nullable: bool,
    default: Option<&'a str>,
    generated: bool,
    identity: bool,
}

impl<'a> ColumnRow<'a> {
    fn new(table: &'a str, name: &'a str, udt: &'a str) -> Self {
        Self {
            table,
            name,
            udt,
            length: None,
            nullable: true,
            default: None,
            generated: false,
            identity: false,
        }
    }

    fn values(self) -> Vec<Value> {
        vec![
            "public".into(),
            self.table.into(),
            self.name.into(),
            self.udt.into(),
            self.length.map_or(Value::Null, Value::Int32),
            Value::Bool(self.nullable),
            self.default.map_or(Value::Null, Value::from),
            Value::Bool(self.generated),
            Value::Bool(self.identity),
        ]
    }
}

fn table_row(name: &str) -> Vec<Value> {
    vec!["public".into(), name.into()]
}

/// `users` with a SERIAL key, a bounded varchar and a generated column;
/// `orders` referencing it.
fn shop_catalog() -> MockRowSource {
    MockRowSource::new()
        .on(
            "information_schema.columns",
            COLUMN_COLUMNS,
            vec![
                ColumnRow {
                    nullable: false,
                    default: Some("nextval('users_id_seq'::regclass)"),
                    identity: true,
                    ..ColumnRow::new("users", "id", "int4")
                }
                .values(),
                ColumnRow {
                    length: Some(255),
                    nullable: false,
                    ..ColumnRow::new("users", "email", "varchar")
                }
                .values(),
                ColumnRow {
                    generated: true,
                    ..ColumnRow::new("users", "email_domain", "text")
                }
                .values(),
                ColumnRow {
                    nullable: false,
                    default: Some("nextval('orders_id_seq'::regclass)"),
                    identity: true,
                    ..ColumnRow::new("orders", "id", "int8")
                }
                .values(),
                ColumnRow {
                    nullable: false,
                    ..ColumnRow::new("orders", "user_id", "int4")
                }
                .values(),
            ],
        )
        .on(
            "'PRIMARY KEY'",
            PK_COLUMNS,
            vec![
                vec!["public".into(), "users".into(), Value::Int32(1), "id".into()],
                vec!["public".into(), "orders".into(), Value::Int32(1), "id".into()],
            ],
        )
        .on(
            "'FOREIGN KEY'",
            FK_COLUMNS,
            vec![vec![
                "orders_user_id_fkey".into(),
                Value::Int32(1),
                "public".into(),
                "orders".into(),
                "user_id".into(),
                "public".into(),
                "users".into(),
                "id".into(),
            ]],
        )
        .on(
            "information_schema.tables",
            TABLE_COLUMNS,
            vec![table_row("orders"), table_row("users")],
        )
}

#[test]
fn test_naming_tokens() {
    assert_eq!(PostgresNaming.sql_token(0), "$1");
    assert_eq!(PostgresNaming.parameter_name(0), "$1");
    assert_eq!(PostgresNaming.sql_token(9), "$10");
}

#[tokio::test]
async fn test_serial_identity_discards_default() {
    let source = shop_catalog();
    let extractor = PostgresExtractor::new();
    let tables = collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap();

    assert_eq!(tables.len(), 2);
    let users = &tables[1];
    assert_eq!(users.name(), "users");

    let id = users.column("id").unwrap();
    assert!(id.is_identity);
    assert_eq!(id.default_value, None);
    assert_eq!(id.primary_key_idx, Some(0));
    assert_eq!(id.data_type, "INT4");
    assert!(!id.is_insertable());

    let email = users.column("email").unwrap();
    assert_eq!(email.data_type, "VARCHAR(255)");
    assert!(!email.nullable);

    let domain = users.column("email_domain").unwrap();
    assert!(domain.is_computed);
    assert!(!domain.is_identity);

    assert!(users.column(XMIN_COLUMN).is_none());
}

#[tokio::test]
async fn test_concurrency_column_added_to_every_table() {
    let source = shop_catalog();
    let extractor = PostgresExtractor::new().with_concurrency_column(true);
    let tables = collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap();

    for table in &tables {
        let xmin = table.column(XMIN_COLUMN).unwrap();
        assert_eq!(xmin.data_type, "XID");
        assert!(!xmin.nullable);
        assert!(xmin.is_computed);
        assert!(xmin.is_concurrency_token);
        assert_eq!(xmin.primary_key_idx, None);
    }

    let names: Vec<&str> = tables[1].columns().iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["email", "email_domain", "id", "xmin"]);
}

#[tokio::test]
async fn test_foreign_key_to_users() {
    let source = shop_catalog();
    let extractor = PostgresExtractor::new();
    let tables = collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap();

    let orders = &tables[0];
    let fks = orders.sorted_foreign_keys();
    assert_eq!(fks.len(), 1);
    assert_eq!(fks[0].primary_key_table(), "users");
    assert_eq!(fks[0].foreign_columns().collect::<Vec<_>>(), vec!["user_id"]);
    assert!(!fks[0].is_composite());
}

#[tokio::test]
async fn test_lookups_run_once() {
    let source = shop_catalog();
    let extractor = PostgresExtractor::new();
    collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap();

    let calls = source.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls[0].0.contains("information_schema.tables"));
    assert!(!calls[0].0.contains("::text IN ("));
    assert!(calls[3].0.contains("pg_get_serial_sequence"));
}

#[tokio::test]
async fn test_temporary_and_toast_schemas_are_excluded() {
    let source = shop_catalog();
    collect_tables(PostgresExtractor::new().extract_tables(&source, &PostgresNaming))
        .await
        .unwrap();

    let calls = source.calls();
    for sql in [&calls[0].0, &calls[3].0] {
        assert!(sql.contains(r"NOT LIKE 'pg\_temp\_%'"), "{}", sql);
        assert!(sql.contains(r"NOT LIKE 'pg\_toast%'"), "{}", sql);
    }
}

#[tokio::test]
async fn test_schema_filter_binds_parameters() {
    let source = shop_catalog();
    let extractor = PostgresExtractor::with_options(&ExtractOptions {
        schemas: vec!["public".to_string(), "sales".to_string()],
        ..ExtractOptions::default()
    });
    collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap();

    let (sql, params) = &source.calls()[0];
    assert!(sql.contains("t.table_schema::text IN ($1, $2)"));
    assert_eq!(params, &vec![Value::from("public"), Value::from("sales")]);
}

#[tokio::test]
async fn test_table_without_columns_is_fatal() {
    let source = MockRowSource::new()
        .on("information_schema.columns", COLUMN_COLUMNS, vec![])
        .on("'PRIMARY KEY'", PK_COLUMNS, vec![])
        .on("'FOREIGN KEY'", FK_COLUMNS, vec![])
        .on("information_schema.tables", TABLE_COLUMNS, vec![table_row("ghost")]);

    let extractor = PostgresExtractor::new().with_concurrency_column(true);
    let err = collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("public.ghost: table has no columns"));
}

#[tokio::test]
async fn test_type_mismatch_ends_stream() {
    let mut row = ColumnRow::new("users", "id", "int4").values();
    row[5] = Value::String("YES".into());
    let source = MockRowSource::new()
        .on("information_schema.columns", COLUMN_COLUMNS, vec![row])
        .on("'PRIMARY KEY'", PK_COLUMNS, vec![])
        .on("'FOREIGN KEY'", FK_COLUMNS, vec![])
        .on("information_schema.tables", TABLE_COLUMNS, vec![table_row("users")]);

    let extractor = PostgresExtractor::new();
    let items: Vec<_> = extractor
        .extract_tables(&source, &PostgresNaming)
        .collect()
        .await;

    assert_eq!(items.len(), 1);
    assert!(matches!(
        items[0],
        Err(SchemataError::TypeMismatch { column: "nullable", found: "string", .. })
    ));
}

#[tokio::test]
async fn test_connectivity_error_passes_through() {
    let source = MockRowSource::new().fail_on("information_schema.tables", "relation does not exist");

    let extractor = PostgresExtractor::new();
    let err = collect_tables(extractor.extract_tables(&source, &PostgresNaming))
        .await
        .unwrap_err();
    assert!(matches!(err, SchemataError::Query(ref m) if m == "relation does not exist"));
    assert!(!err.is_catalog_error());
}
