//! SQL Server catalog extraction
//!
//! Tables come from `sys.tables`, columns from `INFORMATION_SCHEMA.COLUMNS`
//! enriched with `COLUMNPROPERTY`, keys from the canonical queries.

use futures::TryFutureExt;
use futures::stream::StreamExt;
use schemata_core::catalog::ansi::{load_foreign_keys, load_primary_keys};
use schemata_core::catalog::{AnsiSnapshot, CatalogRow, TableKey};
use schemata_core::normalize::format_type;
use schemata_core::{
    Column, Engine, ExtractOptions, NamingStrategy, Result, RowSource, SchemaExtractor,
    TableStream, Value, fetch_all, placeholder_list, stop_after_error,
};
use std::collections::HashMap;

/// Types whose values the engine rewrites on every update.
///
/// Hardcoded: a new row-versioning type would need adding here.
pub const CONCURRENCY_TOKEN_TYPES: &[&str] = &["timestamp", "rowversion"];

const TABLES_SQL: &str = "\
SELECT s.name AS table_schema, t.name AS table_name
FROM sys.tables t
JOIN sys.schemas s ON s.schema_id = t.schema_id
WHERE t.is_ms_shipped = 0";

const COLUMNS_SQL: &str = "\
SELECT c.TABLE_SCHEMA AS table_schema,
       c.TABLE_NAME AS table_name,
       c.COLUMN_NAME AS column_name,
       c.DATA_TYPE AS data_type,
       c.CHARACTER_MAXIMUM_LENGTH AS character_maximum_length,
       CAST(CASE WHEN c.IS_NULLABLE = 'YES' THEN 1 ELSE 0 END AS bit) AS nullable,
       c.COLUMN_DEFAULT AS column_default,
       CAST(COALESCE(COLUMNPROPERTY(OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
                                    c.COLUMN_NAME, 'IsIdentity'), 0) AS bit) AS is_identity,
       CAST(COALESCE(COLUMNPROPERTY(OBJECT_ID(QUOTENAME(c.TABLE_SCHEMA) + '.' + QUOTENAME(c.TABLE_NAME)),
                                    c.COLUMN_NAME, 'IsComputed'), 0) AS bit) AS is_computed
FROM INFORMATION_SCHEMA.COLUMNS c
ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION";

/// Whether `data_type` is in [`CONCURRENCY_TOKEN_TYPES`], ignoring case
pub fn is_concurrency_token_type(data_type: &str) -> bool {
    CONCURRENCY_TOKEN_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(data_type.trim()))
}

/// Extractor for SQL Server's catalog views
#[derive(Debug, Clone, Default)]
pub struct MssqlExtractor {
    schemas: Vec<String>,
}

impl MssqlExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: &ExtractOptions) -> Self {
        Self {
            schemas: options.schemas.clone(),
        }
    }

    fn tables_sql(&self, naming: &dyn NamingStrategy) -> String {
        let mut sql = TABLES_SQL.to_string();
        if !self.schemas.is_empty() {
            sql.push_str(&format!(
                "\n  AND s.name IN ({})",
                placeholder_list(naming, 0, self.schemas.len())
            ));
        }
        sql.push_str("\nORDER BY s.name, t.name");
        sql
    }

    async fn list_tables(
        &self,
        source: &dyn RowSource,
        naming: &dyn NamingStrategy,
    ) -> Result<Vec<TableKey>> {
        let params: Vec<Value> = self.schemas.iter().cloned().map(Value::String).collect();
        let rows = fetch_all(source, &self.tables_sql(naming), &params).await?;
        rows.iter()
            .map(|row| {
                let row = CatalogRow::new("sys.tables", row);
                Ok(TableKey::new(row.string("table_schema")?, row.string("table_name")?))
            })
            .collect()
    }

    async fn load_columns(&self, source: &dyn RowSource) -> Result<HashMap<TableKey, Vec<Column>>> {
        let rows = fetch_all(source, COLUMNS_SQL, &[]).await?;
        let mut columns: HashMap<TableKey, Vec<Column>> = HashMap::new();
        for row in &rows {
            let row = CatalogRow::new("columns", row);
            let key = TableKey::new(row.string("table_schema")?, row.string("table_name")?);
            let raw_type = row.string("data_type")?;
            let token = is_concurrency_token_type(&raw_type);
            let column = Column {
                nullable: row.flag("nullable")?,
                default_value: row.opt_string("column_default")?,
                is_identity: row.flag("is_identity")?,
                is_computed: row.flag("is_computed")? || token,
                is_concurrency_token: token,
                ..Column::new(
                    row.string("column_name")?,
                    format_type(&raw_type, row.opt_int("character_maximum_length")?),
                )
            };
            columns.entry(key).or_default().push(column);
        }
        Ok(columns)
    }

    #[tracing::instrument(skip_all, fields(driver = source.driver_name()))]
    async fn snapshot(
        &self,
        source: &dyn RowSource,
        naming: &dyn NamingStrategy,
    ) -> Result<AnsiSnapshot> {
        let tables = self.list_tables(source, naming).await?;
        let primary_keys = load_primary_keys(source).await?;
        let foreign_keys = load_foreign_keys(source).await?;
        let columns = self.load_columns(source).await?;
        tracing::debug!(table_count = tables.len(), "catalog loaded");

        Ok(AnsiSnapshot {
            tables,
            columns,
            primary_keys,
            foreign_keys,
        })
    }
}

impl SchemaExtractor for MssqlExtractor {
    fn engine(&self) -> Engine {
        Engine::SqlServer
    }

    fn extract_tables<'a>(
        &'a self,
        source: &'a dyn RowSource,
        naming: &'a dyn NamingStrategy,
    ) -> TableStream<'a> {
        let tables = self
            .snapshot(source, naming)
            .map_ok(|snapshot| snapshot.into_tables(|_, _| {}));
        stop_after_error(tables.try_flatten_stream().boxed())
    }
}
