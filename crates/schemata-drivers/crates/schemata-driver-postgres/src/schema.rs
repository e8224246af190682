//! PostgreSQL catalog extraction
//!
//! Tables and columns come from `information_schema`; keys come from the
//! canonical queries in [`schemata_core::catalog::ansi`].

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

/// Name of the synthetic row-version column
pub const XMIN_COLUMN: &str = "xmin";

const TABLES_SQL: &str = "\
SELECT t.table_schema, t.table_name
FROM information_schema.tables t
WHERE t.table_type = 'BASE TABLE'
  AND t.table_schema NOT IN ('pg_catalog', 'information_schema')
  AND t.table_schema NOT LIKE 'pg\\_toast%'
  AND t.table_schema NOT LIKE 'pg\\_temp\\_%'";

const COLUMNS_SQL: &str = "\
SELECT c.table_schema,
       c.table_name,
       c.column_name,
       c.udt_name,
       c.character_maximum_length,
       c.is_nullable = 'YES' AS nullable,
       c.column_default,
       c.is_generated = 'ALWAYS' AS is_generated,
       pg_get_serial_sequence(
           quote_ident(c.table_schema::text) || '.' || quote_ident(c.table_name::text),
           c.column_name::text
       ) IS NOT NULL AS is_identity
FROM information_schema.columns c
JOIN information_schema.tables t
  ON t.table_schema = c.table_schema
 AND t.table_name = c.table_name
WHERE t.table_type = 'BASE TABLE'
  AND c.table_schema NOT IN ('pg_catalog', 'information_schema')
  AND c.table_schema NOT LIKE 'pg\\_toast%'
  AND c.table_schema NOT LIKE 'pg\\_temp\\_%'
ORDER BY c.table_schema, c.table_name, c.ordinal_position";

/// The `xmin` system column as a concurrency token
pub fn xmin_column() -> Column {
    Column {
        nullable: false,
        is_computed: true,
        is_concurrency_token: true,
        ..Column::new(XMIN_COLUMN, "XID")
    }
}

/// Extractor for PostgreSQL's information schema
#[derive(Debug, Clone, Default)]
pub struct PostgresExtractor {
    schemas: Vec<String>,
    concurrency_column: bool,
}

impl PostgresExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: &ExtractOptions) -> Self {
        Self {
            schemas: options.schemas.clone(),
            concurrency_column: options.concurrency_column,
        }
    }

    /// Append the synthetic `xmin` column to every table.
    pub fn with_concurrency_column(mut self, enabled: bool) -> Self {
        self.concurrency_column = enabled;
        self
    }

    fn tables_sql(&self, naming: &dyn NamingStrategy) -> String {
        let mut sql = TABLES_SQL.to_string();
        if !self.schemas.is_empty() {
            sql.push_str(&format!(
                "\n  AND t.table_schema::text IN ({})",
                placeholder_list(naming, 0, self.schemas.len())
            ));
        }
        sql.push_str("\nORDER BY t.table_schema, t.table_name");
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
                let row = CatalogRow::new("tables", row);
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
            let data_type = format_type(
                &row.string("udt_name")?,
                row.opt_int("character_maximum_length")?,
            );
            let column = Column {
                nullable: row.flag("nullable")?,
                default_value: row.opt_string("column_default")?,
                is_computed: row.flag("is_generated")?,
                is_identity: row.flag("is_identity")?,
                ..Column::new(row.string("column_name")?, data_type)
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

impl SchemaExtractor for PostgresExtractor {
    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn extract_tables<'a>(
        &'a self,
        source: &'a dyn RowSource,
        naming: &'a dyn NamingStrategy,
    ) -> TableStream<'a> {
        let concurrency_column = self.concurrency_column;
        let tables = self.snapshot(source, naming).map_ok(move |snapshot| {
            snapshot.into_tables(move |_, columns| {
                if concurrency_column {
                    columns.push(xmin_column());
                }
            })
        });
        stop_after_error(tables.try_flatten_stream().boxed())
    }
}
