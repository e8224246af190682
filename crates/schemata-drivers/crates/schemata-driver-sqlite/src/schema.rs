//! SQLite catalog extraction
//!
//! SQLite has no information schema. Tables come from `sqlite_master`; columns
//! and foreign keys come from the `pragma_table_xinfo` and
//! `pragma_foreign_key_list` table-valued functions, one call per table.

use futures::TryFutureExt;
use futures::stream::{self, StreamExt};
use regex::Regex;
use schemata_core::catalog::{CatalogRow, ForeignKeyRow, TableKey};
use schemata_core::normalize::{build_table, format_type};
use schemata_core::{
    Column, Engine, ExtractOptions, NamingStrategy, Result, RowSource, SchemaExtractor,
    SchemataError, Table, TableStream, Value, fetch_all, stop_after_error,
};
use std::collections::HashMap;
use std::sync::LazyLock;

/// The only schema an attached-database-free SQLite connection exposes
pub const MAIN_SCHEMA: &str = "main";

/// Names with the literal `sqlite_` prefix are reserved for the engine
const TABLES_SQL: &str = "\
SELECT name, sql
FROM sqlite_master
WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
ORDER BY name";

const GENERATED_MARKER: &str = "GENERATED ALWAYS";

static AUTOINCREMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bAUTOINCREMENT\b").expect("valid regex"));

/// `hidden` values reported by `pragma_table_xinfo`
const HIDDEN_VIRTUAL_TABLE: i64 = 1;
const HIDDEN_GENERATED_VIRTUAL: i64 = 2;
const HIDDEN_GENERATED_STORED: i64 = 3;

fn columns_sql(naming: &dyn NamingStrategy) -> String {
    format!(
        "SELECT cid, name, type, \"notnull\" AS not_null, dflt_value, pk, hidden \
         FROM pragma_table_xinfo({}) ORDER BY cid",
        naming.sql_token(0)
    )
}

fn foreign_keys_sql(naming: &dyn NamingStrategy) -> String {
    format!(
        "SELECT id, seq, \"table\" AS parent_table, \"from\" AS from_column, \"to\" AS to_column \
         FROM pragma_foreign_key_list({}) ORDER BY id, seq",
        naming.sql_token(0)
    )
}

/// Split a declared type into its bare type and whether the engine generates it.
///
/// Older SQLite versions leave `GENERATED ALWAYS` at the end of the declared
/// type of generated columns. The marker is stripped; if it is present on a
/// column `hidden` does not report as generated, the catalog contradicts itself.
pub fn classify_column(
    key: &TableKey,
    column: &str,
    declared: &str,
    hidden: i64,
) -> Result<(String, bool)> {
    let is_generated = matches!(hidden, HIDDEN_GENERATED_VIRTUAL | HIDDEN_GENERATED_STORED);
    let trimmed = declared.trim();
    let has_marker = trimmed.len() >= GENERATED_MARKER.len()
        && trimmed.is_char_boundary(trimmed.len() - GENERATED_MARKER.len())
        && trimmed[trimmed.len() - GENERATED_MARKER.len()..].eq_ignore_ascii_case(GENERATED_MARKER);

    if has_marker && !is_generated {
        return Err(SchemataError::consistency(
            &key.schema,
            &key.name,
            format!(
                "column {} declares {} but hidden = {}",
                column, GENERATED_MARKER, hidden
            ),
        ));
    }

    let bare = if has_marker {
        &trimmed[..trimmed.len() - GENERATED_MARKER.len()]
    } else {
        trimmed
    };
    Ok((format_type(bare, None), is_generated))
}

/// Best-effort identity detection: a primary-key column of a table whose DDL
/// mentions `AUTOINCREMENT`. Plain `INTEGER PRIMARY KEY` rowid aliases are
/// engine-populated too but are not detected.
pub fn declares_autoincrement(ddl: Option<&str>) -> bool {
    ddl.is_some_and(|sql| AUTOINCREMENT_REGEX.is_match(sql))
}

/// Extractor for SQLite's PRAGMA-style catalog
#[derive(Debug, Clone, Default)]
pub struct SqliteExtractor {
    schemas: Vec<String>,
}

impl SqliteExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: &ExtractOptions) -> Self {
        Self {
            schemas: options.schemas.clone(),
        }
    }

    fn includes_main(&self) -> bool {
        self.schemas.is_empty() || self.schemas.iter().any(|s| s == MAIN_SCHEMA)
    }

    /// User tables with their DDL, in name order
    async fn list_tables(&self, source: &dyn RowSource) -> Result<Vec<(String, Option<String>)>> {
        if !self.includes_main() {
            tracing::debug!(schemas = ?self.schemas, "schema filter excludes main");
            return Ok(Vec::new());
        }

        let rows = fetch_all(source, TABLES_SQL, &[]).await?;
        let tables = rows
            .iter()
            .map(|row| {
                let row = CatalogRow::new("sqlite_master", row);
                Ok((row.string("name")?, row.opt_string("sql")?))
            })
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(table_count = tables.len(), "tables listed");
        Ok(tables)
    }

    #[tracing::instrument(skip(self, source, naming, ddl), fields(table = %name))]
    async fn extract_table(
        &self,
        source: &dyn RowSource,
        naming: &dyn NamingStrategy,
        name: String,
        ddl: Option<String>,
    ) -> Result<Table> {
        let key = TableKey::new(MAIN_SCHEMA, name.clone());
        let params = [Value::String(name)];
        let autoincrement = declares_autoincrement(ddl.as_deref());

        let column_rows = fetch_all(source, &columns_sql(naming), &params).await?;
        let mut columns = Vec::with_capacity(column_rows.len());
        let mut primary_keys = HashMap::new();
        for row in &column_rows {
            let row = CatalogRow::new("pragma_table_xinfo", row);
            let hidden = row.int("hidden")?;
            if hidden == HIDDEN_VIRTUAL_TABLE {
                continue;
            }
            let column_name = row.string("name")?;
            let (data_type, is_computed) =
                classify_column(&key, &column_name, &row.string("type")?, hidden)?;
            let pk = row.int("pk")?;
            if pk > 0 {
                primary_keys.insert(column_name.clone(), (pk - 1) as usize);
            }
            columns.push(Column {
                nullable: row.int("not_null")? == 0,
                default_value: row.opt_string("dflt_value")?,
                is_computed,
                is_identity: pk > 0 && autoincrement,
                ..Column::new(column_name, data_type)
            });
        }

        let fk_rows = fetch_all(source, &foreign_keys_sql(naming), &params).await?;
        let mut foreign_keys = Vec::with_capacity(fk_rows.len());
        for row in &fk_rows {
            let row = CatalogRow::new("pragma_foreign_key_list", row);
            let seq = row.int("seq")?;
            let parent_table = row.string("parent_table")?;
            let primary_column = match row.opt_string("to_column")? {
                Some(column) => column,
                None => implicit_parent_column(source, naming, &key, &parent_table, seq).await?,
            };
            foreign_keys.push(ForeignKeyRow {
                constraint_name: row.int("id")?.to_string(),
                ordinal: seq as usize,
                foreign_column: row.string("from_column")?,
                primary_schema: MAIN_SCHEMA.to_string(),
                primary_table: parent_table,
                primary_column,
            });
        }

        build_table(&key, columns, Some(&primary_keys), Some(&foreign_keys))
    }
}

/// Resolve `REFERENCES parent` without a column list to the parent's
/// primary-key column at position `seq`.
async fn implicit_parent_column(
    source: &dyn RowSource,
    naming: &dyn NamingStrategy,
    key: &TableKey,
    parent: &str,
    seq: i64,
) -> Result<String> {
    let params = [Value::String(parent.to_string())];
    let rows = fetch_all(source, &columns_sql(naming), &params).await?;
    let mut key_columns = Vec::new();
    for row in &rows {
        let row = CatalogRow::new("pragma_table_xinfo", row);
        let pk = row.int("pk")?;
        if pk > 0 {
            key_columns.push((pk, row.string("name")?));
        }
    }
    key_columns.sort();
    key_columns
        .into_iter()
        .nth(seq as usize)
        .map(|(_, name)| name)
        .ok_or_else(|| {
            SchemataError::consistency(
                &key.schema,
                &key.name,
                format!(
                    "foreign key to {} has no explicit column and the parent has no primary-key column at position {}",
                    parent, seq
                ),
            )
        })
}

impl SchemaExtractor for SqliteExtractor {
    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    fn extract_tables<'a>(
        &'a self,
        source: &'a dyn RowSource,
        naming: &'a dyn NamingStrategy,
    ) -> TableStream<'a> {
        let tables = self.list_tables(source).map_ok(move |tables| {
            stream::iter(tables)
                .then(move |(name, ddl)| self.extract_table(source, naming, name, ddl))
                .boxed()
        });
        stop_after_error(tables.try_flatten_stream().boxed())
    }
}
