//! Canonical queries over the ANSI information-schema views
//!
//! Shared by every engine that exposes `INFORMATION_SCHEMA`. Identifiers are
//! written in uppercase and unquoted so they resolve on case-folding and
//! case-preserving engines alike; result columns are aliased in lowercase.

use super::CatalogRow;
use crate::normalize::build_table;
use crate::source::fetch_all;
use crate::{Column, Result, Row, RowSource, TableStream};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;

/// Primary-key columns of every table
pub const PRIMARY_KEYS_SQL: &str = "\
SELECT tc.TABLE_SCHEMA AS table_schema,
       tc.TABLE_NAME AS table_name,
       kcu.ORDINAL_POSITION AS ordinal_position,
       kcu.COLUMN_NAME AS column_name
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
  ON kcu.CONSTRAINT_CATALOG = tc.CONSTRAINT_CATALOG
 AND kcu.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
 AND kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
 AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA
 AND kcu.TABLE_NAME = tc.TABLE_NAME
WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'";

/// Foreign-key column pairs of every table, matched by ordinal position
/// against the referenced unique constraint.
///
/// SQL Server's `KEY_COLUMN_USAGE` has no `POSITION_IN_UNIQUE_CONSTRAINT`, so
/// both sides are paired on `ORDINAL_POSITION`.
///
/// PostgreSQL only makes constraint names unique per table, so the referencing
/// columns are pinned to the constraint's own table.
pub const FOREIGN_KEYS_SQL: &str = "\
SELECT tc.CONSTRAINT_NAME AS constraint_name,
       fk.ORDINAL_POSITION AS ordinal_position,
       fk.TABLE_SCHEMA AS foreign_schema,
       fk.TABLE_NAME AS foreign_table,
       fk.COLUMN_NAME AS foreign_column,
       pk.TABLE_SCHEMA AS primary_schema,
       pk.TABLE_NAME AS primary_table,
       pk.COLUMN_NAME AS primary_column
FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
JOIN INFORMATION_SCHEMA.REFERENTIAL_CONSTRAINTS rc
  ON rc.CONSTRAINT_CATALOG = tc.CONSTRAINT_CATALOG
 AND rc.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
 AND rc.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE fk
  ON fk.CONSTRAINT_CATALOG = tc.CONSTRAINT_CATALOG
 AND fk.CONSTRAINT_SCHEMA = tc.CONSTRAINT_SCHEMA
 AND fk.CONSTRAINT_NAME = tc.CONSTRAINT_NAME
 AND fk.TABLE_SCHEMA = tc.TABLE_SCHEMA
 AND fk.TABLE_NAME = tc.TABLE_NAME
JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE pk
  ON pk.CONSTRAINT_CATALOG = rc.UNIQUE_CONSTRAINT_CATALOG
 AND pk.CONSTRAINT_SCHEMA = rc.UNIQUE_CONSTRAINT_SCHEMA
 AND pk.CONSTRAINT_NAME = rc.UNIQUE_CONSTRAINT_NAME
 AND pk.ORDINAL_POSITION = fk.ORDINAL_POSITION
WHERE tc.CONSTRAINT_TYPE = 'FOREIGN KEY'";

const PRIMARY_KEYS: &str = "primary_keys";
const FOREIGN_KEYS: &str = "foreign_keys";

/// Schema-qualified table identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub schema: String,
    pub name: String,
}

impl TableKey {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// One column pair of a foreign-key constraint, as read from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    /// Zero-based position within the constraint
    pub ordinal: usize,
    pub foreign_column: String,
    pub primary_schema: String,
    pub primary_table: String,
    pub primary_column: String,
}

/// Column name to zero-based primary-key ordinal, per table
pub type PrimaryKeyLookup = HashMap<TableKey, HashMap<String, usize>>;

/// Foreign-key column pairs, per referencing table
pub type ForeignKeyLookup = HashMap<TableKey, Vec<ForeignKeyRow>>;

/// Run [`PRIMARY_KEYS_SQL`] and index the result by table.
#[tracing::instrument(skip(source), fields(driver = source.driver_name()))]
pub async fn load_primary_keys(source: &dyn RowSource) -> Result<PrimaryKeyLookup> {
    let rows = fetch_all(source, PRIMARY_KEYS_SQL, &[]).await?;
    primary_key_lookup(&rows)
}

/// Run [`FOREIGN_KEYS_SQL`] and index the result by referencing table.
#[tracing::instrument(skip(source), fields(driver = source.driver_name()))]
pub async fn load_foreign_keys(source: &dyn RowSource) -> Result<ForeignKeyLookup> {
    let rows = fetch_all(source, FOREIGN_KEYS_SQL, &[]).await?;
    foreign_key_lookup(&rows)
}

/// Everything an information-schema engine reports, materialized before the
/// first table is built.
#[derive(Debug, Default)]
pub struct AnsiSnapshot {
    /// Tables to emit, in listing order
    pub tables: Vec<TableKey>,
    /// Raw columns per table, in catalog ordinal order
    pub columns: HashMap<TableKey, Vec<Column>>,
    pub primary_keys: PrimaryKeyLookup,
    pub foreign_keys: ForeignKeyLookup,
}

impl AnsiSnapshot {
    /// Build one table per listed key, lazily.
    ///
    /// `decorate` sees each non-empty column list before normalization, which
    /// is where engines add synthetic columns.
    pub fn into_tables<'a, F>(mut self, mut decorate: F) -> TableStream<'a>
    where
        F: FnMut(&TableKey, &mut Vec<Column>) + Send + 'a,
    {
        let tables = std::mem::take(&mut self.tables);
        stream::iter(tables)
            .map(move |key| {
                let mut columns = self.columns.remove(&key).unwrap_or_default();
                if !columns.is_empty() {
                    decorate(&key, &mut columns);
                }
                build_table(
                    &key,
                    columns,
                    self.primary_keys.get(&key),
                    self.foreign_keys.get(&key).map(Vec::as_slice),
                )
            })
            .boxed()
    }
}

pub fn primary_key_lookup(rows: &[Row]) -> Result<PrimaryKeyLookup> {
    let mut lookup = PrimaryKeyLookup::new();
    for row in rows {
        let row = CatalogRow::new(PRIMARY_KEYS, row);
        let key = TableKey::new(row.string("table_schema")?, row.string("table_name")?);
        let ordinal = row.ordinal("ordinal_position")?;
        let column = row.string("column_name")?;
        lookup.entry(key).or_default().insert(column, ordinal);
    }
    Ok(lookup)
}

pub fn foreign_key_lookup(rows: &[Row]) -> Result<ForeignKeyLookup> {
    let mut lookup = ForeignKeyLookup::new();
    for row in rows {
        let row = CatalogRow::new(FOREIGN_KEYS, row);
        let fk = ForeignKeyRow {
            constraint_name: row.string("constraint_name")?,
            ordinal: row.ordinal("ordinal_position")?,
            foreign_column: row.string("foreign_column")?,
            primary_schema: row.string("primary_schema")?,
            primary_table: row.string("primary_table")?,
            primary_column: row.string("primary_column")?,
        };
        let key = TableKey::new(row.string("foreign_schema")?, row.string("foreign_table")?);
        lookup.entry(key).or_default().push(fk);
    }
    Ok(lookup)
}
