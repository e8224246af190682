//! Joins per-table column data with primary-key and foreign-key lookups

use crate::catalog::{ForeignKeyRow, TableKey};
use crate::{Column, ForeignKey, Result, SchemataError, Table};
use std::collections::{BTreeMap, HashMap};

/// Uppercase a catalog type name and append the declared maximum length.
///
/// Nonpositive lengths are engine sentinels (SQL Server reports `-1` for
/// `MAX`) and are embedded as reported.
pub fn format_type(type_name: &str, max_length: Option<i64>) -> String {
    let upper = type_name.trim().to_uppercase();
    match max_length {
        Some(length) => format!("{}({})", upper, length),
        None => upper,
    }
}

/// Rules every column passes through before it enters the model:
/// identity discards the default, a concurrency token is always computed.
pub fn apply_column_policy(mut column: Column) -> Column {
    if column.is_identity {
        column.default_value = None;
    }
    if column.is_concurrency_token {
        column.is_computed = true;
    }
    column
}

/// Group foreign-key rows by constraint name into model foreign keys.
///
/// Every row of one constraint must reference the same table.
pub fn group_foreign_keys(key: &TableKey, rows: &[ForeignKeyRow]) -> Result<Vec<ForeignKey>> {
    let mut groups: BTreeMap<&str, Vec<&ForeignKeyRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.constraint_name.as_str()).or_default().push(row);
    }

    groups
        .into_iter()
        .map(|(constraint, mut members)| {
            members.sort_by_key(|m| m.ordinal);
            let first = members[0];
            if let Some(stray) = members.iter().find(|m| {
                m.primary_schema != first.primary_schema || m.primary_table != first.primary_table
            }) {
                return Err(SchemataError::consistency(
                    &key.schema,
                    &key.name,
                    format!(
                        "foreign key {} references both {}.{} and {}.{}",
                        constraint,
                        first.primary_schema,
                        first.primary_table,
                        stray.primary_schema,
                        stray.primary_table
                    ),
                ));
            }
            let pairs: Vec<(String, String)> = members
                .iter()
                .map(|m| (m.foreign_column.clone(), m.primary_column.clone()))
                .collect();
            ForeignKey::new(first.primary_schema.clone(), first.primary_table.clone(), pairs)
        })
        .collect()
}

/// Build one model table from its raw columns and the lookup entries for it.
///
/// Primary-key ordinals are assigned by column name; a key column the table
/// does not have is a consistency violation, as is a table without columns.
pub fn build_table(
    key: &TableKey,
    columns: Vec<Column>,
    primary_keys: Option<&HashMap<String, usize>>,
    foreign_keys: Option<&[ForeignKeyRow]>,
) -> Result<Table> {
    if columns.is_empty() {
        return Err(SchemataError::consistency(&key.schema, &key.name, "table has no columns"));
    }

    let mut columns: Vec<Column> = columns.into_iter().map(apply_column_policy).collect();

    if let Some(primary_keys) = primary_keys {
        for (name, ordinal) in primary_keys {
            let column = columns.iter_mut().find(|c| &c.name == name).ok_or_else(|| {
                SchemataError::consistency(
                    &key.schema,
                    &key.name,
                    format!("primary key column {} not found", name),
                )
            })?;
            column.primary_key_idx = Some(*ordinal);
        }
    }

    let foreign_keys = match foreign_keys {
        Some(rows) => group_foreign_keys(key, rows)?,
        None => Vec::new(),
    };

    tracing::trace!(
        table = %key,
        columns = columns.len(),
        foreign_keys = foreign_keys.len(),
        "normalized table"
    );

    Table::new(key.schema.clone(), key.name.clone(), columns, foreign_keys)
}
