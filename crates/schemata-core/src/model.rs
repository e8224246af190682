//! Unified relational model produced by every extractor
//!
//! A [`Table`] can only be built through [`Table::new`], which enforces the
//! invariants downstream generators rely on:
//!
//! - at least one column, column names unique
//! - primary-key ordinals, when sorted, are exactly `0..k`
//! - identity columns carry no default, concurrency tokens are computed
//! - every foreign key references columns the table actually has
//!
//! Tables are immutable once built. Equality is structural: columns are kept
//! ordered by name and foreign keys in a `BTreeSet`, so two extractions of an
//! unchanged schema compare equal regardless of catalog row order.

use crate::{Result, SchemataError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// One table column
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Catalog-exact column name
    pub name: String,
    /// Uppercase type name, with `(length)` appended for variable-length types
    pub data_type: String,
    pub nullable: bool,
    /// Raw default expression; always `None` for identity columns
    pub default_value: Option<String>,
    /// Zero-based position within the primary key
    pub primary_key_idx: Option<usize>,
    /// Generated/computed by the engine; never insertable or updatable
    pub is_computed: bool,
    /// Populated by the engine on insert (identity / auto-increment)
    pub is_identity: bool,
    /// Engine-maintained row version usable for optimistic concurrency
    pub is_concurrency_token: bool,
}

impl Column {
    /// Plain, nullable column with no key or generation flags.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default_value: None,
            primary_key_idx: None,
            is_computed: false,
            is_identity: false,
            is_concurrency_token: false,
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key_idx.is_some()
    }

    /// Whether generated code may write this column on INSERT.
    pub fn is_insertable(&self) -> bool {
        !self.is_computed && !self.is_identity
    }

    /// Whether generated code may write this column on UPDATE.
    pub fn is_updatable(&self) -> bool {
        !self.is_computed && !self.is_identity
    }
}

/// One (possibly composite) foreign-key constraint
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "ForeignKeyRepr")]
pub struct ForeignKey {
    primary_key_schema: String,
    primary_key_table: String,
    foreign_to_primary: BTreeSet<(String, String)>,
}

#[derive(Deserialize)]
struct ForeignKeyRepr {
    primary_key_schema: String,
    primary_key_table: String,
    foreign_to_primary: BTreeSet<(String, String)>,
}

impl TryFrom<ForeignKeyRepr> for ForeignKey {
    type Error = SchemataError;

    fn try_from(repr: ForeignKeyRepr) -> Result<Self> {
        ForeignKey::new(
            repr.primary_key_schema,
            repr.primary_key_table,
            repr.foreign_to_primary,
        )
    }
}

impl ForeignKey {
    /// Build a foreign key from its `(foreign column, primary column)` pairs.
    pub fn new(
        primary_key_schema: impl Into<String>,
        primary_key_table: impl Into<String>,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let primary_key_schema = primary_key_schema.into();
        let primary_key_table = primary_key_table.into();
        let foreign_to_primary: BTreeSet<_> = pairs.into_iter().collect();
        if foreign_to_primary.is_empty() {
            return Err(SchemataError::Consistency(format!(
                "foreign key referencing {}.{} has no column pairs",
                primary_key_schema, primary_key_table
            )));
        }
        Ok(Self {
            primary_key_schema,
            primary_key_table,
            foreign_to_primary,
        })
    }

    pub fn primary_key_schema(&self) -> &str {
        &self.primary_key_schema
    }

    pub fn primary_key_table(&self) -> &str {
        &self.primary_key_table
    }

    /// `(foreign column, primary column)` pairs. More than one pair means a composite key.
    pub fn foreign_to_primary(&self) -> &BTreeSet<(String, String)> {
        &self.foreign_to_primary
    }

    pub fn is_composite(&self) -> bool {
        self.foreign_to_primary.len() > 1
    }

    pub fn foreign_columns(&self) -> impl Iterator<Item = &str> {
        self.foreign_to_primary.iter().map(|(f, _)| f.as_str())
    }

    /// Concatenated foreign column names, for deterministic emission order.
    pub fn sort_key(&self) -> String {
        self.foreign_columns().collect()
    }
}

/// A table with its columns and foreign keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "TableRepr")]
pub struct Table {
    schema: String,
    name: String,
    columns: Vec<Column>,
    foreign_keys: BTreeSet<ForeignKey>,
}

#[derive(Deserialize)]
struct TableRepr {
    schema: String,
    name: String,
    columns: Vec<Column>,
    #[serde(default)]
    foreign_keys: BTreeSet<ForeignKey>,
}

impl TryFrom<TableRepr> for Table {
    type Error = SchemataError;

    fn try_from(repr: TableRepr) -> Result<Self> {
        Table::new(repr.schema, repr.name, repr.columns, repr.foreign_keys)
    }
}

impl Table {
    /// Build a table, validating every model invariant.
    pub fn new(
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = Column>,
        foreign_keys: impl IntoIterator<Item = ForeignKey>,
    ) -> Result<Self> {
        let schema = schema.into();
        let name = name.into();
        let mut columns: Vec<Column> = columns.into_iter().collect();
        let foreign_keys: BTreeSet<ForeignKey> = foreign_keys.into_iter().collect();

        if columns.is_empty() {
            return Err(SchemataError::consistency(&schema, &name, "table has no columns"));
        }

        columns.sort_by(|a, b| a.name.cmp(&b.name));
        if let Some(pair) = columns.windows(2).find(|w| w[0].name == w[1].name) {
            return Err(SchemataError::consistency(
                &schema,
                &name,
                format!("duplicate column {}", pair[0].name),
            ));
        }

        for column in &columns {
            if column.is_identity && column.default_value.is_some() {
                return Err(SchemataError::consistency(
                    &schema,
                    &name,
                    format!("identity column {} carries a default", column.name),
                ));
            }
            if column.is_concurrency_token && !column.is_computed {
                return Err(SchemataError::consistency(
                    &schema,
                    &name,
                    format!("concurrency token {} is not computed", column.name),
                ));
            }
        }

        check_primary_key_ordinals(&schema, &name, &columns)?;

        let known: HashSet<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        for fk in &foreign_keys {
            if let Some(missing) = fk.foreign_columns().find(|c| !known.contains(c)) {
                return Err(SchemataError::consistency(
                    &schema,
                    &name,
                    format!(
                        "foreign key to {}.{} uses unknown column {}",
                        fk.primary_key_schema, fk.primary_key_table, missing
                    ),
                ));
            }
        }

        Ok(Self {
            schema,
            name,
            columns,
            foreign_keys,
        })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Columns, ordered by name
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
            .map(|idx| &self.columns[idx])
    }

    pub fn foreign_keys(&self) -> &BTreeSet<ForeignKey> {
        &self.foreign_keys
    }

    /// Primary-key columns in key order
    pub fn primary_key(&self) -> Vec<&Column> {
        let mut key: Vec<&Column> = self.columns.iter().filter(|c| c.is_primary_key()).collect();
        key.sort_by_key(|c| c.primary_key_idx);
        key
    }

    /// Foreign keys ordered by [`ForeignKey::sort_key`]
    pub fn sorted_foreign_keys(&self) -> Vec<&ForeignKey> {
        let mut keys: Vec<&ForeignKey> = self.foreign_keys.iter().collect();
        keys.sort_by_key(|fk| fk.sort_key());
        keys
    }

    /// Return a copy of this table with one more column, re-validated.
    pub fn with_column(&self, column: Column) -> Result<Self> {
        Table::new(
            self.schema.clone(),
            self.name.clone(),
            self.columns.iter().cloned().chain(std::iter::once(column)),
            self.foreign_keys.iter().cloned(),
        )
    }
}

fn check_primary_key_ordinals(schema: &str, name: &str, columns: &[Column]) -> Result<()> {
    let mut ordinals: Vec<usize> = columns.iter().filter_map(|c| c.primary_key_idx).collect();
    ordinals.sort_unstable();
    if ordinals.iter().enumerate().any(|(expected, &actual)| expected != actual) {
        return Err(SchemataError::consistency(
            schema,
            name,
            format!("primary key ordinals {:?} are not contiguous from 0", ordinals),
        ));
    }
    Ok(())
}
