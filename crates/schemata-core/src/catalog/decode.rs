//! Typed access to catalog query rows

use crate::{Result, Row, SchemataError, Value};

/// A row of a named catalog query.
///
/// Columns are located by name and decoded with exactly one call per column.
/// Any native value of a kind the call did not ask for is a fatal
/// [`SchemataError::TypeMismatch`]; a column the query did not project is a
/// [`SchemataError::MissingColumn`].
#[derive(Debug, Clone, Copy)]
pub struct CatalogRow<'r> {
    query: &'static str,
    row: &'r Row,
}

impl<'r> CatalogRow<'r> {
    pub fn new(query: &'static str, row: &'r Row) -> Self {
        Self { query, row }
    }

    fn value(&self, column: &'static str) -> Result<&'r Value> {
        self.row
            .get_by_name(column)
            .ok_or(SchemataError::MissingColumn {
                query: self.query,
                column,
            })
    }

    fn mismatch(&self, column: &'static str, expected: &'static str, found: &Value) -> SchemataError {
        SchemataError::TypeMismatch {
            query: self.query,
            column,
            expected,
            found: found.kind(),
        }
    }

    /// Non-null text
    pub fn string(&self, column: &'static str) -> Result<String> {
        match self.value(column)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.mismatch(column, "string", other)),
        }
    }

    /// Nullable text
    pub fn opt_string(&self, column: &'static str) -> Result<Option<String>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Err(self.mismatch(column, "string or null", other)),
        }
    }

    /// Non-null integer of any width
    pub fn int(&self, column: &'static str) -> Result<i64> {
        let value = self.value(column)?;
        value
            .as_i64()
            .ok_or_else(|| self.mismatch(column, "integer", value))
    }

    /// Nullable integer of any width
    pub fn opt_int(&self, column: &'static str) -> Result<Option<i64>> {
        match self.value(column)? {
            Value::Null => Ok(None),
            value => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.mismatch(column, "integer or null", value)),
        }
    }

    /// One-based catalog ordinal, returned zero-based
    pub fn ordinal(&self, column: &'static str) -> Result<usize> {
        let raw = self.int(column)?;
        if raw < 1 {
            return Err(SchemataError::Consistency(format!(
                "{}.{}: ordinal {} is not one-based",
                self.query, column, raw
            )));
        }
        Ok((raw - 1) as usize)
    }

    /// Non-null boolean
    pub fn flag(&self, column: &'static str) -> Result<bool> {
        match self.value(column)? {
            Value::Bool(b) => Ok(*b),
            other => Err(self.mismatch(column, "bool", other)),
        }
    }
}
