//! SQLite connection implementation

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{Connection as RusqliteConnection, OpenFlags};
use schemata_core::{NamingStrategy, Result, Row, RowSource, RowStream, SchemataError, Value};
use std::sync::Arc;

use crate::SqliteNaming;

/// SQLite connection wrapper
///
/// rusqlite rows borrow the statement, which borrows the locked connection,
/// so each query is materialized under the lock and then streamed.
pub struct SqliteConnection {
    conn: Arc<Mutex<RusqliteConnection>>,
}

impl SqliteConnection {
    /// Open an existing SQLite database file
    pub fn open(path: &str, read_only: bool) -> Result<Self> {
        tracing::info!(path = %path, read_only, "opening SQLite database");
        if path == ":memory:" {
            return Self::open_in_memory();
        }
        let expanded_path = Self::expand_path(path)?;

        let access = if read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        let flags = access | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        let conn = RusqliteConnection::open_with_flags(&expanded_path, flags).map_err(|e| {
            SchemataError::Connection(format!(
                "Failed to open SQLite database at '{}': {}",
                expanded_path, e
            ))
        })?;

        tracing::info!(path = %expanded_path, "SQLite database connection established");
        Ok(Self::from_rusqlite(conn))
    }

    /// Open a fresh in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let conn = RusqliteConnection::open_in_memory().map_err(|e| {
            SchemataError::Connection(format!("Failed to open in-memory database: {}", e))
        })?;
        Ok(Self::from_rusqlite(conn))
    }

    fn from_rusqlite(conn: RusqliteConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Expand path to handle ~ (home directory) and relative paths
    fn expand_path(path: &str) -> Result<String> {
        if path.starts_with("file:") {
            return Ok(path.to_string());
        }

        let expanded = if let Some(rest) = path.strip_prefix("~/") {
            let home = dirs::home_dir().ok_or_else(|| {
                SchemataError::Configuration("Unable to determine HOME directory".into())
            })?;
            home.join(rest).to_string_lossy().to_string()
        } else if path.starts_with('~') {
            return Err(SchemataError::Configuration(
                "User-specific home directories (~user) are not supported".into(),
            ));
        } else {
            path.to_string()
        };

        let path_buf = std::path::PathBuf::from(&expanded);
        let result = if path_buf.is_relative() {
            std::env::current_dir()?
                .join(path_buf)
                .to_string_lossy()
                .to_string()
        } else {
            expanded
        };

        Ok(result)
    }

    /// Execute a batch of statements, used to prepare fixtures
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing SQL batch");
        self.conn
            .lock()
            .execute_batch(sql)
            .map_err(|e| SchemataError::Query(format!("Failed to execute batch: {}", e)))
    }

    fn query_rows(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| SchemataError::Query(format!("Failed to prepare query: {}", e)))?;

        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let named = named_params(params);
        let bound: Vec<(&str, &dyn ToSql)> = named
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect();

        let mut query_rows = stmt
            .query(bound.as_slice())
            .map_err(|e| SchemataError::Query(format!("Failed to execute query: {}", e)))?;

        let mut rows = Vec::new();
        while let Some(row) = query_rows
            .next()
            .map_err(|e| SchemataError::Query(format!("Failed to fetch row: {}", e)))?
        {
            let values = (0..columns.len())
                .map(|i| rusqlite_to_value(row, i))
                .collect::<Result<Vec<_>>>()?;
            rows.push(Row::new(columns.clone(), values));
        }
        Ok(rows)
    }
}

#[async_trait]
impl RowSource for SqliteConnection {
    fn driver_name(&self) -> &str {
        "sqlite"
    }

    #[tracing::instrument(skip(self, sql, params), fields(sql_preview = %sql.chars().take(100).collect::<String>()))]
    async fn stream_rows<'a>(&'a self, sql: &'a str, params: &'a [Value]) -> Result<RowStream<'a>> {
        let start_time = std::time::Instant::now();
        let rows = self.query_rows(sql, params)?;
        tracing::debug!(
            row_count = rows.len(),
            execution_time_ms = start_time.elapsed().as_millis() as u64,
            "query executed successfully"
        );
        Ok(stream::iter(rows.into_iter().map(Ok)).boxed())
    }
}

/// Pair positional values with the `:name` they are bound under
pub(crate) fn named_params(params: &[Value]) -> Vec<(String, rusqlite::types::Value)> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| {
            (
                format!(":{}", SqliteNaming.parameter_name(i)),
                value_to_rusqlite(value),
            )
        })
        .collect()
}

pub(crate) fn value_to_rusqlite(value: &Value) -> rusqlite::types::Value {
    match value {
        Value::Null => rusqlite::types::Value::Null,
        Value::Bool(b) => rusqlite::types::Value::Integer(if *b { 1 } else { 0 }),
        Value::Int8(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int16(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int32(i) => rusqlite::types::Value::Integer(*i as i64),
        Value::Int64(i) => rusqlite::types::Value::Integer(*i),
        Value::Float32(f) => rusqlite::types::Value::Real(*f as f64),
        Value::Float64(f) => rusqlite::types::Value::Real(*f),
        Value::Decimal(d) => rusqlite::types::Value::Text(d.clone()),
        Value::String(s) => rusqlite::types::Value::Text(s.clone()),
        Value::Bytes(b) => rusqlite::types::Value::Blob(b.clone()),
    }
}

/// Convert rusqlite row value to our Value type
fn rusqlite_to_value(row: &rusqlite::Row, idx: usize) -> Result<Value> {
    use rusqlite::types::ValueRef;

    let value_ref = row
        .get_ref(idx)
        .map_err(|e| SchemataError::Query(e.to_string()))?;

    let value = match value_ref {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int64(i),
        ValueRef::Real(f) => Value::Float64(f),
        ValueRef::Text(s) => Value::String(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
    };

    Ok(value)
}
