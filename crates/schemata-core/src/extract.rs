//! Schema extractor trait and stream helpers

use crate::{NamingStrategy, Result, RowSource, Table};
use futures::future;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

/// Lazy, one-shot stream of extracted tables.
///
/// A fatal error is yielded once and the stream ends after it.
pub type TableStream<'a> = BoxStream<'a, Result<Table>>;

/// Catalog engine an extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    Postgres,
    SqlServer,
    Sqlite,
}

impl Engine {
    pub fn id(&self) -> &'static str {
        match self {
            Engine::Postgres => "postgres",
            Engine::SqlServer => "mssql",
            Engine::Sqlite => "sqlite",
        }
    }
}

impl std::fmt::Display for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Engine::Postgres => "PostgreSQL",
            Engine::SqlServer => "SQL Server",
            Engine::Sqlite => "SQLite",
        })
    }
}

/// Reads the catalog of one engine into the unified model.
///
/// Extraction only reads. Lookups spanning all tables are materialized before
/// the first table is yielded; tables themselves are produced lazily.
pub trait SchemaExtractor: Send + Sync {
    fn engine(&self) -> Engine;

    /// Stream every user table visible through `source`.
    fn extract_tables<'a>(
        &'a self,
        source: &'a dyn RowSource,
        naming: &'a dyn NamingStrategy,
    ) -> TableStream<'a>;
}

/// End a stream right after its first error.
pub fn stop_after_error<'a, T: Send + 'a>(
    stream: BoxStream<'a, Result<T>>,
) -> BoxStream<'a, Result<T>> {
    stream
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

/// Drain a table stream and order the result by `(schema, name)`.
pub async fn collect_tables(stream: TableStream<'_>) -> Result<Vec<Table>> {
    let mut tables: Vec<Table> = stream.try_collect().await?;
    tables.sort_by(|a, b| (a.schema(), a.name()).cmp(&(b.schema(), b.name())));
    Ok(tables)
}
