//! SQLite driver implementation

use async_trait::async_trait;
use schemata_core::{
    CatalogDriver, ConnectionConfig, Engine, ExtractOptions, NamingStrategy, Result, RowSource,
    SchemaExtractor, SchemataError,
};
use std::sync::Arc;

use crate::{SqliteConnection, SqliteExtractor, SqliteNaming};

/// SQLite catalog driver
pub struct SqliteDriver;

impl SqliteDriver {
    /// Create a new SQLite driver instance
    pub fn new() -> Self {
        tracing::debug!("SQLite driver initialized");
        Self
    }
}

impl Default for SqliteDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogDriver for SqliteDriver {
    fn display_name(&self) -> &'static str {
        "SQLite"
    }

    fn engine(&self) -> Engine {
        Engine::Sqlite
    }

    fn naming(&self) -> Arc<dyn NamingStrategy> {
        Arc::new(SqliteNaming)
    }

    fn extractor(&self, options: &ExtractOptions) -> Box<dyn SchemaExtractor> {
        Box::new(SqliteExtractor::with_options(options))
    }

    #[tracing::instrument(skip(self, config), fields(path = config.get_string("path").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn RowSource>> {
        let path = config.get_string("path").ok_or_else(|| {
            SchemataError::Configuration(
                "SQLite requires 'path' or 'database'. Example: database = \"/path/to/app.db\"".into(),
            )
        })?;
        let read_only = config.get_bool("read_only");

        let conn = SqliteConnection::open(&path, read_only).map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQLite database");
            e
        })?;

        tracing::info!(path = %path, "SQLite connection created");
        Ok(Box::new(conn))
    }
}
