//! Catalog driver trait definition

use crate::{ConnectionConfig, Engine, ExtractOptions, NamingStrategy, Result, RowSource, SchemaExtractor};
use async_trait::async_trait;
use std::sync::Arc;

/// Everything needed to extract one engine's catalog: a way to connect, the
/// engine's parameter naming and its extractor.
#[async_trait]
pub trait CatalogDriver: Send + Sync {
    /// Unique identifier for this driver (e.g., "postgres", "mssql", "sqlite")
    fn id(&self) -> &'static str {
        self.engine().id()
    }

    /// Human-readable name (e.g., "PostgreSQL", "SQL Server", "SQLite")
    fn display_name(&self) -> &'static str;

    fn engine(&self) -> Engine;

    /// Default connection port (None for file-based databases like SQLite)
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// Parameter naming used in this engine's SQL text
    fn naming(&self) -> Arc<dyn NamingStrategy>;

    /// Build an extractor honoring `options`
    fn extractor(&self, options: &ExtractOptions) -> Box<dyn SchemaExtractor>;

    /// Open a row source for catalog queries
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn RowSource>>;
}
