//! SQL Server driver implementation

use async_trait::async_trait;
use schemata_core::{
    CatalogDriver, ConnectionConfig, Engine, ExtractOptions, NamingStrategy, Result, RowSource,
    SchemaExtractor,
};
use std::sync::Arc;

use crate::connection::DEFAULT_PORT;
use crate::{MssqlConnection, MssqlExtractor, MssqlNaming};

/// SQL Server catalog driver
pub struct MssqlDriver;

impl MssqlDriver {
    /// Create a new SQL Server driver instance
    pub fn new() -> Self {
        tracing::debug!("SQL Server driver initialized");
        Self
    }
}

impl Default for MssqlDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogDriver for MssqlDriver {
    fn display_name(&self) -> &'static str {
        "SQL Server"
    }

    fn engine(&self) -> Engine {
        Engine::SqlServer
    }

    fn default_port(&self) -> Option<u16> {
        Some(DEFAULT_PORT)
    }

    fn naming(&self) -> Arc<dyn NamingStrategy> {
        Arc::new(MssqlNaming)
    }

    fn extractor(&self, options: &ExtractOptions) -> Box<dyn SchemaExtractor> {
        Box::new(MssqlExtractor::with_options(options))
    }

    #[tracing::instrument(skip(self, config), fields(host = config.get_string("host").as_deref(), database = config.get_string("database").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn RowSource>> {
        tracing::debug!("connecting to SQL Server");
        let connection = MssqlConnection::from_config(config).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to SQL Server");
            e
        })?;
        tracing::info!("SQL Server connection created");
        Ok(Box::new(connection))
    }
}
