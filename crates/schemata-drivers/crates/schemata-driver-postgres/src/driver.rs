//! PostgreSQL driver implementation

use async_trait::async_trait;
use schemata_core::{
    CatalogDriver, ConnectionConfig, Engine, ExtractOptions, NamingStrategy, Result, RowSource,
    SchemaExtractor,
};
use std::sync::Arc;

use crate::{PgSslMode, PostgresConnection, PostgresExtractor, PostgresNaming};

/// PostgreSQL catalog driver
pub struct PostgresDriver;

impl PostgresDriver {
    /// Create a new PostgreSQL driver instance
    pub fn new() -> Self {
        tracing::debug!("PostgreSQL driver initialized");
        Self
    }
}

impl Default for PostgresDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogDriver for PostgresDriver {
    fn display_name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn engine(&self) -> Engine {
        Engine::Postgres
    }

    fn default_port(&self) -> Option<u16> {
        Some(5432)
    }

    fn naming(&self) -> Arc<dyn NamingStrategy> {
        Arc::new(PostgresNaming)
    }

    fn extractor(&self, options: &ExtractOptions) -> Box<dyn SchemaExtractor> {
        Box::new(PostgresExtractor::with_options(options))
    }

    #[tracing::instrument(skip(self, config), fields(host = config.get_string("host").as_deref(), database = config.get_string("database").as_deref()))]
    async fn connect(&self, config: &ConnectionConfig) -> Result<Box<dyn RowSource>> {
        let host = config
            .get_string("host")
            .unwrap_or_else(|| "localhost".to_string());
        let port = config.port_or(5432);
        let database = config
            .get_string("database")
            .unwrap_or_else(|| "postgres".to_string());
        let user = config.get_string("username");
        let password = config.get_string("password");

        let ssl_mode = match config.get_string("sslmode") {
            Some(mode) => PgSslMode::parse(&mode)?,
            None => PgSslMode::default(),
        };
        let ca_cert = config.get_string("sslrootcert");

        let conn = PostgresConnection::connect(
            &host,
            port,
            &database,
            user.as_deref(),
            password.as_deref(),
            ssl_mode,
            ca_cert.as_deref(),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to connect to PostgreSQL database");
            e
        })?;

        tracing::info!(host = %host, port = %port, database = %database, ssl = ?ssl_mode, "PostgreSQL connection created");
        Ok(Box::new(conn))
    }
}
