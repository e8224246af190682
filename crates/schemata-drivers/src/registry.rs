//! Driver registry for managing available catalog drivers

use schemata_core::{
    CancellableSource, CatalogDriver, ConnectionConfig, ExtractOptions, Result, SchemataError,
    Table, collect_tables,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Registry of available catalog drivers, keyed by driver id
pub struct DriverRegistry {
    drivers: BTreeMap<&'static str, Arc<dyn CatalogDriver>>,
}

impl DriverRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            drivers: BTreeMap::new(),
        }
    }

    /// Create a registry with all built-in drivers registered
    pub fn with_defaults() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();

        #[cfg(feature = "sqlite")]
        registry.register(Arc::new(crate::sqlite::SqliteDriver::new()));
        #[cfg(feature = "postgres")]
        registry.register(Arc::new(crate::postgres::PostgresDriver::new()));
        #[cfg(feature = "mssql")]
        registry.register(Arc::new(crate::mssql::MssqlDriver::new()));

        registry
    }

    /// Register a new driver
    pub fn register(&mut self, driver: Arc<dyn CatalogDriver>) {
        let id = driver.id();
        tracing::info!(driver = %id, "registering catalog driver");
        self.drivers.insert(id, driver);
    }

    /// Get a driver by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn CatalogDriver>> {
        let driver = self.drivers.get(id).cloned();
        if driver.is_none() {
            tracing::warn!(driver = %id, "driver not found in registry");
        }
        driver
    }

    /// All registered drivers, ordered by id
    pub fn list(&self) -> Vec<Arc<dyn CatalogDriver>> {
        self.drivers.values().cloned().collect()
    }

    /// Check if a driver is registered
    pub fn has(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }

    fn driver_for(&self, config: &ConnectionConfig) -> Result<Arc<dyn CatalogDriver>> {
        self.get(&config.driver).ok_or_else(|| {
            SchemataError::Configuration(format!(
                "unknown driver '{}' (available: {})",
                config.driver,
                self.drivers.keys().copied().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Connect with the driver named in `config` and extract every table,
    /// ordered by `(schema, name)`.
    pub async fn extract(
        &self,
        config: &ConnectionConfig,
        options: &ExtractOptions,
    ) -> Result<Vec<Table>> {
        self.extract_cancellable(config, options, CancellationToken::new())
            .await
    }

    /// Like [`DriverRegistry::extract`], stopping between rows once `token`
    /// is cancelled.
    #[tracing::instrument(skip(self, config, options, token), fields(driver = %config.driver))]
    pub async fn extract_cancellable(
        &self,
        config: &ConnectionConfig,
        options: &ExtractOptions,
        token: CancellationToken,
    ) -> Result<Vec<Table>> {
        let driver = self.driver_for(config)?;
        let source = CancellableSource::new(driver.connect(config).await?, token);
        let naming = driver.naming();
        let extractor = driver.extractor(options);

        let start = std::time::Instant::now();
        let tables = collect_tables(extractor.extract_tables(&source, naming.as_ref())).await?;
        tracing::info!(
            engine = %driver.engine(),
            table_count = tables.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "extraction completed"
        );
        Ok(tables)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_enabled_features() {
        let registry = DriverRegistry::with_defaults();
        #[cfg(feature = "postgres")]
        assert!(registry.has("postgres"));
        #[cfg(feature = "mssql")]
        {
            let driver = registry.get("mssql").unwrap();
            assert_eq!(driver.default_port(), Some(1433));
            assert_eq!(driver.display_name(), "SQL Server");
        }
        #[cfg(feature = "sqlite")]
        assert_eq!(registry.get("sqlite").unwrap().default_port(), None);
        assert!(!registry.has("oracle"));
    }

    #[test]
    fn test_list_is_ordered_by_id() {
        let registry = DriverRegistry::with_defaults();
        let ids: Vec<&str> = registry.list().iter().map(|d| d.id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[tokio::test]
    async fn test_unknown_driver_is_configuration_error() {
        let registry = DriverRegistry::with_defaults();
        let config = ConnectionConfig::new("oracle");
        let err = registry
            .extract(&config, &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SchemataError::Configuration(ref m) if m.contains("oracle")));
    }
}
