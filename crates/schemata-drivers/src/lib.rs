//! Schemata Drivers - catalog drivers for every supported engine
//!
//! This crate re-exports the per-engine driver crates behind cargo features
//! and ties them together in a [`DriverRegistry`].

#[cfg(feature = "mssql")]
pub use schemata_driver_mssql as mssql;
#[cfg(feature = "postgres")]
pub use schemata_driver_postgres as postgres;
#[cfg(feature = "sqlite")]
pub use schemata_driver_sqlite as sqlite;

mod registry;

pub use registry::DriverRegistry;

/// Re-export commonly used types from schemata-core
pub use schemata_core::{
    CatalogDriver, Column, ConnectionConfig, Engine, ExtractOptions, ForeignKey, Result,
    SchemaExtractor, SchemataConfig, SchemataError, Table,
};

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_extracts_in_memory_sqlite() {
        let registry = DriverRegistry::with_defaults();
        let config = ConnectionConfig::new_sqlite(":memory:");

        let tables = registry
            .extract(&config, &ExtractOptions::default())
            .await
            .unwrap();

        // a fresh in-memory database has no user tables
        assert!(tables.is_empty());
    }
}
