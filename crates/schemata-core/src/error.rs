//! Error types for schemata

use thiserror::Error;

/// Core error type for catalog extraction
#[derive(Error, Debug)]
pub enum SchemataError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Driver error: {0}")]
    Driver(String),

    /// A catalog column arrived as a native value of an unexpected kind.
    #[error("Catalog type mismatch in {query}.{column}: expected {expected}, found {found}")]
    TypeMismatch {
        query: &'static str,
        column: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A catalog query did not project a column the extractor locates by name.
    #[error("Catalog column {column} missing from {query} result")]
    MissingColumn {
        query: &'static str,
        column: &'static str,
    },

    /// The catalog describes a state the unified model cannot represent.
    #[error("Catalog consistency violation: {0}")]
    Consistency(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Cancelled")]
    Cancelled,
}

impl SchemataError {
    /// Build a consistency violation for a specific table.
    pub fn consistency(schema: &str, table: &str, detail: impl std::fmt::Display) -> Self {
        SchemataError::Consistency(format!("{}.{}: {}", schema, table, detail))
    }

    /// True for errors raised by the catalog itself (type mismatches and consistency
    /// violations), as opposed to transport or configuration failures.
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            SchemataError::TypeMismatch { .. }
                | SchemataError::MissingColumn { .. }
                | SchemataError::Consistency(_)
        )
    }
}

/// Result type alias for schemata operations
pub type Result<T> = std::result::Result<T, SchemataError>;
