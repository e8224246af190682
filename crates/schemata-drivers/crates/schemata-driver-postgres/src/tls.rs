//! PostgreSQL TLS support
//!
//! Maps the `sslmode` connection parameter onto tokio-postgres' SSL mode and
//! a native-tls connector.

use native_tls::{Certificate, TlsConnector as NativeTlsConnector};
use postgres_native_tls::MakeTlsConnector;
use std::fs;
use tokio_postgres::config::SslMode;

/// Error types for TLS operations
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    /// Unknown `sslmode` value
    #[error("Unsupported sslmode '{0}' (expected disable, prefer, require or verify-full)")]
    UnsupportedMode(String),

    /// Failed to load CA certificate
    #[error("Failed to load CA certificate from {path}: {source}")]
    CaCertLoadFailed {
        path: String,
        source: std::io::Error,
    },

    /// Invalid CA certificate format
    #[error("Invalid CA certificate format: {0}")]
    InvalidCaCert(String),

    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    ConfigurationError(String),
}

impl From<TlsError> for schemata_core::SchemataError {
    fn from(err: TlsError) -> Self {
        match err {
            TlsError::UnsupportedMode(_) => schemata_core::SchemataError::Configuration(err.to_string()),
            other => schemata_core::SchemataError::Connection(other.to_string()),
        }
    }
}

/// Supported `sslmode` values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PgSslMode {
    Disable,
    #[default]
    Prefer,
    /// Encrypt, but accept any server certificate
    Require,
    /// Encrypt and verify the certificate chain and host name
    VerifyFull,
}

impl PgSslMode {
    pub fn parse(value: &str) -> Result<Self, TlsError> {
        match value.to_lowercase().as_str() {
            "disable" => Ok(PgSslMode::Disable),
            "allow" | "prefer" => Ok(PgSslMode::Prefer),
            "require" => Ok(PgSslMode::Require),
            "verify-full" | "verify_full" => Ok(PgSslMode::VerifyFull),
            other => Err(TlsError::UnsupportedMode(other.to_string())),
        }
    }

    pub fn ssl_mode(&self) -> SslMode {
        match self {
            PgSslMode::Disable => SslMode::Disable,
            PgSslMode::Prefer => SslMode::Prefer,
            PgSslMode::Require | PgSslMode::VerifyFull => SslMode::Require,
        }
    }

    pub fn uses_tls(&self) -> bool {
        !matches!(self, PgSslMode::Disable)
    }
}

/// Build a tokio-postgres TLS connector for `mode`, optionally trusting an extra CA.
pub fn build_connector(mode: PgSslMode, ca_cert: Option<&str>) -> Result<MakeTlsConnector, TlsError> {
    let mut builder = NativeTlsConnector::builder();

    if let Some(path) = ca_cert.filter(|p| !p.is_empty()) {
        let pem = fs::read(path).map_err(|source| TlsError::CaCertLoadFailed {
            path: path.to_string(),
            source,
        })?;
        let cert = Certificate::from_pem(&pem).map_err(|e| TlsError::InvalidCaCert(e.to_string()))?;
        builder.add_root_certificate(cert);
    }

    let verify = mode == PgSslMode::VerifyFull;
    builder.danger_accept_invalid_hostnames(!verify);
    builder.danger_accept_invalid_certs(!verify);

    let connector = builder
        .build()
        .map_err(|e| TlsError::ConfigurationError(e.to_string()))?;
    Ok(MakeTlsConnector::new(connector))
}
