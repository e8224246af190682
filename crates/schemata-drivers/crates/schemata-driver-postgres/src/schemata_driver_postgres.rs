//! PostgreSQL catalog extraction for schemata

mod connection;
mod driver;
mod naming;
mod schema;
mod tls;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod schema_tests;

pub use connection::PostgresConnection;
pub use driver::PostgresDriver;
pub use naming::PostgresNaming;
pub use schema::{PostgresExtractor, XMIN_COLUMN, xmin_column};
pub use tls::{PgSslMode, TlsError};
