//! SQL Server catalog extraction for schemata

mod connection;
mod driver;
mod naming;
mod schema;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod schema_tests;

pub use connection::{MssqlConnection, MssqlConnectionError};
pub use driver::MssqlDriver;
pub use naming::MssqlNaming;
pub use schema::{CONCURRENCY_TOKEN_TYPES, MssqlExtractor, is_concurrency_token_type};
