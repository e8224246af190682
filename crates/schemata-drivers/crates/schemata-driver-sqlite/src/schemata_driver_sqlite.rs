//! SQLite catalog extraction for schemata

mod connection;
mod driver;
mod naming;
mod schema;

#[cfg(test)]
mod connection_tests;
#[cfg(test)]
mod schema_tests;

pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
pub use naming::SqliteNaming;
pub use schema::{MAIN_SCHEMA, SqliteExtractor, classify_column, declares_autoincrement};
