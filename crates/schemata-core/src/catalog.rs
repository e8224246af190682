//! Catalog row decoding and the canonical information-schema queries

pub mod ansi;
mod decode;

pub use ansi::{AnsiSnapshot, ForeignKeyLookup, ForeignKeyRow, PrimaryKeyLookup, TableKey};
pub use decode::CatalogRow;

#[cfg(test)]
mod tests;
