//! Schemata Core - relational catalog model and extraction traits
//!
//! This crate provides the engine-agnostic pieces every driver builds on:
//!
//! - `Table`, `Column`, `ForeignKey` - the unified, validated schema model
//! - `RowSource` - lazily streamed, parameterized catalog queries
//! - `NamingStrategy` - engine-specific parameter spelling
//! - `SchemaExtractor` - per-engine catalog readers producing a `TableStream`
//! - `catalog` - typed row decoding and the shared information-schema queries
//! - `CatalogDriver` - connection plus extractor, one per engine

pub mod catalog;
mod config;
mod driver;
mod error;
mod extract;
mod model;
mod naming;
pub mod normalize;
mod source;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
mod types;


pub use config::*;
pub use driver::*;
pub use error::*;
pub use extract::*;
pub use model::*;
pub use naming::*;
pub use source::*;
pub use types::*;
