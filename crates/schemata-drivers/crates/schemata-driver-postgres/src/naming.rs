//! PostgreSQL parameter naming

use schemata_core::NamingStrategy;

/// Positional parameters, one-based: `$1`, `$2`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresNaming;

impl NamingStrategy for PostgresNaming {
    fn parameter_name(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn sql_token(&self, index: usize) -> String {
        self.parameter_name(index)
    }
}
