//! SQLite parameter naming

use schemata_core::NamingStrategy;

/// Named parameters: `:p0` in SQL text, bound as `p0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteNaming;

impl NamingStrategy for SqliteNaming {
    fn parameter_name(&self, index: usize) -> String {
        format!("p{}", index)
    }

    fn sql_token(&self, index: usize) -> String {
        format!(":{}", self.parameter_name(index))
    }
}
