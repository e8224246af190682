//! SQL Server parameter naming

use schemata_core::NamingStrategy;

/// tiberius binds positionally through `@P1`, `@P2`, ...
#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlNaming;

impl NamingStrategy for MssqlNaming {
    fn parameter_name(&self, index: usize) -> String {
        format!("@P{}", index + 1)
    }

    fn sql_token(&self, index: usize) -> String {
        self.parameter_name(index)
    }
}
