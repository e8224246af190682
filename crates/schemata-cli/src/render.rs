//! Terminal tables for the `summary` format and the driver listing

use comfy_table::{Table as ComfyTable, presets::UTF8_FULL_CONDENSED};
use schemata_core::{CatalogDriver, Table};
use std::sync::Arc;

/// One row per table: key, column counts and outgoing foreign keys
pub fn summary_table(tables: &[Table]) -> ComfyTable {
    let mut out = ComfyTable::new();
    out.load_preset(UTF8_FULL_CONDENSED);
    out.set_header(vec![
        "Schema",
        "Table",
        "Columns",
        "Primary key",
        "Identity",
        "Computed",
        "References",
    ]);

    for table in tables {
        let primary_key: Vec<&str> = table.primary_key().iter().map(|c| c.name.as_str()).collect();
        let identity = table.columns().iter().filter(|c| c.is_identity).count();
        let computed = table.columns().iter().filter(|c| c.is_computed).count();
        let references: Vec<String> = table
            .sorted_foreign_keys()
            .iter()
            .map(|fk| format!("{}.{}", fk.primary_key_schema(), fk.primary_key_table()))
            .collect();

        out.add_row(vec![
            table.schema().to_string(),
            table.name().to_string(),
            table.columns().len().to_string(),
            primary_key.join(", "),
            identity.to_string(),
            computed.to_string(),
            references.join(", "),
        ]);
    }
    out
}

pub fn drivers_table(drivers: &[Arc<dyn CatalogDriver>]) -> ComfyTable {
    let mut out = ComfyTable::new();
    out.load_preset(UTF8_FULL_CONDENSED);
    out.set_header(vec!["Id", "Engine", "Default port"]);
    for driver in drivers {
        out.add_row(vec![
            driver.id().to_string(),
            driver.display_name().to_string(),
            driver
                .default_port()
                .map_or_else(|| "-".to_string(), |p| p.to_string()),
        ]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use schemata_core::{Column, ForeignKey};

    fn orders() -> Table {
        let id = Column {
            primary_key_idx: Some(0),
            is_identity: true,
            nullable: false,
            ..Column::new("id", "INT4")
        };
        let customer = Column::new("customer_id", "INT4");
        let fk = ForeignKey::new(
            "public",
            "customers",
            vec![("customer_id".to_string(), "id".to_string())],
        )
        .unwrap();
        Table::new("public", "orders", vec![id, customer], vec![fk]).unwrap()
    }

    #[test]
    fn test_summary_row_per_table() {
        let rendered = summary_table(&[orders()]).to_string();
        assert!(rendered.contains("orders"));
        assert!(rendered.contains("public.customers"));
        assert_eq!(summary_table(&[orders()]).row_iter().count(), 1);
    }

    #[test]
    fn test_drivers_listing() {
        let drivers = schemata_drivers::DriverRegistry::with_defaults().list();
        let rendered = drivers_table(&drivers).to_string();
        assert!(rendered.contains("sqlite"));
        assert!(rendered.contains("1433"));
    }
}
