//! Metadata service
//!
//! Resolves table names to shared, read-only `Table` handles. Tables are
//! fully built before they are published, so readers never observe a
//! partially constructed table.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::table::Table;
use super::{CatalogError, CatalogResult};

/// Table name resolution
pub trait MetaService: Send + Sync {
    /// Resolve a table by name
    fn resolve(&self, name: &str) -> CatalogResult<Arc<Table>>;
}

/// In-memory metadata service
#[derive(Debug, Default)]
pub struct Catalog {
    /// Tables by name
    tables: RwLock<HashMap<String, Arc<Table>>>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Publish a table
    pub fn register(&self, table: Table) -> CatalogResult<Arc<Table>> {
        let mut tables = self.tables.write();
        if tables.contains_key(table.name()) {
            return Err(CatalogError::TableExists(table.name().to_string()));
        }
        let name = table.name().to_string();
        let table = Arc::new(table);
        tables.insert(name.clone(), Arc::clone(&table));
        tracing::info!(table = %name, "Table registered");
        Ok(table)
    }

    /// Publish a table, replacing any previous version.
    ///
    /// Handles to the previous version stay valid for queries already
    /// built against it.
    pub fn replace(&self, table: Table) -> Arc<Table> {
        let name = table.name().to_string();
        let table = Arc::new(table);
        let previous = self.tables.write().insert(name.clone(), Arc::clone(&table));
        tracing::info!(table = %name, replaced = previous.is_some(), "Table published");
        table
    }

    /// Drop a table
    pub fn drop_table(&self, name: &str) -> CatalogResult<()> {
        if self.tables.write().remove(name).is_none() {
            return Err(CatalogError::TableNotFound(name.to_string()));
        }
        tracing::info!(table = %name, "Table dropped");
        Ok(())
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.read().contains_key(name)
    }

    /// List all table names, sorted
    pub fn list_tables(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl MetaService for Catalog {
    fn resolve(&self, name: &str) -> CatalogResult<Arc<Table>> {
        self.tables
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::TableNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Kind, SchemaProvider};

    fn events() -> Table {
        Table::builder("nebula.events")
            .field("id", Kind::BigInt)
            .build()
            .unwrap()
    }

    #[test]
    fn test_catalog_register_resolve_drop() {
        let catalog = Catalog::new();

        catalog.register(events()).unwrap();
        assert!(catalog.table_exists("nebula.events"));

        // Duplicate should fail
        assert!(matches!(
            catalog.register(events()),
            Err(CatalogError::TableExists(_))
        ));

        let t = catalog.resolve("nebula.events").unwrap();
        assert_eq!(t.name(), "nebula.events");

        assert!(matches!(
            catalog.resolve("nebula.missing"),
            Err(CatalogError::TableNotFound(_))
        ));

        catalog.drop_table("nebula.events").unwrap();
        assert!(!catalog.table_exists("nebula.events"));
        assert!(matches!(
            catalog.drop_table("nebula.events"),
            Err(CatalogError::TableNotFound(_))
        ));
    }

    #[test]
    fn test_replace_keeps_old_handles() {
        let catalog = Catalog::new();
        let old = catalog.register(events()).unwrap();

        let newer = Table::builder("nebula.events")
            .field("id", Kind::BigInt)
            .field("name", Kind::Varchar)
            .build()
            .unwrap();
        catalog.replace(newer);

        assert_eq!(old.schema().len(), 2);
        assert_eq!(catalog.resolve("nebula.events").unwrap().schema().len(), 3);
    }

    #[test]
    fn test_list_tables_sorted() {
        let catalog = Catalog::new();
        catalog.register(Table::builder("b").build().unwrap()).unwrap();
        catalog.register(Table::builder("a").build().unwrap()).unwrap();
        assert_eq!(catalog.list_tables(), vec!["a".to_string(), "b".to_string()]);
    }
}
