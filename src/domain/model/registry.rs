//! TableRegistry mapping table names to validated descriptors.

use crate::domain::model::{tables, SchemaError, TableSchema};
use crate::storage::Store;
use std::collections::HashMap;
use std::sync::Arc;

/// A registry of every table the service exposes, in registration order.
pub struct TableRegistry {
    tables: Vec<Arc<TableSchema>>,
    index: HashMap<&'static str, usize>,
}

impl TableRegistry {
    /// Creates a new empty TableRegistry.
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// The full application catalog.
    pub fn standard() -> Result<Self, SchemaError> {
        let mut reg = TableRegistry::new();
        for schema in tables::all() {
            reg.register(schema)?;
        }
        Ok(reg)
    }

    /// Validates and registers a descriptor. Re-registering a table name
    /// replaces the earlier descriptor in place.
    pub fn register(&mut self, schema: TableSchema) -> Result<(), SchemaError> {
        schema.validate()?;
        let name = schema.table_name();
        let schema = Arc::new(schema);
        match self.index.get(name) {
            Some(&pos) => self.tables[pos] = schema,
            None => {
                self.index.insert(name, self.tables.len());
                self.tables.push(schema);
            }
        }
        Ok(())
    }

    /// Retrieves a descriptor by table name.
    pub fn get(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.index.get(name).map(|&pos| self.tables[pos].clone())
    }

    pub fn tables(&self) -> impl Iterator<Item = &Arc<TableSchema>> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> Vec<&'static str> {
        self.tables.iter().map(|t| t.table_name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// CREATE TABLE statements for every registered table.
    pub fn create_table_sql(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.create_table_sql()).collect()
    }

    /// Creates any missing tables. Existing tables are left untouched.
    pub async fn apply_to(&self, store: &Store) -> Result<(), sqlx::Error> {
        let statements = self.create_table_sql();
        store.apply_ddl(statements.iter().map(String::as_str)).await?;
        tracing::info!(tables = self.tables.len(), "Table schema applied");
        Ok(())
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}
