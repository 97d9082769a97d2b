use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::{DbError, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::Schema;

/// Registered table: its heap file plus naming metadata.
struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: String,
}

/// In-memory table registry.
///
/// Maps table IDs to heap files and names, and names back to IDs. The
/// buffer pool and operators only read from it.
pub struct Catalog {
    /// table_id -> entry
    tables: RwLock<HashMap<TableId, TableEntry>>,
    /// table name -> table_id
    ids_by_name: RwLock<HashMap<String, TableId>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            ids_by_name: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a heap file under `name`.
    ///
    /// Re-adding a file with a known ID renames it; re-adding a known name
    /// points the name at the new file.
    pub fn add_table(&self, file: Arc<HeapFile>, name: impl Into<String>, primary_key: impl Into<String>) {
        let name = name.into();
        let id = file.id();

        let mut tables = self.tables.write();
        let mut ids_by_name = self.ids_by_name.write();

        if let Some(old_id) = ids_by_name.insert(name.clone(), id) {
            if old_id != id {
                tables.remove(&old_id);
            }
        }
        if let Some(old) = tables.insert(
            id,
            TableEntry {
                file,
                name: name.clone(),
                primary_key: primary_key.into(),
            },
        ) {
            if old.name != name {
                ids_by_name.remove(&old.name);
            }
        }

        debug!(table_id = %id, table = %name, "registered table");
    }

    /// Returns the ID of the table with the given name.
    pub fn table_id(&self, name: &str) -> Result<TableId> {
        self.ids_by_name
            .read()
            .get(name)
            .copied()
            .ok_or_else(|| DbError::TableNameNotFound(name.to_string()))
    }

    /// Returns the heap file of the table.
    pub fn file(&self, id: TableId) -> Result<Arc<HeapFile>> {
        self.with_entry(id, |entry| Arc::clone(&entry.file))
    }

    /// Returns the schema of the table.
    pub fn schema(&self, id: TableId) -> Result<Arc<Schema>> {
        self.with_entry(id, |entry| Arc::clone(entry.file.schema()))
    }

    /// Returns the primary key field name of the table.
    pub fn primary_key(&self, id: TableId) -> Result<String> {
        self.with_entry(id, |entry| entry.primary_key.clone())
    }

    /// Returns the name of the table.
    pub fn table_name(&self, id: TableId) -> Result<String> {
        self.with_entry(id, |entry| entry.name.clone())
    }

    /// Returns the IDs of every registered table.
    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.read().keys().copied().collect()
    }

    /// Removes every table.
    pub fn clear(&self) {
        self.tables.write().clear();
        self.ids_by_name.write().clear();
    }

    fn with_entry<T>(&self, id: TableId, f: impl FnOnce(&TableEntry) -> T) -> Result<T> {
        self.tables
            .read()
            .get(&id)
            .map(f)
            .ok_or(DbError::TableNotFound(id))
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
