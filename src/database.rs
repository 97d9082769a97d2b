use std::path::Path;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::catalog::Catalog;
use crate::common::{DbConfig, Result, TableId};
use crate::storage::HeapFile;
use crate::tuple::Schema;

/// Runtime context shared by every component of one database instance.
///
/// Holds the configuration, the table catalog and the buffer pool. Operators
/// take a reference to it at construction time.
pub struct Database {
    config: DbConfig,
    catalog: Arc<Catalog>,
    buffer_pool: Arc<BufferPool>,
}

impl Database {
    /// Creates an empty database with the given configuration.
    pub fn new(config: DbConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let buffer_pool = Arc::new(BufferPool::new(config.pool_pages, Arc::clone(&catalog)));
        Self {
            config,
            catalog,
            buffer_pool,
        }
    }

    /// Opens (creating if needed) a heap file with the configured page size
    /// and registers it in the catalog under `name`.
    pub fn create_table<P: AsRef<Path>>(
        &self,
        path: P,
        name: &str,
        schema: Arc<Schema>,
        primary_key: &str,
    ) -> Result<TableId> {
        let file = Arc::new(HeapFile::open(path, schema, self.config.page_size)?);
        let id = file.id();
        self.catalog.add_table(file, name, primary_key);
        Ok(id)
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn buffer_pool(&self) -> &Arc<BufferPool> {
        &self.buffer_pool
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new(DbConfig::default())
    }
}
