use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{Result, TableId, TransactionId};
use crate::storage::{HeapFile, HeapFileIterator};
use crate::tuple::{Schema, Tuple};
use crate::Database;

use super::operator::{Lookahead, OpIterator};

/// Sequential scan over every tuple of one table.
///
/// Column names of the exposed schema are prefixed with `"<alias>."`; the
/// alias defaults to the table's catalog name.
pub struct SeqScan {
    txn: TransactionId,
    table_id: TableId,
    alias: String,
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    /// Table schema with aliased column names
    schema: Arc<Schema>,
    iter: Option<HeapFileIterator>,
    lookahead: Lookahead,
}

impl SeqScan {
    pub fn new(db: &Database, txn: TransactionId, table_id: TableId, alias: Option<&str>) -> Result<Self> {
        let catalog = db.catalog();
        let file = catalog.file(table_id)?;
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => catalog.table_name(table_id)?,
        };
        let schema = Arc::new(file.schema().with_prefix(&alias));

        Ok(Self {
            txn,
            table_id,
            alias,
            file,
            pool: Arc::clone(db.buffer_pool()),
            schema,
            iter: None,
            lookahead: Lookahead::new(),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<()> {
        self.iter = Some(self.file.iter(self.txn, Arc::clone(&self.pool))?);
        self.lookahead.open();
        debug!(table_id = %self.table_id, alias = %self.alias, txn = %self.txn, "opened scan");
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let (iter, schema) = (&mut self.iter, &self.schema);
        self.lookahead.has_next(|| next_aliased(iter, schema))
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let (iter, schema) = (&mut self.iter, &self.schema);
        self.lookahead.next(|| next_aliased(iter, schema))
    }

    fn rewind(&mut self) -> Result<()> {
        self.lookahead.rewind()?;
        if let Some(iter) = self.iter.as_mut() {
            iter.rewind()?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.iter = None;
        self.lookahead.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

fn next_aliased(iter: &mut Option<HeapFileIterator>, schema: &Arc<Schema>) -> Result<Option<Tuple>> {
    let Some(iter) = iter.as_mut() else {
        return Ok(None);
    };
    match iter.next().transpose()? {
        Some(mut tuple) => {
            tuple.reset_schema(Arc::clone(schema))?;
            Ok(Some(tuple))
        }
        None => Ok(None),
    }
}
