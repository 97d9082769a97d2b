use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{DbError, Result, TableId, TransactionId};
use crate::tuple::{Schema, Tuple};
use crate::Database;

use super::mutation::CountOnce;
use super::operator::{Lookahead, OpIterator};

/// Inserts every child tuple into a table and returns one tuple holding
/// the number of inserted rows.
pub struct Insert {
    txn: TransactionId,
    table_id: TableId,
    pool: Arc<BufferPool>,
    inner: CountOnce,
    lookahead: Lookahead,
}

impl Insert {
    /// Fails if the child's schema differs from the table's.
    pub fn new(db: &Database, txn: TransactionId, child: Box<dyn OpIterator>, table_id: TableId) -> Result<Self> {
        let expected = db.catalog().schema(table_id)?;
        if **child.schema() != *expected {
            return Err(DbError::SchemaMismatch {
                expected: expected.to_string(),
                found: child.schema().to_string(),
            });
        }

        Ok(Self {
            txn,
            table_id,
            pool: Arc::clone(db.buffer_pool()),
            inner: CountOnce::new(child)?,
            lookahead: Lookahead::new(),
        })
    }

    pub fn table_id(&self) -> TableId {
        self.table_id
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<()> {
        self.inner.open()?;
        self.lookahead.open();
        debug!(table_id = %self.table_id, txn = %self.txn, child = %self.inner.child_schema(), "opened insert");
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let (inner, pool, txn, table_id) = (&mut self.inner, &self.pool, self.txn, self.table_id);
        self.lookahead
            .has_next(|| inner.fetch(|tuple| pool.insert_tuple(txn, table_id, tuple)))
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let (inner, pool, txn, table_id) = (&mut self.inner, &self.pool, self.txn, self.table_id);
        self.lookahead
            .next(|| inner.fetch(|tuple| pool.insert_tuple(txn, table_id, tuple)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.lookahead.rewind()?;
        self.inner.rewind();
        Ok(())
    }

    fn close(&mut self) {
        self.inner.close();
        self.lookahead.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        self.inner.schema()
    }
}
