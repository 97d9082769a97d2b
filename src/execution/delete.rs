use std::sync::Arc;

use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{Result, TransactionId};
use crate::tuple::{Schema, Tuple};
use crate::Database;

use super::mutation::CountOnce;
use super::operator::{Lookahead, OpIterator};

/// Deletes every child tuple from the table named by its record ID and
/// returns one tuple holding the number of deleted rows.
pub struct Delete {
    txn: TransactionId,
    pool: Arc<BufferPool>,
    inner: CountOnce,
    lookahead: Lookahead,
}

impl Delete {
    pub fn new(db: &Database, txn: TransactionId, child: Box<dyn OpIterator>) -> Result<Self> {
        Ok(Self {
            txn,
            pool: Arc::clone(db.buffer_pool()),
            inner: CountOnce::new(child)?,
            lookahead: Lookahead::new(),
        })
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<()> {
        self.inner.open()?;
        self.lookahead.open();
        debug!(txn = %self.txn, "opened delete");
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let (inner, pool, txn) = (&mut self.inner, &self.pool, self.txn);
        self.lookahead.has_next(|| inner.fetch(|tuple| pool.delete_tuple(txn, tuple)))
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let (inner, pool, txn) = (&mut self.inner, &self.pool, self.txn);
        self.lookahead.next(|| inner.fetch(|tuple| pool.delete_tuple(txn, tuple)))
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
