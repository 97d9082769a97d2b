use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Schema, Tuple};

use super::operator::{Lookahead, OpIterator};

/// Leaf operator over a fixed list of tuples.
pub struct TupleIterator {
    schema: Arc<Schema>,
    tuples: Vec<Tuple>,
    position: usize,
    lookahead: Lookahead,
}

impl TupleIterator {
    /// Creates an iterator over `tuples`, each of which must match `schema`.
    pub fn new(schema: Arc<Schema>, tuples: Vec<Tuple>) -> Result<Self> {
        if let Some(bad) = tuples.iter().find(|t| **t.schema() != *schema) {
            return Err(DbError::SchemaMismatch {
                expected: schema.to_string(),
                found: bad.schema().to_string(),
            });
        }
        Ok(Self {
            schema,
            tuples,
            position: 0,
            lookahead: Lookahead::new(),
        })
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<()> {
        self.position = 0;
        self.lookahead.open();
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let (tuples, position) = (&self.tuples, &mut self.position);
        self.lookahead.has_next(|| Ok(advance(tuples, position)))
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let (tuples, position) = (&self.tuples, &mut self.position);
        self.lookahead.next(|| Ok(advance(tuples, position)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.lookahead.rewind()?;
        self.position = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.lookahead.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }
}

fn advance(tuples: &[Tuple], position: &mut usize) -> Option<Tuple> {
    let tuple = tuples.get(*position).cloned();
    if tuple.is_some() {
        *position += 1;
    }
    tuple
}
