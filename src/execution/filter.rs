use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{Schema, Tuple};

use super::operator::{Lookahead, OpIterator};
use super::Predicate;

/// Passes through the child tuples that satisfy a predicate, in child order.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
    lookahead: Lookahead,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Self {
        Self {
            predicate,
            child,
            lookahead: Lookahead::new(),
        }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.lookahead.open();
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let (child, predicate) = (&mut self.child, &self.predicate);
        self.lookahead.has_next(|| next_match(child.as_mut(), predicate))
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let (child, predicate) = (&mut self.child, &self.predicate);
        self.lookahead.next(|| next_match(child.as_mut(), predicate))
    }

    fn rewind(&mut self) -> Result<()> {
        self.lookahead.rewind()?;
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.lookahead.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        self.child.schema()
    }
}

fn next_match(child: &mut dyn OpIterator, predicate: &Predicate) -> Result<Option<Tuple>> {
    while let Some(tuple) = child.next()? {
        if predicate.filter(&tuple)? {
            return Ok(Some(tuple));
        }
    }
    Ok(None)
}
