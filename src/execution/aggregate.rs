use std::sync::Arc;

use tracing::debug;

use crate::common::Result;
use crate::tuple::{Schema, Tuple};

use super::aggregator::{AggregateIter, AggregateOp, Aggregator};
use super::operator::{Lookahead, OpIterator};

/// Grouped aggregation over a child operator.
///
/// `open` drains the whole child into an [`Aggregator`]; `next` then walks
/// the computed groups. `rewind` replays the groups without touching the
/// child again.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    aggregator: Aggregator,
    results: Option<AggregateIter>,
    lookahead: Lookahead,
}

impl Aggregate {
    /// Creates an aggregation of `agg_field`, grouped by `group_field` if given.
    ///
    /// Fails before any tuple is read if a field index is invalid or `op`
    /// is not supported for the aggregate field's type.
    pub fn new(
        child: Box<dyn OpIterator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggregateOp,
    ) -> Result<Self> {
        let aggregator = Aggregator::new(child.schema(), group_field, agg_field, op)?;
        Ok(Self {
            child,
            aggregator,
            results: None,
            lookahead: Lookahead::new(),
        })
    }

    /// Returns the group-by field index of the child, if grouped.
    pub fn group_field(&self) -> Option<usize> {
        self.aggregator.group_field()
    }

    /// Returns the aggregated field index of the child.
    pub fn aggregate_field(&self) -> usize {
        self.aggregator.aggregate_field()
    }

    pub fn aggregate_op(&self) -> AggregateOp {
        self.aggregator.op()
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;

        self.aggregator.clear();
        while let Some(tuple) = self.child.next()? {
            self.aggregator.merge(&tuple)?;
        }
        self.results = Some(self.aggregator.iter()?);
        self.lookahead.open();

        debug!(op = %self.aggregator.op(), schema = %self.aggregator.schema(), "aggregated child");
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        let results = &mut self.results;
        self.lookahead.has_next(|| Ok(results.as_mut().and_then(Iterator::next)))
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        let results = &mut self.results;
        self.lookahead.next(|| Ok(results.as_mut().and_then(Iterator::next)))
    }

    fn rewind(&mut self) -> Result<()> {
        self.lookahead.rewind()?;
        if let Some(results) = self.results.as_mut() {
            results.rewind();
        }
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results = None;
        self.lookahead.close();
    }

    fn schema(&self) -> &Arc<Schema> {
        self.aggregator.schema()
    }
}
