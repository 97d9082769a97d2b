use std::sync::Arc;

use crate::common::{DbError, Result};
use crate::tuple::{Schema, Tuple};

/// Pull-based query operator.
///
/// Every operator moves between two states: closed (the initial state) and
/// open. `has_next`, `next` and `rewind` are only valid while open and fail
/// with [`DbError::OperatorNotOpen`] otherwise.
///
/// - `Ok(Some(tuple))` → tuple produced
/// - `Ok(None)`        → end of stream
/// - `Err(e)`          → storage or plan error from this operator or a child
pub trait OpIterator {
    /// Opens the operator and its children.
    fn open(&mut self) -> Result<()>;

    /// Returns whether another tuple is available.
    fn has_next(&mut self) -> Result<bool>;

    /// Returns the next tuple, or `None` once the stream is exhausted.
    fn next(&mut self) -> Result<Option<Tuple>>;

    /// Restarts the stream from its first tuple.
    fn rewind(&mut self) -> Result<()>;

    /// Closes the operator and its children.
    fn close(&mut self);

    /// Returns the schema of the tuples this operator produces.
    fn schema(&self) -> &Arc<Schema>;
}

impl<T: OpIterator + ?Sized> OpIterator for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn has_next(&mut self) -> Result<bool> {
        (**self).has_next()
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        (**self).next()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn schema(&self) -> &Arc<Schema> {
        (**self).schema()
    }
}

/// Open/closed state plus a one-tuple lookahead buffer.
///
/// Operators only know how to fetch their next tuple; this turns that into
/// the `has_next`/`next` pair and enforces the open state.
#[derive(Debug, Default)]
pub(crate) struct Lookahead {
    open: bool,
    peeked: Option<Tuple>,
}

impl Lookahead {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&mut self) {
        self.open = true;
        self.peeked = None;
    }

    pub(crate) fn close(&mut self) {
        self.open = false;
        self.peeked = None;
    }

    /// Drops the buffered tuple. Fails if the operator is not open.
    pub(crate) fn rewind(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.peeked = None;
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(DbError::OperatorNotOpen)
        }
    }

    pub(crate) fn has_next<F>(&mut self, fetch: F) -> Result<bool>
    where
        F: FnOnce() -> Result<Option<Tuple>>,
    {
        self.ensure_open()?;
        if self.peeked.is_none() {
            self.peeked = fetch()?;
        }
        Ok(self.peeked.is_some())
    }

    pub(crate) fn next<F>(&mut self, fetch: F) -> Result<Option<Tuple>>
    where
        F: FnOnce() -> Result<Option<Tuple>>,
    {
        self.ensure_open()?;
        match self.peeked.take() {
            Some(tuple) => Ok(Some(tuple)),
            None => fetch(),
        }
    }
}
