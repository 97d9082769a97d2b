use std::sync::Arc;

use crate::common::Result;
use crate::tuple::{DataType, Schema, Tuple};

use super::operator::OpIterator;

/// Shared core of the insert and delete operators.
///
/// On the first fetch it drains the child, applies a mutation to every
/// tuple and produces a single `count` tuple. Later fetches return nothing
/// until `rewind`, which exposes the same count again without re-applying
/// anything.
pub(crate) struct CountOnce {
    child: Box<dyn OpIterator>,
    schema: Arc<Schema>,
    count: Option<Tuple>,
    emitted: bool,
}

impl CountOnce {
    pub(crate) fn new(child: Box<dyn OpIterator>) -> Result<Self> {
        let schema = Arc::new(Schema::from_types_and_names(&[DataType::Integer], &["count"])?);
        Ok(Self {
            child,
            schema,
            count: None,
            emitted: false,
        })
    }

    pub(crate) fn child_schema(&self) -> &Arc<Schema> {
        self.child.schema()
    }

    pub(crate) fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub(crate) fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.count = None;
        self.emitted = false;
        Ok(())
    }

    pub(crate) fn rewind(&mut self) {
        self.emitted = false;
    }

    pub(crate) fn close(&mut self) {
        self.child.close();
        self.count = None;
        self.emitted = false;
    }

    pub(crate) fn fetch<F>(&mut self, mut apply: F) -> Result<Option<Tuple>>
    where
        F: FnMut(&Tuple) -> Result<()>,
    {
        if self.emitted {
            return Ok(None);
        }
        if self.count.is_none() {
            let mut applied: i32 = 0;
            while let Some(tuple) = self.child.next()? {
                apply(&tuple)?;
                applied += 1;
            }
            self.count = Some(Tuple::new(Arc::clone(&self.schema), vec![applied.into()])?);
        }
        self.emitted = true;
        Ok(self.count.clone())
    }
}
