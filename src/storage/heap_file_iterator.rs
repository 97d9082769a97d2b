use std::collections::VecDeque;
use std::sync::Arc;

use crate::buffer::BufferPool;
use crate::common::{PageId, Permissions, Result, TransactionId};
use crate::tuple::Tuple;

use super::HeapFile;

/// Iterator over the tuples of a heap file.
///
/// Pages are pulled through the buffer pool one at a time; the occupied
/// tuples of the current page are copied out so no page latch is held
/// between calls. Pages without tuples are skipped.
pub struct HeapFileIterator {
    file: Arc<HeapFile>,
    pool: Arc<BufferPool>,
    txn: TransactionId,
    /// Page count captured when the iterator was opened or rewound
    num_pages: u32,
    /// Next page to load
    next_page: u32,
    /// Tuples of the current page not yet returned
    buffered: VecDeque<Tuple>,
}

impl HeapFileIterator {
    pub(crate) fn new(file: Arc<HeapFile>, pool: Arc<BufferPool>, txn: TransactionId) -> Result<Self> {
        let num_pages = file.num_pages()?;
        Ok(Self {
            file,
            pool,
            txn,
            num_pages,
            next_page: 0,
            buffered: VecDeque::new(),
        })
    }

    /// Restarts the iteration at page 0.
    pub fn rewind(&mut self) -> Result<()> {
        self.num_pages = self.file.num_pages()?;
        self.next_page = 0;
        self.buffered.clear();
        Ok(())
    }

    /// Loads pages until one with tuples is found. Returns false at the end of the file.
    fn fill(&mut self) -> Result<bool> {
        while self.buffered.is_empty() {
            if self.next_page >= self.num_pages {
                return Ok(false);
            }
            let pid = PageId::new(self.file.id(), self.next_page);
            self.next_page += 1;

            let page = self.pool.fetch_page(self.txn, pid, Permissions::ReadOnly)?;
            self.buffered.extend(page.read().iter().cloned());
        }
        Ok(true)
    }
}

impl Iterator for HeapFileIterator {
    type Item = Result<Tuple>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.fill() {
            Ok(true) => self.buffered.pop_front().map(Ok),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
