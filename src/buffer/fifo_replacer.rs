use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::common::PageId;

/// FIFO Replacement Policy
///
/// Pages are ordered by the time they entered the cache. The victim is
/// always the page that has been resident longest; later accesses to a
/// cached page do not change its position.
pub struct FifoReplacer {
    /// Cached pages, oldest at the front
    queue: Mutex<VecDeque<PageId>>,
}

impl FifoReplacer {
    /// Creates an empty replacer.
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Records that a page entered the cache.
    /// A page that is already tracked keeps its original position.
    pub fn record_insert(&self, page_id: PageId) {
        let mut queue = self.queue.lock();
        if !queue.contains(&page_id) {
            queue.push_back(page_id);
        }
    }

    /// Returns the page that would be evicted next without removing it.
    pub fn victim(&self) -> Option<PageId> {
        self.queue.lock().front().copied()
    }

    /// Removes and returns the oldest page.
    pub fn evict(&self) -> Option<PageId> {
        self.queue.lock().pop_front()
    }

    /// Stops tracking a page.
    pub fn remove(&self, page_id: PageId) {
        let mut queue = self.queue.lock();
        if let Some(pos) = queue.iter().position(|&p| p == page_id) {
            queue.remove(pos);
        }
    }

    /// Returns the tracked pages, oldest first.
    pub fn order(&self) -> Vec<PageId> {
        self.queue.lock().iter().copied().collect()
    }

    /// Returns the number of tracked pages.
    pub fn size(&self) -> usize {
        self.queue.lock().len()
    }
}

impl Default for FifoReplacer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::TableId;

    fn pid(n: u32) -> PageId {
        PageId::new(TableId::new(7), n)
    }

    #[test]
    fn test_fifo_replacer_evict_empty() {
        let replacer = FifoReplacer::new();
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.victim(), None);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_fifo_replacer_insertion_order() {
        let replacer = FifoReplacer::new();

        replacer.record_insert(pid(1));
        replacer.record_insert(pid(2));
        replacer.record_insert(pid(3));
        // Re-inserting does not move page 1 to the back
        replacer.record_insert(pid(1));

        assert_eq!(replacer.size(), 3);
        assert_eq!(replacer.victim(), Some(pid(1)));
        assert_eq!(replacer.evict(), Some(pid(1)));
        assert_eq!(replacer.evict(), Some(pid(2)));
        assert_eq!(replacer.order(), vec![pid(3)]);
    }

    #[test]
    fn test_fifo_replacer_remove() {
        let replacer = FifoReplacer::new();

        replacer.record_insert(pid(1));
        replacer.record_insert(pid(2));
        replacer.remove(pid(1));
        replacer.remove(pid(9));

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(pid(2)));
        assert_eq!(replacer.evict(), None);
    }
}
