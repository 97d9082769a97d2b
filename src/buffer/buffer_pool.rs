use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::storage::page::HeapPage;
use crate::tuple::Tuple;

use super::FifoReplacer;

/// Shared handle to a cached page.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// BufferPool caches heap pages in memory on behalf of every table.
///
/// It holds at most `capacity` pages. When a page must be admitted into a
/// full pool, the page that has been cached longest is evicted first; a
/// dirty victim is written back to its heap file before it is dropped.
///
/// Capacity is strict: with capacity 2, fetching pages 1, 2 and 3 already
/// evicts page 1 when page 3 arrives, and a fourth fetch evicts page 2. A
/// pool that admits before checking (and briefly holds three pages) would
/// evict page 1 only on the fourth fetch; this one never exceeds `capacity`.
///
/// Latching:
/// - `admission` is held across the capacity check, eviction and insert, so
///   two threads never evict the same victim or overshoot the capacity. It is
///   also held while a page is modified through [`BufferPool::update_page`],
///   so a change and its dirty mark are never split by an eviction.
/// - `load_latches` holds one latch per page being read from disk, so a
///   second fetch of the same page waits for the first load instead of
///   repeating it.
/// - each page has its own `RwLock` guarding its slots and dirty state.
///
/// Order: load latch, then `admission`, then a page lock. A page lock is never
/// held while calling back into the pool.
pub struct BufferPool {
    /// Maximum number of cached pages
    capacity: usize,
    /// Resolves table IDs to heap files
    catalog: Arc<Catalog>,
    /// Page table: maps page IDs to cached pages
    pages: RwLock<HashMap<PageId, PageRef>>,
    /// FIFO replacer for eviction decisions
    replacer: FifoReplacer,
    /// In-flight loads, keyed by page
    load_latches: Mutex<HashMap<PageId, Arc<Mutex<()>>>>,
    /// Guards the check-evict-insert sequence
    admission: Mutex<()>,
}

impl BufferPool {
    /// Creates a buffer pool that caches at most `capacity` pages.
    pub fn new(capacity: usize, catalog: Arc<Catalog>) -> Self {
        Self {
            capacity,
            catalog,
            pages: RwLock::new(HashMap::new()),
            replacer: FifoReplacer::new(),
            load_latches: Mutex::new(HashMap::new()),
            admission: Mutex::new(()),
        }
    }

    /// Returns the page with the given ID, reading it from its heap file if
    /// it is not cached.
    ///
    /// `perm` is accepted for a future lock manager and does not restrict access.
    pub fn fetch_page(&self, txn: TransactionId, pid: PageId, perm: Permissions) -> Result<PageRef> {
        if let Some(page) = self.pages.read().get(&pid) {
            trace!(page_id = %pid, %txn, ?perm, "buffer pool hit");
            return Ok(Arc::clone(page));
        }

        let latch = Arc::clone(self.load_latches.lock().entry(pid).or_default());
        let _loading = latch.lock();

        // Another thread may have finished loading while we waited
        if let Some(page) = self.pages.read().get(&pid) {
            return Ok(Arc::clone(page));
        }

        let result = self
            .catalog
            .file(pid.table_id())
            .and_then(|file| file.read_page(pid))
            .and_then(|page| {
                debug!(page_id = %pid, %txn, "loaded page from disk");
                self.admit(Arc::new(RwLock::new(page)))
            });

        self.load_latches.lock().remove(&pid);
        result
    }

    /// Inserts a tuple into the given table on behalf of `txn`.
    ///
    /// The page that receives the tuple stays cached, marked dirty by `txn`.
    pub fn insert_tuple(&self, txn: TransactionId, table_id: TableId, tuple: &Tuple) -> Result<()> {
        let file = self.catalog.file(table_id)?;
        file.insert_tuple(txn, tuple, self)?;
        Ok(())
    }

    /// Deletes a tuple from the table that owns its record ID on behalf of `txn`.
    pub fn delete_tuple(&self, txn: TransactionId, tuple: &Tuple) -> Result<()> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        let file = self.catalog.file(record_id.page_id.table_id())?;
        file.delete_tuple(txn, tuple, self)?;
        Ok(())
    }

    /// Applies `update` to the cached copy of a page and marks it dirty by `txn`.
    ///
    /// The admission latch is held while `update` runs, so the page cannot be
    /// evicted between the change and the dirty mark. If the page was evicted
    /// after it was fetched, it is fetched again so the change always lands on
    /// the one cached copy.
    pub fn update_page<F>(&self, txn: TransactionId, pid: PageId, update: F) -> Result<PageRef>
    where
        F: FnOnce(&mut HeapPage) -> Result<()>,
    {
        let (page, _admission) = loop {
            let page = self.fetch_page(txn, pid, Permissions::ReadWrite)?;
            let admission = self.admission.lock();
            let resident = self
                .pages
                .read()
                .get(&pid)
                .is_some_and(|cached| Arc::ptr_eq(cached, &page));
            if resident {
                break (page, admission);
            }
            trace!(page_id = %pid, %txn, "page evicted before update, fetching again");
        };

        let mut guard = page.write();
        update(&mut guard)?;
        guard.mark_dirty(txn);
        drop(guard);
        Ok(page)
    }

    /// Writes every dirty cached page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        for page in self.snapshot() {
            self.write_back(&page)?;
        }
        Ok(())
    }

    /// Writes one cached page to disk if it is dirty.
    /// Returns false if the page is not cached.
    pub fn flush_page(&self, pid: PageId) -> Result<bool> {
        let page = self.pages.read().get(&pid).cloned();
        match page {
            Some(page) => {
                self.write_back(&page)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Writes every cached page last dirtied by `txn` to disk.
    pub fn flush_pages(&self, txn: TransactionId) -> Result<()> {
        for page in self.snapshot() {
            if page.read().dirtied_by() == Some(txn) {
                self.write_back(&page)?;
            }
        }
        Ok(())
    }

    /// Drops a page from the cache without writing it back.
    pub fn discard_page(&self, pid: PageId) {
        let _admission = self.admission.lock();
        if self.pages.write().remove(&pid).is_some() {
            debug!(page_id = %pid, "discarded page");
        }
        self.replacer.remove(pid);
    }

    /// Releases any lock `txn` holds on the page. No locks are taken by this
    /// pool, so this only records the call.
    pub fn release_page(&self, txn: TransactionId, pid: PageId) {
        trace!(page_id = %pid, %txn, "release page");
    }

    /// Returns whether `txn` holds a lock on the page. Always false, since no
    /// locks are taken by this pool.
    pub fn holds_lock(&self, _txn: TransactionId, _pid: PageId) -> bool {
        false
    }

    /// Finishes a transaction. On commit the pages it dirtied are written to
    /// disk; on abort they are dropped so the next fetch reads the disk image.
    pub fn transaction_complete(&self, txn: TransactionId, commit: bool) -> Result<()> {
        if commit {
            self.flush_pages(txn)?;
        } else {
            let touched: Vec<PageId> = self
                .snapshot()
                .iter()
                .map(|page| page.read())
                .filter(|page| page.dirtied_by() == Some(txn))
                .map(|page| page.id())
                .collect();
            for pid in touched {
                self.discard_page(pid);
            }
        }
        debug!(%txn, commit, "transaction complete");
        Ok(())
    }

    /// Returns the maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of cached pages.
    pub fn len(&self) -> usize {
        self.pages.read().len()
    }

    /// Returns true if no pages are cached.
    pub fn is_empty(&self) -> bool {
        self.pages.read().is_empty()
    }

    /// Returns whether the page is cached.
    pub fn is_cached(&self, pid: PageId) -> bool {
        self.pages.read().contains_key(&pid)
    }

    /// Returns the cached page IDs, oldest first.
    pub fn cached_page_ids(&self) -> Vec<PageId> {
        self.replacer.order()
    }

    /// Puts a freshly loaded page into the cache, evicting first if the pool
    /// is full. If the page is already cached, the cached copy is returned.
    fn admit(&self, page: PageRef) -> Result<PageRef> {
        let pid = page.read().id();
        let _admission = self.admission.lock();

        if let Some(existing) = self.pages.read().get(&pid) {
            return Ok(Arc::clone(existing));
        }

        if self.len() >= self.capacity {
            self.evict_page()?;
        }
        self.pages.write().insert(pid, Arc::clone(&page));
        self.replacer.record_insert(pid);
        Ok(page)
    }

    /// Evicts the oldest cached page, writing it back first if it is dirty.
    /// Must be called with the admission latch held.
    fn evict_page(&self) -> Result<()> {
        let victim = self.replacer.victim().ok_or(DbError::PoolExhausted {
            capacity: self.capacity,
        })?;

        let page = self.pages.read().get(&victim).cloned();
        let flushed = match page {
            Some(page) => self.write_back(&page)?,
            None => false,
        };

        self.pages.write().remove(&victim);
        self.replacer.remove(victim);
        debug!(page_id = %victim, flushed, "evicted page");
        Ok(())
    }

    /// Writes a page back to its heap file if it is dirty and marks it clean.
    /// Returns whether a write happened.
    fn write_back(&self, page: &PageRef) -> Result<bool> {
        let mut guard = page.write();
        if !guard.is_dirty() {
            return Ok(false);
        }
        let file = self.catalog.file(guard.id().table_id())?;
        file.write_page(&guard)?;
        guard.mark_clean();
        trace!(page_id = %guard.id(), "flushed page");
        Ok(true)
    }

    fn snapshot(&self) -> Vec<PageRef> {
        self.pages.read().values().cloned().collect()
    }
}
