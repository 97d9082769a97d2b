use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::{BufferPool, PageRef};
use crate::common::{DbError, PageId, Permissions, Result, TableId, TransactionId};
use crate::tuple::{Schema, Tuple};

use super::disk::DiskManager;
use super::page::HeapPage;
use super::HeapFileIterator;

/// HeapFile stores the tuples of one table as an unordered sequence of
/// fixed-size heap pages in a single file.
///
/// Reads and writes of whole pages go straight to disk. Tuple insertion and
/// deletion go through the buffer pool, which owns the in-memory copy of
/// every cached page.
pub struct HeapFile {
    /// Identity derived from the file's absolute path
    id: TableId,
    /// Schema of every tuple in the file
    schema: Arc<Schema>,
    /// Page-granular access to the backing file
    disk: DiskManager,
    /// Serializes inserts so two callers never append the same page
    insert_latch: Mutex<()>,
}

impl HeapFile {
    /// Opens (creating if needed) the heap file at `path`.
    ///
    /// Fails if a tuple of `schema` does not fit on a page of `page_size` bytes,
    /// or if so many fit that slot numbers would overflow a [`SlotId`](crate::common::SlotId).
    pub fn open<P: AsRef<Path>>(path: P, schema: Arc<Schema>, page_size: usize) -> Result<Self> {
        let slots = HeapPage::slot_count(schema.size(), page_size);
        if slots == 0 {
            return Err(DbError::TupleTooWide {
                tuple_size: schema.size(),
                page_size,
            });
        }
        if slots > HeapPage::MAX_SLOTS {
            return Err(DbError::TooManySlots { slots, page_size });
        }

        let disk = DiskManager::new(path, page_size)?;
        let id = table_id_for(disk.path());

        debug!(table_id = %id, path = %disk.path().display(), "opened heap file");

        Ok(Self {
            id,
            schema,
            disk,
            insert_latch: Mutex::new(()),
        })
    }

    /// Returns the table ID of this file.
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Returns the schema of the tuples stored in this file.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.disk.page_size()
    }

    /// Returns the absolute path of the backing file.
    pub fn path(&self) -> &Path {
        self.disk.path()
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        self.disk.num_pages()
    }

    /// Returns the number of page reads issued against the file.
    pub fn num_reads(&self) -> u32 {
        self.disk.num_reads()
    }

    /// Returns the number of page writes issued against the file.
    pub fn num_writes(&self) -> u32 {
        self.disk.num_writes()
    }

    /// Reads and parses a page directly from disk.
    pub fn read_page(&self, pid: PageId) -> Result<HeapPage> {
        self.check_page(pid)?;

        let mut data = vec![0u8; self.page_size()];
        self.disk.read_page(pid.page_no(), &mut data)?;
        HeapPage::new(pid, Arc::clone(&self.schema), &data)
    }

    /// Writes a page image over its slot in the file.
    pub fn write_page(&self, page: &HeapPage) -> Result<()> {
        let pid = page.id();
        if pid.table_id() != self.id {
            return Err(DbError::TableNotFound(pid.table_id()));
        }
        let data = page.to_bytes()?;
        self.disk.write_page(pid.page_no(), &data)
    }

    /// Inserts a tuple into the first page with a free slot, appending a new
    /// page if every existing page is full. Returns the pages it modified,
    /// which the pool already holds marked dirty by `txn`.
    pub fn insert_tuple(
        &self,
        txn: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageRef>> {
        if **tuple.schema() != *self.schema {
            return Err(DbError::SchemaMismatch {
                expected: self.schema.to_string(),
                found: tuple.schema().to_string(),
            });
        }

        // Held until the tuple is in the cached page, so no other inserter
        // claims the same slot or sees an appended page before it is cached
        let _latch = self.insert_latch.lock();
        let num_pages = self.num_pages()?;

        for page_no in 0..num_pages {
            let pid = PageId::new(self.id, page_no);
            let has_room = pool
                .fetch_page(txn, pid, Permissions::ReadWrite)?
                .read()
                .num_empty_slots()
                > 0;
            if has_room {
                let page = pool.update_page(txn, pid, |page| page.insert_tuple(tuple).map(|_| ()))?;
                return Ok(vec![page]);
            }
            pool.release_page(txn, pid);
        }

        // Every page is full: reserve a new one on disk, then fill it through the pool
        let pid = PageId::new(self.id, num_pages);
        self.disk
            .write_page(num_pages, &HeapPage::empty_page_data(self.page_size()))?;
        debug!(page_id = %pid, "appended heap page");

        let page = pool.update_page(txn, pid, |page| page.insert_tuple(tuple).map(|_| ()))?;
        Ok(vec![page])
    }

    /// Frees the slot named by the tuple's record ID. Returns the page it modified.
    pub fn delete_tuple(
        &self,
        txn: TransactionId,
        tuple: &Tuple,
        pool: &BufferPool,
    ) -> Result<Vec<PageRef>> {
        let record_id = tuple.record_id().ok_or(DbError::MissingRecordId)?;
        self.check_page(record_id.page_id)?;

        let page = pool.update_page(txn, record_id.page_id, |page| page.delete_tuple(tuple))?;
        Ok(vec![page])
    }

    /// Returns an iterator over every tuple in the file, in page then slot order.
    ///
    /// Only the pages present when the iterator is created (or last rewound)
    /// are visited.
    pub fn iter(
        self: &Arc<Self>,
        txn: TransactionId,
        pool: Arc<BufferPool>,
    ) -> Result<HeapFileIterator> {
        HeapFileIterator::new(Arc::clone(self), pool, txn)
    }

    fn check_page(&self, pid: PageId) -> Result<()> {
        let num_pages = self.num_pages()?;
        if pid.table_id() != self.id || pid.page_no() >= num_pages {
            return Err(DbError::PageNotFound {
                page_id: pid,
                num_pages,
            });
        }
        Ok(())
    }
}

fn table_id_for(path: &Path) -> TableId {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    TableId::new(hasher.finish() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{RecordId, SlotId};
    use crate::tuple::{DataType, TupleBuilder};
    use tempfile::NamedTempFile;

    fn int_schema() -> Arc<Schema> {
        Schema::from_types(&[DataType::Integer, DataType::Integer])
            .map(Arc::new)
            .unwrap()
    }

    fn int_only_schema() -> Arc<Schema> {
        Schema::from_types(&[DataType::Integer]).map(Arc::new).unwrap()
    }

    #[test]
    fn test_open_rejects_wide_schema() {
        let temp = NamedTempFile::new().unwrap();
        let wide = Schema::from_types(&[DataType::Char(100)]).map(Arc::new).unwrap();
        assert!(matches!(
            HeapFile::open(temp.path(), wide, 64),
            Err(DbError::TupleTooWide { .. })
        ));
    }

    #[test]
    fn test_open_rejects_page_with_too_many_slots() {
        let temp = NamedTempFile::new().unwrap();
        // 4-byte tuples on a 1 MiB page: 254200 slots
        let err = HeapFile::open(temp.path(), int_only_schema(), 1 << 20).err().unwrap();
        assert!(matches!(err, DbError::TooManySlots { slots: 254200, .. }));
        assert_eq!(err.kind(), crate::common::ErrorKind::Configuration);

        // The largest page whose slots are all addressable still opens
        let max_page = (HeapPage::MAX_SLOTS * 33) / 8;
        assert_eq!(HeapPage::slot_count(4, max_page), HeapPage::MAX_SLOTS);
        assert!(HeapFile::open(temp.path(), int_only_schema(), max_page).is_ok());
    }

    #[test]
    fn test_id_is_stable_per_path() {
        let temp = NamedTempFile::new().unwrap();
        let a = HeapFile::open(temp.path(), int_schema(), 64).unwrap();
        let b = HeapFile::open(temp.path(), int_schema(), 64).unwrap();
        assert_eq!(a.id(), b.id());

        let other = NamedTempFile::new().unwrap();
        let c = HeapFile::open(other.path(), int_schema(), 64).unwrap();
        assert_ne!(a.id(), c.id());
    }

    #[test]
    fn test_read_write_page() {
        let temp = NamedTempFile::new().unwrap();
        let schema = int_schema();
        let file = HeapFile::open(temp.path(), schema.clone(), 64).unwrap();
        let pid = PageId::new(file.id(), 0);

        assert!(matches!(
            file.read_page(pid),
            Err(DbError::PageNotFound { num_pages: 0, .. })
        ));

        let mut page = HeapPage::empty(pid, schema.clone(), 64);
        let t = TupleBuilder::new(schema).value(4).value(5).build().unwrap();
        page.insert_tuple(&t).unwrap();
        file.write_page(&page).unwrap();
        assert_eq!(file.num_pages().unwrap(), 1);

        let read = file.read_page(pid).unwrap();
        assert_eq!(read.iter().count(), 1);
        assert_eq!(read.tuple(SlotId::new(0)), Some(&t));
        assert_eq!(
            read.tuple(SlotId::new(0)).unwrap().record_id(),
            Some(RecordId::new(pid, SlotId::new(0)))
        );
    }

    #[test]
    fn test_write_page_of_other_table_rejected() {
        let temp = NamedTempFile::new().unwrap();
        let schema = int_schema();
        let file = HeapFile::open(temp.path(), schema.clone(), 64).unwrap();
        let foreign = PageId::new(TableId::new(file.id().as_u32().wrapping_add(1)), 0);
        let page = HeapPage::empty(foreign, schema, 64);
        assert!(file.write_page(&page).is_err());
    }
}
