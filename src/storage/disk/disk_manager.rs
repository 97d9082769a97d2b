use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::Result;

/// DiskManager reads and writes fixed-size pages of a single file.
///
/// Page `n` lives at byte offset `n * page_size`. The page count is always
/// derived from the file length, so pages appended by any writer are seen
/// by the next call to [`DiskManager::num_pages`].
pub struct DiskManager {
    /// The backing file
    file: Mutex<File>,
    /// Absolute path to the backing file
    path: PathBuf,
    /// Size of every page in bytes
    page_size: usize,
    /// Number of page reads performed
    num_reads: AtomicU32,
    /// Number of page writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the file at `path`, creating it if it doesn't exist.
    pub fn new<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        let path = path.as_ref().canonicalize()?;

        Ok(Self {
            file: Mutex::new(file),
            path,
            page_size,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads page `page_no` into `data`, which must be exactly one page long.
    /// Bytes past the end of the file read as zero.
    pub fn read_page(&self, page_no: u32, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), self.page_size, "Buffer must be one page");

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset(page_no)))?;

        let mut filled = 0;
        while filled < data.len() {
            match file.read(&mut data[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data`, which must be exactly one page long, over page `page_no`.
    pub fn write_page(&self, page_no: u32, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), self.page_size, "Buffer must be one page");

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(self.offset(page_no)))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of pages in the file, counting a trailing partial page.
    pub fn num_pages(&self) -> Result<u32> {
        let len = self.file.lock().metadata()?.len();
        Ok(len.div_ceil(self.page_size as u64) as u32)
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the number of page reads performed.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes performed.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the absolute path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    fn offset(&self, page_no: u32) -> u64 {
        page_no as u64 * self.page_size as u64
    }
}
