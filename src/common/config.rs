/// Default size of a page in bytes (4 KB)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default buffer pool capacity (number of cached pages)
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Default maximum length of a string field in bytes
pub const DEFAULT_STRING_LEN: u16 = 128;

/// On-disk width of an integer field
pub const INT_SIZE: usize = 4;

/// Length prefix stored in front of every string field
pub const STRING_LENGTH_PREFIX: usize = 4;

/// Runtime settings for a [`crate::Database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    /// Size of every page of every table file
    pub page_size: usize,
    /// Maximum number of pages the buffer pool caches
    pub pool_pages: usize,
}

impl DbConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_pool_pages(mut self, pool_pages: usize) -> Self {
        self.pool_pages = pool_pages;
        self
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pool_pages: DEFAULT_POOL_PAGES,
        }
    }
}
