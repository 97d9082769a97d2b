use thiserror::Error;

use super::types::{PageId, RecordId, SlotId, TableId};

/// Broad classification of a [`DbError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown table, field, page or record
    NotFound,
    /// A plan or value was rejected at construction time
    Configuration,
    /// An operator was driven outside its open state
    IllegalState,
    /// Reading or writing the backing page file failed
    Storage,
    /// The buffer pool could not make room
    Resource,
}

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table {0} not found")]
    TableNotFound(TableId),

    #[error("Table '{0}' not found")]
    TableNameNotFound(String),

    #[error("Page {page_id} not found: table file has {num_pages} pages")]
    PageNotFound { page_id: PageId, num_pages: u32 },

    #[error("Field index {index} out of range for schema with {count} fields")]
    FieldIndexOutOfRange { index: usize, count: usize },

    #[error("Field '{0}' not found")]
    FieldNameNotFound(String),

    #[error("Tuple has no record id")]
    MissingRecordId,

    #[error("Record {record_id} is not stored on {page_id}")]
    RecordNotOnPage { record_id: RecordId, page_id: PageId },

    #[error("Slot {slot_id} on {page_id} is empty")]
    EmptySlot { page_id: PageId, slot_id: SlotId },

    #[error("Page {0} is full")]
    PageFull(PageId),

    #[error("Corrupt page {page_id}: {reason}")]
    CorruptPage { page_id: PageId, reason: String },

    #[error("Schema mismatch: expected [{expected}], found [{found}]")]
    SchemaMismatch { expected: String, found: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Type mismatch at field {index}: expected {expected}, found {found}")]
    TypeMismatch {
        index: usize,
        expected: String,
        found: String,
    },

    #[error("String of {len} bytes exceeds field capacity of {max} bytes")]
    FieldTooLong { len: usize, max: usize },

    #[error("Tuple of {tuple_size} bytes does not fit in a {page_size}-byte page")]
    TupleTooWide { tuple_size: usize, page_size: usize },

    #[error("A {page_size}-byte page holds {slots} slots, more than a slot id can address")]
    TooManySlots { slots: usize, page_size: usize },

    #[error("Aggregate {op} is not supported over {data_type} fields")]
    UnsupportedAggregate { op: String, data_type: String },

    #[error("Aggregate {op} result {value} overflows an integer field")]
    AggregateOverflow { op: String, value: i64 },

    #[error("Operator is not open")]
    OperatorNotOpen,

    #[error("Buffer pool exhausted: no evictable page among {capacity} slots")]
    PoolExhausted { capacity: usize },
}

impl DbError {
    /// Returns the error class this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::TableNotFound(_)
            | DbError::TableNameNotFound(_)
            | DbError::PageNotFound { .. }
            | DbError::FieldIndexOutOfRange { .. }
            | DbError::FieldNameNotFound(_)
            | DbError::MissingRecordId
            | DbError::RecordNotOnPage { .. }
            | DbError::EmptySlot { .. } => ErrorKind::NotFound,

            DbError::SchemaMismatch { .. }
            | DbError::InvalidSchema(_)
            | DbError::TypeMismatch { .. }
            | DbError::FieldTooLong { .. }
            | DbError::TupleTooWide { .. }
            | DbError::TooManySlots { .. }
            | DbError::UnsupportedAggregate { .. }
            | DbError::AggregateOverflow { .. } => ErrorKind::Configuration,

            DbError::OperatorNotOpen => ErrorKind::IllegalState,

            DbError::Io(_) | DbError::CorruptPage { .. } | DbError::PageFull(_) => {
                ErrorKind::Storage
            }

            DbError::PoolExhausted { .. } => ErrorKind::Resource,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
