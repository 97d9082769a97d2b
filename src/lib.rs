//! Strata - page-oriented storage and execution core for a relational database
//!
//! This crate provides the storage and query execution substrate of a
//! single-node DBMS. Tables live in heap files of fixed-size pages; a shared
//! buffer pool caches those pages in memory; queries are trees of pull-based
//! operators.
//!
//! # Architecture
//!
//! The system is organized into several layers:
//!
//! - **Tuples** (`tuple`): Schemas, fields and rows
//!   - `Schema`: Ordered, typed columns; equality ignores names
//!   - `Tuple`: Field values plus an optional on-disk `RecordId`
//!
//! - **Storage Layer** (`storage`): Handles disk I/O and page organization
//!   - `DiskManager`: Reads and writes fixed-size pages of one file
//!   - `HeapPage`: Slot bitmap followed by fixed-width tuple slots
//!   - `HeapFile`: Unordered page-granular storage for one table
//!
//! - **Buffer Pool** (`buffer`): Memory management for database pages
//!   - `BufferPool`: Bounded page cache with dirty-page bookkeeping
//!   - `FifoReplacer`: First-in first-out eviction order
//!
//! - **Catalog** (`catalog`): Table name and ID registry
//!
//! - **Execution** (`execution`): Scan, filter, aggregate, insert and delete operators
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::common::{DbConfig, TransactionId};
//! use strata::execution::{CompareOp, Filter, OpIterator, Predicate, SeqScan};
//! use strata::tuple::{DataType, Schema};
//! use strata::Database;
//!
//! let db = Database::new(DbConfig::default());
//! let schema = Schema::builder()
//!     .column("id", DataType::Integer)
//!     .column("name", DataType::Char(32))
//!     .build_arc()
//!     .unwrap();
//! let table = db.create_table("users.dat", "users", schema, "id").unwrap();
//!
//! let txn = TransactionId::new();
//! let scan = SeqScan::new(&db, txn, table, None).unwrap();
//! let mut filter = Filter::new(Predicate::new(0, CompareOp::LessThan, 10), Box::new(scan));
//!
//! filter.open().unwrap();
//! while let Some(tuple) = filter.next().unwrap() {
//!     println!("{}", tuple);
//! }
//! filter.close();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod execution;
pub mod storage;
pub mod tuple;

mod database;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageId, RecordId, Result, SlotId, TableId, TransactionId};
pub use database::Database;
