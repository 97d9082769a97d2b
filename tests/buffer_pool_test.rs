//! Integration tests for the buffer pool

use std::sync::Arc;
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata::common::{DbConfig, DbError, ErrorKind, PageId, Permissions, TableId, TransactionId};
use strata::storage::page::HeapPage;
use strata::tuple::{DataType, Schema, Tuple, TupleBuilder};
use strata::Database;
use tempfile::TempDir;

const PAGE_SIZE: usize = 64;

/// Two integer columns: 8-byte tuples, 7 slots per 64-byte page.
fn create_db(pool_pages: usize) -> (Database, TableId, Arc<Schema>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::new()
        .with_page_size(PAGE_SIZE)
        .with_pool_pages(pool_pages);
    let db = Database::new(config);
    let schema = Schema::from_types_and_names(&[DataType::Integer, DataType::Integer], &["a", "b"])
        .map(Arc::new)
        .unwrap();
    let table = db
        .create_table(dir.path().join("t.dat"), "t", Arc::clone(&schema), "a")
        .unwrap();
    (db, table, schema, dir)
}

fn add_empty_pages(db: &Database, table: TableId, schema: &Arc<Schema>, count: u32) {
    let file = db.catalog().file(table).unwrap();
    for page_no in 0..count {
        let page = HeapPage::empty(PageId::new(table, page_no), Arc::clone(schema), PAGE_SIZE);
        file.write_page(&page).unwrap();
    }
}

fn row(schema: &Arc<Schema>, a: i32, b: i32) -> Tuple {
    TupleBuilder::new(Arc::clone(schema)).value(a).value(b).build().unwrap()
}

#[test]
fn test_buffer_pool_fetch_caches_page() {
    let (db, table, schema, _dir) = create_db(4);
    add_empty_pages(&db, table, &schema, 1);
    let pool = db.buffer_pool();
    let txn = TransactionId::new();
    let pid = PageId::new(table, 0);

    let first = pool.fetch_page(txn, pid, Permissions::ReadOnly).unwrap();
    let second = pool.fetch_page(txn, pid, Permissions::ReadWrite).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(pool.len(), 1);
    assert!(pool.is_cached(pid));
    assert_eq!(db.catalog().file(table).unwrap().num_reads(), 1);
}

#[test]
fn test_buffer_pool_fetch_missing_page() {
    let (db, table, _schema, _dir) = create_db(4);
    let txn = TransactionId::new();

    let err = db
        .buffer_pool()
        .fetch_page(txn, PageId::new(table, 3), Permissions::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, DbError::PageNotFound { .. }));

    let err = db
        .buffer_pool()
        .fetch_page(txn, PageId::new(TableId::new(table.as_u32() ^ 1), 0), Permissions::ReadOnly)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn test_buffer_pool_fifo_eviction() {
    let (db, table, schema, _dir) = create_db(2);
    add_empty_pages(&db, table, &schema, 4);
    let pool = db.buffer_pool();
    let txn = TransactionId::new();
    let p = |n| PageId::new(table, n);

    pool.fetch_page(txn, p(0), Permissions::ReadOnly).unwrap();
    pool.fetch_page(txn, p(1), Permissions::ReadOnly).unwrap();
    // Re-fetching page 0 does not refresh its position
    pool.fetch_page(txn, p(0), Permissions::ReadOnly).unwrap();

    pool.fetch_page(txn, p(2), Permissions::ReadOnly).unwrap();
    assert!(!pool.is_cached(p(0)));
    assert_eq!(pool.cached_page_ids(), vec![p(1), p(2)]);

    pool.fetch_page(txn, p(3), Permissions::ReadOnly).unwrap();
    assert_eq!(pool.cached_page_ids(), vec![p(2), p(3)]);
}

#[test]
fn test_buffer_pool_capacity_invariant() {
    let capacity = 3;
    let (db, table, schema, _dir) = create_db(capacity);
    add_empty_pages(&db, table, &schema, 8);
    let pool = db.buffer_pool();
    let file = db.catalog().file(table).unwrap();
    let txn = TransactionId::new();
    let mut rng = StdRng::seed_from_u64(42);

    for i in 0..500 {
        match rng.gen_range(0..3) {
            0 => {
                let page_no = rng.gen_range(0..file.num_pages().unwrap());
                pool.fetch_page(txn, PageId::new(table, page_no), Permissions::ReadOnly)
                    .unwrap();
            }
            1 => {
                pool.insert_tuple(txn, table, &row(&schema, i, -i)).unwrap();
            }
            _ => {
                let page_no = rng.gen_range(0..file.num_pages().unwrap());
                let page = pool
                    .fetch_page(txn, PageId::new(table, page_no), Permissions::ReadWrite)
                    .unwrap();
                let victim = page.read().iter().next().cloned();
                if let Some(victim) = victim {
                    pool.delete_tuple(txn, &victim).unwrap();
                }
            }
        }
        assert!(pool.len() <= capacity, "pool holds {} pages", pool.len());
    }
}

#[test]
fn test_buffer_pool_flushes_dirty_victim() {
    let (db, table, schema, _dir) = create_db(1);
    add_empty_pages(&db, table, &schema, 2);
    let pool = db.buffer_pool();
    let file = db.catalog().file(table).unwrap();
    let txn = TransactionId::new();

    pool.insert_tuple(txn, table, &row(&schema, 7, 8)).unwrap();
    let page = pool
        .fetch_page(txn, PageId::new(table, 0), Permissions::ReadOnly)
        .unwrap();
    assert_eq!(page.read().dirtied_by(), Some(txn));

    let writes_before = file.num_writes();
    pool.fetch_page(txn, PageId::new(table, 1), Permissions::ReadOnly)
        .unwrap();
    assert_eq!(file.num_writes(), writes_before + 1);
    assert!(!pool.is_cached(PageId::new(table, 0)));

    let on_disk = file.read_page(PageId::new(table, 0)).unwrap();
    let stored: Vec<_> = on_disk.iter().cloned().collect();
    assert_eq!(stored, vec![row(&schema, 7, 8)]);
}

#[test]
fn test_buffer_pool_exhausted() {
    let (db, table, schema, _dir) = create_db(0);
    add_empty_pages(&db, table, &schema, 1);
    let txn = TransactionId::new();

    let err = db
        .buffer_pool()
        .fetch_page(txn, PageId::new(table, 0), Permissions::ReadOnly)
        .unwrap_err();
    assert!(matches!(err, DbError::PoolExhausted { capacity: 0 }));
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn test_buffer_pool_discard_drops_changes() {
    let (db, table, schema, _dir) = create_db(4);
    add_empty_pages(&db, table, &schema, 1);
    let pool = db.buffer_pool();
    let txn = TransactionId::new();
    let pid = PageId::new(table, 0);

    pool.insert_tuple(txn, table, &row(&schema, 1, 1)).unwrap();
    pool.discard_page(pid);
    assert!(!pool.is_cached(pid));
    assert!(pool.cached_page_ids().is_empty());

    let page = pool.fetch_page(txn, pid, Permissions::ReadOnly).unwrap();
    assert_eq!(page.read().iter().count(), 0);
}

#[test]
fn test_buffer_pool_flush_all() {
    let (db, table, schema, _dir) = create_db(8);
    let pool = db.buffer_pool();
    let file = db.catalog().file(table).unwrap();
    let txn = TransactionId::new();

    // 20 tuples over 7-slot pages: pages 0..=2
    for i in 0..20 {
        pool.insert_tuple(txn, table, &row(&schema, i, i)).unwrap();
    }
    assert_eq!(file.num_pages().unwrap(), 3);

    pool.flush_all_pages().unwrap();
    for pid in pool.cached_page_ids() {
        let cached = pool.fetch_page(txn, pid, Permissions::ReadOnly).unwrap();
        assert!(!cached.read().is_dirty());
    }

    let total: usize = (0..3)
        .map(|n| file.read_page(PageId::new(table, n)).unwrap().iter().count())
        .sum();
    assert_eq!(total, 20);

    // Flushing a clean page writes nothing; an uncached page reports false
    let writes = file.num_writes();
    assert!(pool.flush_page(PageId::new(table, 0)).unwrap());
    assert!(!pool.flush_page(PageId::new(table, 9)).unwrap());
    assert_eq!(file.num_writes(), writes);
}

#[test]
fn test_buffer_pool_transaction_complete() {
    let (db, table, schema, _dir) = create_db(8);
    add_empty_pages(&db, table, &schema, 2);
    let pool = db.buffer_pool();
    let file = db.catalog().file(table).unwrap();
    let pid = PageId::new(table, 0);

    let committed = TransactionId::new();
    pool.insert_tuple(committed, table, &row(&schema, 1, 1)).unwrap();
    pool.transaction_complete(committed, true).unwrap();
    assert_eq!(file.read_page(pid).unwrap().iter().count(), 1);
    assert!(pool.is_cached(pid));

    let aborted = TransactionId::new();
    pool.insert_tuple(aborted, table, &row(&schema, 2, 2)).unwrap();
    pool.transaction_complete(aborted, false).unwrap();
    assert!(!pool.is_cached(pid));

    let page = pool.fetch_page(aborted, pid, Permissions::ReadOnly).unwrap();
    assert_eq!(page.read().iter().count(), 1);
}

#[test]
fn test_buffer_pool_lock_hooks() {
    let (db, table, schema, _dir) = create_db(2);
    add_empty_pages(&db, table, &schema, 1);
    let pool = db.buffer_pool();
    let txn = TransactionId::new();
    let pid = PageId::new(table, 0);

    pool.fetch_page(txn, pid, Permissions::ReadWrite).unwrap();
    assert!(!pool.holds_lock(txn, pid));
    pool.release_page(txn, pid);
    assert!(pool.is_cached(pid));
}

#[test]
fn test_buffer_pool_concurrent_fetch() {
    let (db, table, schema, _dir) = create_db(16);
    add_empty_pages(&db, table, &schema, 4);
    let pool = Arc::clone(db.buffer_pool());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let txn = TransactionId::new();
                for i in 0..100u32 {
                    let pid = PageId::new(table, i % 4);
                    let page = pool.fetch_page(txn, pid, Permissions::ReadOnly).unwrap();
                    assert_eq!(page.read().id(), pid);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every page was loaded from disk exactly once
    assert_eq!(pool.len(), 4);
    assert_eq!(db.catalog().file(table).unwrap().num_reads(), 4);
}

fn stored_on_disk(db: &Database, table: TableId) -> Vec<i32> {
    let file = db.catalog().file(table).unwrap();
    let mut values: Vec<i32> = (0..file.num_pages().unwrap())
        .flat_map(|n| {
            let page = file.read_page(PageId::new(table, n)).unwrap();
            page.iter()
                .map(|t| t.field(0).unwrap().as_int().unwrap())
                .collect::<Vec<_>>()
        })
        .collect();
    values.sort();
    values
}

fn insert_concurrently(pool_pages: usize, with_readers: bool) {
    const WORKERS: i32 = 8;
    const PER_WORKER: i32 = 100;

    let (db, table, schema, _dir) = create_db(pool_pages);
    let pool = Arc::clone(db.buffer_pool());
    let file = db.catalog().file(table).unwrap();

    let mut handles: Vec<_> = (0..WORKERS)
        .map(|worker| {
            let pool = Arc::clone(&pool);
            let schema = Arc::clone(&schema);
            thread::spawn(move || {
                let txn = TransactionId::new();
                for i in 0..PER_WORKER {
                    let a = worker * PER_WORKER + i;
                    pool.insert_tuple(txn, table, &row(&schema, a, -a)).unwrap();
                }
            })
        })
        .collect();

    if with_readers {
        for seed in 0..2 {
            let pool = Arc::clone(&pool);
            let file = Arc::clone(&file);
            handles.push(thread::spawn(move || {
                let mut rng = StdRng::seed_from_u64(seed);
                let txn = TransactionId::new();
                for _ in 0..300 {
                    let num_pages = file.num_pages().unwrap();
                    if num_pages > 0 {
                        let pid = PageId::new(table, rng.gen_range(0..num_pages));
                        pool.fetch_page(txn, pid, Permissions::ReadOnly).unwrap();
                    }
                }
            }));
        }
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let scanned = file
        .iter(TransactionId::new(), Arc::clone(&pool))
        .unwrap()
        .count();
    assert_eq!(scanned, (WORKERS * PER_WORKER) as usize);

    pool.flush_all_pages().unwrap();
    let expected: Vec<i32> = (0..WORKERS * PER_WORKER).collect();
    assert_eq!(stored_on_disk(&db, table), expected);
    assert!(pool.len() <= pool_pages);
}

#[test]
fn test_buffer_pool_concurrent_inserts_keep_every_tuple() {
    insert_concurrently(4, false);
}

#[test]
fn test_buffer_pool_concurrent_inserts_under_eviction() {
    insert_concurrently(1, true);
}

#[test]
fn test_buffer_pool_concurrent_deletes() {
    let (db, table, schema, _dir) = create_db(2);
    let pool = Arc::clone(db.buffer_pool());
    let setup = TransactionId::new();
    for a in 0..400 {
        pool.insert_tuple(setup, table, &row(&schema, a, a)).unwrap();
    }
    pool.transaction_complete(setup, true).unwrap();

    let file = db.catalog().file(table).unwrap();
    let stored: Vec<Tuple> = file
        .iter(setup, Arc::clone(&pool))
        .unwrap()
        .collect::<strata::Result<_>>()
        .unwrap();

    // Odd rows are deleted by four threads while four others insert 400..600
    let odd: Vec<Tuple> = stored
        .into_iter()
        .filter(|t| t.field(0).unwrap().as_int().unwrap() % 2 == 1)
        .collect();
    let mut handles: Vec<_> = odd
        .chunks(50)
        .map(|chunk| {
            let pool = Arc::clone(&pool);
            let chunk = chunk.to_vec();
            thread::spawn(move || {
                let txn = TransactionId::new();
                for t in &chunk {
                    pool.delete_tuple(txn, t).unwrap();
                }
            })
        })
        .collect();
    for worker in 0..4 {
        let pool = Arc::clone(&pool);
        let schema = Arc::clone(&schema);
        handles.push(thread::spawn(move || {
            let txn = TransactionId::new();
            for i in 0..50 {
                let a = 400 + worker * 50 + i;
                pool.insert_tuple(txn, table, &row(&schema, a, a)).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    pool.flush_all_pages().unwrap();

    let expected: Vec<i32> = (0..400).step_by(2).chain(400..600).collect();
    assert_eq!(stored_on_disk(&db, table), expected);
}

#[test]
fn test_buffer_pool_update_after_eviction_hits_cached_copy() {
    let (db, table, schema, _dir) = create_db(1);
    add_empty_pages(&db, table, &schema, 2);
    let pool = db.buffer_pool();
    let txn = TransactionId::new();
    let p0 = PageId::new(table, 0);

    let stale = pool.fetch_page(txn, p0, Permissions::ReadWrite).unwrap();
    pool.fetch_page(txn, PageId::new(table, 1), Permissions::ReadOnly)
        .unwrap();
    assert!(!pool.is_cached(p0));

    let updated = pool
        .update_page(txn, p0, |page| page.insert_tuple(&row(&schema, 5, 6)).map(|_| ()))
        .unwrap();
    assert!(!Arc::ptr_eq(&stale, &updated));
    assert!(pool.is_cached(p0));
    assert_eq!(updated.read().dirtied_by(), Some(txn));
    assert_eq!(stale.read().iter().count(), 0);

    // A failed update leaves the page clean
    pool.flush_page(p0).unwrap();
    let err = pool
        .update_page(txn, p0, |page| page.delete_tuple(&row(&schema, 1, 1)))
        .unwrap_err();
    assert!(matches!(err, DbError::MissingRecordId));
    assert!(!updated.read().is_dirty());
}
