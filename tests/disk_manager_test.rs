//! Integration tests for the disk manager

use std::sync::Arc;
use std::thread;

use rand::seq::SliceRandom;
use rand::thread_rng;
use strata::common::DEFAULT_PAGE_SIZE;
use strata::storage::disk::DiskManager;
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_random_access() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path(), DEFAULT_PAGE_SIZE).unwrap();

    // Write to pages in random order
    let mut write_order: Vec<u32> = (0..10).collect();
    write_order.shuffle(&mut thread_rng());
    for &page_no in &write_order {
        let mut data = vec![0u8; DEFAULT_PAGE_SIZE];
        data[0] = page_no as u8;
        dm.write_page(page_no, &data).unwrap();
    }
    assert_eq!(dm.num_pages().unwrap(), 10);

    // Read back and verify
    for page_no in 0..10u32 {
        let mut data = vec![0u8; DEFAULT_PAGE_SIZE];
        dm.read_page(page_no, &mut data).unwrap();
        assert_eq!(data[0], page_no as u8);
    }
}

#[test]
fn test_disk_manager_persistence() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    let test_data = b"Persistence test";

    // Write data
    {
        let dm = DiskManager::new(&path, DEFAULT_PAGE_SIZE).unwrap();
        let mut data = vec![0u8; DEFAULT_PAGE_SIZE];
        data[..test_data.len()].copy_from_slice(test_data);
        dm.write_page(1, &data).unwrap();
        dm.sync().unwrap();
    }

    // Read back with a new DiskManager
    {
        let dm = DiskManager::new(&path, DEFAULT_PAGE_SIZE).unwrap();
        assert_eq!(dm.num_pages().unwrap(), 2);

        let mut data = vec![0u8; DEFAULT_PAGE_SIZE];
        dm.read_page(1, &mut data).unwrap();
        assert_eq!(&data[..test_data.len()], test_data);
    }
}

#[test]
fn test_disk_manager_page_size_is_per_file() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path(), 512).unwrap();

    let data = vec![7u8; 512];
    dm.write_page(3, &data).unwrap();
    assert_eq!(std::fs::metadata(temp_file.path()).unwrap().len(), 4 * 512);
    assert_eq!(dm.num_pages().unwrap(), 4);
}

#[test]
fn test_disk_manager_concurrent_writes() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path(), DEFAULT_PAGE_SIZE).unwrap());

    let handles: Vec<_> = (0..4u32)
        .map(|worker| {
            let dm = Arc::clone(&dm);
            thread::spawn(move || {
                for i in 0..10u32 {
                    let page_no = worker * 10 + i;
                    let mut data = vec![0u8; DEFAULT_PAGE_SIZE];
                    data[0] = page_no as u8;
                    dm.write_page(page_no, &data).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(dm.num_writes(), 40);
    for page_no in 0..40u32 {
        let mut data = vec![0u8; DEFAULT_PAGE_SIZE];
        dm.read_page(page_no, &mut data).unwrap();
        assert_eq!(data[0], page_no as u8);
    }
}
