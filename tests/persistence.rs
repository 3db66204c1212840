//! # Persistence Tests
//!
//! Integration coverage of the file-backed node store through the full
//! embedding flow: create a tree file, mutate the tree, persist the root
//! handle into the header, reopen, and find everything where it was left.

use std::path::Path;

use tempfile::tempdir;

use loamdb::btree::{Btree, DeleteOutcome, FixedKeyComparator, Order, TreeOptions};
use loamdb::storage::{FileNodeStore, NodeStore, TreeFileHeader, NO_NODE};

const RECORD_SIZE: usize = 16;
const KEY_POSITION: usize = 0;
const KEY_SIZE: usize = 8;

fn record(key: u64, tag: u8) -> [u8; RECORD_SIZE] {
    let mut record = [tag; RECORD_SIZE];
    record[..KEY_SIZE].copy_from_slice(&key.to_be_bytes());
    record
}

fn options() -> TreeOptions {
    TreeOptions::new(Order::Fixed(2), RECORD_SIZE, KEY_POSITION)
}

fn create_store(path: &Path) -> FileNodeStore {
    let options = options();
    let header = TreeFileHeader::new(
        options.node_size().unwrap() as u32,
        RECORD_SIZE as u32,
        KEY_POSITION as u32,
        2,
    );
    FileNodeStore::create(path, &header).unwrap()
}

/// Reopens a tree file the way an embedding layer would: read the header,
/// rebuild the options from it, re-attach at the persisted root.
fn reopen_tree(store: &mut FileNodeStore) -> Btree<'_, FileNodeStore> {
    let header = store.header().unwrap();
    let options = TreeOptions::new(
        Order::Fixed(header.order()),
        header.record_size() as usize,
        header.key_position() as usize,
    );
    let root = header.root_position();
    Btree::open(store, options, root, Box::new(FixedKeyComparator::new(KEY_SIZE))).unwrap()
}

#[test]
fn tree_contents_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.loam");

    {
        let mut store = create_store(&path);
        let root = {
            let mut tree =
                Btree::create(&mut store, options(), Box::new(FixedKeyComparator::new(KEY_SIZE)))
                    .unwrap();
            for key in 0..100u64 {
                tree.insert(&record(key, key as u8)).unwrap();
            }
            tree.root_position()
        };
        store.set_root_position(root).unwrap();
        store.sync().unwrap();
    }

    let mut store = FileNodeStore::open(&path).unwrap();
    let tree = reopen_tree(&mut store);

    tree.verify_structure().unwrap();
    for key in 0..100u64 {
        assert_eq!(
            tree.search(&key.to_be_bytes()).unwrap(),
            Some(record(key, key as u8).to_vec())
        );
    }
    assert_eq!(tree.search(&100u64.to_be_bytes()).unwrap(), None);
}

#[test]
fn root_position_tracks_root_splits_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.loam");

    let mut store = create_store(&path);
    let initial_root = {
        let tree =
            Btree::create(&mut store, options(), Box::new(FixedKeyComparator::new(KEY_SIZE)))
                .unwrap();
        tree.root_position()
    };
    store.set_root_position(initial_root).unwrap();

    // order 2: the fourth insert splits the root and allocates a new one
    let grown_root = {
        let mut tree = reopen_tree(&mut store);
        for key in 0..4u64 {
            tree.insert(&record(key, 0)).unwrap();
        }
        assert_eq!(tree.height().unwrap(), 2);
        tree.root_position()
    };
    assert_ne!(grown_root, initial_root);

    store.set_root_position(grown_root).unwrap();
    store.sync().unwrap();
    drop(store);

    let mut store = FileNodeStore::open(&path).unwrap();
    assert_eq!(store.header().unwrap().root_position(), grown_root);
    let tree = reopen_tree(&mut store);
    assert_eq!(tree.height().unwrap(), 2);
    tree.verify_structure().unwrap();
}

#[test]
fn mutations_after_reopen_land_in_the_same_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.loam");

    {
        let mut store = create_store(&path);
        let root = {
            let mut tree =
                Btree::create(&mut store, options(), Box::new(FixedKeyComparator::new(KEY_SIZE)))
                    .unwrap();
            for key in 0..50u64 {
                tree.insert(&record(key, 1)).unwrap();
            }
            tree.root_position()
        };
        store.set_root_position(root).unwrap();
        store.sync().unwrap();
    }

    {
        let mut store = FileNodeStore::open(&path).unwrap();
        let root = {
            let mut tree = reopen_tree(&mut store);
            for key in 0..25u64 {
                assert_eq!(
                    tree.delete(&key.to_be_bytes()).unwrap(),
                    DeleteOutcome::Deleted
                );
            }
            for key in 100..120u64 {
                tree.insert(&record(key, 2)).unwrap();
            }
            tree.root_position()
        };
        store.set_root_position(root).unwrap();
        store.sync().unwrap();
    }

    let mut store = FileNodeStore::open(&path).unwrap();
    let tree = reopen_tree(&mut store);
    tree.verify_structure().unwrap();
    assert_eq!(tree.search(&10u64.to_be_bytes()).unwrap(), None);
    assert!(tree.search(&30u64.to_be_bytes()).unwrap().is_some());
    assert!(tree.search(&110u64.to_be_bytes()).unwrap().is_some());

    let mut cursor = tree.cursor().unwrap();
    let mut count = 0;
    while cursor.next().unwrap().is_some() {
        count += 1;
    }
    assert_eq!(count, 45);
}

#[test]
fn fresh_file_opens_with_no_root() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("t.loam");

    {
        let store = create_store(&path);
        store.sync().unwrap();
    }

    let mut store = FileNodeStore::open(&path).unwrap();
    let header = store.header().unwrap();
    assert_eq!(header.root_position(), NO_NODE);
    assert_eq!(store.block_size(), options().node_size().unwrap());

    let mut tree = reopen_tree(&mut store);
    assert_eq!(tree.search(&1u64.to_be_bytes()).unwrap(), None);
    assert_eq!(
        tree.insert(&record(1, 0)).unwrap(),
        loamdb::btree::InsertOutcome::NoRoot
    );
}
