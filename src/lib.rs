//! # LoamDB - Embedded B-Tree Record Storage
//!
//! LoamDB is the ordered record storage core of a small embedded database:
//! a disk-backed B-tree over fixed-size records with unique keys, providing
//! point lookup, insertion, deletion, and resumable in-order scans.
//!
//! ## Quick Start
//!
//! ```ignore
//! use loamdb::btree::{Btree, FixedKeyComparator, Order, TreeOptions};
//! use loamdb::storage::MemoryNodeStore;
//!
//! let options = TreeOptions::new(Order::Auto, 64, 0);
//! let mut store = MemoryNodeStore::new(options.node_size()?);
//! let cmp = Box::new(FixedKeyComparator::new(8));
//! let mut tree = Btree::create(&mut store, options, cmp)?;
//!
//! tree.insert(&record)?;
//! let hit = tree.search(&key)?;
//! ```
//!
//! ## Architecture
//!
//! LoamDB sits underneath the query-facing layers of its host database.
//! The parser, executor, and catalog are external collaborators: they drive
//! this crate through the `Btree` operation surface and supply the two
//! capabilities it is parameterized over.
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Host database (parser/executor)    │
//! ├─────────────────────────────────────┤
//! │        B-Tree Core (this crate)      │
//! │   search / insert / delete / cursor  │
//! ├──────────────────┬──────────────────┤
//! │   KeyComparator  │    Node Codec     │
//! ├──────────────────┴──────────────────┤
//! │     NodeStore (file or memory)       │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Design Properties
//!
//! - **Fixed-size node blocks**: every node encodes to exactly
//!   `node_size` bytes determined by the tree order and record size,
//!   making store I/O a whole-block read/write by opaque handle.
//! - **Top-down rebalancing**: inserts split full children before
//!   descending, deletes top up minimal children before descending, so no
//!   corrective pass ever runs on the way back up the tree.
//! - **Scoped node ownership**: only the root stays resident; every other
//!   node lives exactly as long as the call frame that fetched it.
//!
//! ## Concurrency
//!
//! Single-threaded, synchronous, blocking. The core provides no locking;
//! concurrent mutation is undefined and must be prevented by the caller.
//!
//! ## Durability
//!
//! Store I/O failures abort the in-progress operation without rollback. A
//! fault between the writes of a multi-node split or merge can leave the
//! persisted tree inconsistent; crash safety is the responsibility of a
//! layer above this crate.
//!
//! ## Module Overview
//!
//! - [`btree`]: node codec, comparators, the tree algorithms, cursor
//! - [`storage`]: the `NodeStore` contract, file and memory backends,
//!   the persisted tree metadata header

pub mod btree;
pub mod storage;

pub use btree::{
    Btree, Cursor, DeleteOutcome, FixedKeyComparator, InsertOutcome, KeyComparator, Node,
    NodeLayout, Order, TreeOptions, VarKeyComparator,
};
pub use storage::{FileNodeStore, MemoryNodeStore, NodeStore, TreeFileHeader, NO_NODE};
