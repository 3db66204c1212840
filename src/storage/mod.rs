//! # Storage Module
//!
//! This module defines the persistence boundary of the B-tree core: the
//! `NodeStore` contract, the two shipped backends, and the persisted tree
//! metadata header.
//!
//! ## The NodeStore Contract
//!
//! The tree reads and writes whole node blocks by opaque `u32` handle:
//!
//! ```text
//! read(handle)        -> bit-exact copy of one block_size block
//! write(None, block)  -> allocate a fresh handle (append), write, return it
//! write(Some(h), ..)  -> overwrite block h in place
//! delete(handle)      -> release the block (see below)
//! sync()              -> flush pending writes to the medium
//! ```
//!
//! Handle 0 ([`NO_NODE`]) never names a block; it is the universal sentinel
//! for "no node" / "not yet persisted". The tree core depends on nothing
//! about the medium beyond this contract, so backends can be files, memory,
//! or anything else that moves fixed-size blocks.
//!
//! ## Backends
//!
//! | Backend         | Medium            | Handle reuse after delete |
//! |-----------------|-------------------|---------------------------|
//! | FileNodeStore   | mmap'd file       | No (block abandoned)      |
//! | MemoryNodeStore | Vec of blocks     | Yes (LIFO free list)      |
//!
//! `FileNodeStore` deliberately abandons deleted blocks: the on-disk header
//! reserves a `free_head` field for a free-space table that no code path
//! populates or consults. Reclaiming that space is left to an offline
//! rebuild (scan the tree with a cursor into a fresh file) rather than
//! complicating the write path here.
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:                  TreeFileHeader (128 bytes)
//! Offset 128:                Block 1 (block_size bytes)
//! Offset 128 + block_size:   Block 2
//! ...
//! ```
//!
//! ## Thread Safety
//!
//! Stores are single-owner. The tree takes `&mut` for the lifetime of the
//! open tree; wrap in external synchronization if the host needs sharing.

mod file;
mod headers;
mod memory;

pub use file::FileNodeStore;
pub use headers::{TreeFileHeader, CURRENT_VERSION, TREE_HEADER_SIZE, TREE_MAGIC};
pub use memory::MemoryNodeStore;

use eyre::Result;

/// Sentinel handle meaning "no node" / "not yet persisted".
pub const NO_NODE: u32 = 0;

/// Block-granular persistence contract consumed by the B-tree core.
///
/// Implementations move opaque fixed-size blocks addressed by `u32`
/// handles. Handle [`NO_NODE`] is never a valid argument.
pub trait NodeStore {
    /// Size in bytes of every block this store moves.
    fn block_size(&self) -> usize;

    /// Returns a bit-exact copy of the block at `handle`.
    fn read(&self, handle: u32) -> Result<Vec<u8>>;

    /// Writes one block. `Some(handle)` overwrites in place; `None`
    /// allocates a new handle and returns it.
    fn write(&mut self, handle: Option<u32>, block: &[u8]) -> Result<u32>;

    /// Releases the block at `handle`. Whether the handle is ever reused
    /// is backend policy; after this call a read of `handle` may fail.
    fn delete(&mut self, handle: u32) -> Result<()>;

    /// Flushes all pending writes to the backing medium.
    fn sync(&self) -> Result<()>;
}
