//! # Tree Metadata Header
//!
//! Every tree file begins with a 128-byte header that records the
//! parameters a reader needs before it can interpret a single node block:
//! the block size, the record geometry, the tree order, and the handle of
//! the persisted root.
//!
//! ## Header Layout (128 bytes)
//!
//! ```text
//! Offset  Size  Field          Description
//! ------  ----  -------------  ----------------------------------------
//! 0       16    magic          b"LoamDB Tree" + NUL padding
//! 16      4     version        Format version (currently 1)
//! 20      4     block_size     Node block size in bytes
//! 24      4     record_size    Fixed record size in bytes
//! 28      4     key_position   Byte offset of the key region in a record
//! 32      4     order          Minimum degree t of the tree
//! 36      4     root_position  Handle of the persisted root (0 = none)
//! 40      4     free_head      Reserved free-space table head (unused)
//! 44      84    reserved       Zero padding
//! ```
//!
//! `free_head` is reserved format plumbing: nothing writes it and nothing
//! reads it. Deleted node blocks are abandoned, not chained here.
//!
//! ## Endianness
//!
//! All multi-byte fields are little-endian via the zerocopy `U32` wrapper,
//! so the header bytes are identical across hosts.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const TREE_HEADER_SIZE: usize = 128;
pub const TREE_MAGIC: &[u8; 16] = b"LoamDB Tree\x00\x00\x00\x00\x00";
pub const CURRENT_VERSION: u32 = 1;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct TreeFileHeader {
    magic: [u8; 16],
    version: U32,
    block_size: U32,
    record_size: U32,
    key_position: U32,
    order: U32,
    root_position: U32,
    free_head: U32,
    reserved: [u8; 84],
}

const _: () = assert!(std::mem::size_of::<TreeFileHeader>() == TREE_HEADER_SIZE);

impl TreeFileHeader {
    pub fn new(block_size: u32, record_size: u32, key_position: u32, order: u32) -> Self {
        Self {
            magic: *TREE_MAGIC,
            version: U32::new(CURRENT_VERSION),
            block_size: U32::new(block_size),
            record_size: U32::new(record_size),
            key_position: U32::new(key_position),
            order: U32::new(order),
            root_position: U32::new(0),
            free_head: U32::new(0),
            reserved: [0u8; 84],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        ensure!(
            bytes.len() >= TREE_HEADER_SIZE,
            "buffer too small for TreeFileHeader: {} < {}",
            bytes.len(),
            TREE_HEADER_SIZE
        );

        let header = Self::ref_from_bytes(&bytes[..TREE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse TreeFileHeader: {:?}", e))?;

        ensure!(
            &header.magic == TREE_MAGIC,
            "invalid magic bytes in tree file"
        );

        ensure!(
            header.version.get() == CURRENT_VERSION,
            "unsupported tree file version: {} (expected {})",
            header.version.get(),
            CURRENT_VERSION
        );

        Ok(header)
    }

    pub fn from_bytes_mut(bytes: &mut [u8]) -> Result<&mut Self> {
        ensure!(
            bytes.len() >= TREE_HEADER_SIZE,
            "buffer too small for TreeFileHeader: {} < {}",
            bytes.len(),
            TREE_HEADER_SIZE
        );

        let header = Self::mut_from_bytes(&mut bytes[..TREE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to parse TreeFileHeader: {:?}", e))?;

        ensure!(
            &header.magic == TREE_MAGIC,
            "invalid magic bytes in tree file"
        );

        Ok(header)
    }

    pub fn version(&self) -> u32 {
        self.version.get()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size.get()
    }

    pub fn record_size(&self) -> u32 {
        self.record_size.get()
    }

    pub fn key_position(&self) -> u32 {
        self.key_position.get()
    }

    pub fn order(&self) -> u32 {
        self.order.get()
    }

    pub fn root_position(&self) -> u32 {
        self.root_position.get()
    }

    pub fn set_root_position(&mut self, handle: u32) {
        self.root_position = U32::new(handle);
    }

    pub fn free_head(&self) -> u32 {
        self.free_head.get()
    }
}
