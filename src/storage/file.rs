//! # Memory-Mapped File Node Store
//!
//! `FileNodeStore` persists node blocks in a single file: a 128-byte
//! `TreeFileHeader` followed by a dense run of `block_size` blocks. Block
//! handles are 1-based, so handle 0 stays free as the absent-node sentinel
//! and handle `h` lives at byte offset `128 + (h - 1) * block_size`.
//!
//! ## Mmap Discipline
//!
//! The file is memory-mapped for access. Mapped regions become invalid
//! when the file is grown and remapped; rather than runtime guards, the
//! borrow checker enforces safety:
//!
//! ```text
//! read(&self)            // Immutable borrow, copies the block out
//! write(&mut self)       // Mutable borrow (may grow + remap)
//! ```
//!
//! Since growing requires `&mut self`, no block reference can outlive a
//! remap. Reads copy the block out of the map, which also keeps the
//! `NodeStore` contract medium-neutral.
//!
//! ## Allocation and Deletion
//!
//! `write(None, ..)` appends: flush, extend the file by one block, remap,
//! write. `delete` validates the handle and then abandons the block — the
//! header's `free_head` field is reserved for a free-space table that is
//! never populated, so deleted blocks are unreachable dead space until the
//! tree is rebuilt into a fresh file. See DESIGN.md for the rationale.
//!
//! ## Durability
//!
//! `sync()` flushes the map (`msync` on Unix). Individual writes may sit
//! in the page cache until then. There is no write-ahead log; a crash
//! between the writes of a structural operation can leave the file
//! inconsistent, which is a documented property of this engine.

use std::fs::OpenOptions;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;
use zerocopy::IntoBytes;

use super::headers::{TreeFileHeader, TREE_HEADER_SIZE};
use super::{NodeStore, NO_NODE};

#[derive(Debug)]
pub struct FileNodeStore {
    file: std::fs::File,
    mmap: MmapMut,
    block_size: usize,
    block_count: u32,
}

impl FileNodeStore {
    /// Creates a new tree file containing only the header.
    pub fn create<P: AsRef<Path>>(path: P, header: &TreeFileHeader) -> Result<Self> {
        let path = path.as_ref();
        let block_size = header.block_size() as usize;

        ensure!(block_size > 0, "block size must be nonzero");

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .wrap_err_with(|| format!("failed to create tree file '{}'", path.display()))?;

        file.set_len(TREE_HEADER_SIZE as u64)
            .wrap_err("failed to reserve tree file header")?;

        // SAFETY: MmapMut::map_mut is unsafe because externally modified
        // files invalidate the mapping. This is safe because:
        // 1. The file was just created with truncate=true and is owned here
        // 2. The file length is exactly TREE_HEADER_SIZE
        // 3. The mapping's lifetime is tied to FileNodeStore
        // 4. All access is bounds-checked against block_count
        let mut mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        mmap[..TREE_HEADER_SIZE].copy_from_slice(header.as_bytes());
        mmap.flush().wrap_err("failed to flush tree file header")?;

        Ok(Self {
            file,
            mmap,
            block_size,
            block_count: 0,
        })
    }

    /// Opens an existing tree file, validating magic, version, and size.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .wrap_err_with(|| format!("failed to open tree file '{}'", path.display()))?;

        let file_size = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat '{}'", path.display()))?
            .len();

        ensure!(
            file_size >= TREE_HEADER_SIZE as u64,
            "tree file '{}' is smaller than its header ({} bytes)",
            path.display(),
            file_size
        );

        // SAFETY: MmapMut::map_mut is unsafe because externally modified
        // files invalidate the mapping. This is safe because:
        // 1. Tree files are single-owner; external mutation is out of contract
        // 2. The mapping's lifetime is tied to FileNodeStore
        // 3. All access is bounds-checked against block_count
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        let header = TreeFileHeader::from_bytes(&mmap[..TREE_HEADER_SIZE])?;
        let block_size = header.block_size() as usize;
        ensure!(block_size > 0, "tree file header has zero block size");

        let region = file_size - TREE_HEADER_SIZE as u64;
        ensure!(
            region % block_size as u64 == 0,
            "tree file '{}' node region of {} bytes is not a multiple of block size {}",
            path.display(),
            region,
            block_size
        );

        Ok(Self {
            file,
            mmap,
            block_size,
            block_count: (region / block_size as u64) as u32,
        })
    }

    /// Copy of the file header as currently persisted.
    pub fn header(&self) -> Result<TreeFileHeader> {
        Ok(*TreeFileHeader::from_bytes(&self.mmap[..TREE_HEADER_SIZE])?)
    }

    /// Rewrites the root handle in the persisted header.
    pub fn set_root_position(&mut self, handle: u32) -> Result<()> {
        let header = TreeFileHeader::from_bytes_mut(&mut self.mmap[..TREE_HEADER_SIZE])?;
        header.set_root_position(handle);
        Ok(())
    }

    pub fn block_count(&self) -> u32 {
        self.block_count
    }

    fn block_offset(&self, handle: u32) -> Result<usize> {
        ensure!(handle != NO_NODE, "handle 0 is the absent-node sentinel");
        ensure!(
            handle <= self.block_count,
            "handle {} out of bounds (block_count={})",
            handle,
            self.block_count
        );
        Ok(TREE_HEADER_SIZE + (handle as usize - 1) * self.block_size)
    }

    fn grow_by_one(&mut self) -> Result<()> {
        self.mmap
            .flush()
            .wrap_err("failed to flush mmap before grow")?;

        let new_count = self.block_count + 1;
        let new_size = TREE_HEADER_SIZE as u64 + new_count as u64 * self.block_size as u64;

        self.file
            .set_len(new_size)
            .wrap_err_with(|| format!("failed to extend tree file to {} bytes", new_size))?;

        // SAFETY: MmapMut::map_mut is unsafe because the old mapping becomes
        // invalid. This is safe because:
        // 1. grow_by_one takes &mut self, so no block references exist
        // 2. The old map was flushed above
        // 3. The file was extended to new_size before remapping
        // 4. The old map is dropped on assignment
        self.mmap = unsafe {
            MmapMut::map_mut(&self.file).wrap_err("failed to remap tree file after grow")?
        };

        self.block_count = new_count;
        Ok(())
    }
}

impl NodeStore for FileNodeStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read(&self, handle: u32) -> Result<Vec<u8>> {
        let offset = self.block_offset(handle)?;
        Ok(self.mmap[offset..offset + self.block_size].to_vec())
    }

    fn write(&mut self, handle: Option<u32>, block: &[u8]) -> Result<u32> {
        ensure!(
            block.len() == self.block_size,
            "block size mismatch: {} != {}",
            block.len(),
            self.block_size
        );

        let handle = match handle {
            Some(handle) => handle,
            None => {
                self.grow_by_one()?;
                self.block_count
            }
        };

        let offset = self.block_offset(handle)?;
        self.mmap[offset..offset + self.block_size].copy_from_slice(block);
        Ok(handle)
    }

    fn delete(&mut self, handle: u32) -> Result<()> {
        // Abandoned, not reclaimed; see module docs.
        self.block_offset(handle)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.mmap.flush().wrap_err("failed to sync tree file")
    }
}
