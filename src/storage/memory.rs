//! # In-Memory Node Store
//!
//! `MemoryNodeStore` keeps node blocks in a `Vec`, one slot per handle.
//! It is the backend of choice for tests, demos, and throwaway trees, and
//! it doubles as the reference implementation of the `NodeStore` contract:
//! every property an on-disk backend must honor (bit-exact round-trips,
//! append allocation, overwrite in place) is trivially observable here.
//!
//! Unlike `FileNodeStore`, deleted handles ARE recycled: they go onto a
//! LIFO free list that `write(None, ..)` pops before growing the slot
//! vector. Reading a deleted handle is an error until the handle is
//! reissued.

use eyre::{ensure, Result};

use super::{NodeStore, NO_NODE};

#[derive(Debug)]
pub struct MemoryNodeStore {
    block_size: usize,
    blocks: Vec<Option<Vec<u8>>>,
    free: Vec<u32>,
}

impl MemoryNodeStore {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            blocks: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Number of live (non-deleted) blocks.
    pub fn live_blocks(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    fn slot(&self, handle: u32) -> Result<usize> {
        ensure!(handle != NO_NODE, "handle 0 is the absent-node sentinel");
        let index = handle as usize - 1;
        ensure!(
            index < self.blocks.len(),
            "handle {} out of bounds (block_count={})",
            handle,
            self.blocks.len()
        );
        Ok(index)
    }
}

impl NodeStore for MemoryNodeStore {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn read(&self, handle: u32) -> Result<Vec<u8>> {
        let index = self.slot(handle)?;
        match &self.blocks[index] {
            Some(block) => Ok(block.clone()),
            None => eyre::bail!("handle {} was deleted", handle),
        }
    }

    fn write(&mut self, handle: Option<u32>, block: &[u8]) -> Result<u32> {
        ensure!(
            block.len() == self.block_size,
            "block size mismatch: {} != {}",
            block.len(),
            self.block_size
        );

        match handle {
            Some(handle) => {
                let index = self.slot(handle)?;
                self.blocks[index] = Some(block.to_vec());
                Ok(handle)
            }
            None => match self.free.pop() {
                Some(handle) => {
                    let index = self.slot(handle)?;
                    self.blocks[index] = Some(block.to_vec());
                    Ok(handle)
                }
                None => {
                    self.blocks.push(Some(block.to_vec()));
                    Ok(self.blocks.len() as u32)
                }
            },
        }
    }

    fn delete(&mut self, handle: u32) -> Result<()> {
        let index = self.slot(handle)?;
        ensure!(
            self.blocks[index].is_some(),
            "handle {} already deleted",
            handle
        );
        self.blocks[index] = None;
        self.free.push(handle);
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_is_bit_exact() {
        let mut store = MemoryNodeStore::new(8);

        let handle = store.write(None, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let block = store.read(handle).unwrap();

        assert_eq!(block, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn append_allocates_sequential_handles() {
        let mut store = MemoryNodeStore::new(4);

        let first = store.write(None, &[0; 4]).unwrap();
        let second = store.write(None, &[0; 4]).unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn overwrite_in_place_keeps_handle() {
        let mut store = MemoryNodeStore::new(4);

        let handle = store.write(None, &[0; 4]).unwrap();
        let same = store.write(Some(handle), &[9; 4]).unwrap();

        assert_eq!(same, handle);
        assert_eq!(store.read(handle).unwrap(), vec![9; 4]);
    }

    #[test]
    fn deleted_handle_is_recycled() {
        let mut store = MemoryNodeStore::new(4);

        let first = store.write(None, &[1; 4]).unwrap();
        let second = store.write(None, &[2; 4]).unwrap();
        store.delete(first).unwrap();

        let reused = store.write(None, &[3; 4]).unwrap();

        assert_eq!(reused, first);
        assert_eq!(store.read(second).unwrap(), vec![2; 4]);
        assert_eq!(store.live_blocks(), 2);
    }

    #[test]
    fn read_of_deleted_handle_fails() {
        let mut store = MemoryNodeStore::new(4);

        let handle = store.write(None, &[1; 4]).unwrap();
        store.delete(handle).unwrap();

        assert!(store.read(handle).is_err());
    }

    #[test]
    fn wrong_block_size_is_rejected() {
        let mut store = MemoryNodeStore::new(4);

        assert!(store.write(None, &[0; 3]).is_err());
    }

    #[test]
    fn handle_zero_is_rejected() {
        let store = MemoryNodeStore::new(4);

        assert!(store.read(NO_NODE).is_err());
    }
}
