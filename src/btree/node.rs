//! # Node Structure and Codec
//!
//! This module defines the in-memory `Node` and the codec that moves it to
//! and from fixed-size byte blocks. Every node of a tree encodes to exactly
//! `node_size` bytes, so the store below deals only in whole opaque blocks.
//!
//! ## Node Block Layout
//!
//! For a tree of order `t` (minimum degree) and record size `R`, all fields
//! little-endian:
//!
//! ```text
//! Offset        Size        Field
//! ------        ----        ----------------------------------------
//! 0             4           record_count (u32)
//! 4             4           is_leaf (u32, nonzero = leaf)
//! 8             8t          2t child handles (u32 each, unused = 0)
//! 8 + 8t        (2t-1)*R    2t-1 record slots (unused slots zeroed)
//! ```
//!
//! Total: `node_size = 2*(t+1)*4 + (2t-1)*R`, fixed for the tree's
//! lifetime.
//!
//! ## Capacity Rules
//!
//! A node holds at most `2t-1` records; every non-root node holds at least
//! `t-1`. An internal node with `k` records has exactly `k+1` children.
//! The codec validates counts on both encode and decode; the slot regions
//! beyond the live counts are zero on encode and ignored on decode.
//!
//! ## Records
//!
//! Records are opaque `R`-byte sequences packed back to back in one owned
//! buffer, kept strictly ascending by key. Editing shifts the packed bytes;
//! with `2t-1` bounded by the node-size tuning this stays a small memmove.

use eyre::{ensure, Result};
use zerocopy::little_endian::U32;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::storage::NO_NODE;

pub const NODE_HEADER_SIZE: usize = 8;

/// Size in bytes of an encoded node for the given order and record size.
pub fn node_size_for(order: u32, record_size: usize) -> usize {
    let order = order as usize;
    NODE_HEADER_SIZE + 2 * order * 4 + (2 * order - 1) * record_size
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct NodeHeader {
    record_count: U32,
    is_leaf: U32,
}

const _: () = assert!(std::mem::size_of::<NodeHeader>() == NODE_HEADER_SIZE);

/// Geometry of one tree: order, record size, and the derived block layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeLayout {
    order: u32,
    record_size: usize,
}

impl NodeLayout {
    pub fn new(order: u32, record_size: usize) -> Result<Self> {
        ensure!(order >= 2, "tree order must be at least 2, got {}", order);
        ensure!(record_size > 0, "record size must be nonzero");
        Ok(Self { order, record_size })
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Smallest record count a non-root node may hold (`t-1`).
    pub fn min_records(&self) -> usize {
        self.order as usize - 1
    }

    /// Largest record count any node may hold (`2t-1`).
    pub fn max_records(&self) -> usize {
        2 * self.order as usize - 1
    }

    /// Largest child count an internal node may hold (`2t`).
    pub fn max_children(&self) -> usize {
        2 * self.order as usize
    }

    pub fn node_size(&self) -> usize {
        node_size_for(self.order, self.record_size)
    }

    fn records_offset(&self) -> usize {
        NODE_HEADER_SIZE + self.max_children() * 4
    }

    /// Encodes `node` into a fresh `node_size` block.
    pub fn encode(&self, node: &Node) -> Result<Vec<u8>> {
        ensure!(
            node.record_size == self.record_size,
            "node record size {} does not match layout record size {}",
            node.record_size,
            self.record_size
        );
        ensure!(
            node.record_count() <= self.max_records(),
            "node holds {} records, layout allows {}",
            node.record_count(),
            self.max_records()
        );
        if node.is_leaf {
            ensure!(
                node.children.is_empty(),
                "leaf node carries {} child handles",
                node.children.len()
            );
        } else {
            ensure!(
                node.children.len() == node.record_count() + 1,
                "internal node with {} records carries {} children",
                node.record_count(),
                node.children.len()
            );
        }

        let mut block = vec![0u8; self.node_size()];

        let header = NodeHeader {
            record_count: U32::new(node.record_count() as u32),
            is_leaf: U32::new(u32::from(node.is_leaf)),
        };
        block[..NODE_HEADER_SIZE].copy_from_slice(header.as_bytes());

        for (i, child) in node.children.iter().enumerate() {
            let offset = NODE_HEADER_SIZE + i * 4;
            block[offset..offset + 4].copy_from_slice(&child.to_le_bytes());
        }

        let records_offset = self.records_offset();
        block[records_offset..records_offset + node.records.len()]
            .copy_from_slice(&node.records);

        Ok(block)
    }

    /// Decodes a `node_size` block read from handle `position`.
    pub fn decode(&self, position: u32, block: &[u8]) -> Result<Node> {
        ensure!(
            block.len() == self.node_size(),
            "block size mismatch: {} != {}",
            block.len(),
            self.node_size()
        );

        let header = NodeHeader::ref_from_bytes(&block[..NODE_HEADER_SIZE])
            .map_err(|e| eyre::eyre!("failed to read node header: {:?}", e))?;

        let record_count = header.record_count.get() as usize;
        ensure!(
            record_count <= self.max_records(),
            "node {} claims {} records, layout allows {}",
            position,
            record_count,
            self.max_records()
        );

        let is_leaf = header.is_leaf.get() != 0;

        let mut children = Vec::new();
        if !is_leaf {
            children.reserve(record_count + 1);
            for i in 0..=record_count {
                let offset = NODE_HEADER_SIZE + i * 4;
                let handle = u32::from_le_bytes([
                    block[offset],
                    block[offset + 1],
                    block[offset + 2],
                    block[offset + 3],
                ]);
                ensure!(
                    handle != NO_NODE,
                    "node {} has an absent child handle at slot {}",
                    position,
                    i
                );
                children.push(handle);
            }
        }

        let records_offset = self.records_offset();
        let records_len = record_count * self.record_size;
        let records = block[records_offset..records_offset + records_len].to_vec();

        Ok(Node {
            position,
            is_leaf,
            record_size: self.record_size,
            children,
            records,
        })
    }
}

/// One tree node, decoded. `position` 0 means not yet persisted.
#[derive(Debug, Clone)]
pub struct Node {
    position: u32,
    is_leaf: bool,
    record_size: usize,
    children: Vec<u32>,
    records: Vec<u8>,
}

impl Node {
    pub fn leaf(record_size: usize) -> Self {
        Self {
            position: NO_NODE,
            is_leaf: true,
            record_size,
            children: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn internal(record_size: usize) -> Self {
        Self {
            position: NO_NODE,
            is_leaf: false,
            record_size,
            children: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn set_position(&mut self, handle: u32) {
        self.position = handle;
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn record_count(&self) -> usize {
        self.records.len() / self.record_size
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn record_at(&self, index: usize) -> Result<&[u8]> {
        ensure!(
            index < self.record_count(),
            "record index {} out of bounds (record_count={})",
            index,
            self.record_count()
        );
        let offset = index * self.record_size;
        Ok(&self.records[offset..offset + self.record_size])
    }

    pub fn insert_record(&mut self, index: usize, record: &[u8]) -> Result<()> {
        ensure!(
            record.len() == self.record_size,
            "record size mismatch: {} != {}",
            record.len(),
            self.record_size
        );
        ensure!(
            index <= self.record_count(),
            "record index {} out of bounds (record_count={})",
            index,
            self.record_count()
        );
        let offset = index * self.record_size;
        self.records
            .splice(offset..offset, record.iter().copied());
        Ok(())
    }

    pub fn remove_record(&mut self, index: usize) -> Result<Vec<u8>> {
        ensure!(
            index < self.record_count(),
            "record index {} out of bounds (record_count={})",
            index,
            self.record_count()
        );
        let offset = index * self.record_size;
        Ok(self
            .records
            .splice(offset..offset + self.record_size, std::iter::empty())
            .collect())
    }

    pub fn replace_record(&mut self, index: usize, record: &[u8]) -> Result<()> {
        ensure!(
            record.len() == self.record_size,
            "record size mismatch: {} != {}",
            record.len(),
            self.record_size
        );
        ensure!(
            index < self.record_count(),
            "record index {} out of bounds (record_count={})",
            index,
            self.record_count()
        );
        let offset = index * self.record_size;
        self.records[offset..offset + self.record_size].copy_from_slice(record);
        Ok(())
    }

    pub fn push_record(&mut self, record: &[u8]) -> Result<()> {
        self.insert_record(self.record_count(), record)
    }

    pub fn truncate_records(&mut self, count: usize) {
        self.records.truncate(count * self.record_size);
    }

    /// Detaches and returns the raw bytes of records `at..`.
    pub fn split_off_records(&mut self, at: usize) -> Vec<u8> {
        self.records.split_off(at * self.record_size)
    }

    /// Appends a raw record region produced by `split_off_records`.
    pub fn adopt_records(&mut self, records: Vec<u8>) {
        self.records.extend_from_slice(&records);
    }

    pub fn child_at(&self, index: usize) -> Result<u32> {
        ensure!(
            index < self.children.len(),
            "child index {} out of bounds (child_count={})",
            index,
            self.children.len()
        );
        Ok(self.children[index])
    }

    pub fn insert_child(&mut self, index: usize, handle: u32) -> Result<()> {
        ensure!(
            index <= self.children.len(),
            "child index {} out of bounds (child_count={})",
            index,
            self.children.len()
        );
        self.children.insert(index, handle);
        Ok(())
    }

    pub fn remove_child(&mut self, index: usize) -> Result<u32> {
        ensure!(
            index < self.children.len(),
            "child index {} out of bounds (child_count={})",
            index,
            self.children.len()
        );
        Ok(self.children.remove(index))
    }

    pub fn push_child(&mut self, handle: u32) {
        self.children.push(handle);
    }

    pub fn pop_child(&mut self) -> Result<u32> {
        match self.children.pop() {
            Some(handle) => Ok(handle),
            None => eyre::bail!("pop_child on a node with no children"),
        }
    }

    pub fn split_off_children(&mut self, at: usize) -> Vec<u32> {
        self.children.split_off(at)
    }

    pub fn adopt_children(&mut self, children: Vec<u32>) {
        self.children.extend_from_slice(&children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> NodeLayout {
        NodeLayout::new(2, 4).unwrap()
    }

    #[test]
    fn node_size_matches_formula() {
        // node_size = 2*(t+1)*4 + (2t-1)*R
        assert_eq!(node_size_for(2, 4), 2 * 3 * 4 + 3 * 4);
        assert_eq!(node_size_for(5, 16), 2 * 6 * 4 + 9 * 16);
        assert_eq!(layout().node_size(), 36);
    }

    #[test]
    fn layout_rejects_degenerate_parameters() {
        assert!(NodeLayout::new(1, 4).is_err());
        assert!(NodeLayout::new(2, 0).is_err());
    }

    #[test]
    fn leaf_roundtrip_is_exact() {
        let layout = layout();
        let mut node = Node::leaf(4);
        node.push_record(b"aaaa").unwrap();
        node.push_record(b"bbbb").unwrap();
        node.set_position(7);

        let block = layout.encode(&node).unwrap();
        assert_eq!(block.len(), layout.node_size());

        let decoded = layout.decode(7, &block).unwrap();
        assert_eq!(decoded.position(), 7);
        assert!(decoded.is_leaf());
        assert_eq!(decoded.record_count(), 2);
        assert_eq!(decoded.record_at(0).unwrap(), b"aaaa");
        assert_eq!(decoded.record_at(1).unwrap(), b"bbbb");
        assert_eq!(decoded.child_count(), 0);

        // exact inverse: re-encoding reproduces the block bit for bit
        assert_eq!(layout.encode(&decoded).unwrap(), block);
    }

    #[test]
    fn internal_roundtrip_keeps_children() {
        let layout = layout();
        let mut node = Node::internal(4);
        node.push_child(3);
        node.push_record(b"mmmm").unwrap();
        node.push_child(9);

        let block = layout.encode(&node).unwrap();
        let decoded = layout.decode(1, &block).unwrap();

        assert!(!decoded.is_leaf());
        assert_eq!(decoded.child_at(0).unwrap(), 3);
        assert_eq!(decoded.child_at(1).unwrap(), 9);
    }

    #[test]
    fn encode_rejects_overfull_node() {
        let layout = layout();
        let mut node = Node::leaf(4);
        for i in 0..4u8 {
            node.push_record(&[i; 4]).unwrap();
        }

        assert!(layout.encode(&node).is_err());
    }

    #[test]
    fn encode_rejects_child_record_mismatch() {
        let layout = layout();
        let mut node = Node::internal(4);
        node.push_record(b"mmmm").unwrap();
        node.push_child(3);

        assert!(layout.encode(&node).is_err());
    }

    #[test]
    fn decode_rejects_bad_record_count() {
        let layout = layout();
        let node = Node::leaf(4);
        let mut block = layout.encode(&node).unwrap();
        block[0] = 200;

        assert!(layout.decode(1, &block).is_err());
    }

    #[test]
    fn decode_rejects_wrong_block_size() {
        let layout = layout();

        assert!(layout.decode(1, &[0u8; 10]).is_err());
    }

    #[test]
    fn record_editing_shifts_neighbors() {
        let mut node = Node::leaf(2);
        node.push_record(b"aa").unwrap();
        node.push_record(b"cc").unwrap();
        node.insert_record(1, b"bb").unwrap();

        assert_eq!(node.record_at(1).unwrap(), b"bb");
        assert_eq!(node.record_at(2).unwrap(), b"cc");

        let removed = node.remove_record(0).unwrap();
        assert_eq!(removed, b"aa");
        assert_eq!(node.record_count(), 2);
        assert_eq!(node.record_at(0).unwrap(), b"bb");
    }

    #[test]
    fn split_off_records_detaches_tail() {
        let mut node = Node::leaf(2);
        for record in [b"aa", b"bb", b"cc"] {
            node.push_record(record).unwrap();
        }

        let tail = node.split_off_records(2);

        assert_eq!(node.record_count(), 2);
        assert_eq!(tail, b"cc");
    }
}
