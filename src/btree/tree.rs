//! # B-Tree Core
//!
//! This module implements the tree itself: creation and re-attachment,
//! point search, insertion with preemptive splitting, deletion with
//! preemptive rebalancing, and structural validation.
//!
//! ## Shape Invariants
//!
//! For a tree of order `t` (minimum degree):
//!
//! - Every node holds at most `2t-1` records; every non-root node holds at
//!   least `t-1`.
//! - An internal node with `k` records has exactly `k+1` children; child
//!   `i` covers the keys below record `i`, child `k` the keys above record
//!   `k-1`.
//! - Records within a node are strictly ascending by key.
//! - All leaves sit at the same depth.
//!
//! ## Top-Down Rebalancing
//!
//! Both mutating operations do their structural work on the way DOWN:
//!
//! - `insert` splits any full child before descending into it, so the
//!   recursion never has to split on the way back up. A full root grows
//!   the tree by one level first.
//! - `delete` never descends into a child holding the minimum `t-1`
//!   records: it first tops the child up with a record rotated from a
//!   richer sibling, or merges it with a sibling when both are minimal.
//!   Removal from a leaf therefore never underflows an ancestor.
//!
//! Descent is recursive; depth equals tree height, which the order tuning
//! keeps logarithmic and small, so the call stack is the ownership
//! mechanism: each frame fetches its node from the store, mutates it,
//! persists it, and drops it on every exit path. Only the root stays
//! resident, replaced wholesale when the tree grows or collapses a level.
//!
//! ## Collision Policy
//!
//! Duplicate keys are rejected, never updated in place. The target key is
//! checked against each node's records when the node is entered, and a
//! full child is scanned for the key *before* it is split, so a duplicate
//! never causes the node that holds it to split. Ancestor splits performed
//! earlier on the descent stand; they change structure, not the key set.
//!
//! ## Order Auto-Tuning
//!
//! `Order::Auto` derives the order from the record size by scanning ideal
//! block sizes from 1 KiB to 1 MiB in 1 KiB steps and keeping the order
//! whose node size lands closest to an ideal. This keeps store I/O
//! granularity sane across record sizes: small records get wide nodes,
//! huge records degrade gracefully toward the minimum order.
//!
//! ## What Is NOT Here
//!
//! No page cache (every non-root node is re-fetched per operation), no
//! WAL or rollback (a store fault mid-split can leave the persisted tree
//! inconsistent; crash safety belongs to a layer above), no concurrency
//! control.

use std::cmp::Ordering;

use eyre::{bail, ensure, Result};

use super::compare::KeyComparator;
use super::cursor::Cursor;
use super::node::{node_size_for, Node, NodeLayout};
use crate::storage::{NodeStore, NO_NODE};

/// Inline capacity for height-bounded stacks; deeper trees spill to heap.
pub const MAX_TREE_DEPTH: usize = 8;

const MIN_IDEAL_NODE_SIZE: usize = 1024;
const MAX_IDEAL_NODE_SIZE: usize = 1024 * 1024;

/// Tree order: caller-chosen minimum degree, or derived from record size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Auto,
    Fixed(u32),
}

/// Open-time tree parameters.
#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    pub order: Order,
    pub record_size: usize,
    pub key_position: usize,
}

impl TreeOptions {
    pub fn new(order: Order, record_size: usize, key_position: usize) -> Self {
        Self {
            order,
            record_size,
            key_position,
        }
    }

    pub fn resolve_order(&self) -> Result<u32> {
        match self.order {
            Order::Fixed(order) => {
                ensure!(order >= 2, "tree order must be at least 2, got {}", order);
                Ok(order)
            }
            Order::Auto => auto_order(self.record_size),
        }
    }

    /// Node block size these options produce; what the store must be
    /// sized for.
    pub fn node_size(&self) -> Result<usize> {
        Ok(node_size_for(self.resolve_order()?, self.record_size))
    }
}

/// Picks the order whose node size lands closest to an ideal block size,
/// scanning ideals from 1 KiB to 1 MiB in 1 KiB steps. Ties keep the
/// smaller ideal.
fn auto_order(record_size: usize) -> Result<u32> {
    ensure!(record_size > 0, "record size must be nonzero");

    let mut best_order = 2;
    let mut best_diff = usize::MAX;
    let mut ideal = MIN_IDEAL_NODE_SIZE;

    while ideal <= MAX_IDEAL_NODE_SIZE {
        // invert node_size = t*(8 + 2R) + 8 - R for the candidate order
        let order = ((ideal + record_size).saturating_sub(8) / (8 + 2 * record_size)).max(2) as u32;
        let diff = ideal.abs_diff(node_size_for(order, record_size));
        if diff < best_diff {
            best_diff = diff;
            best_order = order;
        }
        ideal += MIN_IDEAL_NODE_SIZE;
    }

    Ok(best_order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Record inserted.
    Inserted,
    /// A record with the same key already exists; the key set is unchanged.
    Collision,
    /// The tree has no root to insert into.
    NoRoot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Record removed.
    Deleted,
    /// No record with this key exists.
    NotFound,
    /// The tree has no root to delete from.
    NoRoot,
    /// The root exists but holds no records.
    EmptyRoot,
}

/// An open B-tree over a borrowed node store.
///
/// The root node stays resident for the lifetime of the open tree; its
/// handle is exposed through [`Btree::root_position`] so the embedding
/// layer can persist it (it changes when the tree grows or shrinks a
/// level).
pub struct Btree<'a, S: NodeStore> {
    store: &'a mut S,
    cmp: Box<dyn KeyComparator>,
    layout: NodeLayout,
    key_position: usize,
    root: Option<Node>,
}

impl<'a, S: NodeStore> Btree<'a, S> {
    /// Creates a fresh tree: validates the geometry against the store and
    /// persists a single empty leaf root.
    pub fn create(
        store: &'a mut S,
        options: TreeOptions,
        cmp: Box<dyn KeyComparator>,
    ) -> Result<Self> {
        let layout = Self::checked_layout(store, &options)?;

        let mut tree = Self {
            store,
            cmp,
            layout,
            key_position: options.key_position,
            root: None,
        };

        let mut root = Node::leaf(layout.record_size());
        tree.write_node(&mut root)?;
        tree.root = Some(root);
        Ok(tree)
    }

    /// Re-attaches to a persisted tree. `root_position` 0 opens the tree
    /// without a root; mutating operations then report `NoRoot`.
    pub fn open(
        store: &'a mut S,
        options: TreeOptions,
        root_position: u32,
        cmp: Box<dyn KeyComparator>,
    ) -> Result<Self> {
        let layout = Self::checked_layout(store, &options)?;

        let mut tree = Self {
            store,
            cmp,
            layout,
            key_position: options.key_position,
            root: None,
        };

        if root_position != NO_NODE {
            tree.root = Some(tree.load_node(root_position)?);
        }
        Ok(tree)
    }

    fn checked_layout(store: &S, options: &TreeOptions) -> Result<NodeLayout> {
        let layout = NodeLayout::new(options.resolve_order()?, options.record_size)?;
        ensure!(
            options.key_position < options.record_size,
            "key position {} outside record of {} bytes",
            options.key_position,
            options.record_size
        );
        ensure!(
            store.block_size() == layout.node_size(),
            "store block size {} does not match node size {}",
            store.block_size(),
            layout.node_size()
        );
        Ok(layout)
    }

    pub fn order(&self) -> u32 {
        self.layout.order()
    }

    pub fn record_size(&self) -> usize {
        self.layout.record_size()
    }

    pub fn key_position(&self) -> usize {
        self.key_position
    }

    pub fn node_size(&self) -> usize {
        self.layout.node_size()
    }

    /// Handle of the persisted root, or [`NO_NODE`] when absent.
    pub fn root_position(&self) -> u32 {
        self.root.as_ref().map_or(NO_NODE, Node::position)
    }

    /// Number of levels from root to leaf, 0 for a rootless tree.
    pub fn height(&self) -> Result<usize> {
        let Some(root) = self.root.as_ref() else {
            return Ok(0);
        };
        let mut height = 1;
        let mut next = if root.is_leaf() {
            None
        } else {
            Some(root.child_at(0)?)
        };
        while let Some(handle) = next {
            let node = self.load_node(handle)?;
            height += 1;
            next = if node.is_leaf() {
                None
            } else {
                Some(node.child_at(0)?)
            };
        }
        Ok(height)
    }

    /// Opens a cursor positioned before the smallest record.
    pub fn cursor(&self) -> Result<Cursor<'_, 'a, S>> {
        Cursor::start(self)
    }

    pub(crate) fn root_node(&self) -> Option<&Node> {
        self.root.as_ref()
    }

    pub(crate) fn load_node(&self, handle: u32) -> Result<Node> {
        ensure!(handle != NO_NODE, "attempted to load the absent-node sentinel");
        let block = self.store.read(handle)?;
        self.layout.decode(handle, &block)
    }

    fn write_node(&mut self, node: &mut Node) -> Result<()> {
        let block = self.layout.encode(node)?;
        let existing = match node.position() {
            NO_NODE => None,
            handle => Some(handle),
        };
        let handle = self.store.write(existing, &block)?;
        node.set_position(handle);
        Ok(())
    }

    fn key_of<'r>(&self, record: &'r [u8]) -> &'r [u8] {
        &record[self.key_position..]
    }

    fn compare_record(&self, record: &[u8], key: &[u8]) -> Ordering {
        self.cmp.compare(self.key_of(record), key)
    }

    /// Index of the first record with key >= target, and whether it is an
    /// exact match. Left-to-right scan over the node's sorted records.
    fn locate(&self, node: &Node, key: &[u8]) -> Result<(usize, bool)> {
        for index in 0..node.record_count() {
            match self.compare_record(node.record_at(index)?, key) {
                Ordering::Less => continue,
                Ordering::Equal => return Ok((index, true)),
                Ordering::Greater => return Ok((index, false)),
            }
        }
        Ok((node.record_count(), false))
    }

    // ----- search ---------------------------------------------------------

    /// Point lookup. Returns the stored record for `key`, or `None`.
    pub fn search(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let Some(root) = self.root.as_ref() else {
            return Ok(None);
        };
        self.search_node(root, key)
    }

    fn search_node(&self, node: &Node, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let (index, found) = self.locate(node, key)?;
        if found {
            return Ok(Some(node.record_at(index)?.to_vec()));
        }
        if node.is_leaf() {
            return Ok(None);
        }
        let child = self.load_node(node.child_at(index)?)?;
        self.search_node(&child, key)
    }

    // ----- insert ---------------------------------------------------------

    /// Inserts a record, keyed by its bytes at `key_position`. Duplicate
    /// keys are rejected with `Collision` and leave the key set unchanged.
    pub fn insert(&mut self, record: &[u8]) -> Result<InsertOutcome> {
        ensure!(
            record.len() == self.layout.record_size(),
            "record size mismatch: {} != {}",
            record.len(),
            self.layout.record_size()
        );

        let Some(mut root) = self.root.take() else {
            return Ok(InsertOutcome::NoRoot);
        };
        let outcome = self.insert_at_root(&mut root, record);
        self.root = Some(root);
        outcome
    }

    fn insert_at_root(&mut self, root: &mut Node, record: &[u8]) -> Result<InsertOutcome> {
        let key = &record[self.key_position..];

        if root.record_count() == self.layout.max_records() {
            if self.locate(root, key)?.1 {
                return Ok(InsertOutcome::Collision);
            }

            // grow the tree by one level, then split the old root
            let mut new_root = Node::internal(self.layout.record_size());
            new_root.push_child(root.position());
            let old_root = std::mem::replace(root, new_root);
            self.split_child(root, 0, old_root)?;
            tracing::trace!(
                target: "loamdb::btree",
                root = root.position(),
                "root was full, tree grew one level"
            );
        }

        self.insert_nonfull(root, record, key)
    }

    /// Descends from a node known to have room, splitting ahead of the
    /// descent wherever the next child is full.
    fn insert_nonfull(&mut self, node: &mut Node, record: &[u8], key: &[u8]) -> Result<InsertOutcome> {
        let (mut index, found) = self.locate(node, key)?;
        if found {
            return Ok(InsertOutcome::Collision);
        }

        if node.is_leaf() {
            node.insert_record(index, record)?;
            self.write_node(node)?;
            return Ok(InsertOutcome::Inserted);
        }

        let mut child = self.load_node(node.child_at(index)?)?;
        if child.record_count() == self.layout.max_records() {
            // a duplicate anywhere in the full child forbids the split
            if self.locate(&child, key)?.1 {
                return Ok(InsertOutcome::Collision);
            }

            self.split_child(node, index, child)?;

            // the median now sits at `index`; pick the side the key sorts into
            match self.compare_record(node.record_at(index)?, key) {
                Ordering::Less => index += 1,
                Ordering::Greater => {}
                Ordering::Equal => bail!("separator equals key after collision scan"),
            }
            child = self.load_node(node.child_at(index)?)?;
        }

        self.insert_nonfull(&mut child, record, key)
    }

    /// Splits the full child `left` of `parent` at child slot `index`:
    /// the upper `t-1` records and `t` children move to a new right
    /// sibling, the median record is promoted into `parent`. Persists
    /// left, right, then parent.
    fn split_child(&mut self, parent: &mut Node, index: usize, mut left: Node) -> Result<()> {
        let order = self.layout.order() as usize;
        ensure!(
            left.record_count() == self.layout.max_records(),
            "split of a node holding {} records (expected {})",
            left.record_count(),
            self.layout.max_records()
        );

        let median = left.record_at(order - 1)?.to_vec();

        let mut right = if left.is_leaf() {
            Node::leaf(self.layout.record_size())
        } else {
            Node::internal(self.layout.record_size())
        };
        right.adopt_records(left.split_off_records(order));
        if !left.is_leaf() {
            right.adopt_children(left.split_off_children(order));
        }
        left.truncate_records(order - 1);

        self.write_node(&mut left)?;
        self.write_node(&mut right)?;

        parent.insert_record(index, &median)?;
        parent.insert_child(index + 1, right.position())?;
        self.write_node(parent)?;

        tracing::trace!(
            target: "loamdb::btree",
            left = left.position(),
            right = right.position(),
            parent = parent.position(),
            "split full child, median promoted"
        );
        Ok(())
    }

    // ----- delete ---------------------------------------------------------

    /// Removes the record stored under `key`.
    pub fn delete(&mut self, key: &[u8]) -> Result<DeleteOutcome> {
        let Some(mut root) = self.root.take() else {
            return Ok(DeleteOutcome::NoRoot);
        };
        let outcome = self.delete_at_root(&mut root, key);
        self.root = Some(root);
        outcome
    }

    fn delete_at_root(&mut self, root: &mut Node, key: &[u8]) -> Result<DeleteOutcome> {
        if root.is_leaf() && root.record_count() == 0 {
            return Ok(DeleteOutcome::EmptyRoot);
        }

        let outcome = self.delete_from(root, key)?;

        // a merge may have drained the root; its sole child takes over
        if !root.is_leaf() && root.record_count() == 0 {
            let old_root = root.position();
            *root = self.load_node(root.child_at(0)?)?;
            self.store.delete(old_root)?;
            tracing::trace!(
                target: "loamdb::btree",
                root = root.position(),
                "empty root collapsed to its sole child"
            );
        }
        Ok(outcome)
    }

    /// Removes `key` from the subtree rooted at `node`, which is either
    /// the root or holds at least `t` records on entry.
    fn delete_from(&mut self, node: &mut Node, key: &[u8]) -> Result<DeleteOutcome> {
        let (index, found) = self.locate(node, key)?;

        if node.is_leaf() {
            if !found {
                return Ok(DeleteOutcome::NotFound);
            }
            node.remove_record(index)?;
            self.write_node(node)?;
            return Ok(DeleteOutcome::Deleted);
        }

        if found {
            return self.delete_internal(node, index, key);
        }

        let mut index = index;
        let mut child = self.load_node(node.child_at(index)?)?;
        if child.record_count() == self.layout.min_records() {
            child = self.fill_child(node, &mut index, child)?;
        }
        self.delete_from(&mut child, key)
    }

    /// Removes the record at `index` of internal `node`, replacing it with
    /// its in-order neighbor when a flanking child can spare one, merging
    /// the flanking children otherwise.
    fn delete_internal(&mut self, node: &mut Node, index: usize, key: &[u8]) -> Result<DeleteOutcome> {
        let min_records = self.layout.min_records();

        let mut left = self.load_node(node.child_at(index)?)?;
        if left.record_count() > min_records {
            let predecessor = self.subtree_max(&left)?;
            node.replace_record(index, &predecessor)?;
            self.write_node(node)?;
            let predecessor_key = &predecessor[self.key_position..];
            let outcome = self.delete_from(&mut left, predecessor_key)?;
            ensure!(
                outcome == DeleteOutcome::Deleted,
                "predecessor record vanished mid-delete"
            );
            return Ok(DeleteOutcome::Deleted);
        }

        let mut right = self.load_node(node.child_at(index + 1)?)?;
        if right.record_count() > min_records {
            let successor = self.subtree_min(&right)?;
            node.replace_record(index, &successor)?;
            self.write_node(node)?;
            let successor_key = &successor[self.key_position..];
            let outcome = self.delete_from(&mut right, successor_key)?;
            ensure!(
                outcome == DeleteOutcome::Deleted,
                "successor record vanished mid-delete"
            );
            return Ok(DeleteOutcome::Deleted);
        }

        // both flanking children minimal: fold them around the doomed key
        let mut merged = self.merge_children(node, index, left, right)?;
        self.delete_from(&mut merged, key)
    }

    /// Largest record in the subtree rooted at `node`.
    fn subtree_max(&self, node: &Node) -> Result<Vec<u8>> {
        ensure!(node.record_count() > 0, "subtree_max on an empty node");
        if node.is_leaf() {
            return Ok(node.record_at(node.record_count() - 1)?.to_vec());
        }
        let mut child = self.load_node(node.child_at(node.record_count())?)?;
        loop {
            ensure!(child.record_count() > 0, "empty node below the root");
            if child.is_leaf() {
                return Ok(child.record_at(child.record_count() - 1)?.to_vec());
            }
            child = self.load_node(child.child_at(child.record_count())?)?;
        }
    }

    /// Smallest record in the subtree rooted at `node`.
    fn subtree_min(&self, node: &Node) -> Result<Vec<u8>> {
        ensure!(node.record_count() > 0, "subtree_min on an empty node");
        if node.is_leaf() {
            return Ok(node.record_at(0)?.to_vec());
        }
        let mut child = self.load_node(node.child_at(0)?)?;
        loop {
            ensure!(child.record_count() > 0, "empty node below the root");
            if child.is_leaf() {
                return Ok(child.record_at(0)?.to_vec());
            }
            child = self.load_node(child.child_at(0)?)?;
        }
    }

    /// Tops up a minimal child before descent: rotate a record in from a
    /// richer sibling, or merge with a sibling when both are minimal.
    /// `index` is rewritten to the child slot of the returned node.
    fn fill_child(&mut self, parent: &mut Node, index: &mut usize, child: Node) -> Result<Node> {
        let min_records = self.layout.min_records();

        if *index > 0 {
            let mut left_sibling = self.load_node(parent.child_at(*index - 1)?)?;
            if left_sibling.record_count() > min_records {
                let mut child = child;
                // separator drops into the child, sibling's max rises
                child.insert_record(0, parent.record_at(*index - 1)?)?;
                if !child.is_leaf() {
                    let moved = left_sibling.pop_child()?;
                    child.insert_child(0, moved)?;
                }
                let lifted = left_sibling.remove_record(left_sibling.record_count() - 1)?;
                parent.replace_record(*index - 1, &lifted)?;

                self.write_node(&mut left_sibling)?;
                self.write_node(&mut child)?;
                self.write_node(parent)?;
                tracing::trace!(
                    target: "loamdb::btree",
                    child = child.position(),
                    sibling = left_sibling.position(),
                    "rotated a record in from the left sibling"
                );
                return Ok(child);
            }
        }

        if *index < parent.record_count() {
            let mut right_sibling = self.load_node(parent.child_at(*index + 1)?)?;
            if right_sibling.record_count() > min_records {
                let mut child = child;
                child.push_record(parent.record_at(*index)?)?;
                if !child.is_leaf() {
                    let moved = right_sibling.remove_child(0)?;
                    child.push_child(moved);
                }
                let lifted = right_sibling.remove_record(0)?;
                parent.replace_record(*index, &lifted)?;

                self.write_node(&mut right_sibling)?;
                self.write_node(&mut child)?;
                self.write_node(parent)?;
                tracing::trace!(
                    target: "loamdb::btree",
                    child = child.position(),
                    sibling = right_sibling.position(),
                    "rotated a record in from the right sibling"
                );
                return Ok(child);
            }
        }

        if *index < parent.record_count() {
            let right_sibling = self.load_node(parent.child_at(*index + 1)?)?;
            self.merge_children(parent, *index, child, right_sibling)
        } else {
            let left_sibling = self.load_node(parent.child_at(*index - 1)?)?;
            *index -= 1;
            self.merge_children(parent, *index, left_sibling, child)
        }
    }

    /// Folds `right` and the separating parent record at `index` into
    /// `left`, producing one `2t-1`-record node. The right node's handle
    /// is released to the store.
    fn merge_children(
        &mut self,
        parent: &mut Node,
        index: usize,
        mut left: Node,
        mut right: Node,
    ) -> Result<Node> {
        ensure!(
            left.record_count() + right.record_count() + 1 <= self.layout.max_records(),
            "merge would overflow: {} + {} + 1 records",
            left.record_count(),
            right.record_count()
        );

        left.push_record(parent.record_at(index)?)?;
        left.adopt_records(right.split_off_records(0));
        if !left.is_leaf() {
            left.adopt_children(right.split_off_children(0));
        }

        parent.remove_record(index)?;
        parent.remove_child(index + 1)?;

        self.write_node(&mut left)?;
        self.write_node(parent)?;
        self.store.delete(right.position())?;

        tracing::trace!(
            target: "loamdb::btree",
            survivor = left.position(),
            removed = right.position(),
            parent = parent.position(),
            "merged siblings around the separator"
        );
        Ok(left)
    }

    // ----- validation -----------------------------------------------------

    /// Walks the persisted tree and checks every shape invariant:
    /// capacity bounds, strict key order within nodes, separator ordering
    /// across levels, child counts, and uniform leaf depth.
    pub fn verify_structure(&self) -> Result<()> {
        let Some(root) = self.root.as_ref() else {
            return Ok(());
        };
        let mut leaf_depth = None;
        self.verify_node(root, 0, true, None, None, &mut leaf_depth)
    }

    fn verify_node(
        &self,
        node: &Node,
        depth: usize,
        is_root: bool,
        lower: Option<&[u8]>,
        upper: Option<&[u8]>,
        leaf_depth: &mut Option<usize>,
    ) -> Result<()> {
        let count = node.record_count();

        ensure!(
            count <= self.layout.max_records(),
            "node {} holds {} records, maximum is {}",
            node.position(),
            count,
            self.layout.max_records()
        );
        if !is_root {
            ensure!(
                count >= self.layout.min_records(),
                "node {} holds {} records, minimum is {}",
                node.position(),
                count,
                self.layout.min_records()
            );
        }

        for index in 0..count {
            let key = self.key_of(node.record_at(index)?);
            if index > 0 {
                let previous = self.key_of(node.record_at(index - 1)?);
                ensure!(
                    self.cmp.compare(previous, key) == Ordering::Less,
                    "records out of order in node {}",
                    node.position()
                );
            }
            if let Some(lower) = lower {
                ensure!(
                    self.cmp.compare(lower, key) == Ordering::Less,
                    "record below its separator in node {}",
                    node.position()
                );
            }
            if let Some(upper) = upper {
                ensure!(
                    self.cmp.compare(key, upper) == Ordering::Less,
                    "record above its separator in node {}",
                    node.position()
                );
            }
        }

        if node.is_leaf() {
            ensure!(
                node.child_count() == 0,
                "leaf node {} carries children",
                node.position()
            );
            match leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) => ensure!(
                    *expected == depth,
                    "leaf {} at depth {}, expected {}",
                    node.position(),
                    depth,
                    expected
                ),
            }
            return Ok(());
        }

        ensure!(
            node.child_count() == count + 1,
            "internal node {} with {} records has {} children",
            node.position(),
            count,
            node.child_count()
        );

        for index in 0..=count {
            let child = self.load_node(node.child_at(index)?)?;
            let lower = if index == 0 {
                lower
            } else {
                Some(self.key_of(node.record_at(index - 1)?))
            };
            let upper = if index == count {
                upper
            } else {
                Some(self.key_of(node.record_at(index)?))
            };
            self.verify_node(&child, depth + 1, false, lower, upper, leaf_depth)?;
        }
        Ok(())
    }
}
