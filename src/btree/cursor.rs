//! # Traversal Cursor
//!
//! A `Cursor` walks the tree in key order, yielding one record per call to
//! [`Cursor::next`]. Callers pull records across unrelated control-flow
//! steps (a table scan driven from outside the crate), so the walk keeps
//! its position in an explicit stack of `(node, next index)` frames rather
//! than in recursion.
//!
//! ## Walk Order
//!
//! The frame stack always holds the path from the root to the node being
//! walked. Opening a cursor descends the leftmost spine to a leaf without
//! yielding anything. Each `next` call then:
//!
//! 1. yields the top frame's next record if one remains — and, on an
//!    internal frame, first pushes the leftmost spine of the child subtree
//!    that follows the yielded separator;
//! 2. pops exhausted frames;
//! 3. reports exhaustion once the stack empties.
//!
//! The sequence is finite, strictly ascending, and not restartable in
//! place; a fresh cursor starts over from the root. Mutating the tree
//! while a cursor is open is prevented by the borrow the cursor holds.

use eyre::Result;
use smallvec::SmallVec;

use super::node::Node;
use super::tree::{Btree, MAX_TREE_DEPTH};
use crate::storage::NodeStore;

struct Frame {
    node: Node,
    /// Next record index to yield from this node.
    index: usize,
}

/// Resumable in-order traversal over an open tree.
///
/// Holds a shared borrow of the [`Btree`] for its whole lifetime, so the
/// tree cannot be mutated mid-scan.
pub struct Cursor<'t, 'a, S: NodeStore> {
    tree: &'t Btree<'a, S>,
    frames: SmallVec<[Frame; MAX_TREE_DEPTH]>,
}

impl<'t, 'a, S: NodeStore> Cursor<'t, 'a, S> {
    /// Opens a cursor positioned before the smallest record. A rootless
    /// tree yields an already-exhausted cursor.
    pub(crate) fn start(tree: &'t Btree<'a, S>) -> Result<Self> {
        let mut cursor = Self {
            tree,
            frames: SmallVec::new(),
        };
        if let Some(root) = tree.root_node() {
            cursor.push_leftmost_spine(root.clone())?;
        }
        Ok(cursor)
    }

    /// Pushes `node` and every node on the leftmost path below it.
    fn push_leftmost_spine(&mut self, node: Node) -> Result<()> {
        let mut next = node;
        loop {
            let child = if next.is_leaf() {
                None
            } else {
                Some(next.child_at(0)?)
            };
            self.frames.push(Frame {
                node: next,
                index: 0,
            });
            match child {
                Some(handle) => next = self.tree.load_node(handle)?,
                None => return Ok(()),
            }
        }
    }

    /// Yields the next record in ascending key order, or `None` once the
    /// tree is exhausted. Exhaustion is terminal: every later call also
    /// returns `None`.
    pub fn next(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };

            if frame.index >= frame.node.record_count() {
                self.frames.pop();
                continue;
            }

            let record = frame.node.record_at(frame.index)?.to_vec();
            frame.index += 1;

            // on an internal frame, everything in the child after this
            // separator comes next
            let descend = if frame.node.is_leaf() {
                None
            } else {
                Some(frame.node.child_at(frame.index)?)
            };
            if let Some(handle) = descend {
                let child = self.tree.load_node(handle)?;
                self.push_leftmost_spine(child)?;
            }

            return Ok(Some(record));
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::btree::{Btree, FixedKeyComparator, Order, TreeOptions};
    use crate::storage::MemoryNodeStore;

    fn letter_store() -> MemoryNodeStore {
        let options = TreeOptions::new(Order::Fixed(2), 1, 0);
        MemoryNodeStore::new(options.node_size().unwrap())
    }

    fn letter_tree(store: &mut MemoryNodeStore) -> Btree<'_, MemoryNodeStore> {
        let options = TreeOptions::new(Order::Fixed(2), 1, 0);
        Btree::create(store, options, Box::new(FixedKeyComparator::new(1))).unwrap()
    }

    fn drain(tree: &Btree<'_, MemoryNodeStore>) -> Vec<u8> {
        let mut cursor = tree.cursor().unwrap();
        let mut out = Vec::new();
        while let Some(record) = cursor.next().unwrap() {
            out.push(record[0]);
        }
        out
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let mut store = letter_store();
        let tree = letter_tree(&mut store);

        let mut cursor = tree.cursor().unwrap();
        assert_eq!(cursor.next().unwrap(), None);
        // exhaustion is terminal
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn single_leaf_yields_in_key_order() {
        let mut store = letter_store();
        let mut tree = letter_tree(&mut store);
        for letter in [b"C", b"A", b"B"] {
            tree.insert(letter).unwrap();
        }

        assert_eq!(drain(&tree), b"ABC");
    }

    #[test]
    fn multi_level_walk_interleaves_separators_and_subtrees() {
        let mut store = letter_store();
        let mut tree = letter_tree(&mut store);
        for letter in b'A'..=b'Z' {
            tree.insert(&[letter]).unwrap();
        }
        assert!(tree.height().unwrap() > 2);

        let scanned = drain(&tree);
        let expected: Vec<u8> = (b'A'..=b'Z').collect();
        assert_eq!(scanned, expected);
    }

    #[test]
    fn fresh_cursor_restarts_from_the_smallest_record() {
        let mut store = letter_store();
        let mut tree = letter_tree(&mut store);
        for letter in [b"A", b"B", b"C", b"D", b"E"] {
            tree.insert(letter).unwrap();
        }

        let mut first = tree.cursor().unwrap();
        assert_eq!(first.next().unwrap(), Some(b"A".to_vec()));
        assert_eq!(first.next().unwrap(), Some(b"B".to_vec()));
        drop(first);

        let mut second = tree.cursor().unwrap();
        assert_eq!(second.next().unwrap(), Some(b"A".to_vec()));
    }

    #[test]
    fn cursor_reflects_deletions() {
        let mut store = letter_store();
        let mut tree = letter_tree(&mut store);
        for letter in b'A'..=b'J' {
            tree.insert(&[letter]).unwrap();
        }
        for letter in [b"C", b"G"] {
            tree.delete(letter).unwrap();
        }

        assert_eq!(drain(&tree), b"ABDEFHIJ");
    }
}
