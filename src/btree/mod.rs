//! # B-Tree Engine
//!
//! This module implements the tree core: the node structure and its block
//! codec, the pluggable key comparators, the tree algorithms (search,
//! insert with preemptive splitting, delete with preemptive rebalancing),
//! and the resumable in-order cursor.
//!
//! ## Module Map
//!
//! - [`node`]: typed `Node` and the `NodeLayout` codec between nodes and
//!   fixed-size byte blocks
//! - [`compare`]: the `KeyComparator` capability plus the fixed-size and
//!   length-prefixed implementations
//! - [`tree`]: the `Btree` itself — creation, search, insert, delete,
//!   structural validation
//! - [`cursor`]: one-record-at-a-time in-order traversal over an explicit
//!   frame stack
//!
//! ## Capabilities
//!
//! A `Btree` is parameterized over two capabilities injected at
//! construction: a [`NodeStore`](crate::storage::NodeStore) that moves
//! whole node blocks by opaque handle, and a [`KeyComparator`] that orders
//! key byte-regions. The tree itself never touches a file and never
//! interprets key bytes.

mod compare;
mod cursor;
mod node;
mod tree;

pub use compare::{FixedKeyComparator, KeyComparator, VarKeyComparator};
pub use cursor::Cursor;
pub use node::{node_size_for, Node, NodeLayout, NODE_HEADER_SIZE};
pub use tree::{Btree, DeleteOutcome, InsertOutcome, Order, TreeOptions, MAX_TREE_DEPTH};
