//! Arena storage for configuration nodes.
//!
//! Every node in a bundle — including every `Config` node reached through
//! an include graph — lives in one arena and is referenced by an opaque
//! [`Position`] rather than by Rust reference. This is what lets an
//! `Include` point at a `Config` without either node owning the other, and
//! lets the loop preventer reason about identity without borrowing the
//! tree.

use crate::node::NodeData;
use serde::{Deserialize, Serialize};

/// Opaque identity of a node within one bundle's arena.
///
/// Two nodes with identical kind, value, and children but different
/// positions are distinct — positions exist precisely to support this
/// distinction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position(u64);

impl Position {
    pub(crate) fn from_index(index: usize) -> Self {
        Position(index as u64)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owns every node of a loaded configuration bundle.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    nodes: Vec<NodeData>,
}

impl Arena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Allocates a new node and returns its position.
    pub fn alloc(&mut self, mut node: NodeData) -> Position {
        let position = Position::from_index(self.nodes.len());
        node.position = position;
        self.nodes.push(node);
        position
    }

    pub fn get(&self, position: Position) -> &NodeData {
        &self.nodes[position.index()]
    }

    pub fn get_mut(&mut self, position: Position) -> &mut NodeData {
        &mut self.nodes[position.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
