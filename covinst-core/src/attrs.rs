//! Per-node attributes passed from a parent's action to a child's
//!
//! Global invariants enforced:
//! - Attributes of a node are cleared when the traversal leaves it
//! - Synthetic nodes never receive attributes

use crate::node::NodeKey;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Attributes {
    /// Suppress the node and its whole subtree
    pub skip_all: bool,
    /// Branch record created for a switch, read by its cases
    pub branch: Option<usize>,
}

#[derive(Debug, Default)]
pub struct AttributeStore {
    entries: HashMap<NodeKey, Attributes>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, key: NodeKey) -> Option<&mut Attributes> {
        if key.is_synthetic() {
            return None;
        }
        Some(self.entries.entry(key).or_default())
    }

    pub fn mark_skip_all(&mut self, key: NodeKey) {
        if let Some(attrs) = self.entry(key) {
            attrs.skip_all = true;
        }
    }

    pub fn set_branch(&mut self, key: NodeKey, branch: usize) {
        if let Some(attrs) = self.entry(key) {
            attrs.branch = Some(branch);
        }
    }

    pub fn skip_all(&self, key: NodeKey) -> bool {
        self.entries.get(&key).is_some_and(|attrs| attrs.skip_all)
    }

    pub fn branch(&self, key: NodeKey) -> Option<usize> {
        self.entries.get(&key).and_then(|attrs| attrs.branch)
    }

    pub fn clear(&mut self, key: NodeKey) {
        self.entries.remove(&key);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
