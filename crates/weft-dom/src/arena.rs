//! Node arena
//!
//! Handle-keyed node storage. Node handles interleave with reference-object
//! handles from the shared allocator, so the store is a map rather than a
//! dense vector.

use std::collections::HashMap;

use weft_wire::Handle;

use crate::node::Node;

/// Arena holding every live node of one document.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: HashMap<Handle, Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, handle: Handle, node: Node) {
        self.nodes.insert(handle, node);
    }

    pub fn get(&self, handle: Handle) -> Option<&Node> {
        self.nodes.get(&handle)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Node> {
        self.nodes.get_mut(&handle)
    }

    pub fn contains(&self, handle: Handle) -> bool {
        self.nodes.contains_key(&handle)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena = NodeArena::new();
        let handle = Handle::from_raw(10);
        arena.insert(handle, Node::text("hi"));
        assert!(arena.contains(handle));
        assert_eq!(arena.get(handle).and_then(Node::character_data), Some("hi"));
        assert!(!arena.contains(Handle::from_raw(11)));
    }
}
