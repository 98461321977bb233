// Copyright 2025 the kdforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena-backed node layout (spec.md §3, §9's "Re-architecture" note).
//!
//! Nodes live in a `Vec` indexed by [`NodeId`] rather than being
//! heap-allocated with raw back-pointers. Slot `0` is the header sentinel:
//! `header.left == &header` becomes `idx == NodeId::HEADER`, a plain
//! integer comparison instead of a pointer-identity trick.

use alloc::vec::Vec;

/// An index into a [`Arena`]. `NodeId::HEADER` denotes the sentinel
/// end-of-iteration position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// The header sentinel, always slot 0.
    pub const HEADER: NodeId = NodeId(0);

    /// Is this the end-of-iteration sentinel?
    pub fn is_header(self) -> bool {
        self == Self::HEADER
    }

    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Slot<V> {
    pub(crate) parent: NodeId,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// 1 + count of descendants. Maintained for both the relaxed and idle
    /// engines (the idle engine's `size()` is a separate counter, but
    /// keeping weight uniform across both avoids splitting the node layout
    /// into two near-identical types for a handful of bytes).
    pub(crate) weight: u32,
    pub(crate) value: Option<V>,
}

/// The node arena backing a tree: a `Vec<Slot<V>>` plus a free list, in the
/// style of `understory_box_tree::Tree`'s generational slot arena (minus
/// the generation counter — kdforest-core's `NodeId`s never outlive the
/// operation that produced them, so staleness checks aren't needed).
#[derive(Clone, Debug)]
pub(crate) struct Arena<V> {
    slots: Vec<Slot<V>>,
    free: Vec<NodeId>,
}

impl<V> Arena<V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: alloc::vec![Slot {
                parent: NodeId::HEADER,
                left: Some(NodeId::HEADER),
                right: Some(NodeId::HEADER),
                weight: 0,
                value: None,
            }],
            free: Vec::new(),
        }
    }

    pub(crate) fn header(&self) -> &Slot<V> {
        &self.slots[0]
    }

    pub(crate) fn header_mut(&mut self) -> &mut Slot<V> {
        &mut self.slots[0]
    }

    pub(crate) fn get(&self, id: NodeId) -> &Slot<V> {
        &self.slots[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Slot<V> {
        &mut self.slots[id.index()]
    }

    pub(crate) fn allocate(&mut self, value: V) -> NodeId {
        let slot = Slot {
            parent: NodeId::HEADER,
            left: None,
            right: None,
            weight: 1,
            value: Some(value),
        };
        if let Some(id) = self.free.pop() {
            self.slots[id.index()] = slot;
            id
        } else {
            self.slots.push(slot);
            NodeId(u32::try_from(self.slots.len() - 1).expect("arena exceeded u32::MAX nodes"))
        }
    }

    /// Free a slot's value, returning it. The slot's links are left as-is;
    /// callers unlink a node from the tree before freeing it.
    pub(crate) fn free(&mut self, id: NodeId) -> V {
        debug_assert!(!id.is_header());
        let slot = &mut self.slots[id.index()];
        let value = slot.value.take().expect("double free of a tree node");
        self.free.push(id);
        value
    }

    pub(crate) fn clear(&mut self) {
        self.slots.truncate(1);
        *self.header_mut() = Slot {
            parent: NodeId::HEADER,
            left: Some(NodeId::HEADER),
            right: Some(NodeId::HEADER),
            weight: 0,
            value: None,
        };
        self.free.clear();
    }

    pub(crate) fn value(&self, id: NodeId) -> &V {
        self.get(id).value.as_ref().expect("node has no value")
    }

    pub(crate) fn value_mut(&mut self, id: NodeId) -> &mut V {
        self.get_mut(id).value.as_mut().expect("node has no value")
    }
}

impl<V> Default for Arena<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_free_reuses_slots() {
        let mut a: Arena<i32> = Arena::new();
        let n1 = a.allocate(1);
        let n2 = a.allocate(2);
        assert_ne!(n1, n2);
        assert_eq!(*a.value(n1), 1);
        let freed = a.free(n1);
        assert_eq!(freed, 1);
        let n3 = a.allocate(3);
        assert_eq!(n3, n1, "freed slot should be reused");
    }

    #[test]
    fn header_starts_self_referential() {
        let a: Arena<i32> = Arena::new();
        assert_eq!(a.header().left, Some(NodeId::HEADER));
        assert_eq!(a.header().right, Some(NodeId::HEADER));
        assert_eq!(a.header().parent, NodeId::HEADER);
    }
}
