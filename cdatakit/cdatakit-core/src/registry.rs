//! Per-node ownership registry.
//!
//! A registry owns the storage of every node its parent allocated or took
//! over: children and the dictionary. It is not a reference count; a node is
//! registered in exactly one registry.

use std::ptr::NonNull;

use crate::{
    error::NodeError,
    memory::{try_box, try_reserve_one},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Built by this crate; its private data can be mutated through a view.
    Built,
    /// Produced elsewhere; only its release callback is trusted.
    Adopted,
}

struct Entry<N> {
    node: NonNull<N>,
    origin: Origin,
}

pub(crate) struct Registry<N> {
    entries: Vec<Entry<N>>,
}

impl<N> Registry<N> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Move `node` into registry-owned heap storage and return its stable
    /// address. On failure `node` is dropped, which releases it.
    pub(crate) fn insert(
        &mut self,
        node: N,
        origin: Origin,
        what: &'static str,
    ) -> Result<NonNull<N>, NodeError> {
        try_reserve_one(&mut self.entries, "ownership registry")?;
        let node = NonNull::from(Box::leak(try_box(node, what)?));
        self.entries.push(Entry { node, origin });
        Ok(node)
    }

    pub(crate) fn origin_of(&self, node: *const N) -> Option<Origin> {
        self.entries
            .iter()
            .find(|entry| std::ptr::eq(entry.node.as_ptr(), node))
            .map(|entry| entry.origin)
    }

    /// Drop a single registered node, running its release first.
    pub(crate) fn remove(&mut self, node: *const N) {
        if let Some(pos) = self
            .entries
            .iter()
            .position(|entry| std::ptr::eq(entry.node.as_ptr(), node))
        {
            let entry = self.entries.remove(pos);
            // SAFETY: the entry was leaked from a `Box` in `insert` and is no
            // longer reachable from the registry.
            drop(unsafe { Box::from_raw(entry.node.as_ptr()) });
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<N> Drop for Registry<N> {
    fn drop(&mut self) {
        // Nodes release themselves on drop; a node whose release already ran
        // is only deallocated.
        for entry in self.entries.drain(..) {
            // SAFETY: every entry was leaked from a `Box` in `insert` and is
            // freed only here or in `remove`.
            drop(unsafe { Box::from_raw(entry.node.as_ptr()) });
        }
    }
}
