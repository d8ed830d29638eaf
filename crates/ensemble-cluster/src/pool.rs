//! Round-robin pool of data nodes

use crate::error::{ClusterError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed, ordered set of nodes handed out in rotation.
///
/// The set never changes after construction. Each call to [`NodePool::next`]
/// advances a shared cursor with a single atomic update, so concurrent callers
/// each get a distinct position and every node is picked equally often.
#[derive(Debug)]
pub struct NodePool<T> {
    nodes: Vec<T>,
    cursor: AtomicUsize,
}

impl<T> NodePool<T> {
    pub fn new(nodes: Vec<T>) -> Self {
        Self {
            nodes,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Select the node at the cursor and advance it
    pub fn next(&self) -> Result<&T> {
        let len = self.nodes.len();
        if len == 0 {
            return Err(ClusterError::EmptyPool);
        }

        let idx = match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
        {
            Ok(prev) | Err(prev) => prev,
        };
        Ok(&self.nodes[idx])
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.nodes.iter()
    }
}
