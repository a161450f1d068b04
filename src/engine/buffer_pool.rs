//! Pre-allocated per-node signal buffers.
//!
//! The engine keeps two pools: one holding every node's output buffers and
//! one holding the mixed-input scratch buffers. All buffers are allocated
//! when a node appears and resized only on configuration changes, so the
//! render path never allocates.

use std::collections::BTreeMap;

use crate::dsp::signal::{SignalBuffer, SignalKind};
use crate::graph::NodeId;

/// A pool of per-node buffer sets, one [`SignalBuffer`] per port.
pub struct BufferPool {
    buffers: BTreeMap<NodeId, Vec<SignalBuffer>>,
    block_size: usize,
}

impl BufferPool {
    /// Creates an empty pool sized for the given block size.
    pub fn new(block_size: usize) -> Self {
        Self {
            buffers: BTreeMap::new(),
            block_size,
        }
    }

    /// Allocates one buffer per port kind for a node, replacing any
    /// existing set.
    pub fn allocate_node(&mut self, node_id: NodeId, kinds: &[SignalKind]) {
        let set = kinds
            .iter()
            .map(|&kind| SignalBuffer::new(kind, self.block_size))
            .collect();
        self.buffers.insert(node_id, set);
    }

    /// Drops a node's buffers.
    pub fn deallocate_node(&mut self, node_id: NodeId) {
        self.buffers.remove(&node_id);
    }

    /// Borrows a node's full buffer set.
    pub fn node_buffers(&self, node_id: NodeId) -> Option<&[SignalBuffer]> {
        self.buffers.get(&node_id).map(Vec::as_slice)
    }

    /// Mutably borrows a node's full buffer set.
    pub fn node_buffers_mut(&mut self, node_id: NodeId) -> Option<&mut [SignalBuffer]> {
        self.buffers.get_mut(&node_id).map(Vec::as_mut_slice)
    }

    /// Borrows one port's buffer.
    pub fn get(&self, node_id: NodeId, port: usize) -> Option<&SignalBuffer> {
        self.buffers.get(&node_id).and_then(|set| set.get(port))
    }

    /// Resets every buffer to the mixing identity.
    pub fn clear_all(&mut self) {
        for set in self.buffers.values_mut() {
            for buffer in set {
                buffer.clear();
            }
        }
    }

    /// Resizes every sample buffer to a new block size.
    pub fn resize_all(&mut self, block_size: usize) {
        self.block_size = block_size;
        for set in self.buffers.values_mut() {
            for buffer in set {
                buffer.resize(block_size);
            }
        }
    }

    /// The block size buffers are currently sized for.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Drops all buffer sets.
    pub fn clear_pool(&mut self) {
        self.buffers.clear();
    }

    /// Total number of buffers across all nodes.
    pub fn len(&self) -> usize {
        self.buffers.values().map(Vec::len).sum()
    }

    /// Returns true if no buffers are allocated.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
