//! The patch graph: nodes, connections, and structural invariants.
//!
//! The graph is the pure data model. It knows nothing about processors or
//! buffers; the engine keeps it in sync with its processor arena. Node 0 is
//! always the sink, and ids are handed out by a per-engine [`IdAllocator`]
//! that never reuses a value.

pub mod scheduler;
pub mod validation;

pub use scheduler::Schedule;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::dsp::parameter::{ParamKind, ParamValue};
use crate::dsp::signal::SignalKind;

/// Identifies a node within one engine instance.
pub type NodeId = usize;

/// The reserved id of the sink node.
pub const SINK_ID: NodeId = 0;

/// The type id the node at [`SINK_ID`] must resolve to.
pub const SINK_TYPE: &str = "sink";

/// A violation of the graph's structural invariants.
///
/// These are load/mutation-time errors; once a graph is accepted, rendering
/// cannot fail structurally.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum StructuralError {
    #[error("duplicate node id {0}")]
    DuplicateNodeId(NodeId),

    #[error("unknown node type '{0}'")]
    UnknownType(String),

    #[error("node {node} input {input} references missing node {missing}")]
    DanglingNode {
        node: NodeId,
        input: usize,
        missing: NodeId,
    },

    #[error("node {node} references output {output} of node {source_node}, which has {count}")]
    OutputOutOfRange {
        node: NodeId,
        source_node: NodeId,
        output: usize,
        count: usize,
    },

    #[error("node {node} has no input {input} ({count} declared)")]
    InputOutOfRange {
        node: NodeId,
        input: usize,
        count: usize,
    },

    #[error("node {node} declares {declared} input ports but type '{type_id}' has {available}")]
    TooManyInputs {
        node: NodeId,
        type_id: String,
        declared: usize,
        available: usize,
    },

    #[error(
        "cannot route {from_kind} output {from}.{output} into {to_kind} input {to}.{input}"
    )]
    KindMismatch {
        from: NodeId,
        output: usize,
        to: NodeId,
        input: usize,
        from_kind: SignalKind,
        to_kind: SignalKind,
    },

    #[error("graph has no sink node (id {SINK_ID} of type '{SINK_TYPE}')")]
    MissingSink,

    #[error("node {0} is a second sink; only node {SINK_ID} may be the sink")]
    DuplicateSink(NodeId),

    #[error("connection {from}.{output} -> {to}.{input} already exists")]
    DuplicateConnection {
        from: NodeId,
        output: usize,
        to: NodeId,
        input: usize,
    },

    #[error("cycle detected through node {0}")]
    Cycle(NodeId),

    #[error("node {node} has no parameter named '{name}'")]
    UnknownParameter { node: NodeId, name: String },

    #[error("parameter '{name}' on node {node} is {expected}, got {found}")]
    ParamKindMismatch {
        node: NodeId,
        name: String,
        expected: ParamKind,
        found: ParamKind,
    },
}

/// A reference to one output port of one node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OutputRef {
    /// The source node.
    pub node: NodeId,
    /// Output port index on the source node.
    pub output: usize,
}

impl OutputRef {
    /// Creates a reference to `node`'s output port `output`.
    pub fn new(node: NodeId, output: usize) -> Self {
        Self { node, output }
    }
}

impl std::fmt::Display for OutputRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.node, self.output)
    }
}

/// A single edge, flattened out of the per-port fan-in lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub from_node: NodeId,
    pub from_output: usize,
    pub to_node: NodeId,
    pub to_input: usize,
}

/// One node in the graph.
///
/// `inputs` has one entry per declared input port; each entry lists the
/// outputs mixed into that port, in connection order. An empty list is an
/// unconnected port.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Registry type id this node was constructed from.
    pub type_id: String,
    /// Parameter overrides, in first-set order.
    pub params: Vec<(String, ParamValue)>,
    /// Fan-in sources per input port.
    pub inputs: Vec<Vec<OutputRef>>,
}

impl Node {
    /// Creates a node of the given type with no ports declared yet.
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            params: Vec::new(),
            inputs: Vec::new(),
        }
    }

    /// Sets a parameter, replacing an earlier value for the same name.
    pub fn set_param(&mut self, name: impl Into<String>, value: ParamValue) {
        let name = name.into();
        if let Some(entry) = self.params.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.params.push((name, value));
        }
    }

    /// Looks up a parameter override by name.
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }
}

/// The complete patch graph.
///
/// Keyed by node id in a `BTreeMap` so iteration (and serialization) is in
/// ascending id order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node under an explicit id.
    pub fn insert(&mut self, id: NodeId, node: Node) -> Result<(), StructuralError> {
        if self.nodes.contains_key(&id) {
            return Err(StructuralError::DuplicateNodeId(id));
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Removes a node and strips every connection touching it.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let removed = self.nodes.remove(&id)?;
        for node in self.nodes.values_mut() {
            for port in &mut node.inputs {
                port.retain(|source| source.node != id);
            }
        }
        Some(removed)
    }

    /// Looks up a node by id.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Looks up a node mutably by id.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Returns true if a node with the given id exists.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates nodes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().map(|(id, node)| (*id, node))
    }

    /// Iterates node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// The largest node id currently present.
    pub fn max_id(&self) -> Option<NodeId> {
        self.nodes.keys().next_back().copied()
    }

    /// Iterates all edges, flattened out of the per-port fan-in lists.
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.nodes.iter().flat_map(|(&to_node, node)| {
            node.inputs
                .iter()
                .enumerate()
                .flat_map(move |(to_input, sources)| {
                    sources.iter().map(move |source| Connection {
                        from_node: source.node,
                        from_output: source.output,
                        to_node,
                        to_input,
                    })
                })
        })
    }

    /// Returns true if the exact edge already exists.
    pub fn is_connected(&self, from: OutputRef, to: NodeId, input: usize) -> bool {
        self.nodes
            .get(&to)
            .and_then(|node| node.inputs.get(input))
            .is_some_and(|sources| sources.contains(&from))
    }

    /// Appends an edge to a fan-in list. The caller validates first.
    pub fn connect(&mut self, from: OutputRef, to: NodeId, input: usize) -> bool {
        match self.nodes.get_mut(&to).and_then(|n| n.inputs.get_mut(input)) {
            Some(sources) => {
                sources.push(from);
                true
            }
            None => false,
        }
    }

    /// Removes an edge. Returns true if it was present.
    pub fn disconnect(&mut self, from: OutputRef, to: NodeId, input: usize) -> bool {
        match self.nodes.get_mut(&to).and_then(|n| n.inputs.get_mut(input)) {
            Some(sources) => {
                let before = sources.len();
                sources.retain(|source| *source != from);
                sources.len() != before
            }
            None => false,
        }
    }
}

/// Hands out node ids for one engine instance.
///
/// Ids are monotonically increasing and never reused, so a stale id held
/// by the control plane can never silently alias a newer node.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: NodeId,
}

impl IdAllocator {
    /// Creates an allocator starting at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next id.
    ///
    /// # Panics
    /// Panics if the id space is exhausted. With address-sized ids this is
    /// unreachable in practice and treated as fatal.
    pub fn next_id(&mut self) -> NodeId {
        let id = self.next;
        self.next = match self.next.checked_add(1) {
            Some(next) => next,
            None => panic!("node id space exhausted"),
        };
        id
    }

    /// Moves the allocator past `id` so loaded patches and incremental
    /// additions never collide.
    pub fn bump_past(&mut self, id: NodeId) {
        if id >= self.next {
            self.next = match id.checked_add(1) {
                Some(next) => next,
                None => panic!("node id space exhausted"),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(type_id: &str, input_ports: usize) -> Node {
        let mut node = Node::new(type_id);
        node.inputs = vec![Vec::new(); input_ports];
        node
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let mut graph = Graph::new();
        assert!(graph.insert(1, node("osc.sine", 0)).is_ok());
        assert_eq!(
            graph.insert(1, node("fx.gain", 1)),
            Err(StructuralError::DuplicateNodeId(1))
        );
    }

    #[test]
    fn test_remove_strips_touching_connections() {
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 2)).unwrap();
        graph.insert(1, node("osc.sine", 0)).unwrap();
        graph.connect(OutputRef::new(1, 0), 0, 0);
        graph.connect(OutputRef::new(1, 0), 0, 1);
        assert_eq!(graph.connections().count(), 2);

        graph.remove(1);
        assert_eq!(graph.connections().count(), 0);
        assert!(graph.contains(0));
    }

    #[test]
    fn test_connections_are_flattened_in_order() {
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 1)).unwrap();
        graph.insert(1, node("osc.sine", 0)).unwrap();
        graph.insert(2, node("osc.sine", 0)).unwrap();
        graph.connect(OutputRef::new(2, 0), 0, 0);
        graph.connect(OutputRef::new(1, 0), 0, 0);

        let edges: Vec<_> = graph.connections().collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].from_node, 2);
        assert_eq!(edges[1].from_node, 1);
    }

    #[test]
    fn test_disconnect() {
        let mut graph = Graph::new();
        graph.insert(0, node(SINK_TYPE, 1)).unwrap();
        graph.insert(1, node("osc.sine", 0)).unwrap();
        graph.connect(OutputRef::new(1, 0), 0, 0);

        assert!(graph.disconnect(OutputRef::new(1, 0), 0, 0));
        assert!(!graph.disconnect(OutputRef::new(1, 0), 0, 0));
        assert_eq!(graph.connections().count(), 0);
    }

    #[test]
    fn test_param_override_replaces() {
        let mut node = Node::new("osc.sine");
        node.set_param("freq", ParamValue::Float(440.0));
        node.set_param("freq", ParamValue::Float(880.0));
        assert_eq!(node.params.len(), 1);
        assert_eq!(node.param("freq"), Some(&ParamValue::Float(880.0)));
    }

    #[test]
    fn test_id_allocator_is_monotonic() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);

        ids.bump_past(10);
        assert_eq!(ids.next_id(), 11);

        // Bumping below the watermark changes nothing.
        ids.bump_past(3);
        assert_eq!(ids.next_id(), 12);
    }
}
