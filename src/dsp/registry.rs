//! Registry of available node types.
//!
//! Maps namespaced type identifiers to constructor functions. The patch
//! loader and the engine's mutation API resolve type ids through here;
//! an id missing from the registry is a structural load error.

use std::collections::HashMap;

use super::processor::{NodeInfo, NodeProcessor};

/// Constructor function stored per node type.
pub type NodeConstructor = fn() -> Box<dyn NodeProcessor>;

/// Registry mapping type ids to node constructors.
pub struct NodeRegistry {
    constructors: HashMap<&'static str, NodeConstructor>,
    infos: Vec<NodeInfo>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
            infos: Vec::new(),
        }
    }

    /// Registers a node type by its `Default` constructor.
    ///
    /// # Panics
    /// Panics if a type with the same id is already registered. Type ids
    /// are static program structure, so a collision is a programming error.
    pub fn register<P: NodeProcessor + Default + 'static>(&mut self) {
        let instance = P::default();
        let info = *instance.info();

        if self.constructors.contains_key(info.id) {
            panic!("node type '{}' is already registered", info.id);
        }

        self.constructors
            .insert(info.id, || Box::new(P::default()) as Box<dyn NodeProcessor>);
        self.infos.push(info);
    }

    /// Constructs a fresh processor for the given type id.
    pub fn construct(&self, type_id: &str) -> Option<Box<dyn NodeProcessor>> {
        self.constructors.get(type_id).map(|ctor| ctor())
    }

    /// Returns true if the type id is registered.
    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    /// Returns metadata for all registered types, in registration order.
    pub fn infos(&self) -> &[NodeInfo] {
        &self.infos
    }

    /// Number of registered node types.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Returns true if no node types are registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
