//! Control-plane commands.
//!
//! Everything a controlling thread may ask of a running engine. Commands
//! travel over the SPSC queue in [`super::channels`] and are applied
//! between rendered blocks, never during one.

use crate::dsp::parameter::ParamValue;
use crate::graph::NodeId;

/// A graph mutation requested by the control plane.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineCommand {
    /// Create a node of a registered type. The id is allocated engine-side.
    AddNode { type_id: String },
    /// Remove a node and every connection touching it.
    RemoveNode { node_id: NodeId },
    /// Route an output into an input port's fan-in list.
    Connect {
        from_node: NodeId,
        from_output: usize,
        to_node: NodeId,
        to_input: usize,
    },
    /// Remove one edge.
    Disconnect {
        from_node: NodeId,
        from_output: usize,
        to_node: NodeId,
        to_input: usize,
    },
    /// Set a parameter by name.
    SetParameter {
        node_id: NodeId,
        name: String,
        value: ParamValue,
    },
    /// Replace the whole graph with a parsed patch. Atomic: on any error
    /// the running graph is untouched.
    LoadPatch { text: String },
    /// Reset every processor's internal state.
    ResetAll,
}
