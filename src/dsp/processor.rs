//! The core trait implemented by every node type.
//!
//! A processor is the stateful per-node object behind a graph node. It
//! declares its ports and parameters statically and renders one block at a
//! time. Instances are created through the registry, prepared with the
//! engine's sample rate and block size, and destroyed with their node.

use super::context::ProcessContext;
use super::parameter::{ParamValue, ParameterDefinition};
use super::port::PortDefinition;
use super::signal::SignalBuffer;

/// Static metadata describing a node type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    /// Namespaced type identifier, e.g. "osc.sine". Used in patch text.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// One-line description of what the node does.
    pub description: &'static str,
}

impl NodeInfo {
    /// Creates node metadata.
    pub const fn new(id: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            id,
            name,
            description,
        }
    }
}

/// A signal processor backing one node in the graph.
///
/// Implementations must be `Send` so an engine (and the processors it owns)
/// can be moved to a render thread. All methods are called from the engine's
/// thread only; `process` must not block or allocate.
pub trait NodeProcessor: Send {
    /// Returns static metadata for this node type.
    fn info(&self) -> &NodeInfo;

    /// Input port declarations, in patch-text `in` line order.
    fn inputs(&self) -> &[PortDefinition];

    /// Output port declarations, in output-index order.
    fn outputs(&self) -> &[PortDefinition];

    /// Parameter declarations. Default: no parameters.
    fn parameters(&self) -> &[ParameterDefinition] {
        &[]
    }

    /// Applies a parameter value by declaration index.
    ///
    /// The engine validates the name and kind before calling; unknown
    /// indices are ignored.
    fn set_parameter(&mut self, index: usize, value: &ParamValue) {
        let _ = (index, value);
    }

    /// Called before processing starts and whenever the engine's
    /// configuration changes. Processors size any internal state here.
    fn prepare(&mut self, sample_rate: f32, max_block_size: usize);

    /// Renders one block.
    ///
    /// `inputs` holds the pre-mixed buffer for each declared input port
    /// (identity values for unconnected ports); `outputs` holds one buffer
    /// per declared output port, cleared before the call.
    fn process(
        &mut self,
        inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        context: &ProcessContext,
    );

    /// Resets internal state (phase, envelope stage, counters) without
    /// touching parameters.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processors_are_object_safe() {
        fn assert_object_safe(_: &dyn NodeProcessor) {}
        let _ = assert_object_safe;
    }

    #[test]
    fn test_node_info() {
        let info = NodeInfo::new("osc.sine", "Sine Oscillator", "Generates a sine wave");
        assert_eq!(info.id, "osc.sine");
        assert_eq!(info.name, "Sine Oscillator");
    }
}
