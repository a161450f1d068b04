//! The terminal sink node.

use crate::dsp::{
    context::ProcessContext,
    port::PortDefinition,
    processor::{NodeInfo, NodeProcessor},
    signal::SignalBuffer,
};
use crate::graph::SINK_TYPE;

/// The graph's single output node, always at node id 0.
///
/// The sink has two audio inputs (left and right) and no outputs. It does
/// no processing of its own: the engine reads the sink's mixed input
/// buffers directly as the result of each rendered block.
pub struct AudioSink {
    inputs: Vec<PortDefinition>,
}

impl AudioSink {
    /// Creates a new sink.
    pub fn new() -> Self {
        Self {
            inputs: vec![
                PortDefinition::audio("left", "Left"),
                PortDefinition::audio("right", "Right"),
            ],
        }
    }
}

impl Default for AudioSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for AudioSink {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo::new(SINK_TYPE, "Audio Sink", "Stereo output of the graph");
        &INFO
    }

    fn inputs(&self) -> &[PortDefinition] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortDefinition] {
        &[]
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    fn process(
        &mut self,
        _inputs: &[SignalBuffer],
        _outputs: &mut [SignalBuffer],
        _context: &ProcessContext,
    ) {
    }

    fn reset(&mut self) {}
}
