//! One-shot trigger source.

use crate::dsp::{
    context::ProcessContext,
    parameter::{ParamValue, ParameterDefinition},
    port::PortDefinition,
    processor::{NodeInfo, NodeProcessor},
    signal::SignalBuffer,
};

/// Emits a single-sample 1.0 pulse at a configured timeline position.
///
/// The node keeps its own sample counter across blocks, so the pulse lands
/// in whichever block contains the configured position.
///
/// # Parameters
/// - **at** (int, default 0): sample position of the pulse.
pub struct Trigger {
    at: i64,
    /// Samples rendered so far.
    pos: u64,
    outputs: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl Trigger {
    const PARAM_AT: usize = 0;

    /// Creates a trigger firing at sample 0.
    pub fn new() -> Self {
        Self {
            at: 0,
            pos: 0,
            outputs: vec![PortDefinition::control("gate", "Gate")],
            parameters: vec![ParameterDefinition::int("at", "Position", 0)],
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for Trigger {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo::new(
            "util.trigger",
            "Trigger",
            "Single-sample pulse at a fixed position",
        );
        &INFO
    }

    fn inputs(&self) -> &[PortDefinition] {
        &[]
    }

    fn outputs(&self) -> &[PortDefinition] {
        &self.outputs
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn set_parameter(&mut self, index: usize, value: &ParamValue) {
        if index == Self::PARAM_AT {
            self.at = value.as_i64();
        }
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    fn process(
        &mut self,
        _inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        context: &ProcessContext,
    ) {
        let Some(out) = outputs[0].samples_mut() else {
            return;
        };
        out[..context.block_size].fill(0.0);

        if self.at >= 0 {
            let at = self.at as u64;
            if at >= self.pos && at < self.pos + context.block_size as u64 {
                out[(at - self.pos) as usize] = 1.0;
            }
        }

        self.pos += context.block_size as u64;
    }

    fn reset(&mut self) {
        self.pos = 0;
    }
}
