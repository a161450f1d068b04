//! Constant control sources.

use crate::dsp::{
    context::ProcessContext,
    parameter::{ParamValue, ParameterDefinition},
    port::PortDefinition,
    processor::{NodeInfo, NodeProcessor},
    signal::SignalBuffer,
};

/// Fills its control output with a constant value.
///
/// # Parameters
/// - **value** (float, default 0.0): the emitted level.
pub struct ControlValue {
    value: f32,
    outputs: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl ControlValue {
    const PARAM_VALUE: usize = 0;

    /// Creates a source emitting 0.0.
    pub fn new() -> Self {
        Self {
            value: 0.0,
            outputs: vec![PortDefinition::control("out", "Out")],
            parameters: vec![ParameterDefinition::float("value", "Value", 0.0)],
        }
    }
}

impl Default for ControlValue {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for ControlValue {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo =
            NodeInfo::new("util.value", "Control Value", "Constant control level");
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
        if index == Self::PARAM_VALUE {
            self.value = value.as_f32();
        }
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    fn process(
        &mut self,
        _inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        _context: &ProcessContext,
    ) {
        outputs[0].fill(self.value);
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::signal::SignalKind;

    #[test]
    fn test_emits_constant() {
        let mut source = ControlValue::new();
        source.set_parameter(0, &ParamValue::Float(0.75));
        source.prepare(44100.0, 16);

        let mut outputs = vec![SignalBuffer::new(SignalKind::Control, 16)];
        source.process(&[], &mut outputs, &ProcessContext::new(44100.0, 16));
        assert!(outputs[0].samples().unwrap().iter().all(|&s| s == 0.75));
    }

    #[test]
    fn test_defaults_to_zero() {
        let mut source = ControlValue::new();
        let mut outputs = vec![SignalBuffer::new(SignalKind::Control, 4)];
        source.process(&[], &mut outputs, &ProcessContext::new(44100.0, 4));
        assert!(outputs[0].samples().unwrap().iter().all(|&s| s == 0.0));
    }
}
