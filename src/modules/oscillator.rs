//! Oscillator nodes.

use std::f32::consts::TAU;

use crate::dsp::{
    context::ProcessContext,
    parameter::{ParamValue, ParameterDefinition},
    port::PortDefinition,
    processor::{NodeInfo, NodeProcessor},
    signal::SignalBuffer,
};

/// A free-running sine wave oscillator.
///
/// The phase accumulator runs in [0, 1) and survives across blocks, so the
/// waveform is continuous no matter how rendering is chunked.
///
/// # Parameters
/// - **freq** (float, default 440.0): frequency in Hz.
pub struct SineOscillator {
    /// Current phase accumulator (0.0 to 1.0).
    phase: f32,
    /// Frequency in Hz, set via the `freq` parameter.
    freq: f32,
    /// Sample rate from the last prepare() call.
    sample_rate: f32,
    outputs: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl SineOscillator {
    const PARAM_FREQ: usize = 0;

    /// Creates a new oscillator at the default frequency.
    pub fn new() -> Self {
        Self {
            phase: 0.0,
            freq: 440.0,
            sample_rate: 44100.0,
            outputs: vec![PortDefinition::audio("out", "Out")],
            parameters: vec![ParameterDefinition::float("freq", "Frequency", 440.0)],
        }
    }
}

impl Default for SineOscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for SineOscillator {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo =
            NodeInfo::new("osc.sine", "Sine Oscillator", "A pure sine wave oscillator");
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
        if index == Self::PARAM_FREQ {
            self.freq = value.as_f32().max(0.0);
        }
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process(
        &mut self,
        _inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        context: &ProcessContext,
    ) {
        let Some(out) = outputs[0].samples_mut() else {
            return;
        };
        let phase_increment = self.freq / self.sample_rate;

        for sample in out.iter_mut().take(context.block_size) {
            *sample = (self.phase * TAU).sin();
            self.phase = (self.phase + phase_increment).fract();
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
