//! Amplitude-shaping nodes.

use crate::dsp::{
    context::ProcessContext,
    parameter::{ParamValue, ParameterDefinition},
    port::PortDefinition,
    processor::{NodeInfo, NodeProcessor},
    signal::SignalBuffer,
};

fn db_to_factor(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Multiplies an audio signal by a control signal, sample by sample.
///
/// The usual way to apply an envelope: route the envelope's control output
/// into the `amp` input. An unconnected `amp` input mixes to zero, which
/// mutes the output.
pub struct Amplifier {
    inputs: Vec<PortDefinition>,
    outputs: Vec<PortDefinition>,
}

impl Amplifier {
    const PORT_IN: usize = 0;
    const PORT_AMP: usize = 1;

    /// Creates a new amplifier.
    pub fn new() -> Self {
        Self {
            inputs: vec![
                PortDefinition::audio("in", "In"),
                PortDefinition::control("amp", "Amplitude"),
            ],
            outputs: vec![PortDefinition::audio("out", "Out")],
        }
    }
}

impl Default for Amplifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for Amplifier {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo::new(
            "fx.amplify",
            "Amplifier",
            "Scales audio by a control signal",
        );
        &INFO
    }

    fn inputs(&self) -> &[PortDefinition] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortDefinition] {
        &self.outputs
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    fn process(
        &mut self,
        inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        context: &ProcessContext,
    ) {
        let (Some(input), Some(amp)) = (
            inputs[Self::PORT_IN].samples(),
            inputs[Self::PORT_AMP].samples(),
        ) else {
            return;
        };
        let Some(out) = outputs[0].samples_mut() else {
            return;
        };

        for i in 0..context.block_size {
            out[i] = input[i] * amp[i];
        }
    }

    fn reset(&mut self) {}
}

/// A fixed gain stage calibrated in decibels.
///
/// # Parameters
/// - **gain** (float, default 0.0): gain in dB; 0 dB is unity.
pub struct Gain {
    factor: f32,
    inputs: Vec<PortDefinition>,
    outputs: Vec<PortDefinition>,
    parameters: Vec<ParameterDefinition>,
}

impl Gain {
    const PARAM_GAIN: usize = 0;

    /// Creates a unity-gain stage.
    pub fn new() -> Self {
        Self {
            factor: 1.0,
            inputs: vec![PortDefinition::audio("in", "In")],
            outputs: vec![PortDefinition::audio("out", "Out")],
            parameters: vec![ParameterDefinition::float("gain", "Gain", 0.0)],
        }
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for Gain {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo::new("fx.gain", "Gain", "Fixed gain in dB");
        &INFO
    }

    fn inputs(&self) -> &[PortDefinition] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortDefinition] {
        &self.outputs
    }

    fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    fn set_parameter(&mut self, index: usize, value: &ParamValue) {
        if index == Self::PARAM_GAIN {
            self.factor = db_to_factor(value.as_f32());
        }
    }

    fn prepare(&mut self, _sample_rate: f32, _max_block_size: usize) {}

    fn process(
        &mut self,
        inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        context: &ProcessContext,
    ) {
        let Some(input) = inputs[0].samples() else {
            return;
        };
        let Some(out) = outputs[0].samples_mut() else {
            return;
        };

        for i in 0..context.block_size {
            out[i] = input[i] * self.factor;
        }
    }

    fn reset(&mut self) {}
}
