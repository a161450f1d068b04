//! Envelope generators.

use crate::dsp::{
    context::ProcessContext,
    port::PortDefinition,
    processor::{NodeInfo, NodeProcessor},
    signal::SignalBuffer,
};

/// A gate-driven ADSR envelope emitting a control signal.
///
/// All four stage lengths arrive as control inputs rather than parameters,
/// so they can themselves be driven by other nodes. Times are in seconds;
/// sustain is a plain amplitude. The gate input opens the envelope when it
/// crosses 0.5 upward and releases it when it falls below 0.5.
///
/// The output amplitude ramps from 0 to 1 over the attack, decays to the
/// sustain level, holds while the gate stays high, and after release fades
/// linearly to 0 over the release time from whatever amplitude the held
/// phase had reached.
pub struct AdsrEnvelope {
    /// Absolute sample position of this node's timeline.
    pos: u64,
    /// Sample at which the gate last opened.
    start: Option<u64>,
    /// Sample at which the gate last closed.
    end: Option<u64>,
    sample_rate: f32,
    inputs: Vec<PortDefinition>,
    outputs: Vec<PortDefinition>,
}

impl AdsrEnvelope {
    const PORT_ATTACK: usize = 0;
    const PORT_DECAY: usize = 1;
    const PORT_SUSTAIN: usize = 2;
    const PORT_RELEASE: usize = 3;
    const PORT_GATE: usize = 4;

    /// Creates a closed envelope.
    pub fn new() -> Self {
        Self {
            pos: 0,
            start: None,
            end: None,
            sample_rate: 44100.0,
            inputs: vec![
                PortDefinition::control("atk", "Attack"),
                PortDefinition::control("dec", "Decay"),
                PortDefinition::control("sus", "Sustain"),
                PortDefinition::control("rel", "Release"),
                PortDefinition::control("gate", "Gate"),
            ],
            outputs: vec![PortDefinition::control("amp", "Amplitude")],
        }
    }

    /// Envelope amplitude `time` seconds into the held phase.
    fn held_gain(attack: f32, decay: f32, sustain: f32, time: f32) -> f32 {
        if time < attack {
            return time / attack;
        }
        let time = time - attack;
        if time < decay {
            return 1.0 + (sustain - 1.0) * (time / decay);
        }
        sustain
    }
}

impl Default for AdsrEnvelope {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeProcessor for AdsrEnvelope {
    fn info(&self) -> &NodeInfo {
        static INFO: NodeInfo = NodeInfo::new(
            "env.adsr",
            "ADSR Envelope",
            "Gate-driven attack/decay/sustain/release envelope",
        );
        &INFO
    }

    fn inputs(&self) -> &[PortDefinition] {
        &self.inputs
    }

    fn outputs(&self) -> &[PortDefinition] {
        &self.outputs
    }

    fn prepare(&mut self, sample_rate: f32, _max_block_size: usize) {
        self.sample_rate = sample_rate;
    }

    fn process(
        &mut self,
        inputs: &[SignalBuffer],
        outputs: &mut [SignalBuffer],
        context: &ProcessContext,
    ) {
        let (Some(attack), Some(decay), Some(sustain), Some(release), Some(gate)) = (
            inputs[Self::PORT_ATTACK].samples(),
            inputs[Self::PORT_DECAY].samples(),
            inputs[Self::PORT_SUSTAIN].samples(),
            inputs[Self::PORT_RELEASE].samples(),
            inputs[Self::PORT_GATE].samples(),
        ) else {
            return;
        };
        let Some(out) = outputs[0].samples_mut() else {
            return;
        };

        let seconds_per_sample = 1.0 / self.sample_rate;

        for i in 0..context.block_size {
            let abs = self.pos + i as u64;
            let open = self.start.is_some() && self.end.is_none();

            if gate[i] >= 0.5 {
                if !open {
                    self.start = Some(abs);
                    self.end = None;
                }
            } else if open {
                self.end = Some(abs);
            }

            out[i] = match (self.start, self.end) {
                (None, _) => 0.0,
                (Some(start), None) => {
                    let time = (abs - start) as f32 * seconds_per_sample;
                    Self::held_gain(attack[i], decay[i], sustain[i], time)
                }
                (Some(start), Some(end)) => {
                    let held = (end - start) as f32 * seconds_per_sample;
                    let since = (abs - end) as f32 * seconds_per_sample;
                    let rel = release[i];
                    if rel <= 0.0 || since >= rel {
                        0.0
                    } else {
                        Self::held_gain(attack[i], decay[i], sustain[i], held)
                            * (1.0 - since / rel)
                    }
                }
            };
        }

        self.pos += context.block_size as u64;
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.start = None;
        self.end = None;
    }
}
