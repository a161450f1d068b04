//! Built-in node types.

pub mod amplifier;
pub mod control;
pub mod envelope;
pub mod oscillator;
pub mod sink;
pub mod trigger;

pub use amplifier::{Amplifier, Gain};
pub use control::ControlValue;
pub use envelope::AdsrEnvelope;
pub use oscillator::SineOscillator;
pub use sink::AudioSink;
pub use trigger::Trigger;

use crate::dsp::registry::NodeRegistry;

/// Registers every built-in node type.
pub fn register_builtins(registry: &mut NodeRegistry) {
    registry.register::<AudioSink>();
    registry.register::<SineOscillator>();
    registry.register::<Amplifier>();
    registry.register::<Gain>();
    registry.register::<AdsrEnvelope>();
    registry.register::<Trigger>();
    registry.register::<ControlValue>();
}
