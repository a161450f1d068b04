//! Signal types, the processor trait, and the node type registry.

pub mod context;
pub mod parameter;
pub mod port;
pub mod processor;
pub mod registry;
pub mod signal;

pub use context::ProcessContext;
pub use parameter::{ParamKind, ParamValue, ParameterDefinition};
pub use port::PortDefinition;
pub use processor::{NodeInfo, NodeProcessor};
pub use registry::{NodeConstructor, NodeRegistry};
pub use signal::{MidiEvent, MidiMessage, SignalBuffer, SignalKind};
