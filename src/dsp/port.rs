//! Port definitions for node processors.
//!
//! Ports are the connection points on nodes. Direction is implied by which
//! list a port appears in (`NodeProcessor::inputs` vs `outputs`), so the
//! definition only carries identity and signal kind.

use super::signal::SignalKind;

/// Definition of a single input or output port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortDefinition {
    /// Stable identifier within the node type.
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// The signal kind this port carries.
    pub kind: SignalKind,
}

impl PortDefinition {
    /// Creates a new port definition.
    pub const fn new(id: &'static str, name: &'static str, kind: SignalKind) -> Self {
        Self { id, name, kind }
    }

    /// Creates an audio port.
    pub const fn audio(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, SignalKind::Audio)
    }

    /// Creates a control port.
    pub const fn control(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, SignalKind::Control)
    }

    /// Creates a MIDI port.
    pub const fn midi(id: &'static str, name: &'static str) -> Self {
        Self::new(id, name, SignalKind::Midi)
    }
}
