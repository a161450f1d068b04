//! Signal kinds and per-block signal buffers.
//!
//! Every wire in the graph carries one of three signal kinds. Buffers are
//! realized per block and recomputed every tick; processors never hold on
//! to them across blocks.

/// The kind of signal carried by a port or buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// Per-sample audio, one f32 per sample frame.
    Audio,
    /// Block-rate control values, one f32 per sample frame.
    Control,
    /// Discrete time-stamped events.
    Midi,
}

impl SignalKind {
    /// Returns a short lowercase name, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Audio => "audio",
            SignalKind::Control => "control",
            SignalKind::Midi => "midi",
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A MIDI channel message, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8, velocity: u8 },
    ControlChange { controller: u8, value: u8 },
    PitchBend { value: u16 },
}

/// A MIDI message with its position inside the current block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiEvent {
    /// Sample offset from the start of the block.
    pub timestamp: u32,
    /// MIDI channel (0-15).
    pub channel: u8,
    /// The decoded message.
    pub message: MidiMessage,
}

impl MidiEvent {
    /// Creates a new event at the given sample offset.
    pub fn new(timestamp: u32, channel: u8, message: MidiMessage) -> Self {
        Self {
            timestamp,
            channel,
            message,
        }
    }
}

/// A pre-allocated per-block buffer holding one signal's worth of data.
///
/// Audio and Control buffers hold `block_size` samples; Midi buffers hold
/// a variable number of events ordered by timestamp.
#[derive(Clone, Debug, PartialEq)]
pub enum SignalBuffer {
    Audio(Vec<f32>),
    Control(Vec<f32>),
    Midi(Vec<MidiEvent>),
}

impl SignalBuffer {
    /// Creates a buffer of the given kind sized for one block.
    pub fn new(kind: SignalKind, block_size: usize) -> Self {
        match kind {
            SignalKind::Audio => SignalBuffer::Audio(vec![0.0; block_size]),
            SignalKind::Control => SignalBuffer::Control(vec![0.0; block_size]),
            SignalKind::Midi => SignalBuffer::Midi(Vec::new()),
        }
    }

    /// Returns the kind of signal this buffer holds.
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalBuffer::Audio(_) => SignalKind::Audio,
            SignalBuffer::Control(_) => SignalKind::Control,
            SignalBuffer::Midi(_) => SignalKind::Midi,
        }
    }

    /// Resets the buffer to the mixing identity: silence, zero, or no events.
    pub fn clear(&mut self) {
        match self {
            SignalBuffer::Audio(samples) | SignalBuffer::Control(samples) => {
                samples.fill(0.0);
            }
            SignalBuffer::Midi(events) => events.clear(),
        }
    }

    /// Resizes sample buffers to a new block size. Midi buffers are unaffected.
    pub fn resize(&mut self, block_size: usize) {
        match self {
            SignalBuffer::Audio(samples) | SignalBuffer::Control(samples) => {
                samples.resize(block_size, 0.0);
            }
            SignalBuffer::Midi(_) => {}
        }
    }

    /// Number of samples (or events) currently held.
    pub fn len(&self) -> usize {
        match self {
            SignalBuffer::Audio(samples) | SignalBuffer::Control(samples) => samples.len(),
            SignalBuffer::Midi(events) => events.len(),
        }
    }

    /// Returns true if the buffer holds no samples or events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fills a sample buffer with a constant value. No-op for Midi.
    pub fn fill(&mut self, value: f32) {
        match self {
            SignalBuffer::Audio(samples) | SignalBuffer::Control(samples) => {
                samples.fill(value);
            }
            SignalBuffer::Midi(_) => {}
        }
    }

    /// Borrows the samples of an Audio or Control buffer.
    pub fn samples(&self) -> Option<&[f32]> {
        match self {
            SignalBuffer::Audio(samples) | SignalBuffer::Control(samples) => Some(samples),
            SignalBuffer::Midi(_) => None,
        }
    }

    /// Mutably borrows the samples of an Audio or Control buffer.
    pub fn samples_mut(&mut self) -> Option<&mut [f32]> {
        match self {
            SignalBuffer::Audio(samples) | SignalBuffer::Control(samples) => Some(samples),
            SignalBuffer::Midi(_) => None,
        }
    }

    /// Borrows the events of a Midi buffer.
    pub fn events(&self) -> Option<&[MidiEvent]> {
        match self {
            SignalBuffer::Midi(events) => Some(events),
            _ => None,
        }
    }

    /// Mutably borrows the event list of a Midi buffer.
    pub fn events_mut(&mut self) -> Option<&mut Vec<MidiEvent>> {
        match self {
            SignalBuffer::Midi(events) => Some(events),
            _ => None,
        }
    }

    /// Mixes another buffer of the same kind into this one.
    ///
    /// Audio and Control sum elementwise; Midi appends events (callers
    /// re-sort by timestamp after merging all fan-in sources). Returns
    /// false without touching `self` when the kinds differ.
    pub fn mix_from(&mut self, other: &SignalBuffer) -> bool {
        match (self, other) {
            (SignalBuffer::Audio(dst), SignalBuffer::Audio(src))
            | (SignalBuffer::Control(dst), SignalBuffer::Control(src)) => {
                for (d, s) in dst.iter_mut().zip(src.iter()) {
                    *d += s;
                }
                true
            }
            (SignalBuffer::Midi(dst), SignalBuffer::Midi(src)) => {
                dst.extend_from_slice(src);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_creation() {
        let audio = SignalBuffer::new(SignalKind::Audio, 256);
        assert_eq!(audio.kind(), SignalKind::Audio);
        assert_eq!(audio.len(), 256);

        let control = SignalBuffer::new(SignalKind::Control, 256);
        assert_eq!(control.kind(), SignalKind::Control);
        assert_eq!(control.len(), 256);

        let midi = SignalBuffer::new(SignalKind::Midi, 256);
        assert_eq!(midi.kind(), SignalKind::Midi);
        assert!(midi.is_empty());
    }

    #[test]
    fn test_clear_resets_to_identity() {
        let mut buf = SignalBuffer::new(SignalKind::Audio, 8);
        buf.fill(0.7);
        buf.clear();
        assert!(buf.samples().unwrap().iter().all(|&s| s == 0.0));

        let mut midi = SignalBuffer::new(SignalKind::Midi, 8);
        midi.events_mut()
            .unwrap()
            .push(MidiEvent::new(3, 0, MidiMessage::NoteOn { note: 60, velocity: 100 }));
        midi.clear();
        assert!(midi.is_empty());
    }

    #[test]
    fn test_mix_sums_samples() {
        let mut a = SignalBuffer::new(SignalKind::Audio, 4);
        let mut b = SignalBuffer::new(SignalKind::Audio, 4);
        a.fill(0.25);
        b.fill(0.5);
        assert!(a.mix_from(&b));
        assert!(a.samples().unwrap().iter().all(|&s| (s - 0.75).abs() < f32::EPSILON));
    }

    #[test]
    fn test_mix_merges_midi() {
        let mut a = SignalBuffer::new(SignalKind::Midi, 4);
        let mut b = SignalBuffer::new(SignalKind::Midi, 4);
        a.events_mut()
            .unwrap()
            .push(MidiEvent::new(5, 0, MidiMessage::NoteOff { note: 60, velocity: 0 }));
        b.events_mut()
            .unwrap()
            .push(MidiEvent::new(2, 1, MidiMessage::NoteOn { note: 64, velocity: 90 }));
        assert!(a.mix_from(&b));
        assert_eq!(a.len(), 2);

        let events = a.events_mut().unwrap();
        events.sort_by_key(|e| e.timestamp);
        assert_eq!(events[0].timestamp, 2);
        assert_eq!(events[1].timestamp, 5);
    }

    #[test]
    fn test_mix_rejects_kind_mismatch() {
        let mut audio = SignalBuffer::new(SignalKind::Audio, 4);
        let control = SignalBuffer::new(SignalKind::Control, 4);
        assert!(!audio.mix_from(&control));
    }

    #[test]
    fn test_resize() {
        let mut buf = SignalBuffer::new(SignalKind::Control, 128);
        buf.resize(512);
        assert_eq!(buf.len(), 512);
        buf.resize(64);
        assert_eq!(buf.len(), 64);
    }
}
