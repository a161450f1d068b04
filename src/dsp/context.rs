//! Per-block processing context.

/// Timing information handed to every processor for one block.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Number of sample frames in this block.
    pub block_size: usize,
    /// Monotonic block counter, bumped once per render call.
    pub tick: u64,
}

impl ProcessContext {
    /// Creates a context for the first block.
    pub fn new(sample_rate: f32, block_size: usize) -> Self {
        Self {
            sample_rate,
            block_size,
            tick: 0,
        }
    }

    /// Duration of one block in seconds.
    pub fn block_duration(&self) -> f32 {
        self.block_size as f32 / self.sample_rate
    }

    /// Converts a duration in seconds to a sample count.
    pub fn seconds_to_samples(&self, seconds: f32) -> usize {
        (seconds * self.sample_rate) as usize
    }
}

impl Default for ProcessContext {
    fn default() -> Self {
        Self::new(44100.0, 256)
    }
}
