//! Audio Processor Trait
//!
//! Defines the interface shared by the per-block processors in the signal
//! path (trim gains, compressor bands).

use crate::buffer::AudioBuffer;
use crate::error::DspError;

/// Largest channel count any processor is prepared for
pub const MAX_CHANNELS: usize = 2;

/// Stream description handed to processors at prepare time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f32, max_block_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            channels,
        }
    }

    /// Reject specs that no processor can run with
    pub fn validate(&self) -> Result<(), DspError> {
        if !self.sample_rate.is_finite() || self.sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(self.sample_rate));
        }
        if self.max_block_size == 0 {
            return Err(DspError::InvalidBlockSize);
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(DspError::InvalidChannelCount {
                got: self.channels,
                max: MAX_CHANNELS,
            });
        }
        Ok(())
    }
}

/// Per-call flags passed alongside the buffer
///
/// A bypassed context still runs the processor; the processor decides how
/// to honor it (compressors keep their detector running, for example).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessContext {
    pub is_bypassed: bool,
}

impl ProcessContext {
    pub fn bypassed(is_bypassed: bool) -> Self {
        Self { is_bypassed }
    }
}

/// Trait for audio processors in the DSP chain
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait AudioProcessor: Send {
    /// Allocate state for the given stream. Called off the audio thread.
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<(), DspError>;

    /// Process the buffer's active region in place
    fn process(&mut self, buffer: &mut AudioBuffer, context: &ProcessContext);

    /// Reset internal state (filter histories, envelopes, ramps)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;
}
