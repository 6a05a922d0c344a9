//! DSP Error Types

use thiserror::Error;

/// Errors that can occur while preparing or configuring DSP components
///
/// None of these are produced from inside a processing call: the audio path
/// is made infallible by validating everything up front.
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("Block size must be non-zero")]
    InvalidBlockSize,

    #[error("Channel count must be between 1 and {max}, got {got}")]
    InvalidChannelCount { got: usize, max: usize },

    #[error("Invalid filter coefficients for frequency {frequency}Hz at sample rate {sample_rate}Hz")]
    InvalidCoefficients { frequency: f32, sample_rate: f32 },

    #[error("FIFO needs at least one slot of at least one sample (block size {block_size}, slots {slots})")]
    InvalidFifoCapacity { block_size: usize, slots: usize },

    #[error("Unknown compression ratio label: {0:?}")]
    UnknownRatio(String),
}
