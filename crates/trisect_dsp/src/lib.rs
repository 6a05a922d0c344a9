//! Trisect DSP - Digital Signal Processing Module
//!
//! This crate provides the signal path and analysis primitives for Trisect:
//! - Linkwitz-Riley 3-band crossover with all-pass phase compensation
//! - Per-band feed-forward compressor with attack/release ballistics
//! - Ramped input/output trim gain
//! - Lock-free block FIFO from the audio thread to the analyzer
//! - FFT spectrum frames and analyzer path generation
//!
//! # Architecture
//!
//! Everything reachable from the audio callback follows a strict
//! "no allocation, no locks" rule once prepared. Fallible work (validating
//! sample rates, computing coefficients, sizing buffers) happens in
//! `prepare`/`configure` and returns [`DspError`].

mod buffer;
mod compressor;
mod crossover;
mod error;
mod fft;
mod fifo;
mod gain;
mod path;
mod processor;

pub use buffer::AudioBuffer;
pub use compressor::{
    CompressorBand, CompressorSettings, Ratio, DEFAULT_RATIO_INDEX, RATIO_CHOICES,
};
pub use crossover::{
    resolve_cutoffs, CrossoverFilterBank, LinkwitzRileyType, MAX_CROSSOVER_HZ, MIN_CROSSOVER_HZ,
};
pub use error::DspError;
pub use fft::{FftDataGenerator, FftOrder, WindowKind, FRAME_QUEUE_CAPACITY};
pub use fifo::{sample_fifo, ChannelSampleFifo, SampleFifoConsumer, SampleFifoProducer};
pub use gain::{db_to_linear, gain_to_db, TrimGain, DEFAULT_RAMP_SECONDS};
pub use path::{
    map_from_log10, map_to_log10, AnalyzerPath, AnalyzerPathGenerator, PathPoint, Rect,
    MAX_DISPLAY_HZ, MIN_DISPLAY_HZ, PATH_QUEUE_CAPACITY, PATH_RESOLUTION,
};
pub use processor::{AudioProcessor, ProcessContext, ProcessSpec, MAX_CHANNELS};

/// Number of bands the crossover produces
pub const NUM_BANDS: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let _bank = CrossoverFilterBank::new();
        let _band = CompressorBand::new(48000.0);
        let _gain = TrimGain::default();
        let _generator = FftDataGenerator::default();
        let _paths = AnalyzerPathGenerator::new();
        assert_eq!(RATIO_CHOICES.len(), 14);
    }
}
