//! Multiband Compressor Engine - Main Entry Point
//!
//! The engine owns all DSP state and runs entirely on the host's audio
//! thread. Parameters arrive through the shared [`ParameterStore`]; the
//! incoming audio is copied out for the analyzer through one
//! [`trisect_dsp::SampleFifoProducer`] per channel.
//!
//! # Per-block order
//!
//! ```text
//! snapshot ─▶ FIFOs (raw input) ─▶ input trim ─▶ crossover split
//!          ─▶ compress (all 3 bands) ─▶ silence muted / un-soloed bands
//!          ─▶ sum ─▶ output trim
//! ```
//!
//! Every compressor runs every block, even when its band is excluded from the
//! sum, so toggling solo/mute never lands on a stale envelope.
//!
//! Nothing on the per-block path logs. Crossover moves are published through
//! [`AppliedCutoffs`] and reported from the analyzer side.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use trisect_dsp::{
    sample_fifo, AudioBuffer, AudioProcessor, ChannelSampleFifo, CompressorBand,
    CrossoverFilterBank, ProcessContext, ProcessSpec, SampleFifoConsumer, TrimGain, NUM_BANDS,
};

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::params::{BandId, EngineSettings, ParameterStore};

/// Crossover cutoffs the audio thread last applied, after clamping
#[derive(Debug, Default)]
pub struct AppliedCutoffs {
    low: AtomicU32,
    high: AtomicU32,
}

impl AppliedCutoffs {
    fn store(&self, (low, high): (f32, f32)) {
        self.low.store(low.to_bits(), Ordering::Relaxed);
        self.high.store(high.to_bits(), Ordering::Relaxed);
    }

    /// `(0.0, 0.0)` until the engine is prepared
    pub fn load(&self) -> (f32, f32) {
        (
            f32::from_bits(self.low.load(Ordering::Relaxed)),
            f32::from_bits(self.high.load(Ordering::Relaxed)),
        )
    }
}

/// Analyzer-side handles created alongside the engine
pub struct AnalyzerInput {
    pub left: SampleFifoConsumer,
    pub right: SampleFifoConsumer,
    /// Current sample rate as `f32` bits, updated on every prepare
    pub sample_rate: Arc<AtomicU32>,
    pub cutoffs: Arc<AppliedCutoffs>,
}

impl AnalyzerInput {
    pub fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate.load(Ordering::Relaxed))
    }
}

/// Three-band compressor with input/output trim
pub struct MultibandCompressor {
    params: Arc<ParameterStore>,
    config: EngineConfig,
    spec: Option<ProcessSpec>,

    crossover: CrossoverFilterBank,
    compressors: [CompressorBand; NUM_BANDS],
    input_gain: TrimGain,
    output_gain: TrimGain,

    /// Working buffer: holds the trimmed input, later the summed output
    work: AudioBuffer,
    bands: [AudioBuffer; NUM_BANDS],

    fifos: [ChannelSampleFifo; 2],
    sample_rate: Arc<AtomicU32>,
    cutoffs: Arc<AppliedCutoffs>,
}

impl MultibandCompressor {
    /// Create an unprepared engine and the analyzer's ends of its FIFOs
    pub fn new(
        params: Arc<ParameterStore>,
        config: &EngineConfig,
    ) -> EngineResult<(Self, AnalyzerInput)> {
        config.validate()?;

        let (left_tx, left_rx) = sample_fifo(config.fifo_block_size, config.fifo_slots)?;
        let (right_tx, right_rx) = sample_fifo(config.fifo_block_size, config.fifo_slots)?;
        let sample_rate = Arc::new(AtomicU32::new(0.0_f32.to_bits()));
        let cutoffs = Arc::new(AppliedCutoffs::default());

        let engine = Self {
            params,
            config: config.clone(),
            spec: None,
            crossover: CrossoverFilterBank::new(),
            compressors: std::array::from_fn(|_| CompressorBand::default()),
            input_gain: TrimGain::new(config.trim_ramp_seconds),
            output_gain: TrimGain::new(config.trim_ramp_seconds),
            work: AudioBuffer::default(),
            bands: std::array::from_fn(|_| AudioBuffer::default()),
            fifos: [
                ChannelSampleFifo::new(left_tx),
                ChannelSampleFifo::new(right_tx),
            ],
            sample_rate: Arc::clone(&sample_rate),
            cutoffs: Arc::clone(&cutoffs),
        };

        let input = AnalyzerInput {
            left: left_rx,
            right: right_rx,
            sample_rate,
            cutoffs,
        };

        Ok((engine, input))
    }

    /// Allocate buffers and reset all DSP state for a new stream
    ///
    /// Not real-time safe. Fails on a non-positive or non-finite sample rate
    /// or a zero block size; the engine stays unprepared in that case.
    pub fn prepare(&mut self, sample_rate: f32, max_block_size: usize) -> EngineResult<()> {
        let spec = ProcessSpec::new(sample_rate, max_block_size, self.config.channels);
        spec.validate()?;

        self.work.set_size(spec.channels, max_block_size);
        for band in &mut self.bands {
            band.set_size(spec.channels, max_block_size);
        }

        let settings = EngineSettings::snapshot(&self.params);

        self.crossover
            .configure(settings.low_mid_hz, settings.mid_high_hz, sample_rate)?;
        self.crossover.reset();
        if let Some((low, high)) = self.crossover.cutoffs() {
            self.cutoffs.store((low, high));
            if low != settings.low_mid_hz || high != settings.mid_high_hz {
                warn!(
                    "Crossover clamped to {:.0}Hz / {:.0}Hz at {}Hz",
                    low, high, sample_rate
                );
            }
        }

        for (compressor, band) in self.compressors.iter_mut().zip(&settings.bands) {
            compressor.prepare(&spec)?;
            compressor.update_settings(band.compressor);
        }

        // Trims start at their targets; only later changes ramp
        self.input_gain.prepare(&spec)?;
        self.output_gain.prepare(&spec)?;
        self.input_gain.set_gain_db(settings.gain_in_db);
        self.output_gain.set_gain_db(settings.gain_out_db);
        self.input_gain.reset();
        self.output_gain.reset();

        for fifo in &mut self.fifos {
            fifo.reset();
        }

        self.sample_rate.store(sample_rate.to_bits(), Ordering::Relaxed);
        self.spec = Some(spec);

        info!(
            "Prepared multiband compressor: {}Hz, {} channels, {} frames",
            sample_rate, spec.channels, max_block_size
        );
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    pub fn sample_rate(&self) -> Option<f32> {
        self.spec.map(|spec| spec.sample_rate)
    }

    pub fn max_block_size(&self) -> Option<usize> {
        self.spec.map(|spec| spec.max_block_size)
    }

    pub fn num_channels(&self) -> usize {
        self.config.channels
    }

    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    /// Resolved crossover cutoffs, once prepared
    pub fn crossover_cutoffs(&self) -> Option<(f32, f32)> {
        self.crossover.cutoffs()
    }

    /// Current gain reduction of one band's compressor
    pub fn gain_reduction_db(&self, band: BandId, channel: usize) -> f32 {
        self.compressors[band.index()].gain_reduction_db(channel)
    }

    /// Blocks the analyzer FIFOs had to drop, summed over both channels
    pub fn dropped_analyzer_blocks(&self) -> u64 {
        self.fifos.iter().map(ChannelSampleFifo::dropped_blocks).sum()
    }

    /// Clear filter histories, envelopes and staged analyzer samples
    pub fn reset(&mut self) {
        self.crossover.reset();
        for compressor in &mut self.compressors {
            compressor.reset();
        }
        self.input_gain.reset();
        self.output_gain.reset();
        for fifo in &mut self.fifos {
            fifo.reset();
        }
    }

    /// Process interleaved frames (`[L0, R0, L1, R1, ...]`) in place
    ///
    /// # Real-time Safety
    /// No allocations or locks while the block fits the prepared size.
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        let channels = self.config.channels;
        let frames = buffer.len() / channels;
        if frames == 0 || !self.ensure_capacity(frames) {
            return;
        }

        self.work.read_interleaved(&buffer[..frames * channels]);
        self.process_work();
        self.work.write_interleaved(buffer);
    }

    /// Process separate left/right slices in place
    ///
    /// Both slices should have the same length; only the common length is
    /// processed. A mono engine processes `left` and leaves `right` alone.
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = left.len().min(right.len());
        if frames == 0 || !self.ensure_capacity(frames) {
            return;
        }

        self.work.set_num_samples(frames);
        self.work.channel_mut(0).copy_from_slice(&left[..frames]);
        if self.config.channels > 1 {
            self.work.channel_mut(1).copy_from_slice(&right[..frames]);
        }

        self.process_work();

        left[..frames].copy_from_slice(self.work.channel(0));
        if self.config.channels > 1 {
            right[..frames].copy_from_slice(self.work.channel(1));
        }
    }

    /// Make sure a block of `frames` fits. Returns `false` if unprepared.
    fn ensure_capacity(&mut self, frames: usize) -> bool {
        let Some(spec) = self.spec else {
            return false;
        };
        if frames <= spec.max_block_size {
            return true;
        }

        warn!(
            "Host block of {} frames exceeds prepared {}, re-preparing",
            frames, spec.max_block_size
        );
        match self.prepare(spec.sample_rate, frames) {
            Ok(()) => true,
            Err(e) => {
                warn!("Re-prepare failed, passing audio through: {}", e);
                false
            }
        }
    }

    /// Run the full signal path over `self.work`
    fn process_work(&mut self) {
        let settings = EngineSettings::snapshot(&self.params);
        self.apply_settings(&settings);

        let last_channel = self.work.num_channels() - 1;
        self.fifos[0].update(self.work.channel(0));
        self.fifos[1].update(self.work.channel(last_channel.min(1)));

        let context = ProcessContext::default();
        self.input_gain.process(&mut self.work, &context);

        self.crossover.split(&self.work, &mut self.bands);

        let active = settings.active_bands();
        for ((compressor, band), enabled) in self
            .compressors
            .iter_mut()
            .zip(self.bands.iter_mut())
            .zip(active)
        {
            compressor.set_enabled(enabled);
            compressor.process_block(band);
        }

        self.work.clear();
        for (compressor, band) in self.compressors.iter().zip(&self.bands) {
            if compressor.is_enabled() {
                self.work.add_from(band);
            }
        }

        self.output_gain.process(&mut self.work, &context);
    }

    fn apply_settings(&mut self, settings: &EngineSettings) {
        let sample_rate = self.crossover.sample_rate();
        if let Ok(true) = self
            .crossover
            .configure(settings.low_mid_hz, settings.mid_high_hz, sample_rate)
        {
            if let Some(applied) = self.crossover.cutoffs() {
                self.cutoffs.store(applied);
            }
        }

        for (compressor, band) in self.compressors.iter_mut().zip(&settings.bands) {
            compressor.update_settings(band.compressor);
            compressor.set_bypassed(band.bypassed);
        }

        self.input_gain.set_gain_db(settings.gain_in_db);
        self.output_gain.set_gain_db(settings.gain_out_db);
    }
}

/// Create and prepare an engine in one call
pub fn prepared_engine(
    params: Arc<ParameterStore>,
    config: &EngineConfig,
    sample_rate: f32,
) -> EngineResult<(MultibandCompressor, AnalyzerInput)> {
    let (mut engine, input) = MultibandCompressor::new(params, config)?;
    engine.prepare(sample_rate, config.max_block_size)?;
    Ok((engine, input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::params::ParameterId;
    use std::f32::consts::PI;

    const SAMPLE_RATE: f32 = 48000.0;

    fn engine_with(params: Arc<ParameterStore>) -> (MultibandCompressor, AnalyzerInput) {
        prepared_engine(params, &EngineConfig::default(), SAMPLE_RATE).unwrap()
    }

    fn sine_block(freq: f32, amplitude: f32, start: usize, frames: usize) -> Vec<f32> {
        (start..start + frames)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0_f32, |p, s| p.max(s.abs()))
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    /// Run `seconds` of a sine through the engine; returns the last 100ms of left output
    fn run_sine(
        engine: &mut MultibandCompressor,
        freq: f32,
        amplitude: f32,
        seconds: f32,
    ) -> Vec<f32> {
        let block = 480;
        let blocks = (seconds * SAMPLE_RATE) as usize / block;
        let mut tail = Vec::new();
        for index in 0..blocks {
            let mut left = sine_block(freq, amplitude, index * block, block);
            let mut right = left.clone();
            engine.process_planar(&mut left, &mut right);
            if index + 10 >= blocks {
                tail.extend_from_slice(&left);
            }
        }
        tail
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = EngineConfig {
            fifo_slots: 0,
            ..Default::default()
        };
        let result = MultibandCompressor::new(Arc::new(ParameterStore::new()), &config);
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_invalid_sample_rate_is_fatal() {
        let (mut engine, _input) =
            MultibandCompressor::new(Arc::new(ParameterStore::new()), &EngineConfig::default())
                .unwrap();
        assert!(matches!(
            engine.prepare(0.0, 512),
            Err(EngineError::DspError(_))
        ));
        assert!(engine.prepare(f32::INFINITY, 512).is_err());
        assert!(engine.prepare(48000.0, 0).is_err());
        assert!(!engine.is_prepared());
    }

    #[test]
    fn test_unprepared_engine_passes_audio() {
        let (mut engine, _input) =
            MultibandCompressor::new(Arc::new(ParameterStore::new()), &EngineConfig::default())
                .unwrap();
        let mut buffer = vec![0.5, -0.5, 0.25, -0.25];
        engine.process_interleaved(&mut buffer);
        assert_eq!(buffer, vec![0.5, -0.5, 0.25, -0.25]);
    }

    #[test]
    fn test_empty_block_is_noop() {
        let params = Arc::new(ParameterStore::new());
        params.set(ParameterId::Threshold(BandId::Mid), -30.0).unwrap();
        let (mut engine, input) = engine_with(params);
        run_sine(&mut engine, 1000.0, 0.5, 0.1);

        let before = engine.gain_reduction_db(BandId::Mid, 0);
        let blocks_before = input.left.num_available_blocks();

        engine.process_interleaved(&mut []);
        engine.process_planar(&mut [], &mut []);
        engine.process_interleaved(&mut [0.3]);

        assert_eq!(engine.gain_reduction_db(BandId::Mid, 0), before);
        assert_eq!(input.left.num_available_blocks(), blocks_before);
    }

    #[test]
    fn test_defaults_are_transparent() {
        // Threshold 0 dB: nothing compresses, output is the all-pass input
        let (mut engine, _input) = engine_with(Arc::new(ParameterStore::new()));
        let tail = run_sine(&mut engine, 1000.0, 0.5, 0.5);
        let level_db = 20.0 * (rms(&tail) / (0.5 / 2.0_f32.sqrt())).log10();
        assert!(level_db.abs() < 0.1, "level changed by {level_db} dB");
    }

    #[test]
    fn test_sine_settles_near_static_curve() {
        let params = Arc::new(ParameterStore::new());
        for band in BandId::ALL {
            params.set(ParameterId::Threshold(band), -12.0).unwrap();
            params.set(ParameterId::Ratio(band), 4.0).unwrap(); // "4.0"
            params.set(ParameterId::Attack(band), 5.0).unwrap();
            params.set(ParameterId::Release(band), 100.0).unwrap();
        }
        let (mut engine, _input) = engine_with(params);

        let amplitude = 10.0_f32.powf(-6.0 / 20.0);
        let tail = run_sine(&mut engine, 1000.0, amplitude, 1.0);
        let peak_db = 20.0 * peak(&tail).log10();

        // A single band settles near -12 + (-6 - -12) / 4 = -10.5 dBFS. The
        // crossovers leave part of the tone in the outer bands below threshold,
        // so the sum settles about 1.4 dB louder, at -9.1 dBFS.
        assert!((peak_db + 9.1).abs() < 0.3, "settled at {peak_db} dBFS");
        assert!(engine.gain_reduction_db(BandId::Mid, 0) < -3.0);
        assert!(engine.gain_reduction_db(BandId::Low, 0) > -1.0);
    }

    #[test]
    fn test_mute_silences_band_but_keeps_tracking() {
        let configure = |muted: bool| {
            let params = Arc::new(ParameterStore::new());
            for band in BandId::ALL {
                params.set(ParameterId::Threshold(band), -30.0).unwrap();
            }
            params.set_bool(ParameterId::Mute(BandId::Mid), muted).unwrap();
            let (engine, _input) = engine_with(Arc::clone(&params));
            (engine, params)
        };
        let (mut muted, muted_params) = configure(true);
        let (mut open, _) = configure(false);

        let muted_tail = run_sine(&mut muted, 1000.0, 0.5, 0.3);
        let open_tail = run_sine(&mut open, 1000.0, 0.5, 0.3);

        // The 1 kHz tone lives in the mid band
        assert!(peak(&muted_tail) < peak(&open_tail) * 0.4);
        for band in BandId::ALL {
            assert_eq!(
                muted.gain_reduction_db(band, 0),
                open.gain_reduction_db(band, 0)
            );
        }

        // Un-muting lands on identical state: outputs match sample for sample
        muted_params
            .set_bool(ParameterId::Mute(BandId::Mid), false)
            .unwrap();
        let mut a = sine_block(1000.0, 0.5, 0, 480);
        let mut b = a.clone();
        let (mut a_right, mut b_right) = (a.clone(), b.clone());
        muted.process_planar(&mut a, &mut a_right);
        open.process_planar(&mut b, &mut b_right);
        assert_eq!(a, b);
    }

    #[test]
    fn test_solo_isolates_band() {
        let params = Arc::new(ParameterStore::new());
        params.set_bool(ParameterId::Solo(BandId::Mid), true).unwrap();
        let (mut engine, _input) = engine_with(Arc::clone(&params));

        // 100 Hz belongs to the low band
        let low_tail = run_sine(&mut engine, 100.0, 0.5, 0.3);
        assert!(peak(&low_tail) < 0.02, "low tone leaked: {}", peak(&low_tail));

        params.set_bool(ParameterId::Solo(BandId::Low), true).unwrap();
        let both_tail = run_sine(&mut engine, 100.0, 0.5, 0.3);
        assert!(peak(&both_tail) > 0.45);
    }

    #[test]
    fn test_bypassed_band_passes_uncompressed() {
        let params = Arc::new(ParameterStore::new());
        for band in BandId::ALL {
            params.set(ParameterId::Threshold(band), -40.0).unwrap();
            params.set_bool(ParameterId::Bypassed(band), true).unwrap();
        }
        let (mut engine, _input) = engine_with(params);
        let tail = run_sine(&mut engine, 1000.0, 0.5, 0.3);

        let level_db = 20.0 * (rms(&tail) / (0.5 / 2.0_f32.sqrt())).log10();
        assert!(level_db.abs() < 0.1);
        // Detector still ran
        assert!(engine.gain_reduction_db(BandId::Mid, 0) < -10.0);
    }

    #[test]
    fn test_trim_gains() {
        let params = Arc::new(ParameterStore::new());
        params.set(ParameterId::GainOut, -6.0).unwrap();
        let (mut engine, _input) = engine_with(Arc::clone(&params));

        let tail = run_sine(&mut engine, 1000.0, 0.25, 0.3);
        let level_db = 20.0 * (rms(&tail) / (0.25 / 2.0_f32.sqrt())).log10();
        assert!((level_db + 6.0).abs() < 0.1, "got {level_db} dB");

        // Input +6 cancels output -6
        params.set(ParameterId::GainIn, 6.0).unwrap();
        let tail = run_sine(&mut engine, 1000.0, 0.25, 0.3);
        let level_db = 20.0 * (rms(&tail) / (0.25 / 2.0_f32.sqrt())).log10();
        assert!(level_db.abs() < 0.1, "got {level_db} dB");
    }

    #[test]
    fn test_interleaved_matches_planar() {
        let params = Arc::new(ParameterStore::new());
        params.set(ParameterId::Threshold(BandId::Low), -20.0).unwrap();
        let (mut planar, _a) = engine_with(Arc::clone(&params));
        let (mut interleaved, _b) = engine_with(params);

        let left = sine_block(200.0, 0.7, 0, 256);
        let right = sine_block(3000.0, 0.4, 0, 256);

        let (mut l, mut r) = (left.clone(), right.clone());
        planar.process_planar(&mut l, &mut r);

        let mut frames: Vec<f32> = left
            .iter()
            .zip(&right)
            .flat_map(|(&a, &b)| [a, b])
            .collect();
        interleaved.process_interleaved(&mut frames);

        for (i, (&a, &b)) in l.iter().zip(&r).enumerate() {
            assert_eq!(frames[2 * i], a);
            assert_eq!(frames[2 * i + 1], b);
        }
    }

    #[test]
    fn test_large_block_reprepares() {
        let (mut engine, _input) = engine_with(Arc::new(ParameterStore::new()));
        assert_eq!(engine.max_block_size(), Some(512));

        let mut left = sine_block(500.0, 0.5, 0, 2048);
        let mut right = left.clone();
        engine.process_planar(&mut left, &mut right);

        assert_eq!(engine.max_block_size(), Some(2048));
        assert!(left.iter().all(|s| s.is_finite()));
        assert!(peak(&left) > 0.1);
    }

    #[test]
    fn test_crossover_follows_parameters() {
        let params = Arc::new(ParameterStore::new());
        let (mut engine, _input) = engine_with(Arc::clone(&params));
        assert_eq!(engine.crossover_cutoffs(), Some((400.0, 2000.0)));

        params.set(ParameterId::LowMidCrossover, 250.0).unwrap();
        params.set(ParameterId::MidHighCrossover, 5000.0).unwrap();
        let mut left = vec![0.0; 64];
        let mut right = vec![0.0; 64];
        engine.process_planar(&mut left, &mut right);
        assert_eq!(engine.crossover_cutoffs(), Some((250.0, 5000.0)));
    }

    /// Counts every event emitted while installed
    struct EventCounter(Arc<std::sync::atomic::AtomicUsize>);

    impl tracing::Subscriber for EventCounter {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }
        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }
        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}
        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}
        fn event(&self, _: &tracing::Event<'_>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
        fn enter(&self, _: &tracing::span::Id) {}
        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn test_block_path_never_logs() {
        let params = Arc::new(ParameterStore::new());
        let (mut engine, input) =
            MultibandCompressor::new(Arc::clone(&params), &EngineConfig::default()).unwrap();
        let events = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        tracing::subscriber::with_default(EventCounter(Arc::clone(&events)), || {
            engine.prepare(SAMPLE_RATE, 512).unwrap();
            assert!(events.load(Ordering::Relaxed) > 0);
            events.store(0, Ordering::Relaxed);

            for i in 0..100 {
                let hz = if i % 2 == 0 { 300.0 } else { 500.0 };
                params.set(ParameterId::LowMidCrossover, hz).unwrap();
                let mut left = sine_block(1000.0, 0.5, i * 256, 256);
                let mut right = left.clone();
                engine.process_planar(&mut left, &mut right);
            }
        });

        assert_eq!(events.load(Ordering::Relaxed), 0);
        // The move is still visible to the analyzer side
        assert_eq!(input.cutoffs.load(), (500.0, 2000.0));
    }

    #[test]
    fn test_raw_input_feeds_analyzer_fifos() {
        let params = Arc::new(ParameterStore::new());
        params.set(ParameterId::GainIn, 6.0).unwrap();
        params.set(ParameterId::GainOut, -12.0).unwrap();
        let (mut engine, mut input) = engine_with(params);
        assert_eq!(input.sample_rate(), SAMPLE_RATE);

        let mut frames = vec![0.1_f32; 2 * 700];
        engine.process_interleaved(&mut frames);
        assert_eq!(input.left.num_available_blocks(), 1);
        assert_eq!(input.right.num_available_blocks(), 1);

        let mut frames = vec![0.1_f32; 2 * 400];
        engine.process_interleaved(&mut frames);
        assert_eq!(input.left.num_available_blocks(), 2);

        // The analyzer sees the input untouched by trims or compression
        assert!(frames.iter().all(|&s| (s - 0.05).abs() < 0.01));
        let block = input.left.pop().unwrap();
        assert_eq!(block.len(), 512);
        assert!(block.iter().all(|&s| s == 0.1));
        let block = input.right.pop().unwrap();
        assert!(block.iter().all(|&s| s == 0.1));
        assert_eq!(engine.dropped_analyzer_blocks(), 0);
    }

    #[test]
    fn test_full_fifo_never_blocks_audio() {
        let config = EngineConfig {
            fifo_block_size: 64,
            fifo_slots: 2,
            ..Default::default()
        };
        let (mut engine, input) =
            prepared_engine(Arc::new(ParameterStore::new()), &config, SAMPLE_RATE).unwrap();

        let mut frames = vec![0.2_f32; 2 * 512];
        engine.process_interleaved(&mut frames);
        assert_eq!(input.left.num_available_blocks(), 2);
        assert_eq!(engine.dropped_analyzer_blocks(), 12);
    }

    #[test]
    fn test_mono_engine() {
        let config = EngineConfig {
            channels: 1,
            ..Default::default()
        };
        let (mut engine, input) =
            prepared_engine(Arc::new(ParameterStore::new()), &config, SAMPLE_RATE).unwrap();

        let mut samples = vec![0.1_f32; 512];
        engine.process_interleaved(&mut samples);
        assert_eq!(input.left.num_available_blocks(), 1);
        assert_eq!(input.right.num_available_blocks(), 1);
    }
}
