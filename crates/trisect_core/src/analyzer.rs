//! Spectrum Analyzer Driver
//!
//! Runs off the audio thread. Each timer tick drains the per-channel sample
//! FIFOs, turns the samples into spectrum frames and the frames into paths,
//! then publishes the newest left/right paths to an [`AnalyzerSnapshot`] that
//! the paint side reads.
//!
//! ```text
//! SampleFifoConsumer ─▶ FftDataGenerator ─▶ AnalyzerPathGenerator ─▶ latest path
//!        (per channel, inside PathProducer)                              │
//!                                                  AnalyzerSnapshot ◀────┘
//! ```

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, warn};
use trisect_dsp::{
    AnalyzerPath, AnalyzerPathGenerator, FftDataGenerator, Rect, SampleFifoConsumer,
};

use crate::config::AnalyzerConfig;
use crate::engine::{AnalyzerInput, AppliedCutoffs};
use crate::error::EngineResult;
use crate::grid::analysis_area;
use crate::params::{ParameterStore, ParameterSubscription};

/// Turns one channel's FIFO output into drawable paths
pub struct PathProducer {
    channel: &'static str,
    fifo: SampleFifoConsumer,
    block: Vec<f32>,
    generator: FftDataGenerator,
    paths: AnalyzerPathGenerator,
    frame: Vec<f32>,
    path: AnalyzerPath,
    reported_drops: u64,
}

impl PathProducer {
    pub fn new(channel: &'static str, fifo: SampleFifoConsumer, config: &AnalyzerConfig) -> Self {
        let block = vec![0.0; fifo.block_size()];
        Self {
            channel,
            fifo,
            block,
            generator: FftDataGenerator::new(
                config.fft_order(),
                config.window.into(),
                config.floor_db,
            ),
            paths: AnalyzerPathGenerator::new(),
            frame: Vec::new(),
            path: AnalyzerPath::new(),
            reported_drops: 0,
        }
    }

    /// Drain everything the audio side has queued and rebuild the path
    ///
    /// `bounds` is the area the path is laid out in. Returns `true` if the
    /// latest path changed.
    pub fn process(&mut self, bounds: Rect, sample_rate: f32) -> bool {
        let fft_size = self.generator.fft_size();
        let bin_width = sample_rate / fft_size as f32;
        let floor_db = self.generator.floor_db();
        let mut updated = false;

        while self.fifo.pop_into(&mut self.block) {
            self.generator.push_samples(&self.block);

            while self.generator.get_fft_data(&mut self.frame) {
                self.paths
                    .generate_path(&self.frame, bounds, fft_size, bin_width, floor_db);
            }

            if let Some(latest) = self.paths.take_latest() {
                self.path = latest;
                updated = true;
            }
        }

        self.report_drops();
        updated
    }

    /// Throw away queued audio and the rolling window
    pub fn discard(&mut self) {
        while self.fifo.pop_into(&mut self.block) {}
        self.generator.reset();
        while self.paths.take_latest().is_some() {}
        self.path.clear();
        self.report_drops();
    }

    pub fn path(&self) -> &AnalyzerPath {
        &self.path
    }

    pub fn channel(&self) -> &'static str {
        self.channel
    }

    pub fn fft_size(&self) -> usize {
        self.generator.fft_size()
    }

    /// Blocks the audio side could not queue because this producer fell behind
    pub fn dropped_blocks(&self) -> u64 {
        self.fifo.dropped_blocks()
    }

    /// False once the engine holding the other end of the FIFO is gone
    pub fn is_engine_alive(&self) -> bool {
        !self.fifo.is_abandoned()
    }

    fn report_drops(&mut self) {
        let dropped = self.fifo.dropped_blocks();
        if dropped > self.reported_drops {
            warn!(
                channel = self.channel,
                new = dropped - self.reported_drops,
                total = dropped,
                "Analyzer FIFO overflowed; audio blocks were dropped"
            );
            self.reported_drops = dropped;
        }
    }
}

/// Latest analyzer output, shared with whoever paints it
#[derive(Debug, Default)]
pub struct AnalyzerSnapshot {
    left: RwLock<AnalyzerPath>,
    right: RwLock<AnalyzerPath>,
    generation: AtomicU64,
}

impl AnalyzerSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bumped every time new paths are published
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn left(&self) -> AnalyzerPath {
        self.left.read().clone()
    }

    pub fn right(&self) -> AnalyzerPath {
        self.right.read().clone()
    }

    /// Borrow both paths without cloning them
    pub fn with_paths<R>(&self, f: impl FnOnce(&AnalyzerPath, &AnalyzerPath) -> R) -> R {
        let left = self.left.read();
        let right = self.right.read();
        f(&left, &right)
    }

    fn publish(&self, left: &AnalyzerPath, right: &AnalyzerPath) {
        self.left.write().clone_from(left);
        self.right.write().clone_from(right);
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn clear(&self) {
        self.left.write().clear();
        self.right.write().clear();
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Two-channel analyzer fed by a [`crate::MultibandCompressor`]
pub struct SpectrumAnalyzer {
    left: PathProducer,
    right: PathProducer,
    sample_rate: Arc<AtomicU32>,
    cutoffs: Arc<AppliedCutoffs>,
    reported_cutoffs: (f32, f32),
    enabled: bool,
    refresh_interval: Duration,
    params_changed: Option<ParameterSubscription>,
    snapshot: Arc<AnalyzerSnapshot>,
}

impl SpectrumAnalyzer {
    pub fn new(input: AnalyzerInput, config: &AnalyzerConfig) -> EngineResult<Self> {
        config.validate()?;

        let AnalyzerInput {
            left,
            right,
            sample_rate,
            cutoffs,
        } = input;
        let reported_cutoffs = cutoffs.load();

        Ok(Self {
            left: PathProducer::new("left", left, config),
            right: PathProducer::new("right", right, config),
            sample_rate,
            cutoffs,
            reported_cutoffs,
            enabled: config.enabled,
            refresh_interval: config.refresh_interval(),
            params_changed: None,
            snapshot: Arc::new(AnalyzerSnapshot::new()),
        })
    }

    /// Also request a repaint whenever a parameter is written
    pub fn with_parameter_listener(mut self, params: &ParameterStore) -> Self {
        self.params_changed = Some(params.subscribe());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Toggle analysis. While disabled, queued audio is discarded so the
    /// audio side never backs up, and the published paths are cleared.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        debug!(enabled, "Spectrum analysis toggled");
        self.enabled = enabled;
        if !enabled {
            self.left.discard();
            self.right.discard();
            self.snapshot.clear();
        }
    }

    pub fn snapshot(&self) -> Arc<AnalyzerSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate.load(Ordering::Relaxed))
    }

    /// Crossover cutoffs as last applied by the engine
    pub fn crossover_cutoffs(&self) -> (f32, f32) {
        self.cutoffs.load()
    }

    pub fn left(&self) -> &PathProducer {
        &self.left
    }

    pub fn right(&self) -> &PathProducer {
        &self.right
    }

    /// Both channels are fed by the same engine; checking one is enough
    pub fn is_engine_alive(&self) -> bool {
        self.left.is_engine_alive()
    }

    /// One analyzer tick for a component occupying `bounds`
    ///
    /// Returns `true` when the caller should repaint: new paths were
    /// published, or a parameter changed since the last tick.
    pub fn timer_callback(&mut self, bounds: Rect) -> bool {
        let mut repaint = false;
        self.report_crossover_moves();

        if self.enabled {
            let area = analysis_area(bounds);
            let sample_rate = self.sample_rate();
            if sample_rate > 0.0 {
                let left = self.left.process(area, sample_rate);
                let right = self.right.process(area, sample_rate);
                if left || right {
                    self.snapshot.publish(self.left.path(), self.right.path());
                    repaint = true;
                }
            } else {
                // Not prepared yet; nothing meaningful can be in the FIFOs
                self.left.discard();
                self.right.discard();
            }
        } else {
            self.left.discard();
            self.right.discard();
        }

        if let Some(changed) = &self.params_changed {
            repaint |= changed.take_changed();
        }

        repaint
    }

    fn report_crossover_moves(&mut self) {
        let applied = self.cutoffs.load();
        if applied != self.reported_cutoffs {
            debug!(
                "Crossover moved to {:.0}Hz / {:.0}Hz",
                applied.0, applied.1
            );
            self.reported_cutoffs = applied;
        }
    }
}
