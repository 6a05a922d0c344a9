//! Three-Band Linkwitz-Riley Crossover
//!
//! Splits a buffer into low/mid/high bands at two cutoff frequencies using
//! LR4 sections (two cascaded Butterworth BiQuads, 24 dB/oct).
//!
//! # Topology
//!
//! ```text
//!            ┌─ LP(fc0) ── AP(fc1) ──────────▶ low
//! input ─────┤
//!            └─ HP(fc0) ─┬─ LP(fc1) ─────────▶ mid
//!                        └─ HP(fc1) ─────────▶ high
//! ```
//!
//! An LR4 low/high pair sums to an all-pass, so
//! `low + mid + high = AP(fc0) · AP(fc1) · input`. The all-pass on the low
//! branch puts it through the same fc1 phase rotation the other two branches
//! see, which is what keeps the bands aligned when they are summed.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type, Q_BUTTERWORTH_F32};

use crate::buffer::AudioBuffer;
use crate::error::DspError;
use crate::processor::MAX_CHANNELS;

/// Lowest cutoff the bank accepts (Hz)
pub const MIN_CROSSOVER_HZ: f32 = 20.0;

/// Highest cutoff the bank accepts (Hz), before the Nyquist limit is applied
pub const MAX_CROSSOVER_HZ: f32 = 20_000.0;

/// Cutoffs are kept below this fraction of the sample rate
const MAX_CUTOFF_RATIO: f32 = 0.45;

/// Response of one Linkwitz-Riley section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkwitzRileyType {
    LowPass,
    HighPass,
    /// Sum of the low and high outputs: flat magnitude, LR4 phase
    AllPass,
}

/// Passthrough coefficients used before the first `configure`
fn identity_coefficients() -> Coefficients<f32> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

fn butterworth(filter: Type<f32>, cutoff: f32, sample_rate: f32) -> Result<Coefficients<f32>, DspError> {
    Coefficients::<f32>::from_params(filter, sample_rate.hz(), cutoff.hz(), Q_BUTTERWORTH_F32).map_err(
        |_| DspError::InvalidCoefficients {
            frequency: cutoff,
            sample_rate,
        },
    )
}

/// Coefficients for both paths of one cutoff, computed before anything is applied
#[derive(Clone, Copy)]
struct SectionCoefficients {
    lowpass: Coefficients<f32>,
    highpass: Coefficients<f32>,
}

impl SectionCoefficients {
    fn new(cutoff: f32, sample_rate: f32) -> Result<Self, DspError> {
        Ok(Self {
            lowpass: butterworth(Type::LowPass, cutoff, sample_rate)?,
            highpass: butterworth(Type::HighPass, cutoff, sample_rate)?,
        })
    }
}

/// One LR4 section with independent state per channel
///
/// Each path is two identical Butterworth stages in series; the all-pass
/// variant runs both paths and sums them.
struct LinkwitzRiley {
    kind: LinkwitzRileyType,
    lowpass: [[DirectForm2Transposed<f32>; 2]; MAX_CHANNELS],
    highpass: [[DirectForm2Transposed<f32>; 2]; MAX_CHANNELS],
}

impl LinkwitzRiley {
    fn new(kind: LinkwitzRileyType) -> Self {
        let identity = identity_coefficients();
        Self {
            kind,
            lowpass: core::array::from_fn(|_| {
                core::array::from_fn(|_| DirectForm2Transposed::<f32>::new(identity))
            }),
            highpass: core::array::from_fn(|_| {
                core::array::from_fn(|_| DirectForm2Transposed::<f32>::new(identity))
            }),
        }
    }

    /// Swap in new coefficients, keeping the filter histories
    fn update_coefficients(&mut self, coeffs: SectionCoefficients) {
        for stages in &mut self.lowpass {
            for stage in stages.iter_mut() {
                stage.update_coefficients(coeffs.lowpass);
            }
        }
        for stages in &mut self.highpass {
            for stage in stages.iter_mut() {
                stage.update_coefficients(coeffs.highpass);
            }
        }
    }

    #[inline]
    fn process_sample(&mut self, channel: usize, input: f32) -> f32 {
        match self.kind {
            LinkwitzRileyType::LowPass => Self::cascade(&mut self.lowpass[channel], input),
            LinkwitzRileyType::HighPass => Self::cascade(&mut self.highpass[channel], input),
            LinkwitzRileyType::AllPass => {
                Self::cascade(&mut self.lowpass[channel], input)
                    + Self::cascade(&mut self.highpass[channel], input)
            }
        }
    }

    #[inline]
    fn cascade(stages: &mut [DirectForm2Transposed<f32>; 2], input: f32) -> f32 {
        let first = stages[0].run(input);
        stages[1].run(first)
    }

    fn process(&mut self, buffer: &mut AudioBuffer) {
        for channel in 0..buffer.num_channels().min(MAX_CHANNELS) {
            for sample in buffer.channel_mut(channel) {
                *sample = self.process_sample(channel, *sample);
            }
        }
    }

    fn reset(&mut self) {
        for stage in self.lowpass.iter_mut().chain(self.highpass.iter_mut()).flatten() {
            stage.reset_state();
        }
    }
}

/// Clamp a requested crossover pair into a usable, correctly ordered pair
///
/// Both cutoffs are limited to `[MIN_CROSSOVER_HZ, min(MAX_CROSSOVER_HZ, 0.45 * fs)]`.
/// If the low cutoff would meet or pass the high one it is pulled down to one
/// octave below it, so the mid band never collapses or inverts.
pub fn resolve_cutoffs(low_mid_hz: f32, mid_high_hz: f32, sample_rate: f32) -> (f32, f32) {
    let max_hz = (sample_rate * MAX_CUTOFF_RATIO)
        .min(MAX_CROSSOVER_HZ)
        .max(MIN_CROSSOVER_HZ * 2.0);

    let high = mid_high_hz.clamp(MIN_CROSSOVER_HZ * 2.0, max_hz);
    let mut low = low_mid_hz.clamp(MIN_CROSSOVER_HZ, max_hz);
    if low >= high {
        low = (high * 0.5).max(MIN_CROSSOVER_HZ);
    }
    (low, high)
}

/// Three-band crossover made of five LR4 sections
///
/// Coefficients only change inside [`configure`](Self::configure), which the
/// engine calls between blocks, so a block is always filtered with one
/// consistent set.
pub struct CrossoverFilterBank {
    // fc0 sections
    low_lowpass: LinkwitzRiley,
    low_highpass: LinkwitzRiley,
    // fc1 sections
    low_allpass: LinkwitzRiley,
    mid_lowpass: LinkwitzRiley,
    mid_highpass: LinkwitzRiley,
    cutoffs: Option<(f32, f32)>,
    sample_rate: f32,
}

impl CrossoverFilterBank {
    pub fn new() -> Self {
        Self {
            low_lowpass: LinkwitzRiley::new(LinkwitzRileyType::LowPass),
            low_highpass: LinkwitzRiley::new(LinkwitzRileyType::HighPass),
            low_allpass: LinkwitzRiley::new(LinkwitzRileyType::AllPass),
            mid_lowpass: LinkwitzRiley::new(LinkwitzRileyType::LowPass),
            mid_highpass: LinkwitzRiley::new(LinkwitzRileyType::HighPass),
            cutoffs: None,
            sample_rate: 0.0,
        }
    }

    /// Set both crossover points
    ///
    /// Returns `Ok(true)` when coefficients were recomputed and `Ok(false)` when
    /// the resolved cutoffs and sample rate are unchanged. On error nothing is
    /// modified: both cutoffs' coefficients are computed before either is applied.
    pub fn configure(
        &mut self,
        low_mid_hz: f32,
        mid_high_hz: f32,
        sample_rate: f32,
    ) -> Result<bool, DspError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        let resolved = resolve_cutoffs(low_mid_hz, mid_high_hz, sample_rate);
        if self.cutoffs == Some(resolved) && self.sample_rate == sample_rate {
            return Ok(false);
        }

        let (low, high) = resolved;
        let fc0 = SectionCoefficients::new(low, sample_rate)?;
        let fc1 = SectionCoefficients::new(high, sample_rate)?;

        self.low_lowpass.update_coefficients(fc0);
        self.low_highpass.update_coefficients(fc0);
        self.low_allpass.update_coefficients(fc1);
        self.mid_lowpass.update_coefficients(fc1);
        self.mid_highpass.update_coefficients(fc1);

        self.cutoffs = Some(resolved);
        self.sample_rate = sample_rate;
        Ok(true)
    }

    /// Change cutoffs at the already-configured sample rate
    pub fn set_cutoffs(&mut self, low_mid_hz: f32, mid_high_hz: f32) -> Result<bool, DspError> {
        self.configure(low_mid_hz, mid_high_hz, self.sample_rate)
    }

    /// Resolved `(low_mid, mid_high)` cutoffs, if configured
    pub fn cutoffs(&self) -> Option<(f32, f32)> {
        self.cutoffs
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Split `input` into `[low, mid, high]`
    ///
    /// Each band buffer adopts the input's length; their capacity must cover it.
    ///
    /// # Real-time Safety
    /// No allocations. O(n) where n = samples x channels.
    pub fn split(&mut self, input: &AudioBuffer, bands: &mut [AudioBuffer; 3]) {
        let [low, mid, high] = bands;

        low.copy_from(input);
        mid.copy_from(input);

        self.low_lowpass.process(low);
        self.low_allpass.process(low);

        self.low_highpass.process(mid);
        high.copy_from(mid);
        self.mid_lowpass.process(mid);
        self.mid_highpass.process(high);
    }

    /// Clear every filter history
    pub fn reset(&mut self) {
        self.low_lowpass.reset();
        self.low_highpass.reset();
        self.low_allpass.reset();
        self.mid_lowpass.reset();
        self.mid_highpass.reset();
    }
}

impl Default for CrossoverFilterBank {
    fn default() -> Self {
        Self::new()
    }
}
