//! Per-band Feed-forward Compressor
//!
//! Each band runs an independent peak-detecting compressor with a hard knee.
//! The gain computer works in dB:
//!
//! ```text
//! level  = 20 * log10(|x|)
//! target = min(0, (threshold - level) * (1 - 1/ratio))
//! ```
//!
//! The target gain reduction is then smoothed with one-pole attack/release
//! ballistics (attack while the reduction deepens, release while it recovers)
//! and applied to the sample. One envelope is kept per channel.

use std::fmt;
use std::str::FromStr;

use crate::buffer::AudioBuffer;
use crate::error::DspError;
use crate::gain::db_to_linear;
use crate::processor::{AudioProcessor, ProcessContext, ProcessSpec, MAX_CHANNELS};

/// Ratio labels offered to the host, in ascending order
pub const RATIO_CHOICES: [&str; 14] = [
    "1.0", "1.5", "2.0", "3.0", "4.0", "5.0", "6.0", "7.0", "8.0", "10.0", "15.0", "20.0", "50.0",
    "100.0",
];

/// Index into [`RATIO_CHOICES`] used for a fresh band ("3.0")
pub const DEFAULT_RATIO_INDEX: usize = 3;

/// Detector level floor (-120 dB), keeps log10 away from zero
const LEVEL_FLOOR: f32 = 1.0e-6;

/// Compression ratio, always >= 1
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f32);

impl Ratio {
    /// 1:1, no compression
    pub const UNITY: Ratio = Ratio(1.0);

    pub fn new(value: f32) -> Result<Self, DspError> {
        if value.is_finite() && value >= 1.0 {
            Ok(Self(value))
        } else {
            Err(DspError::UnknownRatio(value.to_string()))
        }
    }

    /// Parse a choice label. Accepts `"4.0"`, `"4"` and `"4:1"`.
    pub fn from_label(label: &str) -> Result<Self, DspError> {
        let trimmed = label.trim();
        let number = trimmed.strip_suffix(":1").unwrap_or(trimmed);
        let value: f32 = number
            .trim()
            .parse()
            .map_err(|_| DspError::UnknownRatio(label.to_string()))?;
        Self::new(value).map_err(|_| DspError::UnknownRatio(label.to_string()))
    }

    /// Ratio for a choice index; out-of-range indices clamp to the last choice
    pub fn from_choice_index(index: usize) -> Self {
        let label = RATIO_CHOICES[index.min(RATIO_CHOICES.len() - 1)];
        Self::from_label(label).unwrap_or(Self::UNITY)
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Static gain-computer slope, `1 - 1/ratio`
    #[inline]
    pub fn slope(self) -> f32 {
        1.0 - 1.0 / self.0
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self::from_choice_index(DEFAULT_RATIO_INDEX)
    }
}

impl FromStr for Ratio {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

/// Renders as `"4:1"` or `"1.5:1"`
impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}:1", self.0 as u32)
        } else {
            write!(f, "{}:1", self.0)
        }
    }
}

/// User-facing settings for one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub attack_ms: f32,
    pub release_ms: f32,
    pub threshold_db: f32,
    pub ratio: Ratio,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            attack_ms: 50.0,
            release_ms: 250.0,
            threshold_db: 0.0,
            ratio: Ratio::default(),
        }
    }
}

/// One-pole smoothing coefficient for a time constant
///
/// Zero or negative times give an instantaneous response.
#[inline]
fn time_coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    let samples = time_ms * 0.001 * sample_rate;
    if samples > 0.0 {
        (-1.0 / samples).exp()
    } else {
        0.0
    }
}

/// Feed-forward compressor for a single band
#[derive(Debug, Clone)]
pub struct CompressorBand {
    settings: CompressorSettings,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    slope: f32,
    /// Smoothed gain reduction in dB (always <= 0), per channel
    gain_reduction_db: [f32; MAX_CHANNELS],
    bypassed: bool,
    enabled: bool,
}

impl CompressorBand {
    pub fn new(sample_rate: f32) -> Self {
        let mut band = Self {
            settings: CompressorSettings::default(),
            sample_rate,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            slope: 0.0,
            gain_reduction_db: [0.0; MAX_CHANNELS],
            bypassed: false,
            enabled: true,
        };
        band.update_coefficients();
        band
    }

    pub fn settings(&self) -> &CompressorSettings {
        &self.settings
    }

    /// Apply new settings. Coefficients are recomputed only when something
    /// actually changed, so this is cheap to call every block.
    pub fn update_settings(&mut self, settings: CompressorSettings) {
        if settings != self.settings {
            self.settings = settings;
            self.update_coefficients();
        }
    }

    pub fn set_attack_ms(&mut self, attack_ms: f32) {
        self.update_settings(CompressorSettings {
            attack_ms,
            ..self.settings
        });
    }

    /// A bypassed band passes audio through untouched but keeps detecting
    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Whether the band contributes to the summed output (solo/mute result)
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current smoothed gain reduction in dB (0 or negative)
    pub fn gain_reduction_db(&self, channel: usize) -> f32 {
        self.gain_reduction_db.get(channel).copied().unwrap_or(0.0)
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_coefficient(self.settings.attack_ms, self.sample_rate);
        self.release_coeff = time_coefficient(self.settings.release_ms, self.sample_rate);
        self.slope = self.settings.ratio.slope();
    }

    /// Run the detector on one sample and return the gain to apply
    #[inline]
    fn next_gain(&mut self, channel: usize, sample: f32) -> f32 {
        let level_db = 20.0 * sample.abs().max(LEVEL_FLOOR).log10();
        let target = ((self.settings.threshold_db - level_db) * self.slope).min(0.0);

        let state = &mut self.gain_reduction_db[channel];
        let coeff = if target < *state {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        *state = coeff * *state + (1.0 - coeff) * target;
        db_to_linear(*state)
    }

    /// Process with the band's own bypass flag
    pub fn process_block(&mut self, buffer: &mut AudioBuffer) {
        let context = ProcessContext::bypassed(self.bypassed);
        self.process(buffer, &context);
    }
}

impl Default for CompressorBand {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl AudioProcessor for CompressorBand {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<(), DspError> {
        spec.validate()?;
        self.sample_rate = spec.sample_rate;
        self.update_coefficients();
        self.reset();
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer, context: &ProcessContext) {
        let channels = buffer.num_channels().min(MAX_CHANNELS);
        for channel in 0..channels {
            let samples = buffer.channel_mut(channel);
            if context.is_bypassed {
                for &sample in samples.iter() {
                    self.next_gain(channel, sample);
                }
            } else {
                for sample in samples.iter_mut() {
                    *sample *= self.next_gain(channel, *sample);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.gain_reduction_db = [0.0; MAX_CHANNELS];
    }

    fn name(&self) -> &'static str {
        "Compressor Band"
    }
}
