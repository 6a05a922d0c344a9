//! Input/Output Trim Gain
//!
//! Smoothed gain stage placed before the crossover and after the band sum.
//! Changing the target starts a linear ramp from the current gain so that
//! automation never produces a step in the waveform.
//!
//! Also hosts the dB conversion helpers shared by the compressor and the
//! spectrum generator.

use crate::buffer::AudioBuffer;
use crate::error::DspError;
use crate::processor::{AudioProcessor, ProcessContext, ProcessSpec};

/// Default ramp length when the trim target changes
pub const DEFAULT_RAMP_SECONDS: f32 = 0.05;

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, clamped at `floor_db`
///
/// Zero, negative and non-finite gains map straight to the floor.
#[inline]
pub fn gain_to_db(gain: f32, floor_db: f32) -> f32 {
    if gain > 0.0 && gain.is_finite() {
        (20.0 * gain.log10()).max(floor_db)
    } else {
        floor_db
    }
}

/// Linear-ramped gain stage
#[derive(Debug, Clone)]
pub struct TrimGain {
    current: f32,
    target: f32,
    step: f32,
    remaining: usize,
    ramp_seconds: f32,
    ramp_samples: usize,
}

impl TrimGain {
    pub fn new(ramp_seconds: f32) -> Self {
        Self {
            current: 1.0,
            target: 1.0,
            step: 0.0,
            remaining: 0,
            ramp_seconds: ramp_seconds.max(0.0),
            ramp_samples: 0,
        }
    }

    /// Set the target gain in dB. Repeating the current target is a no-op.
    pub fn set_gain_db(&mut self, db: f32) {
        self.set_gain_linear(db_to_linear(db));
    }

    pub fn set_gain_linear(&mut self, gain: f32) {
        if gain == self.target {
            return;
        }
        self.target = gain;
        if self.ramp_samples == 0 {
            self.current = gain;
            self.remaining = 0;
        } else {
            self.remaining = self.ramp_samples;
            self.step = (self.target - self.current) / self.ramp_samples as f32;
        }
    }

    /// Gain that will be applied to the next sample
    pub fn current_gain(&self) -> f32 {
        self.current
    }

    pub fn target_gain(&self) -> f32 {
        self.target
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    #[inline]
    fn next_gain(&mut self) -> f32 {
        if self.remaining > 0 {
            self.current += self.step;
            self.remaining -= 1;
            if self.remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }
}

impl Default for TrimGain {
    fn default() -> Self {
        Self::new(DEFAULT_RAMP_SECONDS)
    }
}

impl AudioProcessor for TrimGain {
    fn prepare(&mut self, spec: &ProcessSpec) -> Result<(), DspError> {
        spec.validate()?;
        self.ramp_samples = (self.ramp_seconds * spec.sample_rate).round() as usize;
        self.reset();
        Ok(())
    }

    fn process(&mut self, buffer: &mut AudioBuffer, context: &ProcessContext) {
        if context.is_bypassed {
            return;
        }

        if !self.is_ramping() {
            if self.current != 1.0 {
                buffer.apply_gain(self.current);
            }
            return;
        }

        // Every channel walks the same ramp
        let start = (self.current, self.remaining);
        let mut end = start;
        for channel in 0..buffer.num_channels() {
            (self.current, self.remaining) = start;
            for sample in buffer.channel_mut(channel) {
                *sample *= self.next_gain();
            }
            end = (self.current, self.remaining);
        }
        (self.current, self.remaining) = end;
    }

    fn reset(&mut self) {
        self.current = self.target;
        self.remaining = 0;
    }

    fn name(&self) -> &'static str {
        "Trim Gain"
    }
}
