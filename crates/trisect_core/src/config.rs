//! Engine and Analyzer Configuration

use serde::{Deserialize, Serialize};
use trisect_dsp::{FftOrder, WindowKind};

use crate::error::{EngineError, EngineResult};

/// Audio-side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Channels processed by the engine (1 = mono, 2 = stereo)
    pub channels: usize,

    /// Block size prepared up front. Larger host blocks trigger a re-prepare.
    pub max_block_size: usize,

    /// Samples per analyzer FIFO block. Independent of the host block size.
    pub fifo_block_size: usize,

    /// Number of blocks each analyzer FIFO can hold
    pub fifo_slots: usize,

    /// Ramp length for the trim gains
    pub trim_ramp_seconds: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            max_block_size: 512,
            fifo_block_size: 512,
            // ~340ms of headroom at 48kHz before the analyzer drops blocks
            fifo_slots: 32,
            trim_ramp_seconds: 0.05,
        }
    }
}

impl EngineConfig {
    /// Small blocks, small FIFO blocks
    pub fn low_latency() -> Self {
        Self {
            max_block_size: 128,
            fifo_block_size: 128,
            fifo_slots: 64,
            ..Self::default()
        }
    }

    /// Larger blocks and a deeper analyzer FIFO
    pub fn high_resolution() -> Self {
        Self {
            max_block_size: 2048,
            fifo_block_size: 1024,
            fifo_slots: 32,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> EngineResult<()> {
        if self.channels == 0 || self.channels > trisect_dsp::MAX_CHANNELS {
            return Err(EngineError::ConfigError(format!(
                "Invalid channel count: {}",
                self.channels
            )));
        }
        if self.max_block_size == 0 || self.max_block_size > 16384 {
            return Err(EngineError::ConfigError(format!(
                "Invalid block size: {}",
                self.max_block_size
            )));
        }
        if self.fifo_block_size == 0 || self.fifo_slots == 0 {
            return Err(EngineError::ConfigError(format!(
                "Invalid FIFO capacity: {} slots of {} samples",
                self.fifo_slots, self.fifo_block_size
            )));
        }
        if !self.trim_ramp_seconds.is_finite() || self.trim_ramp_seconds < 0.0 {
            return Err(EngineError::ConfigError(format!(
                "Invalid trim ramp: {}s",
                self.trim_ramp_seconds
            )));
        }
        Ok(())
    }
}

/// Transform size, serialized as the sample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct AnalyzerFftSize(pub FftOrder);

impl From<AnalyzerFftSize> for usize {
    fn from(size: AnalyzerFftSize) -> Self {
        size.0.fft_size()
    }
}

impl TryFrom<usize> for AnalyzerFftSize {
    type Error = String;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            2048 => Ok(Self(FftOrder::Order2048)),
            4096 => Ok(Self(FftOrder::Order4096)),
            8192 => Ok(Self(FftOrder::Order8192)),
            other => Err(format!("Unsupported FFT size: {other}")),
        }
    }
}

/// Window choice as stored in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AnalyzerWindow {
    #[default]
    BlackmanHarris,
    Hann,
}

impl From<AnalyzerWindow> for WindowKind {
    fn from(window: AnalyzerWindow) -> Self {
        match window {
            AnalyzerWindow::BlackmanHarris => WindowKind::BlackmanHarris,
            AnalyzerWindow::Hann => WindowKind::Hann,
        }
    }
}

/// Spectrum analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub fft_size: AnalyzerFftSize,

    #[serde(default)]
    pub window: AnalyzerWindow,

    /// Lowest level drawn; everything quieter sits on the bottom edge
    pub floor_db: f32,

    /// Timer rate for `timer_callback`
    pub refresh_hz: u32,

    /// Whether analysis starts enabled
    pub enabled: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: AnalyzerFftSize(FftOrder::Order2048),
            window: AnalyzerWindow::BlackmanHarris,
            floor_db: -48.0,
            refresh_hz: 60,
            enabled: true,
        }
    }
}

impl AnalyzerConfig {
    /// Fine frequency resolution at a lower frame rate
    pub fn high_resolution() -> Self {
        Self {
            fft_size: AnalyzerFftSize(FftOrder::Order8192),
            floor_db: -72.0,
            refresh_hz: 30,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        if !self.floor_db.is_finite() || self.floor_db >= 0.0 {
            return Err(EngineError::ConfigError(format!(
                "Analyzer floor must be below 0 dB, got {}",
                self.floor_db
            )));
        }
        if self.refresh_hz == 0 || self.refresh_hz > 240 {
            return Err(EngineError::ConfigError(format!(
                "Invalid analyzer refresh rate: {}Hz",
                self.refresh_hz
            )));
        }
        Ok(())
    }

    pub fn fft_order(&self) -> FftOrder {
        self.fft_size.0
    }

    /// Interval between timer ticks
    pub fn refresh_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.refresh_hz.max(1) as f64)
    }
}
