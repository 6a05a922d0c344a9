//! Trisect Core - Multiband Compressor Engine
//!
//! This crate wires the `trisect_dsp` primitives into a complete three-band
//! compressor, including:
//! - Parameter layout and a lock-free parameter store with state save/restore
//! - The real-time engine (trim, crossover, per-band compression, solo/mute)
//! - Spectrum analyzer driver, grid geometry and its timer thread
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        UI Thread                            │
//! │  ParameterStore::set ──atomics──▶   ◀──RwLock── Snapshot    │
//! │  AnalyzerTimer ──AnalyzerCommand (crossbeam-channel)──┐     │
//! └───────────────────────────────────────────────────────┼─────┘
//!            │ per-block snapshot                         ▼
//! ┌──────────────────────────────────┐   ┌──────────────────────────┐
//! │          Audio Thread            │   │     Analyzer Thread      │
//! │  input ▶ trim ▶ split ▶ compress │   │  FIFO ▶ FFT ▶ path       │
//! │    └──rtrb SampleFifo──────────────▶ │  ▶ AnalyzerSnapshot      │
//! │  (Zero allocation in this path)  │   │                          │
//! └──────────────────────────────────┘   └──────────────────────────┘
//! ```

mod analyzer;
mod config;
mod engine;
mod error;
mod grid;
mod message;
mod params;
mod timer;

pub use analyzer::{AnalyzerSnapshot, PathProducer, SpectrumAnalyzer};
pub use config::{AnalyzerConfig, AnalyzerFftSize, AnalyzerWindow, EngineConfig};
pub use engine::{prepared_engine, AnalyzerInput, AppliedCutoffs, MultibandCompressor};
pub use error::{EngineError, EngineResult};
pub use grid::{
    analysis_area, analyzer_scale_label, frequency_label, gain_label, grid_labels, grid_lines,
    render_area, GridLabel, GridLine, GridLineKind, LabelAlign, GRID_FREQUENCIES, GRID_GAINS,
};
pub use message::AnalyzerCommand;
pub use params::{
    BandId, BandSettings, EngineSettings, ParameterId, ParameterInfo, ParameterKind,
    ParameterRange, ParameterState, ParameterStore, ParameterSubscription, NUM_PARAMETERS,
};
pub use timer::AnalyzerTimer;

// Re-export DSP types for convenience
pub use trisect_dsp::{
    AnalyzerPath, CompressorSettings, FftOrder, PathPoint, Ratio, Rect, WindowKind, NUM_BANDS,
};
