//! FFT Spectrum Data Generator
//!
//! Turns a rolling mono sample window into magnitude spectra in dB for the
//! analyzer display. Runs on the analysis thread, never the audio thread.
//!
//! # Pipeline
//!
//! 1. `push_samples` shifts new samples into a window of `fft_size` samples
//! 2. Once the window has filled, every push produces one frame:
//!    window function, forward FFT, magnitude / (fft_size / 2), then dB
//!    clamped to the floor
//! 3. Frames queue in a bounded FIFO; a full FIFO drops the new frame

use std::f32::consts::PI;
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::gain::gain_to_db;

/// Frames kept before new ones are dropped
pub const FRAME_QUEUE_CAPACITY: usize = 30;

/// Supported transform sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FftOrder {
    /// 2048 samples, ~23 Hz bins at 48 kHz
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    pub fn fft_size(self) -> usize {
        match self {
            FftOrder::Order2048 => 2048,
            FftOrder::Order4096 => 4096,
            FftOrder::Order8192 => 8192,
        }
    }

    /// Number of magnitude bins per frame
    pub fn num_bins(self) -> usize {
        self.fft_size() / 2
    }
}

/// Window applied before the transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowKind {
    #[default]
    BlackmanHarris,
    Hann,
}

/// Window table normalised so its coefficients sum to `size`
///
/// With this scaling a full-scale sine reads close to 0 dB regardless of the
/// window chosen.
fn window_table(kind: WindowKind, size: usize) -> Vec<f32> {
    let denom = (size - 1) as f32;
    let mut table: Vec<f32> = (0..size)
        .map(|n| {
            let x = 2.0 * PI * n as f32 / denom;
            match kind {
                WindowKind::BlackmanHarris => {
                    0.35875 - 0.48829 * x.cos() + 0.14128 * (2.0 * x).cos()
                        - 0.01168 * (3.0 * x).cos()
                }
                WindowKind::Hann => 0.5 - 0.5 * x.cos(),
            }
        })
        .collect();

    let sum: f32 = table.iter().sum();
    if sum > 0.0 {
        let scale = size as f32 / sum;
        for w in &mut table {
            *w *= scale;
        }
    }
    table
}

/// Rolling-window FFT producer with a bounded frame queue
pub struct FftDataGenerator {
    order: FftOrder,
    window_kind: WindowKind,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// Most recent `fft_size` samples, oldest first
    history: Vec<f32>,
    filled: usize,
    floor_db: f32,
    frames_in: Producer<Vec<f32>>,
    frames_out: Consumer<Vec<f32>>,
    dropped_frames: u64,
}

impl FftDataGenerator {
    pub fn new(order: FftOrder, window_kind: WindowKind, floor_db: f32) -> Self {
        let (frames_in, frames_out) = RingBuffer::new(FRAME_QUEUE_CAPACITY);
        let mut generator = Self {
            order,
            window_kind,
            window: Vec::new(),
            fft: FftPlanner::new().plan_fft_forward(order.fft_size()),
            buffer: Vec::new(),
            scratch: Vec::new(),
            history: Vec::new(),
            filled: 0,
            floor_db,
            frames_in,
            frames_out,
            dropped_frames: 0,
        };
        generator.rebuild();
        generator
    }

    pub fn order(&self) -> FftOrder {
        self.order
    }

    pub fn fft_size(&self) -> usize {
        self.order.fft_size()
    }

    pub fn window_kind(&self) -> WindowKind {
        self.window_kind
    }

    pub fn floor_db(&self) -> f32 {
        self.floor_db
    }

    pub fn set_floor_db(&mut self, floor_db: f32) {
        self.floor_db = floor_db;
    }

    /// Switch transform size. Clears the window and any queued frames.
    pub fn change_order(&mut self, order: FftOrder) {
        if order == self.order {
            return;
        }
        self.order = order;
        self.fft = FftPlanner::new().plan_fft_forward(order.fft_size());
        self.rebuild();
    }

    pub fn set_window_kind(&mut self, kind: WindowKind) {
        if kind != self.window_kind {
            self.window_kind = kind;
            self.window = window_table(kind, self.fft_size());
        }
    }

    fn rebuild(&mut self) {
        let size = self.fft_size();
        self.window = window_table(self.window_kind, size);
        self.buffer = vec![Complex::new(0.0, 0.0); size];
        self.scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
        self.history = vec![0.0; size];
        self.clear_frames();
        self.filled = 0;
    }

    fn clear_frames(&mut self) {
        while self.frames_out.pop().is_ok() {}
    }

    /// Shift `samples` into the rolling window and produce a frame if the
    /// window is full. Returns `true` when a frame was queued.
    pub fn push_samples(&mut self, samples: &[f32]) -> bool {
        if samples.is_empty() {
            return false;
        }

        let size = self.history.len();
        if samples.len() >= size {
            self.history.copy_from_slice(&samples[samples.len() - size..]);
        } else {
            self.history.copy_within(samples.len().., 0);
            self.history[size - samples.len()..].copy_from_slice(samples);
        }
        self.filled = (self.filled + samples.len()).min(size);

        if self.filled < size {
            return false;
        }
        self.produce_frame()
    }

    fn produce_frame(&mut self) -> bool {
        for ((slot, &sample), &w) in self
            .buffer
            .iter_mut()
            .zip(&self.history)
            .zip(&self.window)
        {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        let num_bins = self.order.num_bins();
        let norm = num_bins as f32;
        let floor = self.floor_db;
        let frame: Vec<f32> = self.buffer[..num_bins]
            .iter()
            .map(|c| gain_to_db(c.norm() / norm, floor))
            .collect();

        match self.frames_in.push(frame) {
            Ok(()) => true,
            Err(_) => {
                self.dropped_frames += 1;
                false
            }
        }
    }

    pub fn num_available_fft_data_blocks(&self) -> usize {
        self.frames_out.slots()
    }

    /// Move the oldest frame into `out`. Returns `false` when none is queued.
    pub fn get_fft_data(&mut self, out: &mut Vec<f32>) -> bool {
        match self.frames_out.pop() {
            Ok(frame) => {
                *out = frame;
                true
            }
            Err(_) => false,
        }
    }

    /// Frames discarded because the queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Forget the rolling window and queued frames
    pub fn reset(&mut self) {
        self.history.fill(0.0);
        self.filled = 0;
        self.clear_frames();
    }
}

impl Default for FftDataGenerator {
    fn default() -> Self {
        Self::new(FftOrder::default(), WindowKind::default(), -48.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    fn sine(freq: f32, amplitude: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn test_order_sizes() {
        assert_eq!(FftOrder::Order2048.fft_size(), 2048);
        assert_eq!(FftOrder::Order4096.num_bins(), 2048);
        assert_eq!(FftOrder::Order8192.fft_size(), 8192);
    }

    #[test]
    fn test_windows_are_normalised_and_tapered() {
        for kind in [WindowKind::BlackmanHarris, WindowKind::Hann] {
            let table = window_table(kind, 1024);
            let sum: f32 = table.iter().sum();
            assert!((sum - 1024.0).abs() < 0.5, "{kind:?} sums to {sum}");
            assert!(table[0] < 0.01);
            assert!(table[1023] < 0.01);
            assert!(table[512] > 1.0);
        }
    }

    #[test]
    fn test_no_frame_until_window_fills() {
        let mut generator = FftDataGenerator::default();
        assert!(!generator.push_samples(&[0.0; 1024]));
        assert_eq!(generator.num_available_fft_data_blocks(), 0);
        assert!(generator.push_samples(&[0.0; 1024]));
        assert!(generator.push_samples(&[0.0; 256]));
        assert_eq!(generator.num_available_fft_data_blocks(), 2);
    }

    #[test]
    fn test_silence_sits_on_floor() {
        let mut generator =
            FftDataGenerator::new(FftOrder::Order2048, WindowKind::BlackmanHarris, -48.0);
        generator.push_samples(&[0.0; 2048]);

        let mut frame = Vec::new();
        assert!(generator.get_fft_data(&mut frame));
        assert_eq!(frame.len(), 1024);
        assert!(frame.iter().all(|&db| db == -48.0));
    }

    #[test]
    fn test_sine_peak_lands_on_its_bin() {
        let mut generator =
            FftDataGenerator::new(FftOrder::Order4096, WindowKind::BlackmanHarris, -100.0);
        generator.push_samples(&sine(1000.0, 1.0, 4096));

        let mut frame = Vec::new();
        assert!(generator.get_fft_data(&mut frame));
        assert!(frame.iter().all(|db| db.is_finite()));

        let (peak_bin, peak_db) = frame
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, db)| {
                if db > best.1 {
                    (i, db)
                } else {
                    best
                }
            });

        let expected_bin = 1000.0 * 4096.0 / SAMPLE_RATE;
        assert!(
            (peak_bin as f32 - expected_bin).abs() <= 1.0,
            "peak at bin {peak_bin}"
        );
        // Full-scale sine reads near 0 dB (scalloping loss is under 1 dB)
        assert!(peak_db > -1.5 && peak_db < 0.5, "peak {peak_db} dB");
        // Far from the tone the spectrum is deep down
        assert!(frame[10] < -60.0);
    }

    #[test]
    fn test_queue_is_bounded() {
        let mut generator = FftDataGenerator::default();
        generator.push_samples(&[0.1; 2048]);
        for _ in 0..FRAME_QUEUE_CAPACITY + 4 {
            generator.push_samples(&[0.1; 64]);
        }
        assert_eq!(
            generator.num_available_fft_data_blocks(),
            FRAME_QUEUE_CAPACITY
        );
        assert_eq!(generator.dropped_frames(), 5);
    }

    #[test]
    fn test_frames_come_out_oldest_first() {
        let mut generator = FftDataGenerator::new(FftOrder::Order2048, WindowKind::Hann, -120.0);
        generator.push_samples(&[0.0; 2048]);
        generator.push_samples(&sine(2000.0, 0.5, 2048));

        let mut frame = Vec::new();
        assert!(generator.get_fft_data(&mut frame));
        assert!(frame.iter().all(|&db| db == -120.0));
        assert!(generator.get_fft_data(&mut frame));
        assert!(frame.iter().any(|&db| db > -12.0));
        assert!(!generator.get_fft_data(&mut frame));
    }

    #[test]
    fn test_change_order_clears_state() {
        let mut generator = FftDataGenerator::default();
        generator.push_samples(&[0.0; 2048]);
        generator.change_order(FftOrder::Order8192);

        assert_eq!(generator.fft_size(), 8192);
        assert_eq!(generator.num_available_fft_data_blocks(), 0);
        assert!(!generator.push_samples(&[0.0; 4096]));
        assert!(generator.push_samples(&[0.0; 4096]));

        let mut frame = Vec::new();
        generator.get_fft_data(&mut frame);
        assert_eq!(frame.len(), 4096);
    }

    #[test]
    fn test_window_kind_swaps_table() {
        let mut generator = FftDataGenerator::default();
        assert_eq!(generator.window_kind(), WindowKind::BlackmanHarris);

        generator.set_window_kind(WindowKind::Hann);
        assert_eq!(generator.window_kind(), WindowKind::Hann);
        assert_eq!(generator.window, window_table(WindowKind::Hann, 2048));

        generator.change_order(FftOrder::Order4096);
        assert_eq!(generator.window, window_table(WindowKind::Hann, 4096));
    }

    #[test]
    fn test_floor_change_applies_to_next_frame() {
        let mut generator = FftDataGenerator::default();
        generator.set_floor_db(-90.0);
        assert_eq!(generator.floor_db(), -90.0);
        generator.push_samples(&[0.0; 2048]);

        let mut frame = Vec::new();
        assert!(generator.get_fft_data(&mut frame));
        assert!(frame.iter().all(|&db| db == -90.0));
    }

    #[test]
    fn test_reset_forgets_window() {
        let mut generator = FftDataGenerator::default();
        generator.push_samples(&[0.3; 2048]);
        generator.reset();
        assert_eq!(generator.num_available_fft_data_blocks(), 0);
        assert!(!generator.push_samples(&[0.3; 1024]));
    }
}
