//! Analyzer Timer Thread
//!
//! Drives [`SpectrumAnalyzer::timer_callback`] at the configured refresh rate
//! on a dedicated thread. The UI talks to it through a command channel and
//! reads results from the shared [`AnalyzerSnapshot`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};
use trisect_dsp::Rect;

use crate::analyzer::{AnalyzerSnapshot, SpectrumAnalyzer};
use crate::error::{EngineError, EngineResult};
use crate::message::AnalyzerCommand;

/// Handle to the running analyzer thread. Dropping it stops the thread.
pub struct AnalyzerTimer {
    command_sender: Sender<AnalyzerCommand>,
    snapshot: Arc<AnalyzerSnapshot>,
    repaints: Arc<AtomicU64>,
    thread: Option<JoinHandle<()>>,
}

impl AnalyzerTimer {
    /// Move `analyzer` onto a new thread and start ticking
    pub fn spawn(analyzer: SpectrumAnalyzer, bounds: Rect) -> EngineResult<Self> {
        let (command_sender, command_receiver) = unbounded();
        let snapshot = analyzer.snapshot();
        let repaints = Arc::new(AtomicU64::new(0));
        let repaint_counter = Arc::clone(&repaints);

        let thread = thread::Builder::new()
            .name("trisect-analyzer".into())
            .spawn(move || {
                Self::timer_thread_main(analyzer, bounds, command_receiver, repaint_counter);
            })?;

        Ok(Self {
            command_sender,
            snapshot,
            repaints,
            thread: Some(thread),
        })
    }

    pub fn snapshot(&self) -> &Arc<AnalyzerSnapshot> {
        &self.snapshot
    }

    /// Ticks that asked for a repaint so far
    pub fn repaint_requests(&self) -> u64 {
        self.repaints.load(Ordering::Relaxed)
    }

    pub fn set_bounds(&self, bounds: Rect) -> EngineResult<()> {
        self.send_command(AnalyzerCommand::SetBounds(bounds))
    }

    pub fn set_enabled(&self, enabled: bool) -> EngineResult<()> {
        self.send_command(AnalyzerCommand::SetEnabled(enabled))
    }

    /// False once the thread has exited, either on request or because the
    /// engine feeding it was dropped
    pub fn is_running(&self) -> bool {
        self.thread
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the thread and wait for it
    pub fn shutdown(&mut self) {
        let _ = self.command_sender.send(AnalyzerCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    fn send_command(&self, command: AnalyzerCommand) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSendError)
    }

    fn timer_thread_main(
        mut analyzer: SpectrumAnalyzer,
        mut bounds: Rect,
        command_receiver: Receiver<AnalyzerCommand>,
        repaints: Arc<AtomicU64>,
    ) {
        let interval = analyzer.refresh_interval();
        info!(
            "Analyzer timer started ({:.1} Hz)",
            1.0 / interval.as_secs_f64()
        );

        let mut next_tick = Instant::now() + interval;
        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            match command_receiver.recv_timeout(wait) {
                Ok(AnalyzerCommand::SetBounds(new_bounds)) => {
                    debug!(?new_bounds, "Analyzer bounds changed");
                    bounds = new_bounds;
                }
                Ok(AnalyzerCommand::SetEnabled(enabled)) => analyzer.set_enabled(enabled),
                Ok(AnalyzerCommand::Shutdown) => {
                    info!("Analyzer shutdown command received");
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if analyzer.timer_callback(bounds) {
                        repaints.fetch_add(1, Ordering::Relaxed);
                    }
                    if !analyzer.is_engine_alive() {
                        info!("Engine dropped, analyzer timer exiting");
                        break;
                    }
                    next_tick = Self::next_deadline(next_tick, interval);
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        info!("Analyzer timer stopped");
    }

    /// Keep a steady cadence, but skip missed ticks instead of bursting
    fn next_deadline(previous: Instant, interval: Duration) -> Instant {
        let next = previous + interval;
        let now = Instant::now();
        if next < now {
            now + interval
        } else {
            next
        }
    }
}

impl Drop for AnalyzerTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalyzerConfig, EngineConfig};
    use crate::engine::MultibandCompressor;
    use crate::params::ParameterStore;

    const BOUNDS: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 640.0,
        height: 240.0,
    };

    fn engine_and_timer() -> (MultibandCompressor, AnalyzerTimer) {
        let params = Arc::new(ParameterStore::new());
        let (mut engine, input) =
            MultibandCompressor::new(params, &EngineConfig::default()).unwrap();
        engine.prepare(48000.0, 512).unwrap();
        let analyzer = SpectrumAnalyzer::new(input, &AnalyzerConfig::default()).unwrap();
        let timer = AnalyzerTimer::spawn(analyzer, BOUNDS).unwrap();
        (engine, timer)
    }

    fn feed(engine: &mut MultibandCompressor, frames: usize) {
        let mut left: Vec<f32> = (0..frames)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin())
            .collect();
        let mut right = left.clone();
        for (l, r) in left.chunks_mut(512).zip(right.chunks_mut(512)) {
            engine.process_planar(l, r);
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_timer_publishes_paths() {
        let (mut engine, timer) = engine_and_timer();
        assert!(timer.is_running());

        feed(&mut engine, 8192);
        assert!(wait_for(|| timer.snapshot().generation() > 0));
        assert!(!timer.snapshot().left().is_empty());
        assert!(timer.repaint_requests() > 0);
    }

    #[test]
    fn test_disable_clears_snapshot() {
        let (mut engine, timer) = engine_and_timer();
        feed(&mut engine, 8192);
        assert!(wait_for(|| !timer.snapshot().left().is_empty()));

        timer.set_enabled(false).unwrap();
        assert!(wait_for(|| timer.snapshot().left().is_empty()));
    }

    #[test]
    fn test_bounds_change_applies_to_new_paths() {
        let (mut engine, timer) = engine_and_timer();
        let wide = Rect::new(0.0, 0.0, 1240.0, 240.0);
        timer.set_bounds(wide).unwrap();

        // Keep feeding so a tick that raced the bounds change is not the last
        assert!(wait_for(|| {
            feed(&mut engine, 2048);
            timer
                .snapshot()
                .left()
                .points()
                .iter()
                .any(|point| point.x > BOUNDS.width)
        }));
    }

    #[test]
    fn test_shutdown_and_send_after_stop() {
        let (_engine, mut timer) = engine_and_timer();
        timer.shutdown();
        assert!(!timer.is_running());
        assert!(matches!(
            timer.set_enabled(true),
            Err(EngineError::ChannelSendError)
        ));
    }

    #[test]
    fn test_exits_when_engine_dropped() {
        let (engine, timer) = engine_and_timer();
        drop(engine);
        assert!(wait_for(|| !timer.is_running()));
    }
}
