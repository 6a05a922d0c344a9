//! Message Types for Thread Communication
//!
//! Commands flow from the UI thread -> analyzer timer thread

use trisect_dsp::Rect;

/// Commands sent to the [`crate::AnalyzerTimer`] thread
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerCommand {
    /// The analyzer component was laid out at new bounds
    SetBounds(Rect),

    /// Turn spectrum analysis on or off
    SetEnabled(bool),

    /// Stop ticking and let the thread exit
    Shutdown,
}
