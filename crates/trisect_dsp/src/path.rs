//! Analyzer Path Generation
//!
//! Converts dB spectrum frames into polylines in display coordinates. The
//! frequency axis is logarithmic from 20 Hz to 20 kHz; the level axis is
//! linear from the floor (bottom) to 0 dB (top).

use rtrb::{Consumer, Producer, RingBuffer};

/// Lowest frequency on the analyzer axis
pub const MIN_DISPLAY_HZ: f32 = 20.0;

/// Highest frequency on the analyzer axis
pub const MAX_DISPLAY_HZ: f32 = 20000.0;

/// Bins skipped between path points
pub const PATH_RESOLUTION: usize = 2;

/// Paths kept before new ones are dropped
pub const PATH_QUEUE_CAPACITY: usize = 30;

/// Position of `value` on a log10 axis, 0.0 at `min` and 1.0 at `max`
#[inline]
pub fn map_from_log10(value: f32, min: f32, max: f32) -> f32 {
    (value.log10() - min.log10()) / (max.log10() - min.log10())
}

/// Inverse of [`map_from_log10`]
#[inline]
pub fn map_to_log10(proportion: f32, min: f32, max: f32) -> f32 {
    10.0_f32.powf(min.log10() + proportion * (max.log10() - min.log10()))
}

/// Linear remap of `value` from `[src_min, src_max]` to `[dst_min, dst_max]`
#[inline]
pub fn map_range(value: f32, src_min: f32, src_max: f32, dst_min: f32, dst_max: f32) -> f32 {
    dst_min + (value - src_min) / (src_max - src_min) * (dst_max - dst_min)
}

/// Axis-aligned rectangle in display coordinates (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f32 {
        self.x
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn top(&self) -> f32 {
        self.y
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Shrink each edge independently; sizes never go negative
    pub fn inset(&self, left: f32, top: f32, right: f32, bottom: f32) -> Rect {
        Rect {
            x: self.x + left,
            y: self.y + top,
            width: (self.width - left - right).max(0.0),
            height: (self.height - top - bottom).max(0.0),
        }
    }

    /// Frequency to x within this rect, log scale over the display range
    pub fn x_for_frequency(&self, hz: f32) -> f32 {
        self.left() + self.width * map_from_log10(hz, MIN_DISPLAY_HZ, MAX_DISPLAY_HZ)
    }

    /// Level to y within this rect, `floor_db` at the bottom and `ceiling_db`
    /// at the top, clamped to the rect
    pub fn y_for_db(&self, db: f32, floor_db: f32, ceiling_db: f32) -> f32 {
        map_range(db, floor_db, ceiling_db, self.bottom(), self.top())
            .clamp(self.top(), self.bottom())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
}

/// Polyline made of one or more connected runs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzerPath {
    points: Vec<PathPoint>,
    /// Index into `points` where each run begins
    subpath_starts: Vec<usize>,
}

impl AnalyzerPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.subpath_starts.clear();
    }

    pub fn start_new_subpath(&mut self, x: f32, y: f32) {
        self.subpath_starts.push(self.points.len());
        self.points.push(PathPoint { x, y });
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        if self.points.is_empty() {
            self.start_new_subpath(x, y);
        } else {
            self.points.push(PathPoint { x, y });
        }
    }

    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate the connected runs of the path
    pub fn subpaths(&self) -> impl Iterator<Item = &[PathPoint]> + '_ {
        self.subpath_starts.iter().enumerate().map(move |(i, &start)| {
            let end = self
                .subpath_starts
                .get(i + 1)
                .copied()
                .unwrap_or(self.points.len());
            &self.points[start..end]
        })
    }

    fn last_mut(&mut self) -> Option<&mut PathPoint> {
        self.points.last_mut()
    }
}

/// Builds analyzer paths from spectrum frames and queues them for drawing
pub struct AnalyzerPathGenerator {
    paths_in: Producer<AnalyzerPath>,
    paths_out: Consumer<AnalyzerPath>,
    dropped_paths: u64,
}

impl AnalyzerPathGenerator {
    pub fn new() -> Self {
        let (paths_in, paths_out) = RingBuffer::new(PATH_QUEUE_CAPACITY);
        Self {
            paths_in,
            paths_out,
            dropped_paths: 0,
        }
    }

    /// Build one path from a dB frame and queue it
    ///
    /// `fft_data` holds one dB value per bin; `bin_width` is
    /// `sample_rate / fft_size`. Returns `false` if the queue was full.
    pub fn generate_path(
        &mut self,
        fft_data: &[f32],
        bounds: Rect,
        fft_size: usize,
        bin_width: f32,
        floor_db: f32,
    ) -> bool {
        let path = build_path(fft_data, bounds, fft_size, bin_width, floor_db);
        match self.paths_in.push(path) {
            Ok(()) => true,
            Err(_) => {
                self.dropped_paths += 1;
                false
            }
        }
    }

    pub fn num_paths_available(&self) -> usize {
        self.paths_out.slots()
    }

    /// Move the oldest queued path into `path`
    pub fn get_path(&mut self, path: &mut AnalyzerPath) -> bool {
        match self.paths_out.pop() {
            Ok(next) => {
                *path = next;
                true
            }
            Err(_) => false,
        }
    }

    /// Drain the queue, keeping only the newest path
    pub fn take_latest(&mut self) -> Option<AnalyzerPath> {
        let mut latest = None;
        while let Ok(path) = self.paths_out.pop() {
            latest = Some(path);
        }
        latest
    }

    pub fn dropped_paths(&self) -> u64 {
        self.dropped_paths
    }
}

impl Default for AnalyzerPathGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn build_path(
    fft_data: &[f32],
    bounds: Rect,
    fft_size: usize,
    bin_width: f32,
    floor_db: f32,
) -> AnalyzerPath {
    let mut path = AnalyzerPath::new();
    let usable_width = bin_width.is_finite() && bin_width > 0.0;
    let usable_floor = floor_db.is_finite() && floor_db < 0.0;
    if bounds.is_empty() || !usable_width || !usable_floor {
        return path;
    }

    let num_bins = (fft_size / 2).min(fft_data.len());
    let mut last_column: Option<i64> = None;
    let mut gap = true;

    for bin in (1..num_bins).step_by(PATH_RESOLUTION) {
        let db = fft_data[bin];
        if !db.is_finite() {
            gap = true;
            continue;
        }

        let hz = bin as f32 * bin_width;
        if !(MIN_DISPLAY_HZ..=MAX_DISPLAY_HZ).contains(&hz) {
            continue;
        }

        let x = bounds.x_for_frequency(hz);
        let y = bounds.y_for_db(db, floor_db, 0.0);
        let column = x.round() as i64;

        if gap {
            path.start_new_subpath(x, y);
            gap = false;
        } else if last_column == Some(column) {
            // Same pixel column: keep the louder (higher on screen) value
            if let Some(last) = path.last_mut() {
                last.y = last.y.min(y);
            }
        } else {
            path.line_to(x, y);
        }
        last_column = Some(column);
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Rect = Rect {
        x: 0.0,
        y: 0.0,
        width: 600.0,
        height: 200.0,
    };

    fn flat_frame(db: f32, bins: usize) -> Vec<f32> {
        vec![db; bins]
    }

    #[test]
    fn test_log_mapping() {
        assert_eq!(map_from_log10(20.0, 20.0, 20000.0), 0.0);
        assert!((map_from_log10(20000.0, 20.0, 20000.0) - 1.0).abs() < 1e-6);
        assert!((map_from_log10(632.46, 20.0, 20000.0) - 0.5).abs() < 1e-3);
        assert!((map_to_log10(0.5, 20.0, 20000.0) - 632.46).abs() < 0.5);
    }

    #[test]
    fn test_rect_helpers() {
        let inner = BOUNDS.inset(20.0, 12.0, 20.0, 2.0);
        assert_eq!(inner, Rect::new(20.0, 12.0, 560.0, 186.0));
        assert!(Rect::new(0.0, 0.0, 10.0, 10.0)
            .inset(8.0, 0.0, 8.0, 0.0)
            .is_empty());

        assert_eq!(BOUNDS.y_for_db(0.0, -48.0, 0.0), 0.0);
        assert_eq!(BOUNDS.y_for_db(-48.0, -48.0, 0.0), 200.0);
        assert_eq!(BOUNDS.y_for_db(-100.0, -48.0, 0.0), 200.0);
        assert_eq!(BOUNDS.y_for_db(12.0, -48.0, 0.0), 0.0);
        assert_eq!(BOUNDS.x_for_frequency(20.0), 0.0);
    }

    #[test]
    fn test_path_spans_display_range() {
        let mut generator = AnalyzerPathGenerator::new();
        let frame = flat_frame(-24.0, 1024);
        assert!(generator.generate_path(&frame, BOUNDS, 2048, 48000.0 / 2048.0, -48.0));

        let mut path = AnalyzerPath::new();
        assert!(generator.get_path(&mut path));
        assert!(!path.is_empty());

        let points = path.points();
        assert!(points.windows(2).all(|w| w[0].x < w[1].x));
        assert!(points.iter().all(|p| p.x >= 0.0 && p.x <= 600.0));
        assert!(points.iter().all(|p| (p.y - 100.0).abs() < 1e-3));
        assert_eq!(path.subpaths().count(), 1);
    }

    #[test]
    fn test_same_column_keeps_louder_bin() {
        // Narrow bounds force many high bins into the same column
        let bounds = Rect::new(0.0, 0.0, 10.0, 100.0);
        let mut frame = flat_frame(-40.0, 1024);
        frame[801] = -4.0;

        let path = build_path(&frame, bounds, 2048, 48000.0 / 2048.0, -48.0);
        let columns: Vec<i64> = path.points().iter().map(|p| p.x.round() as i64).collect();
        let mut deduped = columns.clone();
        deduped.dedup();
        assert_eq!(columns, deduped);

        let loudest = path
            .points()
            .iter()
            .fold(f32::MAX, |top, p| top.min(p.y));
        assert!((loudest - 100.0 * 4.0 / 48.0).abs() < 1e-3);
    }

    #[test]
    fn test_non_finite_bins_split_the_path() {
        let mut frame = flat_frame(-12.0, 1024);
        frame[101] = f32::NAN;
        frame[103] = f32::INFINITY;

        let path = build_path(&frame, BOUNDS, 2048, 48000.0 / 2048.0, -48.0);
        assert!(path.points().iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        assert_eq!(path.subpaths().count(), 2);
    }

    #[test]
    fn test_degenerate_inputs_give_empty_path() {
        let frame = flat_frame(-12.0, 1024);
        assert!(build_path(&frame, Rect::default(), 2048, 23.4, -48.0).is_empty());
        assert!(build_path(&frame, BOUNDS, 2048, 0.0, -48.0).is_empty());
        assert!(build_path(&[], BOUNDS, 2048, 23.4, -48.0).is_empty());
    }

    #[test]
    fn test_queue_order_and_latest() {
        let mut generator = AnalyzerPathGenerator::new();
        for level in [-40.0, -30.0, -20.0] {
            generator.generate_path(&flat_frame(level, 1024), BOUNDS, 2048, 23.4375, -48.0);
        }
        assert_eq!(generator.num_paths_available(), 3);

        let mut path = AnalyzerPath::new();
        generator.get_path(&mut path);
        assert!((path.points()[0].y - 200.0 * 40.0 / 48.0).abs() < 1e-3);

        let latest = generator.take_latest().unwrap();
        assert!((latest.points()[0].y - 200.0 * 20.0 / 48.0).abs() < 1e-3);
        assert_eq!(generator.num_paths_available(), 0);
        assert!(generator.take_latest().is_none());
    }

    #[test]
    fn test_full_queue_drops_new_paths() {
        let mut generator = AnalyzerPathGenerator::new();
        let frame = flat_frame(-6.0, 1024);
        for _ in 0..PATH_QUEUE_CAPACITY {
            assert!(generator.generate_path(&frame, BOUNDS, 2048, 23.4375, -48.0));
        }
        assert!(!generator.generate_path(&frame, BOUNDS, 2048, 23.4375, -48.0));
        assert_eq!(generator.dropped_paths(), 1);
    }
}
