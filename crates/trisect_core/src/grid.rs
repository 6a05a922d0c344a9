//! Analyzer Grid Geometry
//!
//! Layout for the analyzer background: the framed render area, the inner
//! analysis area, grid lines and their labels. Everything here is plain
//! geometry in the component's coordinate space; drawing is left to the UI.
//!
//! Gain lines span ±24 dB. The left-hand scale reads the same lines shifted
//! down by 24 dB, which is where the spectrum path (0 dB at the top, -48 dB
//! at the bottom) actually sits.

use trisect_dsp::{PathPoint, Rect};

/// Frequencies with a vertical grid line
pub const GRID_FREQUENCIES: [f32; 10] = [
    20.0, 50.0, 100.0, 200.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0, 20000.0,
];

/// Gains with a horizontal grid line
pub const GRID_GAINS: [f32; 5] = [-24.0, -12.0, 0.0, 12.0, 24.0];

/// Top of the gain scale; the bottom is its negative
pub const GRID_GAIN_RANGE_DB: f32 = 24.0;

/// Offset between the gain scale and the analyzer scale on the left
pub const ANALYZER_SCALE_OFFSET_DB: f32 = -24.0;

/// Framed area inside the component bounds
pub fn render_area(bounds: Rect) -> Rect {
    bounds.inset(20.0, 12.0, 20.0, 2.0)
}

/// Area the grid and spectrum paths are laid out in
pub fn analysis_area(bounds: Rect) -> Rect {
    render_area(bounds).inset(0.0, 4.0, 0.0, 4.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLineKind {
    Frequency,
    Gain,
    /// The 0 dB gain line, drawn highlighted
    Unity,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLine {
    pub kind: GridLineKind,
    pub from: PathPoint,
    pub to: PathPoint,
}

/// Where a label sits relative to its anchor point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAlign {
    /// Horizontally centred on the anchor, top edge at the anchor
    TopCentre,
    /// Vertically centred, text starting at the anchor
    Left,
    /// Vertically centred, text ending at the anchor
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLabel {
    pub text: String,
    pub anchor: PathPoint,
    pub align: LabelAlign,
    pub highlighted: bool,
}

/// `"20Hz"`, `"500Hz"`, `"1kHz"`, `"2.5kHz"`
pub fn frequency_label(hz: f32) -> String {
    if hz > 999.0 {
        format!("{}kHz", hz / 1000.0)
    } else {
        format!("{hz}Hz")
    }
}

/// `"+12"`, `"0"`, `"-24"`
pub fn gain_label(db: f32) -> String {
    if db > 0.0 {
        format!("+{db}")
    } else {
        format!("{db}")
    }
}

/// Left-hand analyzer scale label for a gain line
pub fn analyzer_scale_label(db: f32) -> String {
    format!("{}", db + ANALYZER_SCALE_OFFSET_DB)
}

/// y of a gain line within `area`
pub fn gain_y(area: Rect, db: f32) -> f32 {
    area.y_for_db(db, -GRID_GAIN_RANGE_DB, GRID_GAIN_RANGE_DB)
}

/// Vertical frequency lines followed by horizontal gain lines
pub fn grid_lines(bounds: Rect) -> Vec<GridLine> {
    let area = analysis_area(bounds);
    if area.is_empty() {
        return Vec::new();
    }

    let verticals = GRID_FREQUENCIES.iter().map(|&hz| {
        let x = area.x_for_frequency(hz);
        GridLine {
            kind: GridLineKind::Frequency,
            from: PathPoint { x, y: area.top() },
            to: PathPoint {
                x,
                y: area.bottom(),
            },
        }
    });

    let horizontals = GRID_GAINS.iter().map(|&db| {
        let y = gain_y(area, db);
        GridLine {
            kind: if db == 0.0 {
                GridLineKind::Unity
            } else {
                GridLineKind::Gain
            },
            from: PathPoint { x: area.left(), y },
            to: PathPoint {
                x: area.right(),
                y,
            },
        }
    });

    verticals.chain(horizontals).collect()
}

/// Frequency labels along the top edge, gain labels on the right and the
/// analyzer scale on the left
pub fn grid_labels(bounds: Rect) -> Vec<GridLabel> {
    let area = analysis_area(bounds);
    if area.is_empty() {
        return Vec::new();
    }

    let mut labels = Vec::with_capacity(GRID_FREQUENCIES.len() + 2 * GRID_GAINS.len());

    for &hz in &GRID_FREQUENCIES {
        labels.push(GridLabel {
            text: frequency_label(hz),
            anchor: PathPoint {
                x: area.x_for_frequency(hz),
                y: bounds.top() + 1.0,
            },
            align: LabelAlign::TopCentre,
            highlighted: false,
        });
    }

    for &db in &GRID_GAINS {
        let y = gain_y(area, db);
        labels.push(GridLabel {
            text: gain_label(db),
            anchor: PathPoint {
                x: bounds.right(),
                y,
            },
            align: LabelAlign::Right,
            highlighted: db == 0.0,
        });
        labels.push(GridLabel {
            text: analyzer_scale_label(db),
            anchor: PathPoint {
                x: bounds.left() + 1.0,
                y,
            },
            align: LabelAlign::Left,
            highlighted: false,
        });
    }

    labels
}
