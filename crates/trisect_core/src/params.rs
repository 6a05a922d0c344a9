//! Parameter Store
//!
//! Every automatable value lives here as `f32` bits in an `AtomicU32`, so the
//! audio thread can read without locks. The control thread writes through
//! [`ParameterStore::set`], which clamps and snaps to the parameter's range.
//!
//! The audio thread never reads individual parameters mid-block: it takes an
//! [`EngineSettings`] snapshot once at the top of each block.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use trisect_dsp::{CompressorSettings, Ratio, DEFAULT_RATIO_INDEX, NUM_BANDS, RATIO_CHOICES};

use crate::error::{EngineError, EngineResult};

/// One of the three crossover bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandId {
    Low,
    Mid,
    High,
}

impl BandId {
    pub const ALL: [BandId; NUM_BANDS] = [BandId::Low, BandId::Mid, BandId::High];

    pub fn index(self) -> usize {
        match self {
            BandId::Low => 0,
            BandId::Mid => 1,
            BandId::High => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BandId::Low => "Low",
            BandId::Mid => "Mid",
            BandId::High => "High",
        }
    }
}

/// Identifies a parameter in the layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterId {
    GainIn,
    GainOut,
    LowMidCrossover,
    MidHighCrossover,
    Threshold(BandId),
    Attack(BandId),
    Release(BandId),
    Ratio(BandId),
    Bypassed(BandId),
    Mute(BandId),
    Solo(BandId),
}

const GLOBAL_PARAMETERS: usize = 4;
const PARAMETERS_PER_BAND: usize = 7;

/// Total number of parameters in the layout
pub const NUM_PARAMETERS: usize = GLOBAL_PARAMETERS + PARAMETERS_PER_BAND * NUM_BANDS;

impl ParameterId {
    /// Position in the store, stable across runs
    pub fn index(self) -> usize {
        let band_slot = |band: BandId, offset: usize| {
            GLOBAL_PARAMETERS + band.index() * PARAMETERS_PER_BAND + offset
        };
        match self {
            ParameterId::GainIn => 0,
            ParameterId::GainOut => 1,
            ParameterId::LowMidCrossover => 2,
            ParameterId::MidHighCrossover => 3,
            ParameterId::Threshold(band) => band_slot(band, 0),
            ParameterId::Attack(band) => band_slot(band, 1),
            ParameterId::Release(band) => band_slot(band, 2),
            ParameterId::Ratio(band) => band_slot(band, 3),
            ParameterId::Bypassed(band) => band_slot(band, 4),
            ParameterId::Mute(band) => band_slot(band, 5),
            ParameterId::Solo(band) => band_slot(band, 6),
        }
    }

    /// Every parameter, in store order
    pub fn all() -> Vec<ParameterId> {
        let mut ids = vec![
            ParameterId::GainIn,
            ParameterId::GainOut,
            ParameterId::LowMidCrossover,
            ParameterId::MidHighCrossover,
        ];
        for band in BandId::ALL {
            ids.extend([
                ParameterId::Threshold(band),
                ParameterId::Attack(band),
                ParameterId::Release(band),
                ParameterId::Ratio(band),
                ParameterId::Bypassed(band),
                ParameterId::Mute(band),
                ParameterId::Solo(band),
            ]);
        }
        ids
    }

    /// Display name, also the key used in saved state
    pub fn name(self) -> String {
        let banded = |prefix: &str, band: BandId| format!("{} {} Band", prefix, band.name());
        match self {
            ParameterId::GainIn => "Gain In".to_string(),
            ParameterId::GainOut => "Gain Out".to_string(),
            ParameterId::LowMidCrossover => "Low-Mid Crossover Freq".to_string(),
            ParameterId::MidHighCrossover => "Mid-High Crossover Freq".to_string(),
            ParameterId::Threshold(band) => banded("Threshold", band),
            ParameterId::Attack(band) => banded("Attack", band),
            ParameterId::Release(band) => banded("Release", band),
            ParameterId::Ratio(band) => banded("Ratio", band),
            ParameterId::Bypassed(band) => banded("Bypassed", band),
            ParameterId::Mute(band) => banded("Mute", band),
            ParameterId::Solo(band) => banded("Solo", band),
        }
    }
}

/// Continuous range with a snapping interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ParameterRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }

    /// Clamp into the range and snap to the nearest step
    pub fn snap(&self, value: f32) -> f32 {
        let clamped = value.clamp(self.min, self.max);
        if self.step > 0.0 {
            let steps = ((clamped - self.min) / self.step).round();
            (self.min + steps * self.step).clamp(self.min, self.max)
        } else {
            clamped
        }
    }
}

/// What kind of value a parameter holds
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Continuous {
        range: ParameterRange,
        unit: &'static str,
    },
    /// Stored as the index into `labels`
    Choice { labels: &'static [&'static str] },
    /// Stored as 0.0 or 1.0
    Toggle,
}

impl ParameterKind {
    /// Map any finite value onto one the parameter can hold
    pub fn sanitize(&self, value: f32) -> f32 {
        match self {
            ParameterKind::Continuous { range, .. } => range.snap(value),
            ParameterKind::Choice { labels } => {
                let last = labels.len().saturating_sub(1) as f32;
                value.round().clamp(0.0, last)
            }
            ParameterKind::Toggle => {
                if value >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

/// Static description of one parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub id: ParameterId,
    pub name: String,
    pub kind: ParameterKind,
    pub default: f32,
}

const GAIN_RANGE: ParameterRange = ParameterRange::new(-24.0, 24.0, 0.5);
const LOW_MID_RANGE: ParameterRange = ParameterRange::new(20.0, 999.0, 1.0);
const MID_HIGH_RANGE: ParameterRange = ParameterRange::new(1000.0, 20000.0, 1.0);
const THRESHOLD_RANGE: ParameterRange = ParameterRange::new(-60.0, 12.0, 1.0);
const TIME_RANGE: ParameterRange = ParameterRange::new(5.0, 500.0, 1.0);

fn describe(id: ParameterId) -> ParameterInfo {
    let continuous = |range, unit| ParameterKind::Continuous { range, unit };
    let (kind, default) = match id {
        ParameterId::GainIn | ParameterId::GainOut => (continuous(GAIN_RANGE, "dB"), 0.0),
        ParameterId::LowMidCrossover => (continuous(LOW_MID_RANGE, "Hz"), 400.0),
        ParameterId::MidHighCrossover => (continuous(MID_HIGH_RANGE, "Hz"), 2000.0),
        ParameterId::Threshold(_) => (continuous(THRESHOLD_RANGE, "dB"), 0.0),
        ParameterId::Attack(_) => (continuous(TIME_RANGE, "ms"), 50.0),
        ParameterId::Release(_) => (continuous(TIME_RANGE, "ms"), 250.0),
        ParameterId::Ratio(_) => (
            ParameterKind::Choice {
                labels: &RATIO_CHOICES,
            },
            DEFAULT_RATIO_INDEX as f32,
        ),
        ParameterId::Bypassed(_) | ParameterId::Mute(_) | ParameterId::Solo(_) => {
            (ParameterKind::Toggle, 0.0)
        }
    };
    ParameterInfo {
        id,
        name: id.name(),
        kind,
        default,
    }
}

/// Change flag handed out by [`ParameterStore::subscribe`]
///
/// Dropping the subscription unregisters it.
#[derive(Debug)]
pub struct ParameterSubscription {
    changed: Arc<AtomicBool>,
}

impl ParameterSubscription {
    /// True if any parameter was written since the last call
    pub fn take_changed(&self) -> bool {
        self.changed.swap(false, Ordering::AcqRel)
    }
}

/// Lock-free parameter values plus their layout
pub struct ParameterStore {
    infos: Vec<ParameterInfo>,
    values: Vec<AtomicU32>,
    listeners: Mutex<Vec<Weak<AtomicBool>>>,
}

impl ParameterStore {
    /// Store holding the full compressor layout at default values
    pub fn new() -> Self {
        let infos: Vec<ParameterInfo> = ParameterId::all().into_iter().map(describe).collect();
        let values = infos
            .iter()
            .map(|info| AtomicU32::new(info.default.to_bits()))
            .collect();
        Self {
            infos,
            values,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn infos(&self) -> &[ParameterInfo] {
        &self.infos
    }

    pub fn info(&self, id: ParameterId) -> &ParameterInfo {
        &self.infos[id.index()]
    }

    /// Look a parameter up by display name
    pub fn find(&self, name: &str) -> Option<ParameterId> {
        self.infos
            .iter()
            .find(|info| info.name == name)
            .map(|info| info.id)
    }

    /// Current value. A single relaxed atomic load; safe on the audio thread.
    #[inline]
    pub fn get(&self, id: ParameterId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    #[inline]
    pub fn get_bool(&self, id: ParameterId) -> bool {
        self.get(id) >= 0.5
    }

    #[inline]
    pub fn get_choice_index(&self, id: ParameterId) -> usize {
        self.get(id).max(0.0) as usize
    }

    /// Write a value, clamped and snapped to the parameter's range
    ///
    /// Returns the value actually stored. Control thread only: notifying
    /// subscribers takes a lock.
    pub fn set(&self, id: ParameterId, value: f32) -> EngineResult<f32> {
        let info = self.info(id);
        if !value.is_finite() {
            return Err(EngineError::InvalidParameterValue {
                name: info.name.clone(),
                value,
            });
        }
        let stored = info.kind.sanitize(value);
        self.values[id.index()].store(stored.to_bits(), Ordering::Relaxed);
        self.notify();
        Ok(stored)
    }

    pub fn set_bool(&self, id: ParameterId, on: bool) -> EngineResult<f32> {
        self.set(id, if on { 1.0 } else { 0.0 })
    }

    pub fn set_by_name(&self, name: &str, value: f32) -> EngineResult<f32> {
        let id = self
            .find(name)
            .ok_or_else(|| EngineError::UnknownParameter(name.to_string()))?;
        self.set(id, value)
    }

    /// Human-readable value, e.g. `"400Hz"`, `"1.5kHz"`, `"4:1"`, `"On"`
    pub fn format_value(&self, id: ParameterId) -> String {
        let value = self.get(id);
        match &self.info(id).kind {
            ParameterKind::Continuous { unit, .. } => {
                if *unit == "Hz" && value >= 1000.0 {
                    format!("{}kHz", value / 1000.0)
                } else {
                    format!("{}{}", value, unit)
                }
            }
            ParameterKind::Choice { labels } => labels
                .get(self.get_choice_index(id))
                .and_then(|label| Ratio::from_label(label).ok())
                .map(|ratio| ratio.to_string())
                .unwrap_or_default(),
            ParameterKind::Toggle => {
                if value >= 0.5 {
                    "On".to_string()
                } else {
                    "Off".to_string()
                }
            }
        }
    }

    /// Register for change notifications
    pub fn subscribe(&self) -> ParameterSubscription {
        let changed = Arc::new(AtomicBool::new(false));
        self.listeners.lock().push(Arc::downgrade(&changed));
        ParameterSubscription { changed }
    }

    fn notify(&self) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|weak| match weak.upgrade() {
            Some(flag) => {
                flag.store(true, Ordering::Release);
                true
            }
            None => false,
        });
    }

    /// Put every parameter back to its default
    pub fn reset_to_defaults(&self) {
        for info in &self.infos {
            self.values[info.id.index()].store(info.default.to_bits(), Ordering::Relaxed);
        }
        self.notify();
    }

    /// Capture every value by name
    pub fn state(&self) -> ParameterState {
        ParameterState {
            values: self
                .infos
                .iter()
                .map(|info| (info.name.clone(), self.get(info.id)))
                .collect(),
        }
    }

    /// Restore a captured state
    ///
    /// Every entry is checked before anything is written, so a bad state
    /// leaves the store untouched. Parameters missing from the state go back
    /// to their defaults.
    pub fn restore_state(&self, state: &ParameterState) -> EngineResult<()> {
        let mut resolved = Vec::with_capacity(state.values.len());
        for (name, &value) in &state.values {
            let id = self
                .find(name)
                .ok_or_else(|| EngineError::UnknownParameter(name.clone()))?;
            if !value.is_finite() {
                return Err(EngineError::InvalidParameterValue {
                    name: name.clone(),
                    value,
                });
            }
            resolved.push((id, value));
        }

        for info in &self.infos {
            self.values[info.id.index()].store(info.default.to_bits(), Ordering::Relaxed);
        }
        for (id, value) in resolved {
            let stored = self.info(id).kind.sanitize(value);
            self.values[id.index()].store(stored.to_bits(), Ordering::Relaxed);
        }
        self.notify();
        Ok(())
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Saved parameter values, keyed by display name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterState {
    pub values: BTreeMap<String, f32>,
}

impl ParameterState {
    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Per-band values from one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandSettings {
    pub compressor: CompressorSettings,
    pub bypassed: bool,
    pub mute: bool,
    pub solo: bool,
}

/// Everything the audio thread needs for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub gain_in_db: f32,
    pub gain_out_db: f32,
    pub low_mid_hz: f32,
    pub mid_high_hz: f32,
    pub bands: [BandSettings; NUM_BANDS],
}

impl EngineSettings {
    /// Read every parameter once. No allocation, no locks.
    pub fn snapshot(store: &ParameterStore) -> Self {
        let band = |id: BandId| BandSettings {
            compressor: CompressorSettings {
                attack_ms: store.get(ParameterId::Attack(id)),
                release_ms: store.get(ParameterId::Release(id)),
                threshold_db: store.get(ParameterId::Threshold(id)),
                ratio: Ratio::from_choice_index(store.get_choice_index(ParameterId::Ratio(id))),
            },
            bypassed: store.get_bool(ParameterId::Bypassed(id)),
            mute: store.get_bool(ParameterId::Mute(id)),
            solo: store.get_bool(ParameterId::Solo(id)),
        };

        Self {
            gain_in_db: store.get(ParameterId::GainIn),
            gain_out_db: store.get(ParameterId::GainOut),
            low_mid_hz: store.get(ParameterId::LowMidCrossover),
            mid_high_hz: store.get(ParameterId::MidHighCrossover),
            bands: [band(BandId::Low), band(BandId::Mid), band(BandId::High)],
        }
    }

    /// Bands that reach the output: soloed bands if any solo is on,
    /// otherwise every band that isn't muted
    pub fn active_bands(&self) -> [bool; NUM_BANDS] {
        let any_solo = self.bands.iter().any(|band| band.solo);
        let mut active = [false; NUM_BANDS];
        for (slot, band) in active.iter_mut().zip(&self.bands) {
            *slot = if any_solo { band.solo } else { !band.mute };
        }
        active
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::snapshot(&ParameterStore::new())
    }
}
