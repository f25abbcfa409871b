// Energy Profiler - segments the energy curve into low/medium/high/climax sections
// Smoothed with a centered moving average; sections shorter than the minimum are absorbed

use serde::{Deserialize, Serialize};

use crate::audio::AudioFeatures;
use crate::pipeline::Fallback;

/// Curves whose smoothed range is this narrow are treated as flat
const FLAT_SPREAD: f64 = 1e-6;

/// Coarse intensity bucket of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
    Climax,
}

impl EnergyLevel {
    /// Placement probability of an onset-less cell before difficulty scaling
    pub fn base_probability(&self) -> f64 {
        match self {
            EnergyLevel::Low => 0.15,
            EnergyLevel::Medium => 0.35,
            EnergyLevel::High => 0.6,
            EnergyLevel::Climax => 0.85,
        }
    }

    /// High or Climax; gates jumps and brackets
    pub fn is_intense(&self) -> bool {
        matches!(self, EnergyLevel::High | EnergyLevel::Climax)
    }
}

/// A contiguous span `[start, end)` at one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergySection {
    pub start: f64,
    pub end: f64,
    pub level: EnergyLevel,
}

impl EnergySection {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// Sections partitioning `[0, duration)` with no gaps or overlaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyProfile {
    pub sections: Vec<EnergySection>,
}

impl EnergyProfile {
    /// Whole track at one level
    pub fn flat(duration: f64, level: EnergyLevel) -> Self {
        EnergyProfile {
            sections: vec![EnergySection {
                start: 0.0,
                end: duration,
                level,
            }],
        }
    }

    /// Level of the section containing `time`; clamps outside the track
    pub fn level_at(&self, time: f64) -> EnergyLevel {
        let index = self.sections.partition_point(|s| s.end <= time);
        self.sections
            .get(index)
            .or_else(|| self.sections.last())
            .map(|s| s.level)
            .unwrap_or(EnergyLevel::Medium)
    }

    pub fn reaches_intense(&self) -> bool {
        self.sections.iter().any(|s| s.level.is_intense())
    }
}

/// Energy profiler settings (global, not per difficulty)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    /// Cut points low|medium, medium|high, high|climax on min-max normalized
    /// energy; a flat curve is compared as-is
    pub thresholds: [f64; 3],

    /// Moving average width in samples
    pub smoothing_window: usize,

    /// Shortest section, in beats
    pub min_section_beats: f64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        EnergyConfig {
            thresholds: [0.30, 0.60, 0.85],
            smoothing_window: 5,
            min_section_beats: 2.0,
        }
    }
}

impl EnergyConfig {
    pub fn level_for(&self, energy: f64) -> EnergyLevel {
        if energy < self.thresholds[0] {
            EnergyLevel::Low
        } else if energy < self.thresholds[1] {
            EnergyLevel::Medium
        } else if energy < self.thresholds[2] {
            EnergyLevel::High
        } else {
            EnergyLevel::Climax
        }
    }
}

/// Segment the track's energy curve
pub fn profile_energy(
    features: &AudioFeatures,
    config: &EnergyConfig,
) -> (EnergyProfile, Option<Fallback>) {
    let duration = features.duration;

    if features.energy_curve.is_empty() {
        log::warn!("No energy curve supplied, using one medium section");
        return (
            EnergyProfile::flat(duration, EnergyLevel::Medium),
            Some(Fallback::FlatEnergy),
        );
    }

    let values: Vec<f64> = features.energy_curve.iter().map(|&(_, e)| e).collect();
    let smoothed = normalize(smooth(&values, config.smoothing_window));

    // Sample i covers [t_i, t_{i+1}); the first reaches back to 0, the last to the end
    let curve = &features.energy_curve;
    let mut raw = Vec::with_capacity(curve.len());
    for (i, &(time, _)) in curve.iter().enumerate() {
        let start = if i == 0 { 0.0 } else { time.min(duration) };
        let end = curve
            .get(i + 1)
            .map(|&(next, _)| next.min(duration))
            .unwrap_or(duration);
        if end > start {
            raw.push(EnergySection {
                start,
                end,
                level: config.level_for(smoothed[i]),
            });
        }
    }

    if raw.is_empty() {
        return (EnergyProfile::flat(duration, config.level_for(smoothed[0])), None);
    }

    let min_length = config.min_section_beats * features.beat_period();
    let sections = merge_equal(absorb_short(merge_equal(raw), min_length));

    log::debug!(
        "Energy thresholds {:?}, smoothing window {}, min section {:.3}s",
        config.thresholds,
        config.smoothing_window,
        min_length
    );
    log::info!("Profiled {} energy sections", sections.len());

    (EnergyProfile { sections }, None)
}

fn smooth(values: &[f64], window_size: usize) -> Vec<f64> {
    let half_window = window_size / 2;

    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half_window);
            let end = (i + half_window + 1).min(values.len());
            values[start..end].iter().sum::<f64>() / (end - start) as f64
        })
        .collect()
}

/// Min-max scale onto [0, 1] so the cut points are relative to the track
///
/// A flat curve has no spread to scale by and keeps its absolute values.
fn normalize(values: Vec<f64>) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let spread = max - min;
    if spread <= FLAT_SPREAD {
        return values;
    }

    log::debug!("Normalizing energy range [{:.4}, {:.4}]", min, max);
    values.into_iter().map(|v| (v - min) / spread).collect()
}

fn merge_equal(sections: Vec<EnergySection>) -> Vec<EnergySection> {
    let mut merged: Vec<EnergySection> = Vec::with_capacity(sections.len());
    for section in sections {
        match merged.last_mut() {
            Some(last) if last.level == section.level => last.end = section.end,
            _ => merged.push(section),
        }
    }
    merged
}

/// Fold sections shorter than `min_length` into the previous one; a short
/// leading section folds into its successor instead
fn absorb_short(sections: Vec<EnergySection>, min_length: f64) -> Vec<EnergySection> {
    let mut kept: Vec<EnergySection> = Vec::with_capacity(sections.len());
    for section in sections {
        match kept.last_mut() {
            Some(last) if section.length() < min_length => last.end = section.end,
            _ => kept.push(section),
        }
    }

    if kept.len() > 1 && kept[0].length() < min_length {
        let first = kept.remove(0);
        kept[0].start = first.start;
    }

    kept
}
