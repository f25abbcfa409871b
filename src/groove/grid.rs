// Step Grid - the timing lattice every step must land on
// The only place continuous onset times are reconciled against the lattice

use serde::{Deserialize, Serialize};

use crate::analysis::{Beat, BeatKind};

/// Onset match tolerance in seconds (fixed, not per difficulty)
pub const ONSET_EPSILON: f64 = 0.030;

/// Grid division - defines the resolution of the lattice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridDivision {
    /// Quarter notes (1 per beat)
    Quarter,

    /// Eighth notes (2 per beat)
    Eighth,

    /// Sixteenth notes (4 per beat)
    Sixteenth,
}

impl GridDivision {
    /// Get number of subdivisions per beat
    pub fn subdivisions_per_beat(&self) -> u32 {
        match self {
            GridDivision::Quarter => 1,
            GridDivision::Eighth => 2,
            GridDivision::Sixteenth => 4,
        }
    }

    /// Seconds between adjacent cells
    pub fn interval(&self, bpm: f64) -> f64 {
        60.0 / bpm / self.subdivisions_per_beat() as f64
    }
}

/// Where a cell sits inside its beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdivisionKind {
    /// On the beat
    Beat,

    /// Halfway between beats ("and")
    Eighth,

    /// Quarter positions between beats ("e" / "a")
    Sixteenth,
}

impl SubdivisionKind {
    fn at(index: usize, division: GridDivision) -> Self {
        let per_beat = division.subdivisions_per_beat() as usize;
        match (per_beat, index % per_beat) {
            (_, 0) => SubdivisionKind::Beat,
            (4, 2) | (2, 1) => SubdivisionKind::Eighth,
            _ => SubdivisionKind::Sixteenth,
        }
    }
}

/// One lattice position; read-only after construction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    pub time: f64,
    pub subdivision_kind: SubdivisionKind,
    pub has_onset: bool,

    /// Class of the detected beat this cell carries, if any
    pub beat_kind: Option<BeatKind>,

    /// Strength of that beat (0.0 when none)
    pub beat_strength: f32,
}

impl GridCell {
    pub fn is_downbeat(&self) -> bool {
        self.beat_kind == Some(BeatKind::Downbeat)
    }
}

/// Step lattice for one (bpm, difficulty) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    /// Beats per minute
    pub bpm: f64,

    pub division: GridDivision,

    /// Seconds between cells
    pub interval: f64,

    /// Cells in time order; `cells[k].time == k * interval`
    pub cells: Vec<GridCell>,
}

impl Grid {
    /// Build the lattice from 0 up to (excluding) `duration`
    pub fn build(
        bpm: f64,
        duration: f64,
        division: GridDivision,
        onsets: &[f64],
        beats: &[Beat],
    ) -> Self {
        let interval = division.interval(bpm);

        let mut cells: Vec<GridCell> = (0u64..)
            .map(|k| k as f64 * interval)
            .take_while(|&time| time < duration)
            .enumerate()
            .map(|(index, time)| GridCell {
                time,
                subdivision_kind: SubdivisionKind::at(index, division),
                has_onset: false,
                beat_kind: None,
                beat_strength: 0.0,
            })
            .collect();

        mark_onsets(&mut cells, onsets);

        // Each beat labels the nearest cell within half an interval
        for beat in beats {
            let index = (beat.time / interval).round();
            if index < 0.0 {
                continue;
            }
            if let Some(cell) = cells.get_mut(index as usize) {
                if (cell.time - beat.time).abs() <= interval / 2.0 {
                    cell.beat_kind = Some(beat.kind);
                    cell.beat_strength = beat.strength;
                }
            }
        }

        log::debug!(
            "Grid {:?} at {:.2} BPM: interval {:.4}s, {} cells",
            division,
            bpm,
            interval,
            cells.len()
        );

        Grid {
            bpm,
            division,
            interval,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Index of the cell whose time is exactly `time`
    pub fn index_of(&self, time: f64) -> Option<usize> {
        if !time.is_finite() || time < 0.0 {
            return None;
        }
        let index = (time / self.interval).round() as usize;
        match self.cells.get(index) {
            Some(cell) if cell.time == time => Some(index),
            _ => None,
        }
    }

    /// Whether `time` is a value this grid produced
    pub fn contains_time(&self, time: f64) -> bool {
        self.index_of(time).is_some()
    }

    pub fn onset_count(&self) -> usize {
        self.cells.iter().filter(|c| c.has_onset).count()
    }
}

/// Two-pointer sweep over sorted cells and sorted onsets
fn mark_onsets(cells: &mut [GridCell], onsets: &[f64]) {
    let mut next = 0;
    for cell in cells.iter_mut() {
        while next < onsets.len() && onsets[next] < cell.time - ONSET_EPSILON {
            next += 1;
        }
        cell.has_onset = onsets
            .get(next)
            .map(|&onset| (onset - cell.time).abs() <= ONSET_EPSILON)
            .unwrap_or(false);
    }
}
