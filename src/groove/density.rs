// Density Scheduler - decides which grid cells receive a step
// Two-sided clamp over a trailing 1 s window: never above the maximum, forced up to the minimum

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::grid::Grid;
use crate::analysis::{BeatKind, EnergyLevel, EnergyProfile};
use crate::chart::DifficultyProfile;
use crate::pipeline::{GenerationResult, PipelineState, SeedStage, Stage};

/// Length of the sliding density window, seconds
pub const DENSITY_WINDOW: f64 = 1.0;

/// Why a cell received a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementReason {
    /// A detected onset falls on the cell
    Onset,

    /// The seeded energy draw cleared the section's threshold
    EnergyDraw,

    /// Injected to keep the window at the density minimum
    Forced,
}

/// A grid cell chosen to carry a step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCell {
    /// Index into the grid's cells
    pub index: usize,
    pub time: f64,
    pub reason: PlacementReason,
    pub level: EnergyLevel,
    pub beat_kind: Option<BeatKind>,
}

/// Walk the grid in time order and pick the cells that get a step
pub fn schedule_steps(
    grid: &Grid,
    profile: &DifficultyProfile,
    energy: &EnergyProfile,
    state: &mut PipelineState,
) -> GenerationResult<Vec<ScheduledCell>> {
    let mut stream = state.stream(SeedStage::Density);
    let max_in_window = profile.max_per_window();
    let need = profile.min_per_window();
    let energy_scale = f64::from(profile.energy_scale);
    let track_start = grid.cells.first().map(|c| c.time).unwrap_or(0.0);

    log::debug!(
        "Density window {:.1}s: {}..={} steps, min gap {:.3}s",
        DENSITY_WINDOW,
        need,
        max_in_window,
        profile.min_step_gap
    );

    let mut window: VecDeque<f64> = VecDeque::with_capacity(max_in_window + 1);
    let mut placed: Vec<ScheduledCell> = Vec::new();

    for (index, cell) in grid.cells.iter().enumerate() {
        state.cancel.check(Stage::DensitySchedule, index)?;

        while let Some(&front) = window.front() {
            if front <= cell.time - DENSITY_WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }

        if let Some(last) = placed.last() {
            if cell.time - last.time < profile.min_step_gap {
                continue;
            }
        }
        if window.len() + 1 > max_in_window {
            continue;
        }

        let level = energy.level_at(cell.time);

        // Last moment the window can still reach the minimum
        let deadline = if need == 0 {
            f64::INFINITY
        } else if placed.len() >= need {
            placed[placed.len() - need].time + DENSITY_WINDOW
        } else {
            track_start + DENSITY_WINDOW
        };

        let reason = if cell.has_onset {
            Some(PlacementReason::Onset)
        } else if stream.unit(index as u64) < level.base_probability() * energy_scale {
            Some(PlacementReason::EnergyDraw)
        } else if cell.time + grid.interval >= deadline {
            Some(PlacementReason::Forced)
        } else {
            None
        };

        if let Some(reason) = reason {
            window.push_back(cell.time);
            placed.push(ScheduledCell {
                index,
                time: cell.time,
                reason,
                level,
                beat_kind: cell.beat_kind,
            });
        }
    }

    log::info!(
        "Scheduled {} steps on {} cells ({} forced)",
        placed.len(),
        grid.len(),
        placed
            .iter()
            .filter(|c| c.reason == PlacementReason::Forced)
            .count()
    );

    Ok(placed)
}
