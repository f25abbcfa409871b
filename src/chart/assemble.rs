// Chart Assembler - final contract checks, statistics and the chart record
// Any failed check is a defect in an earlier stage and aborts the request

use super::difficulty::DifficultyProfile;
use super::types::{Chart, ChartStats, Step};
use crate::groove::Grid;
use crate::pipeline::{GenerationError, GenerationResult, Stage};

const HOLD_TOLERANCE: f64 = 1e-9;

/// Check the finished step list against the grid and profile and build the chart
pub fn assemble_chart(
    steps: Vec<Step>,
    grid: &Grid,
    profile: &DifficultyProfile,
    bpm: f64,
    duration: f64,
) -> GenerationResult<Chart> {
    let mut previous: Option<f64> = None;

    for step in &steps {
        if let Some(prev) = previous {
            if step.time <= prev {
                return Err(GenerationError::invariant(
                    Stage::Assembly,
                    format!("step at {} does not follow step at {}", step.time, prev),
                ));
            }
        }
        previous = Some(step.time);

        if !grid.contains_time(step.time) {
            return Err(GenerationError::invariant(
                Stage::Assembly,
                format!("step at {} is not a grid cell time", step.time),
            ));
        }

        if step.arrows.is_double() && !profile.allows_multi() {
            return Err(GenerationError::invariant(
                Stage::Assembly,
                format!(
                    "two-arrow step at {} not allowed for {}",
                    step.time, profile.name
                ),
            ));
        }

        if let Some(hold) = step.hold_duration() {
            let in_range = hold >= profile.hold_min() - HOLD_TOLERANCE
                && hold <= profile.hold_max() + HOLD_TOLERANCE;
            if !in_range || step.end_time() > duration + HOLD_TOLERANCE {
                return Err(GenerationError::invariant(
                    Stage::Assembly,
                    format!("hold at {} has invalid duration {}", step.time, hold),
                ));
            }
        }
    }

    let stats = ChartStats::from_steps(&steps);
    log::info!(
        "Assembled {} chart: {} steps, {} holds, {} doubles",
        profile.name,
        stats.total_steps,
        stats.hold_count,
        stats.double_count
    );

    Ok(Chart {
        bpm,
        difficulty: profile.name,
        duration,
        steps,
        stats,
    })
}
