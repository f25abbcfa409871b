// Explainability module
// Per-step account of why a step exists and how its arrows were chosen

use serde::{Deserialize, Serialize};

use super::arrows::{PlacedStep, StepPattern};
use super::types::{ArrowSet, Chart, Foot};
use crate::analysis::{BeatKind, EnergyLevel};
use crate::groove::PlacementReason;

/// Complete decision information for a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDecision {
    pub time: f64,

    // --- Placement ---
    pub placement: PlacementReason,
    pub beat_kind: Option<BeatKind>,
    pub level: EnergyLevel,

    // --- Foot logic ---
    pub arrows: ArrowSet,
    pub pattern: StepPattern,
    pub foot: Option<Foot>,
    pub cost: f64,

    // --- Holds ---
    pub hold_duration: Option<f64>,

    // --- Explainability ---
    pub reasoning: String,
}

impl StepDecision {
    pub fn from_pipeline_data(placed: &PlacedStep, hold_duration: Option<f64>) -> Self {
        let mut reason_parts = Vec::new();

        // 1. Placement
        reason_parts.push(match placed.reason {
            PlacementReason::Onset => "Placed on a detected onset.".to_string(),
            PlacementReason::EnergyDraw => {
                format!("Placed by the {:?} energy draw.", placed.level)
            }
            PlacementReason::Forced => "Forced to keep the minimum density.".to_string(),
        });

        if let Some(kind) = placed.beat_kind {
            reason_parts.push(format!("Cell carries a {:?} beat.", kind));
        }

        // 2. Arrows
        let arrows: Vec<String> = placed
            .arrows
            .arrows()
            .iter()
            .map(|a| format!("{:?}", a))
            .collect();
        let played = match (placed.pattern, placed.foot) {
            (StepPattern::Jump, _) => "as a jump".to_string(),
            (StepPattern::Bracket, Some(foot)) => format!("as a {:?}-foot bracket", foot),
            (_, Some(foot)) => format!("with the {:?} foot", foot),
            (_, None) => String::new(),
        };
        reason_parts.push(format!(
            "Chose {} {} (cost {:.2}).",
            arrows.join("+"),
            played,
            placed.cost
        ));

        // 3. Holds
        if let Some(duration) = hold_duration {
            reason_parts.push(format!("Held for {:.2}s over a sustained note.", duration));
        }

        StepDecision {
            time: placed.time,
            placement: placed.reason,
            beat_kind: placed.beat_kind,
            level: placed.level,
            arrows: placed.arrows,
            pattern: placed.pattern,
            foot: placed.foot,
            cost: placed.cost,
            hold_duration,
            reasoning: reason_parts.join(" "),
        }
    }
}

/// Pair each placed step with its final chart step
pub fn explain_steps(placed: &[PlacedStep], chart: &Chart) -> Vec<StepDecision> {
    placed
        .iter()
        .zip(&chart.steps)
        .map(|(placed, step)| StepDecision::from_pipeline_data(placed, step.hold_duration()))
        .collect()
}
