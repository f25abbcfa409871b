// Pipeline stage names
// Shared by error context, progress trace entries and logging

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the linear chart-generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validation,
    BeatClassification,
    EnergyProfiling,
    SustainDetection,
    GridBuild,
    DensitySchedule,
    ArrowSelection,
    HoldInsertion,
    Assembly,
}

impl Stage {
    /// Every stage in execution order
    pub const ALL: [Stage; 9] = [
        Stage::Validation,
        Stage::BeatClassification,
        Stage::EnergyProfiling,
        Stage::SustainDetection,
        Stage::GridBuild,
        Stage::DensitySchedule,
        Stage::ArrowSelection,
        Stage::HoldInsertion,
        Stage::Assembly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Validation => "validation",
            Stage::BeatClassification => "beat_classification",
            Stage::EnergyProfiling => "energy_profiling",
            Stage::SustainDetection => "sustain_detection",
            Stage::GridBuild => "grid_build",
            Stage::DensitySchedule => "density_schedule",
            Stage::ArrowSelection => "arrow_selection",
            Stage::HoldInsertion => "hold_insertion",
            Stage::Assembly => "assembly",
        }
    }

    /// Fraction of the pipeline completed once this stage finishes
    pub fn progress(&self) -> f32 {
        let position = Stage::ALL
            .iter()
            .position(|stage| stage == self)
            .unwrap_or(0);
        (position + 1) as f32 / Stage::ALL.len() as f32
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde_name() {
        for stage in Stage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage));
        }
    }

    #[test]
    fn test_progress_is_monotonic() {
        let progress: Vec<f32> = Stage::ALL.iter().map(|s| s.progress()).collect();
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(Stage::Assembly.progress(), 1.0);
    }
}
