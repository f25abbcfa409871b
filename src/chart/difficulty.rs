// Difficulty presets
// Exactly three canonical profiles; no free-form parameters at the boundary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::groove::GridDivision;
use crate::pipeline::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Beginner,
        Difficulty::Intermediate,
        Difficulty::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Expert => "expert",
        }
    }

    pub fn profile(&self) -> DifficultyProfile {
        DifficultyProfile::preset(*self)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = GenerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "expert" => Ok(Difficulty::Expert),
            other => Err(GenerationError::Configuration(format!(
                "unknown difficulty '{}' (expected beginner, intermediate or expert)",
                other
            ))),
        }
    }
}

/// Fixed generation parameters of one difficulty
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub name: Difficulty,

    /// Lattice resolution steps may land on
    pub grid: GridDivision,

    /// Allowed steps per second in any trailing 1 s window (min, max)
    pub density_range: (f32, f32),

    /// Target fraction of steps that are holds
    pub hold_pct: f32,

    /// Hold duration bounds in seconds (min, max)
    pub hold_duration_range: (f32, f32),

    pub allow_doubles: bool,
    pub allow_jumps: bool,
    pub allow_brackets: bool,
    pub allow_crossovers: bool,

    /// Longest run of consecutive two-arrow steps
    pub max_consecutive_multi: u32,

    /// Longest run of steps at stream spacing (an eighth apart or closer)
    pub max_stream_len: u32,

    /// Scales the energy-driven placement probability
    pub energy_scale: f32,

    /// Minimum spacing between consecutive steps, seconds
    pub min_step_gap: f64,
}

impl DifficultyProfile {
    pub fn preset(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Beginner => DifficultyProfile {
                name: difficulty,
                grid: GridDivision::Quarter,
                density_range: (0.6, 1.2),
                hold_pct: 0.15,
                hold_duration_range: (0.8, 2.0),
                allow_doubles: false,
                allow_jumps: false,
                allow_brackets: false,
                allow_crossovers: false,
                max_consecutive_multi: 0,
                max_stream_len: 0,
                energy_scale: 0.3,
                min_step_gap: 0.35,
            },
            Difficulty::Intermediate => DifficultyProfile {
                name: difficulty,
                grid: GridDivision::Eighth,
                density_range: (1.3, 2.3),
                hold_pct: 0.20,
                hold_duration_range: (0.6, 3.0),
                allow_doubles: true,
                allow_jumps: true,
                allow_brackets: false,
                allow_crossovers: true,
                max_consecutive_multi: 2,
                max_stream_len: 6,
                energy_scale: 0.6,
                min_step_gap: 0.15,
            },
            Difficulty::Expert => DifficultyProfile {
                name: difficulty,
                grid: GridDivision::Sixteenth,
                density_range: (2.2, 4.0),
                hold_pct: 0.25,
                hold_duration_range: (0.5, 4.0),
                allow_doubles: true,
                allow_jumps: true,
                allow_brackets: true,
                allow_crossovers: true,
                max_consecutive_multi: 4,
                max_stream_len: 16,
                energy_scale: 1.0,
                min_step_gap: 0.08,
            },
        }
    }

    /// Whether any two-arrow step may appear at all
    pub fn allows_multi(&self) -> bool {
        self.allow_doubles && (self.allow_jumps || self.allow_brackets)
    }

    /// Most steps any trailing window may hold
    pub fn max_per_window(&self) -> usize {
        self.density_range.1.floor() as usize
    }

    /// Fewest steps a full trailing window should hold
    pub fn min_per_window(&self) -> usize {
        self.density_range.0.ceil() as usize
    }

    pub fn hold_min(&self) -> f64 {
        f64::from(self.hold_duration_range.0)
    }

    pub fn hold_max(&self) -> f64 {
        f64::from(self.hold_duration_range.1)
    }
}
