// Generator configuration
// Global analyzer settings; difficulty presets stay compiled in

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::{BeatConfig, EnergyConfig, SustainConfig};
use crate::pipeline::{GenerationError, GenerationResult};

/// Settings shared by every difficulty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub beats: BeatConfig,
    pub energy: EnergyConfig,
    pub sustain: SustainConfig,
}

impl GeneratorConfig {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> GenerationResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            GenerationError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: GeneratorConfig = serde_json::from_str(&contents).map_err(|e| {
            GenerationError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no analyzer can work with
    pub fn validate(&self) -> GenerationResult<()> {
        let beats = &self.beats;
        if !(beats.onset_window_fraction > 0.0 && beats.onset_window_fraction <= 0.5) {
            return Err(invalid("beats.onset_window_fraction", beats.onset_window_fraction));
        }
        if !(0.0..=1.0).contains(&beats.unmatched_onset_weight) {
            return Err(invalid("beats.unmatched_onset_weight", beats.unmatched_onset_weight));
        }

        let energy = &self.energy;
        let [low, mid, high] = energy.thresholds;
        if !(low.is_finite() && high.is_finite() && low < mid && mid < high) {
            return Err(GenerationError::Configuration(format!(
                "energy.thresholds must be strictly ascending, got {:?}",
                energy.thresholds
            )));
        }
        if energy.smoothing_window == 0 {
            return Err(GenerationError::Configuration(
                "energy.smoothing_window must be at least 1".to_string(),
            ));
        }
        if !(energy.min_section_beats >= 0.0) {
            return Err(invalid("energy.min_section_beats", energy.min_section_beats));
        }

        let sustain = &self.sustain;
        for (name, value) in [
            ("sustain.min_duration", sustain.min_duration),
            ("sustain.min_pitch_hz", sustain.min_pitch_hz),
            ("sustain.tolerance_semitones", sustain.tolerance_semitones),
            ("sustain.max_sample_gap", sustain.max_sample_gap),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(invalid(name, value));
            }
        }

        Ok(())
    }
}

fn invalid(name: &str, value: f64) -> GenerationError {
    GenerationError::Configuration(format!("{} has invalid value {}", name, value))
}
