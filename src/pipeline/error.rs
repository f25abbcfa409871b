// Generation error taxonomy
// Hard failures abort the request; soft fallbacks are logged and reported alongside the chart

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::Stage;
use crate::audio::FeatureError;

/// Errors that abort a generation request without producing a chart
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Malformed or unusable upstream feature record
    #[error("upstream feature error during {stage}: {source}")]
    UpstreamFeature {
        stage: Stage,
        #[source]
        source: FeatureError,
    },

    /// Unknown difficulty, invalid config values or unsupported backend
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal contract broken; indicates a defect, never bad input
    #[error("invariant violation during {stage}: {detail}")]
    InvariantViolation { stage: Stage, detail: String },

    /// Caller requested cancellation between grid cells
    #[error("generation cancelled during {stage} at cell {cell}")]
    Cancelled { stage: Stage, cell: usize },

    /// A spawned analysis task panicked or was aborted
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl GenerationError {
    pub fn invariant(stage: Stage, detail: impl Into<String>) -> Self {
        GenerationError::InvariantViolation {
            stage,
            detail: detail.into(),
        }
    }
}

impl From<FeatureError> for GenerationError {
    fn from(source: FeatureError) -> Self {
        GenerationError::UpstreamFeature {
            stage: Stage::Validation,
            source,
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Soft degradations resolved locally with documented substitute values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fallback {
    /// No beat times supplied; beats fabricated from the tempo alone
    SyntheticBeats { count: usize },

    /// No pitch trace supplied; no sustained notes, no holds
    NoPitchTrace,

    /// No energy curve supplied; the whole track is one medium section
    FlatEnergy,

    /// Fewer hold candidates than the difficulty's hold percentage asks for
    HoldTargetUnmet { target: usize, placed: usize },
}

impl Fallback {
    pub fn stage(&self) -> Stage {
        match self {
            Fallback::SyntheticBeats { .. } => Stage::BeatClassification,
            Fallback::NoPitchTrace => Stage::SustainDetection,
            Fallback::FlatEnergy => Stage::EnergyProfiling,
            Fallback::HoldTargetUnmet { .. } => Stage::HoldInsertion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_error_maps_to_upstream() {
        let err: GenerationError = FeatureError::InvalidBpm(-5.0).into();
        assert!(matches!(
            err,
            GenerationError::UpstreamFeature {
                stage: Stage::Validation,
                ..
            }
        ));
        assert!(err.to_string().contains("-5"));
    }

    #[test]
    fn test_invariant_message_names_stage() {
        let err = GenerationError::invariant(Stage::Assembly, "step at 1.234 is off-grid");
        let message = err.to_string();
        assert!(message.contains("assembly"));
        assert!(message.contains("1.234"));
    }

    #[test]
    fn test_fallback_serializes_with_kind_tag() {
        let fallback = Fallback::HoldTargetUnmet {
            target: 10,
            placed: 3,
        };
        let json = serde_json::to_value(&fallback).unwrap();
        assert_eq!(json["kind"], "hold_target_unmet");
        assert_eq!(json["placed"], 3);
        assert_eq!(fallback.stage(), Stage::HoldInsertion);
    }
}
