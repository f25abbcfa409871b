// Analysis fan-out - runs the three analyzers and joins their results
// The async variant runs each analyzer on a blocking worker

use std::sync::Arc;

use super::beats::{classify_beats, Beat};
use super::energy::{profile_energy, EnergyProfile};
use super::sustain::{detect_sustained_notes, SustainedNote};
use crate::audio::AudioFeatures;
use crate::config::GeneratorConfig;
use crate::pipeline::{Fallback, GenerationError, GenerationResult};

/// Joined output of the analyzers, ready for grid construction
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub beats: Vec<Beat>,
    pub energy: EnergyProfile,
    pub notes: Vec<SustainedNote>,

    /// Fallbacks in beats, energy, sustain order
    pub fallbacks: Vec<Fallback>,
}

impl Analysis {
    fn join(
        (beats, beat_fallback): (Vec<Beat>, Option<Fallback>),
        (energy, energy_fallback): (EnergyProfile, Option<Fallback>),
        (notes, sustain_fallback): (Vec<SustainedNote>, Option<Fallback>),
    ) -> Self {
        let fallbacks = [beat_fallback, energy_fallback, sustain_fallback]
            .into_iter()
            .flatten()
            .collect();
        Analysis {
            beats,
            energy,
            notes,
            fallbacks,
        }
    }
}

/// Run the analyzers one after another on the calling thread
pub fn analyze(features: &AudioFeatures, config: &GeneratorConfig) -> Analysis {
    Analysis::join(
        classify_beats(features, &config.beats),
        profile_energy(features, &config.energy),
        detect_sustained_notes(features, &config.sustain),
    )
}

/// Run the analyzers as three concurrent blocking tasks
///
/// No state is shared between the tasks; the result is identical to
/// [`analyze`].
pub async fn analyze_concurrently(
    features: Arc<AudioFeatures>,
    config: &GeneratorConfig,
) -> GenerationResult<Analysis> {
    let beats = {
        let features = Arc::clone(&features);
        let config = config.beats.clone();
        tokio::task::spawn_blocking(move || classify_beats(&features, &config))
    };
    let energy = {
        let features = Arc::clone(&features);
        let config = config.energy.clone();
        tokio::task::spawn_blocking(move || profile_energy(&features, &config))
    };
    let sustain = {
        let features = Arc::clone(&features);
        let config = config.sustain.clone();
        tokio::task::spawn_blocking(move || detect_sustained_notes(&features, &config))
    };

    let (beats, energy, sustain) = tokio::try_join!(beats, energy, sustain)
        .map_err(|e| GenerationError::Worker(format!("analysis task failed: {}", e)))?;

    Ok(Analysis::join(beats, energy, sustain))
}
