// Chart generation - runs the full pipeline for one request
// Analyzers may fan out; everything from the grid onward is strictly sequential

use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use super::error::{GenerationError, GenerationResult};
use super::seed::DeterministicSeed;
use super::stage::Stage;
use super::state::{CancellationToken, PipelineState};
use super::trace::TraceEntry;
use super::Fallback;
use crate::analysis::{analyze, analyze_concurrently, Analysis};
use crate::audio::AudioFeatures;
use crate::chart::{
    assemble_chart, explain_steps, insert_holds, select_arrows, Chart, Difficulty, StepDecision,
};
use crate::config::GeneratorConfig;
use crate::groove::{schedule_steps, Grid};

/// One chart to generate
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub features: Arc<AudioFeatures>,
    pub difficulty: Difficulty,

    /// Content fingerprint from the audio collaborator; derived from the
    /// feature record when absent
    pub fingerprint: Option<String>,
}

impl GenerationRequest {
    pub fn new(features: Arc<AudioFeatures>, difficulty: Difficulty) -> Self {
        GenerationRequest {
            features,
            difficulty,
            fingerprint: None,
        }
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn fingerprint(&self) -> String {
        self.fingerprint
            .clone()
            .unwrap_or_else(|| self.features.fingerprint())
    }

    pub fn seed(&self) -> DeterministicSeed {
        DeterministicSeed::derive(&self.fingerprint(), self.difficulty)
    }
}

/// Chart plus everything needed to understand how it was made
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub chart: Chart,
    pub fallbacks: Vec<Fallback>,
    pub trace: Vec<TraceEntry>,
    pub decisions: Vec<StepDecision>,
}

/// Generate one chart on the calling thread
pub fn generate_chart(
    request: &GenerationRequest,
    config: &GeneratorConfig,
    cancel: CancellationToken,
) -> GenerationResult<GenerationReport> {
    let mut state = begin(request, config, cancel)?;
    let analysis = analyze(&request.features, config);
    finish(request, analysis, &mut state)
}

/// Generate one chart with the analyzers running as concurrent blocking tasks
pub async fn generate_chart_async(
    request: GenerationRequest,
    config: GeneratorConfig,
    cancel: CancellationToken,
) -> GenerationResult<GenerationReport> {
    let mut state = begin(&request, &config, cancel)?;
    let analysis = analyze_concurrently(Arc::clone(&request.features), &config).await?;

    tokio::task::spawn_blocking(move || finish(&request, analysis, &mut state))
        .await
        .map_err(|e| GenerationError::Worker(format!("generation task failed: {}", e)))?
}

/// Validate inputs and build the per-request state
fn begin(
    request: &GenerationRequest,
    config: &GeneratorConfig,
    cancel: CancellationToken,
) -> GenerationResult<PipelineState> {
    cancel.check(Stage::Validation, 0)?;

    let seed = request.seed();
    let mut state = PipelineState::new(seed, cancel);
    state.stage_started(Stage::Validation);

    request.features.validate()?;
    config.validate()?;

    log::info!(
        "Generating {} chart at {:.2} BPM over {:.2}s (seed {:016x})",
        request.difficulty,
        request.features.bpm,
        request.features.duration,
        seed.value()
    );
    state.stage_completed(
        Stage::Validation,
        json!({
            "difficulty": request.difficulty,
            "seed": format!("{:016x}", seed.value()),
        }),
    );

    Ok(state)
}

/// Sequential stages from the grid to the assembled chart
fn finish(
    request: &GenerationRequest,
    analysis: Analysis,
    state: &mut PipelineState,
) -> GenerationResult<GenerationReport> {
    let features = &request.features;
    let profile = request.difficulty.profile();

    for fallback in analysis.fallbacks {
        state.fallback(fallback);
    }
    state.stage_completed(
        Stage::BeatClassification,
        json!({ "beats": analysis.beats.len() }),
    );
    state.stage_completed(
        Stage::EnergyProfiling,
        json!({
            "sections": analysis.energy.sections.len(),
            "intense": analysis.energy.reaches_intense(),
        }),
    );
    state.stage_completed(
        Stage::SustainDetection,
        json!({ "notes": analysis.notes.len() }),
    );

    state.cancel.check(Stage::GridBuild, 0)?;
    state.stage_started(Stage::GridBuild);
    let grid = Grid::build(
        features.bpm,
        features.duration,
        profile.grid,
        &features.onset_times,
        &analysis.beats,
    );
    state.stage_completed(
        Stage::GridBuild,
        json!({ "cells": grid.len(), "onset_cells": grid.onset_count(), "interval": grid.interval }),
    );

    state.stage_started(Stage::DensitySchedule);
    let scheduled = schedule_steps(&grid, &profile, &analysis.energy, state)?;
    state.stage_completed(Stage::DensitySchedule, json!({ "placed": scheduled.len() }));

    state.stage_started(Stage::ArrowSelection);
    let placed = select_arrows(&scheduled, &profile, features.bpm, &analysis.notes, state)?;
    state.stage_completed(
        Stage::ArrowSelection,
        json!({ "doubles": placed.iter().filter(|s| s.arrows.is_double()).count() }),
    );

    state.stage_started(Stage::HoldInsertion);
    let steps = insert_holds(&placed, &analysis.notes, &profile, features.duration, state)?;
    state.stage_completed(
        Stage::HoldInsertion,
        json!({ "holds": steps.iter().filter(|s| s.is_hold()).count() }),
    );

    state.stage_started(Stage::Assembly);
    let chart = assemble_chart(steps, &grid, &profile, features.bpm, features.duration)?;
    state.stage_completed(Stage::Assembly, json!({ "stats": chart.stats }));

    let decisions = explain_steps(&placed, &chart);

    Ok(GenerationReport {
        chart,
        fallbacks: std::mem::take(&mut state.fallbacks),
        trace: std::mem::take(&mut state.trace),
        decisions,
    })
}
