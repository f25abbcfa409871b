// Pipeline state - per-request values threaded through the sequential stages
// No globals: every request builds a fresh state from its own seed

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::error::{Fallback, GenerationError, GenerationResult};
use super::seed::{DeterministicSeed, SeedStage, SeededStream};
use super::stage::Stage;
use super::trace::{TraceBuilder, TraceEntry};
use crate::chart::arrows::FootState;

/// Cooperative cancellation flag checked between grid cells
///
/// Cloning shares the flag, so a job layer can keep one handle and pass
/// another into the generator.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next cell boundary
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Fail with `Cancelled` if cancellation was requested
    pub fn check(&self, stage: Stage, cell: usize) -> GenerationResult<()> {
        if self.is_cancelled() {
            return Err(GenerationError::Cancelled { stage, cell });
        }
        Ok(())
    }
}

/// Mutable state owned by one generation request
///
/// Scheduler, arrow selector and hold inserter each borrow it in turn;
/// nothing in it outlives the request.
#[derive(Debug)]
pub struct PipelineState {
    pub seed: DeterministicSeed,
    pub cancel: CancellationToken,

    /// Running foot-logic state of the arrow selector
    pub foot: FootState,

    /// Soft fallbacks taken so far
    pub fallbacks: Vec<Fallback>,

    /// Stage progress entries, in order
    pub trace: Vec<TraceEntry>,
}

impl PipelineState {
    pub fn new(seed: DeterministicSeed, cancel: CancellationToken) -> Self {
        PipelineState {
            seed,
            cancel,
            foot: FootState::default(),
            fallbacks: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn stream(&self, stage: SeedStage) -> SeededStream {
        self.seed.stream(stage)
    }

    /// Record a soft fallback and log it
    pub fn fallback(&mut self, fallback: Fallback) {
        log::warn!("[{}] fallback: {:?}", fallback.stage(), fallback);
        self.fallbacks.push(fallback);
    }

    pub fn stage_started(&mut self, stage: Stage) {
        self.trace
            .push(TraceBuilder::stage(stage).progress(progress_before(stage), "started"));
    }

    pub fn stage_completed(&mut self, stage: Stage, data: serde_json::Value) {
        log::info!("[{}] complete: {}", stage, data);
        self.trace
            .push(TraceBuilder::stage(stage).with_data(stage.progress(), "complete", data));
    }
}

fn progress_before(stage: Stage) -> f32 {
    stage.progress() - 1.0 / Stage::ALL.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared_between_clones() {
        let token = CancellationToken::new();
        let handle = token.clone();

        assert!(token.check(Stage::DensitySchedule, 0).is_ok());

        handle.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(
            token.check(Stage::DensitySchedule, 17),
            Err(GenerationError::Cancelled { cell: 17, .. })
        ));
    }

    #[test]
    fn test_fallbacks_are_recorded() {
        let mut state = PipelineState::new(DeterministicSeed::from_raw(1), CancellationToken::new());
        state.fallback(Fallback::NoPitchTrace);
        assert_eq!(state.fallbacks, vec![Fallback::NoPitchTrace]);
    }

    #[test]
    fn test_stage_trace_entries() {
        let mut state = PipelineState::new(DeterministicSeed::from_raw(1), CancellationToken::new());
        state.stage_started(Stage::Validation);
        state.stage_completed(Stage::Validation, serde_json::json!({"ok": true}));

        assert_eq!(state.trace.len(), 2);
        assert_eq!(state.trace[0].stage, "validation");
        assert_eq!(state.trace[0].progress, 0.0);
        assert!(state.trace[1].data.is_some());
    }
}
