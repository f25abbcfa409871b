// Hold Inserter - promotes taps inside sustained notes to holds
// Longest and most confident notes first; every hold stays playable

use std::cmp::Ordering;

use super::arrows::{PlacedStep, StepPattern};
use super::difficulty::DifficultyProfile;
use super::types::{Step, StepKind};
use crate::analysis::SustainedNote;
use crate::pipeline::{Fallback, GenerationResult, PipelineState, SeedStage, Stage};

/// Gap left between a hold's release and the next step needing that panel or foot
pub const RELEASE_MARGIN: f64 = 0.05;

/// First-pass acceptance probability bounds
const MIN_ACCEPT: f64 = 0.2;
const ACCEPT_BOOST: f64 = 1.5;

#[derive(Debug, Clone, Copy)]
struct HoldCandidate {
    /// Position in the placed step list
    position: usize,
    duration: f64,
    note_length: f64,
    confidence: f32,
    time: f64,
}

impl HoldCandidate {
    fn end(&self) -> f64 {
        self.time + self.duration
    }

    /// Longest note first, then most confident, then earliest
    fn priority(&self, other: &Self) -> Ordering {
        other
            .note_length
            .total_cmp(&self.note_length)
            .then_with(|| other.confidence.total_cmp(&self.confidence))
            .then_with(|| self.time.total_cmp(&other.time))
    }
}

/// Convert placed steps into chart steps, turning some taps into holds
pub fn insert_holds(
    placed: &[PlacedStep],
    notes: &[SustainedNote],
    profile: &DifficultyProfile,
    track_duration: f64,
    state: &mut PipelineState,
) -> GenerationResult<Vec<Step>> {
    let target = (f64::from(profile.hold_pct) * placed.len() as f64).round() as usize;

    let mut candidates = Vec::new();
    for (position, step) in placed.iter().enumerate() {
        state.cancel.check(Stage::HoldInsertion, step.index)?;
        if let Some(candidate) = candidate_for(position, placed, notes, profile, track_duration) {
            candidates.push(candidate);
        }
    }
    candidates.sort_by(|a, b| a.priority(b));

    let mut accepted: Vec<HoldCandidate> = Vec::new();
    let mut taken = vec![false; candidates.len()];

    if !candidates.is_empty() && target > 0 {
        let mut stream = state.stream(SeedStage::Holds);
        let accept = (target as f64 / candidates.len() as f64 * ACCEPT_BOOST).clamp(MIN_ACCEPT, 1.0);

        for (i, candidate) in candidates.iter().enumerate() {
            if accepted.len() >= target {
                break;
            }
            let draw = stream.unit(placed[candidate.position].index as u64);
            if draw < accept && fits(candidate, &accepted) {
                accepted.push(*candidate);
                taken[i] = true;
            }
        }

        // Second pass fills the remainder deterministically
        for (i, candidate) in candidates.iter().enumerate() {
            if accepted.len() >= target {
                break;
            }
            if !taken[i] && fits(candidate, &accepted) {
                accepted.push(*candidate);
                taken[i] = true;
            }
        }
    }

    let mut durations: Vec<Option<f64>> = vec![None; placed.len()];
    for hold in &accepted {
        durations[hold.position] = Some(hold.duration);
    }

    let steps: Vec<Step> = placed
        .iter()
        .zip(durations)
        .map(|(step, duration)| Step {
            time: step.time,
            arrows: step.arrows,
            kind: match duration {
                Some(hold_duration) => StepKind::Hold { hold_duration },
                None => StepKind::Tap,
            },
        })
        .collect();

    log::info!(
        "Inserted {} holds from {} candidates (target {})",
        accepted.len(),
        candidates.len(),
        target
    );

    if accepted.len() < target {
        state.fallback(Fallback::HoldTargetUnmet {
            target,
            placed: accepted.len(),
        });
    }

    Ok(steps)
}

/// Build the hold candidate for one step, if it can be held at all
fn candidate_for(
    position: usize,
    placed: &[PlacedStep],
    notes: &[SustainedNote],
    profile: &DifficultyProfile,
    track_duration: f64,
) -> Option<HoldCandidate> {
    let step = &placed[position];
    if step.pattern != StepPattern::Single {
        return None;
    }

    let note = notes.iter().find(|n| n.contains(step.time))?;
    let mut duration = (note.end - step.time).min(profile.hold_max());

    // Release before the next step that needs this foot, this panel, or both feet
    let blocker = placed[position + 1..].iter().find(|next| {
        next.pattern == StepPattern::Jump
            || next.arrows.intersects(&step.arrows)
            || (next.foot.is_some() && next.foot == step.foot)
    });
    if let Some(next) = blocker {
        duration = duration.min(next.time - RELEASE_MARGIN - step.time);
    }
    duration = duration.min(track_duration - step.time);

    if duration < profile.hold_min() {
        return None;
    }

    Some(HoldCandidate {
        position,
        duration,
        note_length: note.length(),
        confidence: note.confidence,
        time: step.time,
    })
}

/// Holds never overlap each other
fn fits(candidate: &HoldCandidate, accepted: &[HoldCandidate]) -> bool {
    accepted
        .iter()
        .all(|hold| candidate.end() < hold.time || hold.end() < candidate.time)
}
