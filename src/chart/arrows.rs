// Arrow Selector - foot logic
// Scores every candidate arrow or arrow pair with a stateful cost function and keeps the cheapest

use serde::{Deserialize, Serialize};

use super::difficulty::DifficultyProfile;
use super::types::{Arrow, ArrowSet, Foot};
use crate::analysis::{BeatKind, EnergyLevel, SustainedNote};
use crate::groove::{PlacementReason, ScheduledCell};
use crate::pipeline::{GenerationError, GenerationResult, PipelineState, SeedStage, SeededStream, Stage};

// Cost weights; only their relative order matters
const REPEAT_PENALTY: f64 = 3.0;
const SAME_FOOT_PENALTY: f64 = 2.0;
const FORBIDDEN_CROSSOVER_PENALTY: f64 = 6.0;
const CROSSOVER_PENALTY: f64 = 1.5;
const ADJACENT_BONUS: f64 = 1.0;
const RECENT_PENALTY: f64 = 0.75;
const PITCH_BONUS: f64 = 0.5;
const LIMIT_PENALTY: f64 = 100.0;
const JITTER: f64 = 0.5;

/// Chance that an eligible off-downbeat cell offers brackets
const BRACKET_CHANCE: f64 = 0.35;

/// Counter stride per cell in the arrow stream (candidates use 0..10, bracket draw 15)
const DRAWS_PER_CELL: u64 = 16;
const BRACKET_DRAW: u64 = 15;

/// How the step is played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepPattern {
    /// One arrow, one foot
    Single,

    /// Two arrows, both feet
    Jump,

    /// Two neighbouring arrows under one foot
    Bracket,
}

/// Running foot-logic state carried from step to step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FootState {
    pub last_arrows: Option<ArrowSet>,
    pub prev_arrows: Option<ArrowSet>,

    /// Foot that hit the last step; `None` after a jump or at the start
    pub last_foot: Option<Foot>,

    pub consecutive_multi: u32,

    /// Steps in the current run at stream spacing
    pub stream_len: u32,

    pub last_time: Option<f64>,
}

/// A scheduled cell with its arrows decided
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlacedStep {
    /// Grid cell index
    pub index: usize,
    pub time: f64,
    pub arrows: ArrowSet,
    pub foot: Option<Foot>,
    pub pattern: StepPattern,
    pub reason: PlacementReason,

    /// Cost of the winning candidate
    pub cost: f64,

    pub beat_kind: Option<BeatKind>,
    pub level: EnergyLevel,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    arrows: ArrowSet,
    foot: Option<Foot>,
    pattern: StepPattern,
    cost: f64,
}

/// Pairs in enum order, following the singles in the candidate list
const PAIRS: [(Arrow, Arrow); 6] = [
    (Arrow::Left, Arrow::Down),
    (Arrow::Left, Arrow::Up),
    (Arrow::Left, Arrow::Right),
    (Arrow::Down, Arrow::Up),
    (Arrow::Down, Arrow::Right),
    (Arrow::Up, Arrow::Right),
];

/// Decide the arrows of every scheduled cell, in time order
///
/// Inside a sustained note the panel matching the note's pitch gets a small
/// bonus, so the step most likely to become a hold follows the melody.
pub fn select_arrows(
    cells: &[ScheduledCell],
    profile: &DifficultyProfile,
    bpm: f64,
    notes: &[SustainedNote],
    state: &mut PipelineState,
) -> GenerationResult<Vec<PlacedStep>> {
    let mut stream = state.stream(SeedStage::Arrows);
    let stream_gap = 30.0 / bpm;
    let mut placed = Vec::with_capacity(cells.len());

    for cell in cells {
        state.cancel.check(Stage::ArrowSelection, cell.index)?;

        let foot = &state.foot;
        let in_stream = foot
            .last_time
            .map(|last| cell.time - last <= stream_gap + 1e-9)
            .unwrap_or(false);
        let stream_len = if in_stream { foot.stream_len + 1 } else { 1 };

        let melody = notes.iter().find(|n| n.contains(cell.time)).map(|n| n.arrow());

        let best = candidates(cell, profile, foot, melody, &mut stream)
            .into_iter()
            .enumerate()
            .map(|(slot, mut candidate)| {
                candidate.cost += score(&candidate, profile, foot, stream_len)
                    + stream.unit(cell.index as u64 * DRAWS_PER_CELL + slot as u64) * JITTER;
                candidate
            })
            .fold(None, |best: Option<Candidate>, candidate| match best {
                Some(b) if b.cost <= candidate.cost => Some(b),
                _ => Some(candidate),
            })
            .ok_or_else(|| {
                GenerationError::invariant(
                    Stage::ArrowSelection,
                    format!("no arrow candidate for cell {} at {}", cell.index, cell.time),
                )
            })?;

        let foot = &mut state.foot;
        foot.prev_arrows = foot.last_arrows;
        foot.last_arrows = Some(best.arrows);
        foot.last_foot = best.foot;
        foot.consecutive_multi = if best.arrows.is_double() {
            foot.consecutive_multi + 1
        } else {
            0
        };
        foot.stream_len = stream_len;
        foot.last_time = Some(cell.time);

        placed.push(PlacedStep {
            index: cell.index,
            time: cell.time,
            arrows: best.arrows,
            foot: best.foot,
            pattern: best.pattern,
            reason: cell.reason,
            cost: best.cost,
            beat_kind: cell.beat_kind,
            level: cell.level,
        });
    }

    log::info!(
        "Selected arrows for {} steps ({} jumps, {} brackets)",
        placed.len(),
        placed.iter().filter(|s| s.pattern == StepPattern::Jump).count(),
        placed.iter().filter(|s| s.pattern == StepPattern::Bracket).count()
    );

    Ok(placed)
}

/// Candidate list in fixed order: singles, then the eligible pairs
///
/// Singles carry their foot-placement cost already; pairs carry their
/// accent bonus.
fn candidates(
    cell: &ScheduledCell,
    profile: &DifficultyProfile,
    foot: &FootState,
    melody: Option<Arrow>,
    stream: &mut SeededStream,
) -> Vec<Candidate> {
    let mut list: Vec<Candidate> = Arrow::ALL
        .iter()
        .map(|&arrow| {
            let (chosen, cost) = foot_for_single(arrow, foot.last_foot, profile);
            let bonus = if melody == Some(arrow) { PITCH_BONUS } else { 0.0 };
            Candidate {
                arrows: ArrowSet::Single(arrow),
                foot: Some(chosen),
                pattern: StepPattern::Single,
                cost: cost - bonus,
            }
        })
        .collect();

    if !profile.allow_doubles || !cell.level.is_intense() {
        return list;
    }

    let downbeat = cell.beat_kind == Some(BeatKind::Downbeat);
    let climax = cell.level == EnergyLevel::Climax;

    if downbeat && profile.allow_jumps {
        let accent = if climax { -3.5 } else { -2.5 };
        for (a, b) in PAIRS {
            list.push(Candidate {
                arrows: ArrowSet::Double(a, b),
                foot: None,
                pattern: StepPattern::Jump,
                cost: accent,
            });
        }
    } else if !downbeat
        && profile.allow_brackets
        && stream.unit(cell.index as u64 * DRAWS_PER_CELL + BRACKET_DRAW) < BRACKET_CHANCE
    {
        let accent = if climax { -2.0 } else { -1.5 };
        for (a, b) in PAIRS {
            if let Some(owner) = bracket_foot(a, b) {
                let same = foot.last_foot == Some(owner);
                list.push(Candidate {
                    arrows: ArrowSet::Double(a, b),
                    foot: Some(owner),
                    pattern: StepPattern::Bracket,
                    cost: accent + if same { SAME_FOOT_PENALTY } else { 0.0 },
                });
            }
        }
    }

    list
}

/// Foot that plays `arrow` next and the placement cost
///
/// Left and right panels belong to their own foot; playing one with the
/// other foot is a crossover. Down and up take whichever foot is due.
fn foot_for_single(arrow: Arrow, last_foot: Option<Foot>, profile: &DifficultyProfile) -> (Foot, f64) {
    let due = last_foot.map(|f| f.other());
    let natural = match arrow.column() {
        c if c < 0 => Foot::Left,
        c if c > 0 => Foot::Right,
        _ => return (due.unwrap_or(Foot::Left), 0.0),
    };

    match due {
        Some(due) if due != natural => {
            let crossover = if profile.allow_crossovers {
                CROSSOVER_PENALTY
            } else {
                FORBIDDEN_CROSSOVER_PENALTY
            };
            if crossover < SAME_FOOT_PENALTY {
                (due, crossover)
            } else {
                (natural, SAME_FOOT_PENALTY)
            }
        }
        _ => (natural, 0.0),
    }
}

/// One foot can cover a side panel plus a centre panel
fn bracket_foot(a: Arrow, b: Arrow) -> Option<Foot> {
    match (a, b) {
        (Arrow::Left, Arrow::Down) | (Arrow::Left, Arrow::Up) => Some(Foot::Left),
        (Arrow::Down, Arrow::Right) | (Arrow::Up, Arrow::Right) => Some(Foot::Right),
        _ => None,
    }
}

/// History-dependent part of the cost
fn score(
    candidate: &Candidate,
    profile: &DifficultyProfile,
    foot: &FootState,
    stream_len: u32,
) -> f64 {
    let mut cost = 0.0;

    if let Some(last) = foot.last_arrows {
        if candidate.arrows.intersects(&last) {
            cost += REPEAT_PENALTY;
        } else if let ArrowSet::Single(arrow) = candidate.arrows {
            if last.arrows().iter().any(|&l| arrow.is_adjacent(l)) {
                cost -= ADJACENT_BONUS;
            }
        }
    }

    if let Some(prev) = foot.prev_arrows {
        if candidate.arrows.intersects(&prev) {
            cost += RECENT_PENALTY;
        }
    }

    if candidate.arrows.is_double() {
        if foot.consecutive_multi + 1 > profile.max_consecutive_multi {
            cost += LIMIT_PENALTY;
        }
        if stream_len > profile.max_stream_len {
            cost += LIMIT_PENALTY;
        }
    }

    cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Difficulty;
    use crate::pipeline::{CancellationToken, DeterministicSeed};

    fn cell(index: usize, time: f64, level: EnergyLevel, beat_kind: Option<BeatKind>) -> ScheduledCell {
        ScheduledCell {
            index,
            time,
            reason: PlacementReason::Forced,
            level,
            beat_kind,
        }
    }

    fn select(difficulty: Difficulty, cells: &[ScheduledCell], seed: u64) -> Vec<PlacedStep> {
        let mut state = PipelineState::new(DeterministicSeed::from_raw(seed), CancellationToken::new());
        select_arrows(cells, &difficulty.profile(), 120.0, &[], &mut state).unwrap()
    }

    fn steady_cells(count: usize, spacing: f64, level: EnergyLevel) -> Vec<ScheduledCell> {
        (0..count)
            .map(|i| {
                let kind = if i % 4 == 0 { Some(BeatKind::Downbeat) } else { None };
                cell(i * 2, i as f64 * spacing, level, kind)
            })
            .collect()
    }

    #[test]
    fn test_beginner_never_repeats_or_doubles() {
        for seed in 0..16 {
            let steps = select(Difficulty::Beginner, &steady_cells(64, 1.5, EnergyLevel::Climax), seed);
            for pair in steps.windows(2) {
                assert!(!pair[1].arrows.is_double());
                assert_ne!(pair[0].arrows, pair[1].arrows, "seed {}", seed);
            }
        }
    }

    #[test]
    fn test_beginner_avoids_crossovers() {
        let steps = select(Difficulty::Beginner, &steady_cells(64, 1.5, EnergyLevel::Medium), 9);
        for step in &steps {
            match step.arrows {
                ArrowSet::Single(Arrow::Left) => assert_eq!(step.foot, Some(Foot::Left)),
                ArrowSet::Single(Arrow::Right) => assert_eq!(step.foot, Some(Foot::Right)),
                _ => {}
            }
        }
    }

    #[test]
    fn test_jumps_only_on_intense_downbeats() {
        let mut cells = steady_cells(32, 0.5, EnergyLevel::High);
        cells.extend(
            (32..64).map(|i| cell(i * 2, i as f64 * 0.5, EnergyLevel::Low, Some(BeatKind::Downbeat))),
        );
        let steps = select(Difficulty::Intermediate, &cells, 4);

        let jumps: Vec<&PlacedStep> = steps.iter().filter(|s| s.arrows.is_double()).collect();
        assert!(!jumps.is_empty());
        for jump in jumps {
            assert_eq!(jump.pattern, StepPattern::Jump);
            assert_eq!(jump.beat_kind, Some(BeatKind::Downbeat));
            assert!(jump.level.is_intense());
            assert_eq!(jump.foot, None);
        }
    }

    #[test]
    fn test_consecutive_multi_limit() {
        // Every cell an intense downbeat: jumps are always offered
        let cells: Vec<ScheduledCell> = (0..40)
            .map(|i| cell(i * 4, i as f64 * 0.5, EnergyLevel::Climax, Some(BeatKind::Downbeat)))
            .collect();
        let steps = select(Difficulty::Intermediate, &cells, 2);

        let mut run = 0;
        for step in &steps {
            run = if step.arrows.is_double() { run + 1 } else { 0 };
            assert!(run <= 2);
        }
    }

    #[test]
    fn test_brackets_use_one_foot() {
        let cells: Vec<ScheduledCell> = (0..200)
            .map(|i| cell(i, i as f64 * 0.3, EnergyLevel::Climax, Some(BeatKind::Offbeat)))
            .collect();
        let steps = select(Difficulty::Expert, &cells, 8);

        let brackets: Vec<&PlacedStep> = steps
            .iter()
            .filter(|s| s.pattern == StepPattern::Bracket)
            .collect();
        assert!(!brackets.is_empty());
        for bracket in brackets {
            let ArrowSet::Double(a, b) = bracket.arrows else {
                panic!("bracket with one arrow");
            };
            assert_eq!(bracket.foot, bracket_foot(a, b));
        }
    }

    #[test]
    fn test_foot_for_single() {
        let beginner = Difficulty::Beginner.profile();
        let expert = Difficulty::Expert.profile();

        assert_eq!(foot_for_single(Arrow::Left, None, &beginner), (Foot::Left, 0.0));
        assert_eq!(foot_for_single(Arrow::Down, Some(Foot::Left), &beginner), (Foot::Right, 0.0));
        assert_eq!(
            foot_for_single(Arrow::Left, Some(Foot::Left), &beginner),
            (Foot::Left, SAME_FOOT_PENALTY)
        );
        assert_eq!(
            foot_for_single(Arrow::Left, Some(Foot::Left), &expert),
            (Foot::Right, CROSSOVER_PENALTY)
        );
    }

    #[test]
    fn test_selection_is_deterministic() {
        let cells = steady_cells(100, 0.25, EnergyLevel::High);
        assert_eq!(
            select(Difficulty::Expert, &cells, 31),
            select(Difficulty::Expert, &cells, 31)
        );
    }

    #[test]
    fn test_sustained_pitch_steers_the_arrow() {
        let note = |pitch| SustainedNote {
            start: 0.0,
            end: 10.0,
            confidence: 1.0,
            pitch,
        };
        let cells = [cell(8, 1.0, EnergyLevel::Medium, None)];
        let profile = Difficulty::Intermediate.profile();

        for seed in 0..16 {
            for (pitch, expected) in [(110.0, Arrow::Left), (880.0, Arrow::Right)] {
                let mut state =
                    PipelineState::new(DeterministicSeed::from_raw(seed), CancellationToken::new());
                let placed = select_arrows(&cells, &profile, 120.0, &[note(pitch)], &mut state).unwrap();
                assert_eq!(placed[0].arrows, ArrowSet::Single(expected));
            }
        }
    }
}
