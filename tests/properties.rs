// Chart-level properties that must hold for any input

mod common;

use pretty_assertions::assert_eq;
use stepcraft_lib::chart::{ArrowSet, StepKind};
use stepcraft_lib::groove::GridDivision;
use stepcraft_lib::Difficulty;

use common::{chart, generate, steady_pitch, steady_track, steps_in_window};

#[test]
fn test_identical_inputs_give_identical_json() {
    for difficulty in Difficulty::ALL {
        let mut features = steady_track(135.0, 45.0, 0.7);
        features.pitch_trace = Some(steady_pitch(10.0, 30.0));

        let first = chart(features.clone(), difficulty).to_json().unwrap();
        let second = chart(features, difficulty).to_json().unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_difficulties_differ() {
    let features = steady_track(128.0, 30.0, 0.5);
    let beginner = chart(features.clone(), Difficulty::Beginner);
    let expert = chart(features, Difficulty::Expert);
    assert!(expert.steps.len() > beginner.steps.len());
}

#[test]
fn test_intermediate_steps_on_eighth_grid_at_120_bpm() {
    let chart = chart(steady_track(120.0, 60.0, 0.9), Difficulty::Intermediate);

    assert!(!chart.steps.is_empty());
    for step in &chart.steps {
        let k = step.time / 0.25;
        assert_eq!(k.fract(), 0.0, "step at {} is off the eighth grid", step.time);
        assert!(k >= 0.0);
    }
}

#[test]
fn test_expert_density_window() {
    let chart = chart(steady_track(128.0, 60.0, 0.5), Difficulty::Expert);
    let interval = GridDivision::Sixteenth.interval(128.0);
    let last = chart.steps.last().unwrap().time;

    for step in &chart.steps {
        assert!(steps_in_window(&chart, step.time) <= 4);
    }

    let mut t = 0.0;
    let mut k = 0u32;
    while t <= last {
        if t >= 2.0 {
            let count = steps_in_window(&chart, t);
            assert!(count as f64 >= 2.2, "window ending {} has {} steps", t, count);
        }
        k += 1;
        t = k as f64 * interval;
    }
}

#[test]
fn test_beginner_has_no_doubles_or_repeats() {
    for bpm in [90.0, 128.0, 174.0] {
        let chart = chart(steady_track(bpm, 90.0, 0.95), Difficulty::Beginner);

        assert_eq!(chart.stats.double_count, 0);
        assert!(chart.steps.iter().all(|s| !s.arrows.is_double()));
        for pair in chart.steps.windows(2) {
            assert!(
                pair[0].arrows != pair[1].arrows,
                "repeated {:?} at {} and {}",
                pair[0].arrows,
                pair[0].time,
                pair[1].time
            );
        }
    }
}

#[test]
fn test_hold_durations_within_profile() {
    for difficulty in Difficulty::ALL {
        let mut features = steady_track(128.0, 60.0, 0.5);
        features.pitch_trace = Some(steady_pitch(0.0, 60.0));
        let chart = chart(features, difficulty);
        let profile = difficulty.profile();

        for step in &chart.steps {
            if let StepKind::Hold { hold_duration } = step.kind {
                assert!(hold_duration >= profile.hold_min() - 1e-9);
                assert!(hold_duration <= profile.hold_max() + 1e-9);
                assert!(matches!(step.arrows, ArrowSet::Single(_)));
            }
        }
    }
}

#[test]
fn test_hold_fraction_near_target() {
    let mut features = steady_track(120.0, 60.0, 0.5);
    features.pitch_trace = Some(steady_pitch(0.0, 60.0));
    let report = generate(features, Difficulty::Intermediate);
    let fraction = report.chart.stats.hold_fraction();

    assert!(
        (fraction - 0.20).abs() <= 0.05,
        "hold fraction {:.3} outside 0.20 +/- 0.05",
        fraction
    );
    assert!(report.fallbacks.is_empty());
}

#[test]
fn test_stats_match_steps() {
    let chart = chart(steady_track(150.0, 40.0, 0.9), Difficulty::Expert);
    let stats = chart.stats;

    assert_eq!(stats.total_steps, chart.steps.len());
    assert_eq!(stats.tap_count + stats.hold_count, stats.total_steps);
    assert_eq!(stats.single_count + stats.double_count, stats.total_steps);
    assert_eq!(stats.total_arrows, stats.single_count + 2 * stats.double_count);
}

#[test]
fn test_chart_json_round_trips() {
    let mut features = steady_track(128.0, 20.0, 0.8);
    features.pitch_trace = Some(steady_pitch(2.0, 18.0));
    let chart = chart(features, Difficulty::Expert);

    let json = chart.to_json().unwrap();
    let parsed: stepcraft_lib::Chart = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.difficulty, chart.difficulty);
    assert_eq!(parsed.stats, chart.stats);
    assert_eq!(parsed.steps.len(), chart.steps.len());
    for (a, b) in parsed.steps.iter().zip(&chart.steps) {
        assert!((a.time - b.time).abs() < 1e-9);
        assert_eq!(a.arrows, b.arrows);
        assert_eq!(a.is_hold(), b.is_hold());
    }
}
