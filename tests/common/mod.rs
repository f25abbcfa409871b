// Shared fixtures for integration tests
#![allow(dead_code)]

use std::sync::Arc;

use stepcraft_lib::chart::Chart;
use stepcraft_lib::{
    generate_chart, AudioFeatures, CancellationToken, Difficulty, GenerationReport,
    GenerationRequest, GeneratorConfig,
};

/// Steady track: beats on the tempo, flat energy at `energy`, no pitch trace
pub fn steady_track(bpm: f64, duration: f64, energy: f64) -> AudioFeatures {
    let period = 60.0 / bpm;
    let beats: Vec<f64> = (0..)
        .map(|k| k as f64 * period)
        .take_while(|&t| t < duration)
        .collect();
    let energy_curve = (0..)
        .map(|k| k as f64 * 0.5)
        .take_while(|&t| t < duration)
        .map(|t| (t, energy))
        .collect();

    AudioFeatures {
        bpm,
        beat_times: beats.clone(),
        onset_times: beats,
        energy_curve,
        pitch_trace: None,
        duration,
    }
}

/// Pitch trace holding one steady note over `[start, end]`
pub fn steady_pitch(start: f64, end: f64) -> Vec<(f64, f64)> {
    let count = ((end - start) / 0.05).round() as usize;
    (0..=count).map(|k| (start + k as f64 * 0.05, 261.6)).collect()
}

pub fn generate(features: AudioFeatures, difficulty: Difficulty) -> GenerationReport {
    let request = GenerationRequest::new(Arc::new(features), difficulty).with_fingerprint("fixture");
    generate_chart(&request, &GeneratorConfig::default(), CancellationToken::new())
        .expect("generation succeeds")
}

pub fn chart(features: AudioFeatures, difficulty: Difficulty) -> Chart {
    generate(features, difficulty).chart
}

/// Steps with time in the trailing window `(end - 1, end]`
pub fn steps_in_window(chart: &Chart, end: f64) -> usize {
    chart
        .steps
        .iter()
        .filter(|s| s.time > end - 1.0 && s.time <= end)
        .count()
}
