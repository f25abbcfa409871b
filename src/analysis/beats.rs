// Beat Classifier - downbeat/upbeat/offbeat labels and strength per beat
// 4/4 measure cycle anchored at the first strong onset near a beat

use serde::{Deserialize, Serialize};

use crate::audio::AudioFeatures;
use crate::pipeline::Fallback;

/// Position class of a beat within its measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BeatKind {
    /// Beat 1 of the measure
    Downbeat,

    /// Beat 3 of the measure
    Upbeat,

    /// Beats 2 and 4
    Offbeat,
}

impl BeatKind {
    pub fn from_measure_pos(measure_pos: u8) -> Self {
        match measure_pos {
            0 => BeatKind::Downbeat,
            2 => BeatKind::Upbeat,
            _ => BeatKind::Offbeat,
        }
    }
}

/// A classified beat; never mutated after classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub time: f64,

    /// Normalized local onset energy [0.0, 1.0]
    pub strength: f32,

    pub kind: BeatKind,

    /// Position within the 4/4 measure (0..=3)
    pub measure_pos: u8,

    /// Local beat period from the neighbouring beats, seconds
    pub period: f64,
}

/// Beat classifier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Onset match window as a fraction of the local beat period
    pub onset_window_fraction: f64,

    /// Strength weight of a beat with no matching onset
    pub unmatched_onset_weight: f64,
}

impl Default for BeatConfig {
    fn default() -> Self {
        BeatConfig {
            onset_window_fraction: 0.25,
            unmatched_onset_weight: 0.6,
        }
    }
}

/// Classify every beat of the track
///
/// Falls back to a synthetic grid from the tempo when no beat times were
/// supplied.
pub fn classify_beats(
    features: &AudioFeatures,
    config: &BeatConfig,
) -> (Vec<Beat>, Option<Fallback>) {
    let global_period = features.beat_period();

    let (times, fallback) = if features.beat_times.is_empty() {
        let times = synthetic_beats(global_period, features.duration);
        log::warn!(
            "No beat times supplied, synthesizing {} beats at {:.1} BPM",
            times.len(),
            features.bpm
        );
        let count = times.len();
        (times, Some(Fallback::SyntheticBeats { count }))
    } else {
        (features.beat_times.clone(), None)
    };

    if times.is_empty() {
        return (Vec::new(), fallback);
    }

    let periods = local_periods(&times, global_period);
    let has_energy = !features.energy_curve.is_empty();

    let raw: Vec<f64> = times
        .iter()
        .zip(&periods)
        .map(|(&time, &period)| {
            let energy = if has_energy {
                features.energy_at(time)
            } else {
                1.0
            };
            let matched = nearest_distance(&features.onset_times, time)
                .map(|d| d <= period * config.onset_window_fraction)
                .unwrap_or(false);
            let weight = if matched {
                1.0
            } else {
                config.unmatched_onset_weight
            };
            energy * weight
        })
        .collect();

    let max_raw = raw.iter().copied().fold(0.0f64, f64::max);
    let phase = measure_phase(features, &times, &periods);
    log::debug!("Measure phase {} from first strong onset", phase);

    let beats = times
        .iter()
        .enumerate()
        .map(|(i, &time)| {
            let measure_pos = ((i % 4) + 4 - phase) as u8 % 4;
            let strength = if max_raw > 0.0 {
                (raw[i] / max_raw) as f32
            } else {
                0.0
            };
            Beat {
                time,
                strength: strength.clamp(0.0, 1.0),
                kind: BeatKind::from_measure_pos(measure_pos),
                measure_pos,
                period: periods[i],
            }
        })
        .collect::<Vec<_>>();

    log::info!(
        "Classified {} beats ({} downbeats)",
        beats.len(),
        beats.iter().filter(|b| b.kind == BeatKind::Downbeat).count()
    );

    (beats, fallback)
}

fn synthetic_beats(period: f64, duration: f64) -> Vec<f64> {
    (0u64..)
        .map(|k| k as f64 * period)
        .take_while(|&t| t < duration)
        .collect()
}

/// Each beat's period from its two neighbours, so tempo drift is tolerated
fn local_periods(times: &[f64], fallback: f64) -> Vec<f64> {
    let n = times.len();
    (0..n)
        .map(|i| {
            let period = match (i.checked_sub(1), times.get(i + 1)) {
                (Some(prev), Some(&next)) => (next - times[prev]) / 2.0,
                (None, Some(&next)) => next - times[i],
                (Some(prev), None) => times[i] - times[prev],
                (None, None) => fallback,
            };
            if period > 0.0 {
                period
            } else {
                fallback
            }
        })
        .collect()
}

/// Index of the beat that starts a measure, modulo 4
///
/// The first onset at or above the median onset energy that lies within a
/// quarter period of a beat marks the first downbeat.
fn measure_phase(features: &AudioFeatures, times: &[f64], periods: &[f64]) -> usize {
    if features.onset_times.is_empty() {
        return 0;
    }

    let energies: Vec<f64> = features
        .onset_times
        .iter()
        .map(|&t| features.energy_at(t))
        .collect();
    let mut sorted = energies.clone();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let median = sorted[sorted.len() / 2];

    for (&onset, &energy) in features.onset_times.iter().zip(&energies) {
        if energy < median {
            continue;
        }
        if let Some(index) = nearest_index(times, onset) {
            if (times[index] - onset).abs() <= periods[index] / 4.0 {
                return index % 4;
            }
        }
    }

    0
}

/// Index of the value nearest to `time` in an ascending slice
pub(crate) fn nearest_index(sorted: &[f64], time: f64) -> Option<usize> {
    if sorted.is_empty() {
        return None;
    }
    let upper = sorted.partition_point(|&t| t < time);
    if upper == 0 {
        return Some(0);
    }
    if upper == sorted.len() {
        return Some(sorted.len() - 1);
    }
    if time - sorted[upper - 1] <= sorted[upper] - time {
        Some(upper - 1)
    } else {
        Some(upper)
    }
}

fn nearest_distance(sorted: &[f64], time: f64) -> Option<f64> {
    nearest_index(sorted, time).map(|i| (sorted[i] - time).abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(beats: Vec<f64>, onsets: Vec<f64>) -> AudioFeatures {
        AudioFeatures {
            bpm: 120.0,
            beat_times: beats,
            onset_times: onsets,
            energy_curve: vec![(0.0, 0.5), (10.0, 0.5)],
            pitch_trace: None,
            duration: 10.0,
        }
    }

    #[test]
    fn test_empty_beats_synthesize_from_tempo() {
        let (beats, fallback) = classify_beats(&features(vec![], vec![]), &BeatConfig::default());

        assert_eq!(beats.len(), 20);
        assert_eq!(fallback, Some(Fallback::SyntheticBeats { count: 20 }));
        assert!((beats[3].time - 1.5).abs() < 1e-12);
        assert_eq!(beats[0].kind, BeatKind::Downbeat);
        assert_eq!(beats[2].kind, BeatKind::Upbeat);
        assert_eq!(beats[1].kind, BeatKind::Offbeat);
    }

    #[test]
    fn test_measure_anchored_at_first_strong_onset() {
        let beats: Vec<f64> = (0..8).map(|k| k as f64 * 0.5).collect();
        // First onset sits on beat index 1
        let (classified, fallback) =
            classify_beats(&features(beats, vec![0.51, 1.5]), &BeatConfig::default());

        assert!(fallback.is_none());
        assert_eq!(classified[1].measure_pos, 0);
        assert_eq!(classified[1].kind, BeatKind::Downbeat);
        assert_eq!(classified[0].measure_pos, 3);
        assert_eq!(classified[5].kind, BeatKind::Downbeat);
        assert_eq!(classified[3].kind, BeatKind::Upbeat);
    }

    #[test]
    fn test_strength_prefers_matched_onsets() {
        let beats = vec![0.0, 0.5, 1.0, 1.5];
        let (classified, _) = classify_beats(&features(beats, vec![1.0]), &BeatConfig::default());

        assert_eq!(classified[2].strength, 1.0);
        assert!((classified[0].strength - 0.6).abs() < 1e-6);
        assert!(classified.iter().all(|b| (0.0..=1.0).contains(&b.strength)));
    }

    #[test]
    fn test_local_period_tracks_drift() {
        let periods = local_periods(&[0.0, 0.5, 1.1, 1.8], 0.5);
        assert!((periods[0] - 0.5).abs() < 1e-12);
        assert!((periods[1] - 0.55).abs() < 1e-12);
        assert!((periods[2] - 0.65).abs() < 1e-12);
        assert!((periods[3] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_nearest_index() {
        let values = [0.0, 1.0, 2.0];
        assert_eq!(nearest_index(&values, -3.0), Some(0));
        assert_eq!(nearest_index(&values, 1.4), Some(1));
        assert_eq!(nearest_index(&values, 1.6), Some(2));
        assert_eq!(nearest_index(&values, 9.0), Some(2));
        assert_eq!(nearest_index(&[], 1.0), None);
    }
}
