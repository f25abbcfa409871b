// Audio Features - Pre-extracted analysis record consumed by the chart engine
// Validation, content fingerprinting and energy lookup for the upstream feature vector

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Lowest tempo the engine accepts from the analysis collaborator
pub const MIN_BPM: f64 = 20.0;

/// Highest tempo the engine accepts from the analysis collaborator
pub const MAX_BPM: f64 = 400.0;

/// Longest track the engine accepts, seconds (two hours)
pub const MAX_DURATION: f64 = 7200.0;

/// Errors raised when the upstream feature record is malformed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("bpm must be finite and within [20, 400], got {0}")]
    InvalidBpm(f64),

    #[error("duration must be finite and within (0, 7200] seconds, got {0}")]
    InvalidDuration(f64),

    #[error("{field}[{index}] is not a finite number")]
    NonFiniteValue { field: &'static str, index: usize },

    #[error("{field}[{index}] is negative")]
    NegativeTime { field: &'static str, index: usize },

    #[error("{field}[{index}] is earlier than the previous entry")]
    Unordered { field: &'static str, index: usize },

    #[error("energy_curve[{index}] has negative energy")]
    NegativeEnergy { index: usize },
}

/// Pre-extracted audio features for one source track
///
/// Produced once by the audio-analysis collaborator and treated as an
/// immutable read-only record by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    /// Estimated tempo in beats per minute
    pub bpm: f64,

    /// Detected beat timestamps in seconds, ascending
    #[serde(default)]
    pub beat_times: Vec<f64>,

    /// Detected onset timestamps in seconds, ascending
    #[serde(default)]
    pub onset_times: Vec<f64>,

    /// (time, energy) samples, energy normalized to [0, 1]
    #[serde(default)]
    pub energy_curve: Vec<(f64, f64)>,

    /// Optional (time, pitch_hz) samples; pitch <= 0 marks unvoiced frames
    #[serde(default)]
    pub pitch_trace: Option<Vec<(f64, f64)>>,

    /// Track duration in seconds
    pub duration: f64,
}

impl AudioFeatures {
    /// Seconds per quarter note at the estimated tempo
    pub fn beat_period(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Check the record for values no pipeline stage can work with
    pub fn validate(&self) -> Result<(), FeatureError> {
        if !self.bpm.is_finite() || self.bpm < MIN_BPM || self.bpm > MAX_BPM {
            return Err(FeatureError::InvalidBpm(self.bpm));
        }

        if !self.duration.is_finite() || self.duration <= 0.0 || self.duration > MAX_DURATION {
            return Err(FeatureError::InvalidDuration(self.duration));
        }

        check_times("beat_times", self.beat_times.iter().copied())?;
        check_times("onset_times", self.onset_times.iter().copied())?;
        check_times("energy_curve", self.energy_curve.iter().map(|&(t, _)| t))?;

        for (index, &(_, energy)) in self.energy_curve.iter().enumerate() {
            if !energy.is_finite() {
                return Err(FeatureError::NonFiniteValue {
                    field: "energy_curve",
                    index,
                });
            }
            if energy < 0.0 {
                return Err(FeatureError::NegativeEnergy { index });
            }
        }

        if let Some(ref trace) = self.pitch_trace {
            check_times("pitch_trace", trace.iter().map(|&(t, _)| t))?;
            for (index, &(_, pitch)) in trace.iter().enumerate() {
                if !pitch.is_finite() {
                    return Err(FeatureError::NonFiniteValue {
                        field: "pitch_trace",
                        index,
                    });
                }
            }
        }

        Ok(())
    }

    /// Stable content fingerprint of the feature record (hex SHA-256)
    ///
    /// Used as the seed source when the collaborator does not supply a
    /// fingerprint of the decoded samples.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();

        hasher.update(b"stepcraft-features-v1");
        hasher.update(self.bpm.to_le_bytes());
        hasher.update(self.duration.to_le_bytes());

        hash_series(&mut hasher, self.beat_times.iter().copied());
        hash_series(&mut hasher, self.onset_times.iter().copied());
        hash_series(
            &mut hasher,
            self.energy_curve.iter().flat_map(|&(t, e)| [t, e]),
        );

        match self.pitch_trace {
            Some(ref trace) => {
                hasher.update([1u8]);
                hash_series(&mut hasher, trace.iter().flat_map(|&(t, p)| [t, p]));
            }
            None => hasher.update([0u8]),
        }

        hex::encode(hasher.finalize())
    }

    /// Energy at a timestamp, linearly interpolated between curve samples
    /// Clamps to the first/last sample outside the curve; 0.0 for an empty curve
    pub fn energy_at(&self, time: f64) -> f64 {
        let curve = &self.energy_curve;
        let (first, last) = match (curve.first(), curve.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return 0.0,
        };

        if time <= first.0 {
            return first.1;
        }
        if time >= last.0 {
            return last.1;
        }

        // First sample strictly after `time`
        let upper = curve.partition_point(|&(t, _)| t <= time);
        let (t0, e0) = curve[upper - 1];
        let (t1, e1) = curve[upper];

        let span = t1 - t0;
        if span <= f64::EPSILON {
            return e1;
        }

        e0 + (e1 - e0) * (time - t0) / span
    }
}

/// Verify a time series is finite, non-negative and non-decreasing
fn check_times(
    field: &'static str,
    times: impl Iterator<Item = f64>,
) -> Result<(), FeatureError> {
    let mut previous = f64::NEG_INFINITY;

    for (index, time) in times.enumerate() {
        if !time.is_finite() {
            return Err(FeatureError::NonFiniteValue { field, index });
        }
        if time < 0.0 {
            return Err(FeatureError::NegativeTime { field, index });
        }
        if time < previous {
            return Err(FeatureError::Unordered { field, index });
        }
        previous = time;
    }

    Ok(())
}

/// Feed a length-prefixed series of floats into the hasher
fn hash_series(hasher: &mut Sha256, values: impl Iterator<Item = f64>) {
    let values: Vec<f64> = values.collect();
    hasher.update((values.len() as u64).to_le_bytes());
    for value in values {
        hasher.update(value.to_le_bytes());
    }
}
