// Sustained Note Detector - pitch-stable intervals usable as hold candidates

use serde::{Deserialize, Serialize};

use crate::audio::AudioFeatures;
use crate::chart::Arrow;
use crate::pipeline::Fallback;

/// A pitch-stable interval; notes never overlap each other
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SustainedNote {
    pub start: f64,
    pub end: f64,

    /// 1.0 for a perfectly steady pitch, falling toward 0.0 at the tolerance edge
    pub confidence: f32,

    /// Mean pitch in Hz
    pub pitch: f64,
}

impl SustainedNote {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment `[start, end)`
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time < self.end
    }

    /// MIDI note number of the mean pitch
    pub fn midi_note(&self) -> f64 {
        69.0 + 12.0 * (self.pitch / 440.0).log2()
    }

    /// Panel the note leans toward: low notes left, high notes right
    pub fn arrow(&self) -> Arrow {
        match self.midi_note() {
            n if n < 55.0 => Arrow::Left,
            n if n < 60.0 => Arrow::Down,
            n if n < 70.0 => Arrow::Up,
            _ => Arrow::Right,
        }
    }
}

/// Sustained note detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SustainConfig {
    /// Shortest interval reported, seconds
    pub min_duration: f64,

    /// Samples below this pitch are unvoiced
    pub min_pitch_hz: f64,

    /// Largest drift from the run's first pitch, semitones
    pub tolerance_semitones: f64,

    /// Largest gap between consecutive samples of one run, seconds
    pub max_sample_gap: f64,
}

impl Default for SustainConfig {
    fn default() -> Self {
        SustainConfig {
            min_duration: 0.3,
            min_pitch_hz: 50.0,
            tolerance_semitones: 1.0,
            max_sample_gap: 0.1,
        }
    }
}

struct Run {
    start: f64,
    last: f64,
    anchor: f64,
    pitches: Vec<f64>,
}

impl Run {
    fn begin(time: f64, pitch: f64) -> Self {
        Run {
            start: time,
            last: time,
            anchor: pitch,
            pitches: vec![pitch],
        }
    }

    fn finish(self, config: &SustainConfig, duration: f64) -> Option<SustainedNote> {
        let end = self.last.min(duration);
        if end - self.start < config.min_duration {
            return None;
        }

        let count = self.pitches.len() as f64;
        let mean_deviation = self
            .pitches
            .iter()
            .map(|&p| semitones(p, self.anchor).abs())
            .sum::<f64>()
            / count;
        let confidence = (1.0 - mean_deviation / config.tolerance_semitones).clamp(0.0, 1.0);

        Some(SustainedNote {
            start: self.start,
            end,
            confidence: confidence as f32,
            pitch: self.pitches.iter().sum::<f64>() / count,
        })
    }
}

fn semitones(pitch: f64, reference: f64) -> f64 {
    12.0 * (pitch / reference).log2()
}

/// Find sustained notes in the pitch trace
///
/// A missing trace yields no notes and a fallback; holds then simply fall
/// short of their target.
pub fn detect_sustained_notes(
    features: &AudioFeatures,
    config: &SustainConfig,
) -> (Vec<SustainedNote>, Option<Fallback>) {
    let trace = match &features.pitch_trace {
        Some(trace) => trace,
        None => {
            log::warn!("No pitch trace supplied, hold notes disabled");
            return (Vec::new(), Some(Fallback::NoPitchTrace));
        }
    };

    let mut notes = Vec::new();
    let mut current: Option<Run> = None;

    for &(time, pitch) in trace {
        let voiced = pitch.is_finite() && pitch >= config.min_pitch_hz;

        if let Some(run) = current.as_mut() {
            let continues = voiced
                && time - run.last <= config.max_sample_gap
                && semitones(pitch, run.anchor).abs() < config.tolerance_semitones;
            if continues {
                run.last = time;
                run.pitches.push(pitch);
                continue;
            }
        }

        if let Some(note) = current
            .take()
            .and_then(|run| run.finish(config, features.duration))
        {
            notes.push(note);
        }
        if voiced {
            current = Some(Run::begin(time, pitch));
        }
    }

    if let Some(note) = current.and_then(|run| run.finish(config, features.duration)) {
        notes.push(note);
    }

    log::info!("Detected {} sustained notes", notes.len());
    (notes, None)
}
