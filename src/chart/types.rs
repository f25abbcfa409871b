// Chart types - arrows, steps and the emitted chart record
// Illegal states (empty or triple arrow sets, holds without a duration) are unrepresentable

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::difficulty::Difficulty;

/// One of the four panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arrow {
    Left,
    Down,
    Up,
    Right,
}

impl Arrow {
    /// Panels in enum order; also the candidate tie-break order
    pub const ALL: [Arrow; 4] = [Arrow::Left, Arrow::Down, Arrow::Up, Arrow::Right];

    /// Lateral position on the pad: left side, centre column, right side
    pub fn column(&self) -> i8 {
        match self {
            Arrow::Left => -1,
            Arrow::Down | Arrow::Up => 0,
            Arrow::Right => 1,
        }
    }

    /// Panels sharing an edge on the pad (everything except the opposite panel)
    pub fn is_adjacent(&self, other: Arrow) -> bool {
        !matches!(
            (self, other),
            (Arrow::Left, Arrow::Right)
                | (Arrow::Right, Arrow::Left)
                | (Arrow::Up, Arrow::Down)
                | (Arrow::Down, Arrow::Up)
        ) && *self != other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Foot {
    Left,
    Right,
}

impl Foot {
    pub fn other(&self) -> Foot {
        match self {
            Foot::Left => Foot::Right,
            Foot::Right => Foot::Left,
        }
    }
}

/// One or two distinct arrows, stored in enum order
///
/// Serialized as a plain list (`["down", "right"]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowSet {
    Single(Arrow),
    Double(Arrow, Arrow),
}

impl ArrowSet {
    /// Build a double; `None` when both arrows are the same panel
    pub fn double(a: Arrow, b: Arrow) -> Option<ArrowSet> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(ArrowSet::Double(a, b)),
            std::cmp::Ordering::Greater => Some(ArrowSet::Double(b, a)),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrowSet::Single(_) => 1,
            ArrowSet::Double(..) => 2,
        }
    }

    /// Always false; an arrow set holds at least one arrow
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_double(&self) -> bool {
        matches!(self, ArrowSet::Double(..))
    }

    pub fn contains(&self, arrow: Arrow) -> bool {
        match *self {
            ArrowSet::Single(a) => a == arrow,
            ArrowSet::Double(a, b) => a == arrow || b == arrow,
        }
    }

    pub fn intersects(&self, other: &ArrowSet) -> bool {
        other.arrows().iter().any(|a| self.contains(*a))
    }

    pub fn arrows(&self) -> Vec<Arrow> {
        match *self {
            ArrowSet::Single(a) => vec![a],
            ArrowSet::Double(a, b) => vec![a, b],
        }
    }
}

impl Serialize for ArrowSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.arrows().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ArrowSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let arrows = Vec::<Arrow>::deserialize(deserializer)?;
        match arrows.as_slice() {
            [a] => Ok(ArrowSet::Single(*a)),
            [a, b] => ArrowSet::double(*a, *b)
                .ok_or_else(|| D::Error::custom("duplicate arrow in step")),
            _ => Err(D::Error::custom(format!(
                "step must have 1 or 2 arrows, got {}",
                arrows.len()
            ))),
        }
    }
}

/// Tap or hold; the hold carries its duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepKind {
    Tap,
    Hold { hold_duration: f64 },
}

/// The chart's atomic unit; `time` is always a grid cell time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub time: f64,
    pub arrows: ArrowSet,
    #[serde(flatten)]
    pub kind: StepKind,
}

impl Step {
    pub fn tap(time: f64, arrows: ArrowSet) -> Self {
        Step {
            time,
            arrows,
            kind: StepKind::Tap,
        }
    }

    pub fn hold_duration(&self) -> Option<f64> {
        match self.kind {
            StepKind::Hold { hold_duration } => Some(hold_duration),
            StepKind::Tap => None,
        }
    }

    pub fn is_hold(&self) -> bool {
        self.hold_duration().is_some()
    }

    /// Time the step stops occupying its panels
    pub fn end_time(&self) -> f64 {
        self.time + self.hold_duration().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartStats {
    pub total_steps: usize,
    pub total_arrows: usize,
    pub tap_count: usize,
    pub hold_count: usize,
    pub single_count: usize,
    pub double_count: usize,
}

impl ChartStats {
    pub fn from_steps(steps: &[Step]) -> Self {
        let mut stats = ChartStats {
            total_steps: steps.len(),
            ..ChartStats::default()
        };

        for step in steps {
            stats.total_arrows += step.arrows.len();
            if step.is_hold() {
                stats.hold_count += 1;
            } else {
                stats.tap_count += 1;
            }
            if step.arrows.is_double() {
                stats.double_count += 1;
            } else {
                stats.single_count += 1;
            }
        }

        stats
    }

    /// Fraction of steps that are holds
    pub fn hold_fraction(&self) -> f64 {
        if self.total_steps == 0 {
            0.0
        } else {
            self.hold_count as f64 / self.total_steps as f64
        }
    }
}

/// The pipeline's output artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub bpm: f64,
    pub difficulty: Difficulty,
    pub duration: f64,
    pub steps: Vec<Step>,
    pub stats: ChartStats,
}

impl Chart {
    /// Canonical JSON form; identical inputs always give identical bytes
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_double_is_ordered_and_rejects_duplicates() {
        assert_eq!(
            ArrowSet::double(Arrow::Right, Arrow::Down),
            Some(ArrowSet::Double(Arrow::Down, Arrow::Right))
        );
        assert_eq!(ArrowSet::double(Arrow::Up, Arrow::Up), None);
    }

    #[test]
    fn test_adjacency() {
        assert!(Arrow::Left.is_adjacent(Arrow::Down));
        assert!(Arrow::Up.is_adjacent(Arrow::Right));
        assert!(!Arrow::Left.is_adjacent(Arrow::Right));
        assert!(!Arrow::Up.is_adjacent(Arrow::Down));
        assert!(!Arrow::Left.is_adjacent(Arrow::Left));
    }

    #[test]
    fn test_step_wire_format() {
        let tap = Step::tap(2.625, ArrowSet::Double(Arrow::Down, Arrow::Right));
        let hold = Step {
            time: 3.0,
            arrows: ArrowSet::Single(Arrow::Left),
            kind: StepKind::Hold { hold_duration: 1.2 },
        };

        assert_eq!(
            serde_json::to_value(tap).unwrap(),
            serde_json::json!({"time": 2.625, "arrows": ["down", "right"], "type": "tap"})
        );
        assert_eq!(
            serde_json::to_value(hold).unwrap(),
            serde_json::json!({"time": 3.0, "arrows": ["left"], "type": "hold", "hold_duration": 1.2})
        );
    }

    #[test]
    fn test_step_deserialize_validates_arrows() {
        let parsed: Step =
            serde_json::from_str(r#"{"time": 1.0, "arrows": ["up"], "type": "tap"}"#).unwrap();
        assert_eq!(parsed.arrows, ArrowSet::Single(Arrow::Up));

        let triple = r#"{"time": 1.0, "arrows": ["up", "down", "left"], "type": "tap"}"#;
        assert!(serde_json::from_str::<Step>(triple).is_err());

        let empty = r#"{"time": 1.0, "arrows": [], "type": "tap"}"#;
        assert!(serde_json::from_str::<Step>(empty).is_err());

        let duplicate = r#"{"time": 1.0, "arrows": ["up", "up"], "type": "tap"}"#;
        assert!(serde_json::from_str::<Step>(duplicate).is_err());

        let hold_without_duration = r#"{"time": 1.0, "arrows": ["up"], "type": "hold"}"#;
        assert!(serde_json::from_str::<Step>(hold_without_duration).is_err());
    }

    #[test]
    fn test_stats_counts() {
        let steps = vec![
            Step::tap(0.5, ArrowSet::Single(Arrow::Left)),
            Step::tap(1.0, ArrowSet::Double(Arrow::Left, Arrow::Right)),
            Step {
                time: 1.5,
                arrows: ArrowSet::Single(Arrow::Up),
                kind: StepKind::Hold { hold_duration: 0.8 },
            },
        ];
        let stats = ChartStats::from_steps(&steps);

        assert_eq!(
            stats,
            ChartStats {
                total_steps: 3,
                total_arrows: 4,
                tap_count: 2,
                hold_count: 1,
                single_count: 2,
                double_count: 1,
            }
        );
        assert!((stats.hold_fraction() - 1.0 / 3.0).abs() < 1e-12);
        assert!((steps[2].end_time() - 2.3).abs() < 1e-12);
    }
}
