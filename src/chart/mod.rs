// Chart construction - arrows, holds and the final chart record

pub mod arrows;
pub mod assemble;
pub mod difficulty;
pub mod explainability;
pub mod holds;
pub mod types;

pub use arrows::{select_arrows, FootState, PlacedStep, StepPattern};
pub use assemble::assemble_chart;
pub use difficulty::{Difficulty, DifficultyProfile};
pub use explainability::{explain_steps, StepDecision};
pub use holds::insert_holds;
pub use types::{Arrow, ArrowSet, Chart, ChartStats, Foot, Step, StepKind};
