// Signal analysis - beat classes, energy sections and sustained notes
// The three analyzers are independent pure functions of the feature record

pub mod beats;
pub mod energy;
pub mod join;
pub mod sustain;

pub use beats::{classify_beats, Beat, BeatConfig, BeatKind};
pub use energy::{profile_energy, EnergyConfig, EnergyLevel, EnergyProfile, EnergySection};
pub use join::{analyze, analyze_concurrently, Analysis};
pub use sustain::{detect_sustained_notes, SustainConfig, SustainedNote};
