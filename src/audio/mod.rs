// Audio feature module
// Holds the upstream feature record the chart engine consumes

pub mod features;

pub use features::{AudioFeatures, FeatureError, MAX_BPM, MAX_DURATION, MIN_BPM};
