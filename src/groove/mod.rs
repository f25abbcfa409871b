// Groove Engine - step lattice and density scheduling
// Everything downstream of here only sees grid cell times

pub mod density;
pub mod grid;

pub use density::{schedule_steps, PlacementReason, ScheduledCell, DENSITY_WINDOW};
pub use grid::{Grid, GridCell, GridDivision, SubdivisionKind, ONSET_EPSILON};
