// Pipeline execution and monitoring module
// Orchestrates the full features-to-chart pipeline

pub mod backend;
pub mod error;
pub mod generate;
pub mod seed;
pub mod stage;
pub mod state;
pub mod trace;

pub use backend::{Generator, GeneratorBackend};
pub use error::{Fallback, GenerationError, GenerationResult};
pub use generate::{generate_chart, generate_chart_async, GenerationReport, GenerationRequest};
pub use seed::{DeterministicSeed, SeedStage, SeededStream};
pub use stage::Stage;
pub use state::{CancellationToken, PipelineState};
pub use trace::{read_trace_file, TraceBuilder, TraceEntry, TraceError, TraceWriter};
