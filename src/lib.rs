// Stepcraft - Deterministic step chart generator
// Module declarations

use clap::Parser;
use std::process::ExitCode;

pub mod analysis;
pub mod audio;
pub mod chart;
pub mod commands;
pub mod config;
pub mod groove;
pub mod pipeline;

pub use audio::AudioFeatures;
pub use chart::{Chart, Difficulty, DifficultyProfile};
pub use config::GeneratorConfig;
pub use pipeline::{
    generate_chart, generate_chart_async, CancellationToken, GenerationError, GenerationReport,
    GenerationRequest,
};

/// CLI entry point: installs the log sink, builds the runtime and runs one command
pub fn run() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = commands::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            log::error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::run_command(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e.message());
            ExitCode::FAILURE
        }
    }
}
