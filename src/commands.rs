// CLI Commands
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::audio::AudioFeatures;
use crate::chart::{Chart, Difficulty, DifficultyProfile, StepDecision};
use crate::config::GeneratorConfig;
use crate::pipeline::{
    CancellationToken, Fallback, GenerationError, GenerationReport, GenerationRequest, Generator,
    GeneratorBackend, TraceWriter,
};

#[derive(Debug, Serialize)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<E: std::fmt::Display> From<E> for CommandError {
    fn from(error: E) -> Self {
        CommandError {
            message: error.to_string(),
        }
    }
}

type CommandResult<T> = Result<T, CommandError>;

/// Stepcraft - deterministic step chart generator
#[derive(Parser)]
#[command(name = "stepcraft")]
#[command(about = "Generate four-lane step charts from audio features")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate charts from an audio feature record (JSON)
    Generate(GenerateArgs),

    /// Print the three difficulty presets
    Presets,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Feature record produced by the audio analysis collaborator
    pub features: PathBuf,

    /// beginner, intermediate, expert or all
    #[arg(short, long, default_value = "intermediate")]
    pub difficulty: String,

    /// Content fingerprint of the decoded audio (defaults to a hash of the features)
    #[arg(long)]
    pub fingerprint: Option<String>,

    /// Analyzer settings (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write charts here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Append pipeline progress entries to this JSONL file
    #[arg(long)]
    pub trace: Option<PathBuf>,

    /// Include fallbacks and per-step decisions in the output
    #[arg(long)]
    pub explain: bool,
}

/// Chart with its generation account, emitted with `--explain`
#[derive(Debug, Serialize)]
struct ExplainedChart<'a> {
    chart: &'a Chart,
    fallbacks: &'a [Fallback],
    decisions: &'a [StepDecision],
}

pub async fn run_command(cli: Cli) -> CommandResult<()> {
    match cli.command {
        Commands::Generate(args) => generate(args).await,
        Commands::Presets => presets(),
    }
}

// ==================== GENERATION ====================

/// Parse the difficulty argument; `all` expands to every preset
pub fn parse_difficulties(value: &str) -> Result<Vec<Difficulty>, GenerationError> {
    if value.trim().eq_ignore_ascii_case("all") {
        return Ok(Difficulty::ALL.to_vec());
    }
    Ok(vec![value.parse()?])
}

async fn load_features(path: &Path) -> CommandResult<AudioFeatures> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| CommandError {
        message: format!("Failed to read features {}: {}", path.display(), e),
    })?;
    let features = serde_json::from_str(&contents).map_err(|e| CommandError {
        message: format!("Failed to parse features {}: {}", path.display(), e),
    })?;
    Ok(features)
}

async fn generate(args: GenerateArgs) -> CommandResult<()> {
    let difficulties = parse_difficulties(&args.difficulty)?;
    let features = Arc::new(load_features(&args.features).await?);
    let config = match &args.config {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::default(),
    };
    let generator = Generator::with_config(GeneratorBackend::Deterministic, config)?;
    let cancel = CancellationToken::new();

    // Requests are independent; each difficulty runs as its own task
    let handles: Vec<_> = difficulties
        .iter()
        .map(|&difficulty| {
            let mut request = GenerationRequest::new(Arc::clone(&features), difficulty);
            if let Some(fingerprint) = &args.fingerprint {
                request = request.with_fingerprint(fingerprint.clone());
            }
            let generator = generator.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { generator.generate_async(request, cancel).await })
        })
        .collect();

    let mut reports: Vec<GenerationReport> = Vec::with_capacity(handles.len());
    for handle in handles {
        let report = handle.await.map_err(|e| CommandError {
            message: format!("Generation task failed: {}", e),
        })?;
        match report {
            Ok(report) => reports.push(report),
            Err(e) => {
                cancel.cancel();
                return Err(e.into());
            }
        }
    }

    if let Some(path) = &args.trace {
        let writer = TraceWriter::new(path.clone());
        for report in &reports {
            let label = report.chart.difficulty.as_str();
            let entries: Vec<_> = report
                .trace
                .iter()
                .cloned()
                .map(|entry| entry.for_request(label))
                .collect();
            writer.write_batch(&entries)?;
        }
        log::info!("Trace written to {}", writer.path().display());
    }

    let json = render_output(&reports, args.explain)?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            log::info!("Wrote {} chart(s) to {}", reports.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// One chart as an object, several as an array
fn render_output(reports: &[GenerationReport], explain: bool) -> Result<String, serde_json::Error> {
    if explain {
        let explained: Vec<ExplainedChart> = reports
            .iter()
            .map(|r| ExplainedChart {
                chart: &r.chart,
                fallbacks: &r.fallbacks,
                decisions: &r.decisions,
            })
            .collect();
        match explained.as_slice() {
            [single] => serde_json::to_string_pretty(single),
            many => serde_json::to_string_pretty(many),
        }
    } else {
        let charts: Vec<&Chart> = reports.iter().map(|r| &r.chart).collect();
        match charts.as_slice() {
            [single] => single.to_json(),
            many => serde_json::to_string_pretty(many),
        }
    }
}

// ==================== PRESETS ====================

fn presets() -> CommandResult<()> {
    let profiles: Vec<DifficultyProfile> = Difficulty::ALL.iter().map(|d| d.profile()).collect();
    println!("{}", serde_json::to_string_pretty(&profiles)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_features(dir: &TempDir) -> PathBuf {
        let features = AudioFeatures {
            bpm: 120.0,
            beat_times: vec![],
            onset_times: vec![0.5, 1.0, 1.5],
            energy_curve: vec![(0.0, 0.5), (8.0, 0.5)],
            pitch_trace: None,
            duration: 8.0,
        };
        let path = dir.path().join("features.json");
        std::fs::write(&path, serde_json::to_string(&features).unwrap()).unwrap();
        path
    }

    fn args(features: PathBuf, difficulty: &str) -> GenerateArgs {
        GenerateArgs {
            features,
            difficulty: difficulty.to_string(),
            fingerprint: None,
            config: None,
            output: None,
            trace: None,
            explain: false,
        }
    }

    #[test]
    fn test_parse_difficulties() {
        assert_eq!(parse_difficulties("ALL").unwrap().len(), 3);
        assert_eq!(parse_difficulties("expert").unwrap(), vec![Difficulty::Expert]);
        assert!(parse_difficulties("hard").is_err());
    }

    #[test]
    fn test_cli_parses_generate() {
        let cli = Cli::try_parse_from([
            "stepcraft",
            "generate",
            "song.json",
            "--difficulty",
            "all",
            "--explain",
        ])
        .unwrap();

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.features, PathBuf::from("song.json"));
                assert_eq!(args.difficulty, "all");
                assert!(args.explain);
            }
            Commands::Presets => panic!("expected generate"),
        }
    }

    #[tokio::test]
    async fn test_generate_all_writes_array_and_trace() {
        let dir = TempDir::new().unwrap();
        let features = write_features(&dir);
        let output = dir.path().join("charts.json");
        let trace = dir.path().join("trace.jsonl");

        let mut generate_args = args(features, "all");
        generate_args.output = Some(output.clone());
        generate_args.trace = Some(trace.clone());
        generate(generate_args).await.unwrap();

        let written: Vec<Chart> =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(written[0].difficulty, Difficulty::Beginner);

        let entries = crate::pipeline::read_trace_file(&trace).unwrap();
        assert!(entries.iter().any(|e| e.request.as_deref() == Some("expert")));
    }

    #[tokio::test]
    async fn test_unknown_difficulty_fails() {
        let dir = TempDir::new().unwrap();
        let err = generate(args(write_features(&dir), "nightmare")).await.unwrap_err();
        assert!(err.message().contains("nightmare"));
    }
}
