use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use egemaps_engine::engine::{AnalysisOptions, Engine};
use egemaps_engine::error::{EngineError, ErrorCode};
use egemaps_engine::feature_set::FEATURE_NAMES;
use egemaps_engine::signal::wav::{read_wav, write_wav};
use egemaps_engine::testing::{SyntheticPattern, SyntheticSpec};
use egemaps_engine::EngineConfig;
use serde::Serialize;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "egemaps_cli",
    about = "Extract eGeMAPSv02 acoustic features from WAV files"
)]
struct Cli {
    /// Log pipeline progress to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a WAV file and print the feature vector as JSON
    Analyze {
        #[arg(long)]
        input: PathBuf,
        /// JSON engine configuration (defaults to the reference recipe)
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Include the human-oriented voice summary
        #[arg(long)]
        summary: bool,
        /// Include per-frame F0, loudness and HNR contours
        #[arg(long)]
        lld: bool,
        /// Print values only, one per line, with this text for undefined ones
        #[arg(long)]
        flat: Option<String>,
    },
    /// Write a deterministic synthetic WAV file
    Synth {
        #[arg(long, value_enum, default_value_t = PatternArg::HarmonicVoice)]
        pattern: PatternArg,
        #[arg(long, default_value_t = 220.0)]
        frequency: f32,
        #[arg(long, default_value_t = 0.5)]
        amplitude: f32,
        #[arg(long, default_value_t = 16_000)]
        sample_rate: u32,
        #[arg(long, default_value_t = 1_500)]
        duration_ms: u32,
        #[arg(long, default_value_t = 1)]
        channels: u16,
        #[arg(long)]
        output: PathBuf,
    },
    /// List the 88 feature names in output order
    Names,
    /// Print the engine and recipe version
    Version,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PatternArg {
    Sine,
    HarmonicVoice,
    WhiteNoise,
    ImpulseTrain,
    Silence,
}

impl From<PatternArg> for SyntheticPattern {
    fn from(arg: PatternArg) -> Self {
        match arg {
            PatternArg::Sine => SyntheticPattern::Sine,
            PatternArg::HarmonicVoice => SyntheticPattern::HarmonicVoice,
            PatternArg::WhiteNoise => SyntheticPattern::WhiteNoise,
            PatternArg::ImpulseTrain => SyntheticPattern::ImpulseTrain,
            PatternArg::Silence => SyntheticPattern::Silence,
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            input,
            config,
            output,
            summary,
            lld,
            flat,
        } => run_analyze(input, config, output, summary, lld, flat),
        Commands::Synth {
            pattern,
            frequency,
            amplitude,
            sample_rate,
            duration_ms,
            channels,
            output,
        } => {
            let spec = SyntheticSpec::new(pattern.into())
                .with_frequency(frequency)
                .with_amplitude(amplitude)
                .with_sample_rate(sample_rate)
                .with_duration_ms(duration_ms)
                .with_channels(channels);
            write_wav(&output, &spec.to_audio())?;
            println!("{}", output.display());
            Ok(ExitCode::from(0))
        }
        Commands::Names => {
            for name in FEATURE_NAMES {
                println!("{name}");
            }
            Ok(ExitCode::from(0))
        }
        Commands::Version => {
            println!("{}", Engine::version());
            Ok(ExitCode::from(0))
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run_analyze(
    input: PathBuf,
    config_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
    summary: bool,
    lld: bool,
    flat: Option<String>,
) -> Result<ExitCode> {
    let config = match config_path {
        Some(path) => {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("reading config {}", path.display()))?;
            EngineConfig::from_json_str(&contents)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    let engine = Engine::with_config(config);
    if let Err(err) = engine.initialize() {
        return emit_engine_error(&err);
    }

    let audio = read_wav(&input)?;
    let options = AnalysisOptions {
        include_lld_time_series: lld,
        include_summary: summary,
    };
    let report = match engine.analyze_detailed(&audio, &options) {
        Ok(report) => report,
        Err(err) => return emit_engine_error(&err),
    };

    let text = match flat {
        Some(sentinel) => report
            .features
            .iter()
            .map(|(_, value)| match value.value() {
                Some(v) => v.to_string(),
                None => sentinel.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        None => serde_json::to_string_pretty(&report)?,
    };

    if let Some(path) = output_path {
        fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{text}");
    }

    Ok(ExitCode::from(0))
}

/// Engine failures are reported as JSON on stdout with exit code 2
fn emit_engine_error(err: &EngineError) -> Result<ExitCode> {
    let payload = ErrorPayload {
        code: err.code(),
        message: err.message(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(ExitCode::from(2))
}

#[derive(Serialize)]
struct ErrorPayload {
    code: i32,
    message: String,
}
