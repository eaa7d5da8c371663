//! framepacectl - Frame Scheduler Trace Driver
//!
//! Runs recorded or synthetic wall-clock traces through the frame scheduler
//! and reports the physics tick counts and idle deltas it chooses.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod error;
mod output;
mod report;
mod trace;

use anyhow::Result;
use clap::{Parser, Subcommand};
use framepace_scheduler::SchedulerConfig;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CliError;
use crate::trace::Pattern;

#[derive(Parser)]
#[command(name = "framepacectl")]
#[command(about = "Frame scheduler trace driver - Replay and simulate frame timing")]
#[command(version)]
#[command(long_about = "
framepacectl drives the frame scheduler with a sequence of monotonic clock
readings, one per rendered frame, and reports how many physics ticks each
frame runs and what idle delta animation receives.

Traces are JSON arrays of microsecond readings. Synthetic traces cover steady,
jittery, stalling and mismatched render rates.
Use --json flag for machine-readable output suitable for scripting.
")]
struct Cli {
    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Scheduler configuration file (JSON)
    #[arg(long, global = true, env = "FRAMEPACE_CONFIG")]
    config: Option<PathBuf>,

    /// Physics ticks per second
    #[arg(long, global = true, env = "FRAMEPACE_TICK_RATE")]
    tick_rate: Option<u32>,

    /// Jitter tolerance as a fraction of a tick period
    #[arg(long, global = true)]
    jitter_tolerance: Option<f64>,

    /// Force a constant frame rate
    #[arg(long, global = true)]
    fixed_fps: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a synthetic frame timing pattern
    Simulate {
        /// Frame timing pattern
        #[arg(short, long, value_enum, default_value_t = Pattern::Steady)]
        pattern: Pattern,

        /// Number of frames to render
        #[arg(short, long, default_value_t = 600)]
        frames: usize,

        /// Render rate in Hz (144 for mismatch, 60 otherwise)
        #[arg(long)]
        render_hz: Option<u32>,

        /// Seed for the jitter pattern
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Print only the summary, not every frame
        #[arg(long)]
        summary_only: bool,
    },

    /// Replay a recorded trace file
    Replay {
        /// JSON array of microsecond clock readings
        file: PathBuf,

        /// Print only the summary, not every frame
        #[arg(long)]
        summary_only: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("framepacectl={log_level},framepace_scheduler={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match execute_command(&cli) {
        Ok(()) => Ok(()),
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }

            let exit_code = match e.downcast_ref::<CliError>() {
                Some(CliError::IoError(_)) => 2,
                Some(CliError::InvalidConfiguration(_)) | Some(CliError::Scheduler(_)) => 3,
                Some(CliError::InvalidTrace(_)) | Some(CliError::JsonError(_)) => 4,
                None => 1,
            };

            std::process::exit(exit_code);
        }
    }
}

fn execute_command(cli: &Cli) -> Result<()> {
    let config = resolve_config(cli)?;

    let (samples, summary_only) = match &cli.command {
        Commands::Simulate {
            pattern,
            frames,
            render_hz,
            seed,
            summary_only,
        } => {
            if *frames == 0 {
                let message = "at least one frame is needed".to_string();
                return Err(CliError::InvalidTrace(message).into());
            }
            let render_hz = render_hz.unwrap_or_else(|| pattern.default_render_hz());
            info!(?pattern, frames, render_hz, seed, "Generating synthetic trace");
            (trace::generate(*pattern, *frames, render_hz, *seed)?, *summary_only)
        }
        Commands::Replay { file, summary_only } => {
            info!(path = %file.display(), "Loading trace");
            (trace::load_samples(file)?, *summary_only)
        }
    };

    let report = report::run_trace(config.clone(), &samples)?;
    output::print_report(&config, &report, cli.json, !summary_only);
    Ok(())
}

/// Defaults, then the config file, then command-line overrides.
fn resolve_config(cli: &Cli) -> Result<SchedulerConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            SchedulerConfig::from_json(&text)?
        }
        None => SchedulerConfig::default(),
    };

    if let Some(rate) = cli.tick_rate {
        config.physics_ticks_per_second = rate;
    }
    if let Some(tolerance) = cli.jitter_tolerance {
        config.jitter_tolerance = tolerance;
    }
    if let Some(fps) = cli.fixed_fps {
        config.fixed_fps = Some(fps);
    }

    config
        .validate()
        .map_err(|e| CliError::InvalidConfiguration(e.to_string()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    // --- Global flag parsing ---

    #[test]
    fn parse_simulate_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["framepacectl", "simulate"])?;
        assert!(!cli.json);
        assert_eq!(cli.verbose, 0);
        assert!(cli.tick_rate.is_none());
        assert!(matches!(
            cli.command,
            Commands::Simulate {
                pattern: Pattern::Steady,
                frames: 600,
                render_hz: None,
                seed: 0,
                summary_only: false,
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from([
            "framepacectl",
            "simulate",
            "--pattern",
            "mismatch",
            "--frames",
            "1440",
            "--json",
            "-vv",
            "--tick-rate",
            "120",
            "--jitter-tolerance",
            "0.25",
        ])?;
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.tick_rate, Some(120));
        assert!(
            cli.jitter_tolerance
                .is_some_and(|tolerance| (tolerance - 0.25).abs() < f64::EPSILON)
        );
        assert!(matches!(
            cli.command,
            Commands::Simulate {
                pattern: Pattern::Mismatch,
                frames: 1440,
                ..
            }
        ));
        Ok(())
    }

    #[test]
    fn parse_replay_requires_file() {
        assert!(Cli::try_parse_from(["framepacectl", "replay"]).is_err());
    }

    #[test]
    fn parse_rejects_unknown_pattern() {
        let result = Cli::try_parse_from(["framepacectl", "simulate", "--pattern", "sawtooth"]);
        assert!(result.is_err());
    }

    // --- Configuration resolution ---

    #[test]
    fn resolve_config_applies_overrides() -> TestResult {
        let cli = Cli::try_parse_from([
            "framepacectl",
            "--tick-rate",
            "240",
            "--fixed-fps",
            "30",
            "simulate",
        ])?;
        let config = resolve_config(&cli)?;
        assert_eq!(config.physics_ticks_per_second, 240);
        assert_eq!(config.fixed_fps, Some(30));
        Ok(())
    }

    #[test]
    fn resolve_config_reads_file_then_flags() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{ "physics_ticks_per_second": 120, "jitter_tolerance": 0.25 }}"#
        )?;
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from([
            "framepacectl",
            "--config",
            path.as_str(),
            "--jitter-tolerance",
            "0.1",
            "simulate",
        ])?;
        let config = resolve_config(&cli)?;
        assert_eq!(config.physics_ticks_per_second, 120);
        assert!((config.jitter_tolerance - 0.1).abs() < f64::EPSILON);
        Ok(())
    }

    #[test]
    fn resolve_config_rejects_zero_tick_rate() -> TestResult {
        let cli = Cli::try_parse_from(["framepacectl", "--tick-rate", "0", "simulate"])?;
        assert!(matches!(
            resolve_config(&cli),
            Err(CliError::InvalidConfiguration(_))
        ));
        Ok(())
    }

    #[test]
    fn resolve_config_reports_malformed_file() -> TestResult {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(file, "{{ not json")?;
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["framepacectl", "--config", path.as_str(), "simulate"])?;
        assert!(matches!(resolve_config(&cli), Err(CliError::Scheduler(_))));
        Ok(())
    }
}
