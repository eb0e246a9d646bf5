//! Headless lane battle runner.
//!
//! Runs scripted battles without any presentation layer. Reports go to
//! stdout; logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Run the built-in skirmish
//! cargo run -p lanewar_headless -- run
//!
//! # Run a scenario file for at most 1000 frames, JSON output
//! cargo run -p lanewar_headless -- run --scenario scenarios/skirmish.ron --frames 1000 --json
//!
//! # Validate a scenario file
//! cargo run -p lanewar_headless -- validate scenarios/skirmish.ron
//!
//! # Verify determinism
//! cargo run -p lanewar_headless -- verify --runs 5
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lanewar_headless::{HeadlessRunner, Scenario, ScenarioError};

#[derive(Parser)]
#[command(name = "lanewar_headless")]
#[command(about = "Headless lane battle runner for scenario testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle and print its report
    Run {
        /// Scenario file to load (default: built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Override the scenario's frame limit
        #[arg(short, long)]
        frames: Option<u64>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Load a scenario and initialize an engine without running it
    Validate {
        /// Scenario file to check
        file: PathBuf,
    },

    /// Verify determinism by running the same scenario several times
    Verify {
        /// Scenario file to load (default: built-in skirmish)
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Override the scenario's frame limit
        #[arg(short, long)]
        frames: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Run {
            scenario,
            frames,
            json,
        }) => cmd_run(scenario, frames, json),
        Some(Commands::Validate { file }) => cmd_validate(&file),
        Some(Commands::Verify {
            scenario,
            runs,
            frames,
        }) => cmd_verify(scenario, runs, frames),
        None => cmd_run(None, None, false),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_scenario(path: Option<PathBuf>) -> Result<Scenario, ScenarioError> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "Loading scenario");
            Scenario::load(path)
        }
        None => Ok(Scenario::skirmish()),
    }
}

fn runner_for(scenario: Scenario, frames: Option<u64>) -> HeadlessRunner {
    let runner = HeadlessRunner::new(scenario);
    match frames {
        Some(frames) => runner.with_max_frames(frames),
        None => runner,
    }
}

/// Run a single battle
fn cmd_run(
    scenario: Option<PathBuf>,
    frames: Option<u64>,
    json: bool,
) -> Result<ExitCode, ScenarioError> {
    let runner = runner_for(load_scenario(scenario)?, frames);
    let report = runner.run()?;

    if json {
        match report.to_json() {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Failed to serialize report: {e}");
                return Ok(ExitCode::FAILURE);
            }
        }
    } else {
        println!("{}", report.summary());
    }
    Ok(ExitCode::SUCCESS)
}

/// Validate a scenario file
fn cmd_validate(file: &Path) -> Result<ExitCode, ScenarioError> {
    let scenario = Scenario::load(file)?;
    HeadlessRunner::new(scenario.clone()).build()?;

    println!(
        "OK: '{}' ({} unit types, {} waves, {} scripted spawns, {} max frames)",
        scenario.name,
        scenario.units.len(),
        scenario.waves.iter().count(),
        scenario.player_script.len(),
        scenario.max_frames
    );
    Ok(ExitCode::SUCCESS)
}

/// Verify determinism across repeated runs
fn cmd_verify(
    scenario: Option<PathBuf>,
    runs: u32,
    frames: Option<u64>,
) -> Result<ExitCode, ScenarioError> {
    let runner = runner_for(load_scenario(scenario)?, frames);
    tracing::info!(
        "Verifying determinism: {} ({} runs)",
        runner.scenario().name,
        runs
    );

    let verify = runner.verify(runs)?;
    if verify.deterministic {
        eprintln!(
            "PASS: All {} runs produced identical results",
            verify.hashes.len()
        );
        eprintln!("  Final hash: {:016x}", verify.hashes[0]);
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        for (run, hash) in verify.hashes.iter().enumerate() {
            eprintln!("  Run {run}: {hash:016x}");
        }
        Ok(ExitCode::FAILURE)
    }
}
