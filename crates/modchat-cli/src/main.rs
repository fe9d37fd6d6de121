//! modchat CLI - runs one chat moderation testcase.
//!
//! # Usage
//!
//! ```text
//! modchat <TESTCASE> [-C DIR] [--config FILE] [--threshold N] [--json] [-d] [-v]
//! ```
//!
//! Reads `<DIR>/testcase_<TESTCASE>/input.txt`, runs the simulation and
//! prints the transcript on stdout. Logs go to stderr.
//!
//! # Configuration
//!
//! Tuning is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`MODCHAT_*`)
//! 3. Explicit config file (`--config`)
//! 4. Project config (`.modchat/config.toml` under the root directory)
//! 5. Default values (lowest priority)

use anyhow::{Context, Result};
use clap::Parser;
use modchat_runtime::config::{ConfigLoader, SimConfig, TestcaseConfig};
use modchat_runtime::{transcript_channel, Simulation, SimulationOutcome, TranscriptEvent};
use modchat_types::ErrorCode;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// modchat - multi-group chat simulation with centralized moderation
#[derive(Parser, Debug)]
#[command(name = "modchat")]
#[command(version, about, long_about = None)]
struct Args {
    /// Testcase identifier (`testcase_<TESTCASE>/` under the root)
    testcase: String,

    /// Directory containing the testcase directories (defaults to current directory)
    #[arg(short = 'C', long)]
    root: Option<PathBuf>,

    /// Extra tuning file, applied over `.modchat/config.toml`
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the violation threshold from input.txt
    #[arg(long, value_name = "N")]
    threshold: Option<u32>,

    /// Print the outcome as JSON instead of transcript lines
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn root(&self) -> PathBuf {
        self.root.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to get current directory, using '.'");
                PathBuf::from(".")
            })
        })
    }

    fn load_config(&self, root: &Path) -> Result<SimConfig> {
        let mut loader = ConfigLoader::new().with_project_root(root);
        if let Some(ref path) = self.config {
            loader = loader.with_config_file(path);
        }
        loader
            .load()
            .map_err(|e| anyhow::anyhow!("Config error [{}]: {e}", e.code()))
    }
}

fn init_tracing(args: &Args) {
    // --debug > --verbose > RUST_LOG > "warn"
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .init();
}

fn print_summary(outcome: &SimulationOutcome) {
    let report = &outcome.report;
    println!(
        "Summary: {} group(s), {} chat event(s), {} dropped record(s), {} user(s) removed",
        report.terminations.len(),
        outcome.validation.chats.len(),
        report
            .sessions
            .iter()
            .map(|s| s.dropped_records)
            .sum::<usize>(),
        report.total_removed(),
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args);

    let root = args.root();
    let config = args.load_config(&root)?;
    info!(root = %root.display(), testcase = %args.testcase, "Loading testcase");

    let testcase = TestcaseConfig::load(&root, &args.testcase).map_err(|e| {
        anyhow::anyhow!("Testcase '{}' [{}]: {e}", args.testcase, e.code())
    })?;

    let (tx, mut rx) = transcript_channel();
    let json = args.json;
    let printer = tokio::spawn(async move {
        let mut events: Vec<TranscriptEvent> = Vec::new();
        while let Some(event) = rx.recv().await {
            if json {
                events.push(event);
            } else {
                println!("{event}");
            }
        }
        events
    });

    let mut simulation = Simulation::new(testcase, config).with_transcript(tx);
    if let Some(threshold) = args.threshold {
        simulation = simulation.with_threshold(threshold);
    }

    let result = simulation.run().await;
    let events = printer.await.context("transcript printer failed")?;
    let outcome = result.map_err(|e| anyhow::anyhow!("Simulation failed [{}]: {e}", e.code()))?;

    if args.json {
        let doc = serde_json::json!({
            "transcript": events,
            "report": outcome.report,
            "moderation": outcome.moderation,
            "validation": outcome.validation,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        print_summary(&outcome);
    }

    Ok(())
}
