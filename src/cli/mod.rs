//! Command-line interface for lims-liquid.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **manifest**: Build AVITI run manifests for a sequencing step
//! - **pool**: Build a Zika pooling worklist
//! - **norm**: Build a Zika normalization worklist
//! - **check-indices**: Check a CSV of index pairs for near-collisions
//!
//! ## Usage
//!
//! ```text
//! # Run manifests from a LIMS snapshot of the loading step
//! lims-liquid manifest --snapshot step.json --out-dir out/
//!
//! # Pooling worklist with custom constraints
//! lims-liquid pool --snapshot step.json --config run.json
//!
//! # Normalization from a local sample sheet, no LIMS involved
//! lims-liquid norm --local-data samples.csv --out-dir out/
//!
//! # Index sanity check, JSON output for scripting
//! lims-liquid check-indices indices.csv --check-flips --format json
//! ```
//!
//! Steps driven by a LIMS snapshot always write a log, also when they fail, and
//! hand it to the LIMS log slot. The exit code is 0 on success, 2 when warnings
//! were logged and 1 on failure.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lims::Lims;
use crate::matching::collision::CollisionConfig;
use crate::report::{RunLog, EXIT_FAILURE};
use crate::volume::{NormConfig, PoolConfig};
use crate::worklist::buffer::BufferConfig;

pub mod check;
pub mod manifest;
pub mod norm;
pub mod pool;

#[derive(Parser)]
#[command(name = "lims-liquid")]
#[command(author = "Genomics Core Facility")]
#[command(version)]
#[command(about = "Generate AVITI run manifests and Mosquito/Zika worklists from LIMS process data")]
#[command(
    long_about = "lims-liquid turns the data of one LIMS step into instrument inputs:\n- AVITI run manifests, with index expansion, PhiX controls and collision checks\n- Zika pooling and normalization worklists, with volumes solved under pipetting constraints"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate AVITI run manifests for a sequencing step
    Manifest(manifest::ManifestArgs),

    /// Generate a Zika worklist pooling samples
    Pool(pool::PoolArgs),

    /// Generate a Zika worklist normalizing samples
    Norm(norm::NormArgs),

    /// Check a CSV of index pairs for near-collisions
    CheckIndices(check::CheckArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Options shared by the steps that talk to the LIMS
#[derive(clap::Args, Debug, Clone)]
pub struct StepArgs {
    /// Directory receiving generated files, write-backs and uploads
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// JSON file with solver, buffer and collision settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Settings for a run, every section optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub pool: PoolConfig,
    pub norm: NormConfig,
    pub buffer: BufferConfig,
    pub collision: CollisionConfig,
}

impl RunConfig {
    /// Load from a JSON file, or defaults without one
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        debug!("Loaded run config from {}", path.display());
        Ok(config)
    }
}

/// What a step produced
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub exit_code: i32,
    pub log_file: PathBuf,
    /// Files generated on success
    pub outputs: Vec<PathBuf>,
    pub warnings: usize,
    /// Terminal error, if the step failed
    pub error: Option<String>,
}

/// Run the body of a step and always leave a log behind.
///
/// A failing body is logged as `ERROR: ...`. The log is written to `log_file` and,
/// when a LIMS is attached, uploaded to `log_slot`.
pub fn run_step<L, F>(mut lims: Option<&mut L>, log_file: &Path, log_slot: &str, body: F) -> StepReport
where
    L: Lims + ?Sized,
    F: FnOnce(Option<&mut L>, &mut RunLog) -> anyhow::Result<Vec<PathBuf>>,
{
    let mut log = RunLog::new();
    let result = body(lims.as_deref_mut(), &mut log);

    let (outputs, error) = match result {
        Ok(outputs) => (outputs, None),
        Err(e) => {
            log.error(format!("{e:#}"));
            (Vec::new(), Some(format!("{e:#}")))
        }
    };

    let mut delivered = log.write(log_file).map_err(anyhow::Error::from);
    if delivered.is_ok() {
        if let Some(lims) = lims {
            delivered = lims.upload(log_slot, log_file).map_err(anyhow::Error::from);
        }
    }

    let exit_code = match (&error, delivered) {
        (None, Ok(())) => log.exit_code(),
        (None, Err(e)) => {
            eprintln!("Failed to deliver log {}: {e:#}", log_file.display());
            EXIT_FAILURE
        }
        (Some(_), _) => EXIT_FAILURE,
    };

    StepReport {
        exit_code,
        log_file: log_file.to_path_buf(),
        outputs,
        warnings: log.warning_count(),
        error,
    }
}

/// `yymmdd_HHMMSS` stamp embedded in output filenames
#[must_use]
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%y%m%d_%H%M%S").to_string()
}

/// Print a step report and return its exit code
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn print_report(report: &StepReport, format: OutputFormat) -> anyhow::Result<i32> {
    match format {
        OutputFormat::Text => {
            for output in &report.outputs {
                println!("{}", output.display());
            }
            println!("Log: {}", report.log_file.display());
            if let Some(error) = &report.error {
                eprintln!("Error: {error}");
            } else if report.warnings > 0 {
                eprintln!("Files generated with warnings, please check the log file");
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
        OutputFormat::Tsv => {
            println!("kind\tpath");
            for output in &report.outputs {
                println!("output\t{}", output.display());
            }
            println!("log\t{}", report.log_file.display());
        }
    }
    Ok(report.exit_code)
}
