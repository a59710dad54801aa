use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::cli::pool::{LOG_SLOT, WORKLIST_SLOT};
use crate::cli::{print_report, run_step, run_timestamp, OutputFormat, RunConfig, StepArgs};
use crate::core::transfer::TransferRow;
use crate::lims::records::TransferRecord;
use crate::lims::snapshot::SnapshotLims;
use crate::lims::{assert_output_fields, Lims};
use crate::parsing::local::read_norm_sheet;
use crate::report::RunLog;
use crate::utils::validation::validate_filename;
use crate::volume::norm::{log_header, solve_norm, NormSample, NormSolution};
use crate::volume::NormConfig;
use crate::worklist::buffer::{resolve_buffer_transfers, BufferConfig, BufferStrategy};
use crate::worklist::format::{format_transfers, SortMode};
use crate::worklist::norm_deck;
use crate::worklist::writer::{build_rows, worklist_filenames, write_worklist, RowOptions};

/// Process id used in filenames of offline runs
pub const LOCAL_PROCESS_ID: &str = "local";

#[derive(Args)]
pub struct NormArgs {
    /// JSON snapshot of the LIMS normalization step
    #[arg(long, required_unless_present = "local_data", conflicts_with = "local_data")]
    pub snapshot: Option<PathBuf>,

    /// CSV sample sheet to normalize instead of LIMS data; nothing is written back or uploaded
    #[arg(long)]
    pub local_data: Option<PathBuf>,

    #[command(flatten)]
    pub step: StepArgs,

    /// Keep the target volume of over-concentrated samples
    #[arg(long)]
    pub no_volume_expansion: bool,

    /// Never draw buffer and sample into the same tip
    #[arg(long)]
    pub no_multi_aspirate: bool,

    /// Keep tips across consecutive buffer transfers to the same well
    #[arg(long)]
    pub keep_buffer_tips: bool,

    /// Fill buffer plate wells column-wise instead of using column 1
    #[arg(long)]
    pub adaptive_buffer: bool,

    /// Fail when a sample delivers less than this fraction of its target amount
    #[arg(long)]
    pub min_delivered_fraction: Option<f64>,
}

impl NormArgs {
    fn apply(&self, config: &mut NormConfig) {
        if self.no_volume_expansion {
            config.volume_expansion = false;
        }
        if self.no_multi_aspirate {
            config.multi_aspirate = false;
        }
        if self.keep_buffer_tips {
            config.keep_buffer_tips = true;
        }
        if self.adaptive_buffer {
            config.buffer_strategy = BufferStrategy::Adaptive;
        }
        if self.min_delivered_fraction.is_some() {
            config.min_delivered_fraction = self.min_delivered_fraction;
        }
    }
}

pub fn run(args: NormArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let run_config = RunConfig::load(args.step.config.as_deref())?;
    let mut config = run_config.norm;
    args.apply(&mut config);
    let buffer = run_config.buffer;

    let out_dir = &args.step.out_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let timestamp = run_timestamp();

    if let Some(sheet) = &args.local_data {
        let (wl_name, log_name) = worklist_filenames("norm", LOCAL_PROCESS_ID, &timestamp);
        let log_file = out_dir.join(log_name);
        let report = run_step(None::<&mut SnapshotLims>, &log_file, LOG_SLOT, |_, log| {
            let records = read_norm_sheet(sheet)?;
            norm_step(&records, None::<&mut SnapshotLims>, &config, &buffer, out_dir, &wl_name, log)
        });
        return print_report(&report, format);
    }

    let snapshot = args
        .snapshot
        .as_deref()
        .context("Either --snapshot or --local-data is required")?;
    let mut lims = SnapshotLims::load(snapshot, out_dir)?;
    let process = lims.process()?;
    let (wl_name, log_name) = worklist_filenames("norm", &process.id, &timestamp);
    validate_filename(&wl_name)?;
    let log_file = out_dir.join(log_name);

    let report = run_step(Some(&mut lims), &log_file, LOG_SLOT, |lims, log| {
        let lims = lims.context("No LIMS attached")?;
        let records = lims.transfers()?;
        assert_output_fields(&records)?;
        norm_step(&records, Some(lims), &config, &buffer, out_dir, &wl_name, log)
    });
    lims.flush()?;

    print_report(&report, format)
}

/// Solve every sample and write the worklist; with a LIMS attached, write back
/// amounts and volumes and upload the worklist.
///
/// # Errors
///
/// Returns the first solver, deck, buffer or LIMS error. Nothing is written back on failure.
pub fn norm_step<L: Lims + ?Sized>(
    records: &[TransferRecord],
    lims: Option<&mut L>,
    config: &NormConfig,
    buffer: &BufferConfig,
    out_dir: &Path,
    wl_name: &str,
    log: &mut RunLog,
) -> anyhow::Result<Vec<PathBuf>> {
    log_header(config, log);
    let samples = records
        .iter()
        .map(|r| NormSample::from_record(r, config))
        .collect::<Result<Vec<_>, _>>()?;
    let solutions = solve_norm(&samples, config, log)?;

    let rows: Vec<TransferRow> = solutions
        .iter()
        .map(NormSolution::transfer_rows)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();
    let deck = norm_deck(
        samples.iter().map(|s| s.src_plate.as_str()),
        samples.iter().map(|s| s.dst_plate.as_str()),
    )?;
    let resolved = resolve_buffer_transfers(rows, config.buffer_strategy, buffer)?;
    for warning in &resolved.warnings {
        log.warning(warning);
    }
    let placed = format_transfers(&resolved.rows, &deck, SortMode::Normalization)?;
    let worklist = build_rows(
        &placed,
        RowOptions {
            multi_aspirate: config.multi_aspirate,
            keep_buffer_tips: config.keep_buffer_tips,
        },
    );

    let mut comments = vec![
        format!("This worklist will enact normalization of {} samples", samples.len()),
        "For detailed parameters see the worklist log".to_string(),
    ];
    comments.extend(resolved.comments);
    let path = write_worklist(out_dir, wl_name, &worklist, &deck, &comments)
        .with_context(|| format!("Failed to write {wl_name}"))?;
    info!("Wrote {} worklist rows to {}", worklist.len(), path.display());

    if let Some(lims) = lims {
        for write in solutions.iter().flat_map(NormSolution::writes) {
            lims.put_udf(&write.artifact_id, write.field, write.value)?;
        }
        lims.upload(WORKLIST_SLOT, &path)?;
    }

    Ok(vec![path])
}
