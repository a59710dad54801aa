use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::cli::{print_report, run_step, run_timestamp, OutputFormat, RunConfig, StepArgs};
use crate::core::transfer::TransferRow;
use crate::lims::snapshot::SnapshotLims;
use crate::lims::{assert_output_fields, Lims};
use crate::report::RunLog;
use crate::utils::validation::validate_filename;
use crate::volume::pool::{log_header, pools_from_records, solve_pool, PoolSolution};
use crate::volume::PoolConfig;
use crate::worklist::format::{format_transfers, SortMode};
use crate::worklist::pool_deck;
use crate::worklist::writer::{build_rows, worklist_filenames, write_worklist, RowOptions};

/// LIMS file slot receiving the worklist
pub const WORKLIST_SLOT: &str = "Mosquito CSV File";

/// LIMS file slot receiving the worklist log
pub const LOG_SLOT: &str = "Mosquito Log";

#[derive(Args)]
pub struct PoolArgs {
    /// JSON snapshot of the LIMS pooling step
    #[arg(long)]
    pub snapshot: PathBuf,

    #[command(flatten)]
    pub step: StepArgs,

    /// Lowest validated pipetting volume (ul)
    #[arg(long)]
    pub min_pipette_vol: Option<f64>,

    /// Largest allowed pool volume (ul)
    #[arg(long)]
    pub well_max_vol: Option<f64>,
}

pub fn run(args: PoolArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let mut config = RunConfig::load(args.step.config.as_deref())?.pool;
    if let Some(vol) = args.min_pipette_vol {
        config.min_pipette_vol = vol;
    }
    if let Some(vol) = args.well_max_vol {
        config.well_max_vol = vol;
    }

    let out_dir = &args.step.out_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut lims = SnapshotLims::load(&args.snapshot, out_dir)?;
    let process = lims.process()?;
    let (wl_name, log_name) = worklist_filenames("pool", &process.id, &run_timestamp());
    validate_filename(&wl_name)?;
    let log_file = out_dir.join(log_name);

    let report = run_step(Some(&mut lims), &log_file, LOG_SLOT, |lims, log| {
        let lims = lims.context("No LIMS attached")?;
        pool_step(lims, &config, out_dir, &wl_name, log)
    });
    lims.flush()?;

    print_report(&report, format)
}

/// Solve every pool, write the worklist, then write back volumes and upload.
///
/// # Errors
///
/// Returns the first solver, deck or LIMS error. Nothing is written back on failure.
pub fn pool_step<L: Lims + ?Sized>(
    lims: &mut L,
    config: &PoolConfig,
    out_dir: &Path,
    wl_name: &str,
    log: &mut RunLog,
) -> anyhow::Result<Vec<PathBuf>> {
    let records = lims.transfers()?;
    assert_output_fields(&records)?;

    log_header(config, log);
    let pools = pools_from_records(&records, config)?;
    let solutions = pools
        .iter()
        .map(|(spec, members)| solve_pool(spec, members, config, log))
        .collect::<Result<Vec<PoolSolution>, _>>()?;

    let rows: Vec<TransferRow> = solutions
        .iter()
        .map(PoolSolution::transfer_rows)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();
    let deck = pool_deck(
        rows.iter().map(|r| r.src_plate.as_str()),
        rows.iter().map(|r| r.dst_plate.as_str()),
    )?;
    let placed = format_transfers(&rows, &deck, SortMode::Pooling)?;
    let worklist = build_rows(&placed, RowOptions::default());

    let mut comments = vec![
        format!("This worklist will enact pooling of {} samples", records.len()),
        "For detailed parameters see the worklist log".to_string(),
    ];
    comments.extend(solutions.iter().filter_map(PoolSolution::buffer_instruction));
    let path = write_worklist(out_dir, wl_name, &worklist, &deck, &comments)
        .with_context(|| format!("Failed to write {wl_name}"))?;
    info!("Wrote {} worklist rows to {}", worklist.len(), path.display());

    for write in solutions.iter().flat_map(|s| &s.writes) {
        lims.put_udf(&write.artifact_id, write.field, write.value.clone())?;
    }
    lims.upload(WORKLIST_SLOT, &path)?;

    Ok(vec![path])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lims::records::{ArtifactRecord, ProcessInfo, TransferRecord, Udfs};
    use crate::lims::snapshot::Snapshot;
    use crate::lims::Field;
    use tempfile::tempdir;

    fn record(name: &str, conc: f64, well: &str) -> TransferRecord {
        TransferRecord {
            input: ArtifactRecord {
                id: format!("in-{name}"),
                name: name.to_string(),
                sample_name: Some(name.to_string()),
                container: "Libraries".to_string(),
                well: well.to_string(),
                udf: Udfs::default()
                    .with(Field::Concentration, conc)
                    .with(Field::Volume, 30.0),
                sample_udf: Udfs::default(),
            },
            output: ArtifactRecord {
                id: "pool-1".to_string(),
                name: "Pool, A".to_string(),
                sample_name: None,
                container: "Pools".to_string(),
                well: "A:1".to_string(),
                udf: Udfs::default()
                    .with(Field::PoolConc, 5.0)
                    .with(Field::FinalVolume, 20.0),
                sample_udf: Udfs::default(),
            },
        }
    }

    fn lims(dir: &Path) -> SnapshotLims {
        let snapshot = Snapshot {
            process: ProcessInfo {
                id: "24-77".to_string(),
                name: "Pooling".to_string(),
                technician: "Jane Doe".to_string(),
            },
            lane_pools: Vec::new(),
            transfers: vec![record("S1", 5.0, "A:1"), record("S2", 50.0, "B:1")],
        };
        SnapshotLims::new(snapshot, dir)
    }

    #[test]
    fn test_pool_step_writes_worklist_and_udfs() {
        let dir = tempdir().unwrap();
        let mut lims = lims(dir.path());
        let mut log = RunLog::new();

        let outputs = pool_step(&mut lims, &PoolConfig::default(), dir.path(), "wl.csv", &mut log).unwrap();
        assert_eq!(outputs, vec![dir.path().join("wl.csv")]);

        let text = std::fs::read_to_string(&outputs[0]).unwrap();
        assert!(text.contains("COMMENT, This worklist will enact pooling of 2 samples"));
        assert!(text.contains("COMMENT, Add 9.0 ul buffer to pool Pool; A (well A:1)"));
        assert!(text.contains("COMMENT, Set up layout:    [Empty]     Libraries     Pools     [Empty]     [Empty]"));
        assert!(text.contains("COPY,2,1,1,1,3,1,1,5000,[VAR1]"));
        assert!(text.contains("COPY,2,1,1,2,3,1,1,1000,[VAR1]"));
        assert!(text.ends_with("COMMENT, Done"));

        let pool = &lims.updates()["pool-1"];
        assert_eq!(pool[Field::FinalVolume.udf_name()].as_f64(), Some(20.0));
        assert_eq!(pool[Field::PoolConc.udf_name()].as_f64(), Some(5.0));
        assert_eq!(lims.uploads().len(), 1);
        assert!(log.lines().iter().any(|l| l == "Pooling OK"));
    }

    #[test]
    fn test_pool_step_failure_writes_nothing_back() {
        let dir = tempdir().unwrap();
        let mut lims = lims(dir.path());
        let mut log = RunLog::new();
        let config = PoolConfig {
            well_max_vol: 10.0,
            ..PoolConfig::default()
        };

        assert!(pool_step(&mut lims, &config, dir.path(), "wl.csv", &mut log).is_err());
        assert!(lims.updates().is_empty());
        assert!(lims.uploads().is_empty());
    }
}
