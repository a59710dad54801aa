use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Datelike;
use clap::Args;

use crate::catalog::store::IndexCatalog;
use crate::cli::{print_report, run_step, run_timestamp, OutputFormat, RunConfig, StepArgs};
use crate::lims::snapshot::SnapshotLims;
use crate::lims::Lims;
use crate::manifest::archive::{copy_to_archive, manifest_root_name, write_archive};
use crate::manifest::builder::flowcell_id;
use crate::manifest::{ManifestBuilder, RunHeader};
use crate::matching::collision::CollisionConfig;
use crate::report::RunLog;
use crate::utils::validation::{filename_component, validate_filename};

#[derive(Args)]
pub struct ManifestArgs {
    /// JSON snapshot of the LIMS flowcell loading step
    #[arg(long)]
    pub snapshot: PathBuf,

    #[command(flatten)]
    pub step: StepArgs,

    /// LIMS file slot receiving the manifest archive
    #[arg(long = "file", default_value = "AVITI Run Manifest")]
    pub file_slot: String,

    /// LIMS file slot receiving the log
    #[arg(long = "log", default_value = "AVITI Run Manifest Log")]
    pub log_slot: String,

    /// Index tables JSON overlaid on the embedded catalog
    #[arg(long)]
    pub index_tables: Option<PathBuf>,

    /// Also compare reverse-complement orientations of every index
    #[arg(long)]
    pub check_flips: bool,

    /// Report index pairs at or below this distance
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Directory to copy the archive into, under a subfolder per year
    #[arg(long)]
    pub archive_dir: Option<PathBuf>,
}

/// Everything needed to build the manifests besides the LIMS
pub struct ManifestOptions<'a> {
    pub catalog: &'a IndexCatalog,
    pub collision: CollisionConfig,
    pub file_slot: &'a str,
    pub timestamp: &'a str,
    pub out_dir: &'a Path,
    pub archive_dir: Option<&'a Path>,
}

pub fn run(args: ManifestArgs, format: OutputFormat) -> anyhow::Result<i32> {
    let mut collision = RunConfig::load(args.step.config.as_deref())?.collision;
    if args.check_flips {
        collision.check_flips = true;
    }
    if let Some(threshold) = args.threshold {
        collision.threshold = threshold;
    }

    let mut catalog = IndexCatalog::load_embedded()?;
    if let Some(path) = &args.index_tables {
        catalog.merge(IndexCatalog::load_from_file(path)?);
    }

    let out_dir = &args.step.out_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    let mut lims = SnapshotLims::load(&args.snapshot, out_dir)?;
    let process = lims.process()?;
    let timestamp = run_timestamp();
    let log_name = format!("AVITI_run_manifest_{}_{timestamp}.log", process.id);
    validate_filename(&log_name)?;
    let log_file = out_dir.join(log_name);

    let options = ManifestOptions {
        catalog: &catalog,
        collision,
        file_slot: &args.file_slot,
        timestamp: &timestamp,
        out_dir,
        archive_dir: args.archive_dir.as_deref(),
    };
    let report = run_step(Some(&mut lims), &log_file, &args.log_slot, |lims, log| {
        let lims = lims.context("No LIMS attached")?;
        manifest_step(lims, &options, log)
    });
    lims.flush()?;

    print_report(&report, format)
}

/// Build, archive and upload the manifests of one flowcell
///
/// # Errors
///
/// Returns the first validation, index or collision error, or an IO/LIMS failure.
pub fn manifest_step<L: Lims + ?Sized>(
    lims: &mut L,
    options: &ManifestOptions<'_>,
    log: &mut RunLog,
) -> anyhow::Result<Vec<PathBuf>> {
    let process = lims.process()?;
    let pools = lims.lane_pools()?;

    let flowcell = flowcell_id(&pools)?;
    if flowcell.contains('-') {
        log.warning(format!(
            "Container name {flowcell} contains a dash, did you forget to set the name of the LIMS container to the flowcell ID?"
        ));
    }

    let root_name = manifest_root_name(
        &filename_component(&flowcell),
        &process.id,
        options.timestamp,
        &filename_component(&process.technician),
    );
    validate_filename(&root_name)?;
    let header = RunHeader {
        step_name: process.name.clone(),
        step_id: process.id.clone(),
        root_name: root_name.clone(),
    };

    let builder = ManifestBuilder::new(options.catalog, options.collision.clone())?;
    let set = builder.build(&pools, &header)?;

    for warning in &set.warnings {
        log.warning(&warning.message);
    }
    for file in &set.files {
        log.info(format!(
            "Manifest {} ({}): {} samples, {} controls",
            file.name, file.key, file.samples, file.controls
        ));
    }

    let archive = write_archive(options.out_dir, &root_name, &set.files)?;
    log.info("Uploading run manifest to LIMS...");
    lims.upload(options.file_slot, &archive)?;

    if let Some(dir) = options.archive_dir {
        match copy_to_archive(&archive, dir, chrono::Local::now().year()) {
            Some(copy) => log.info(format!("Run manifest copied to {}", copy.display())),
            None => log.warning(format!("Failed to copy run manifest to {}", dir.display())),
        }
    }

    Ok(vec![archive])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::index::PhixSet;
    use crate::lims::records::{LanePool, PoolSample, ProcessInfo, Udfs};
    use crate::lims::snapshot::Snapshot;
    use crate::lims::Field;
    use tempfile::tempdir;

    fn catalog() -> IndexCatalog {
        let mut catalog = IndexCatalog::new();
        catalog
            .add_phix_set(PhixSet {
                name: "PhiX Control Library, Adept".to_string(),
                nickname: "PhiX_Adept".to_string(),
                indices: vec![
                    ("ATGTCGCTAG".to_string(), "CTAGCTCGTA".to_string()),
                    ("CACAGATCGT".to_string(), "ACGAGAGTCT".to_string()),
                    ("GCACATAGTC".to_string(), "GACTACTAGC".to_string()),
                    ("TGTGTCGACA".to_string(), "TGTCTGACAG".to_string()),
                ],
            })
            .unwrap();
        catalog
    }

    fn lims(dir: &Path, container: &str, labels: &[&str]) -> SnapshotLims {
        let samples = labels
            .iter()
            .enumerate()
            .map(|(i, label)| PoolSample {
                name: format!("P1_{}", 101 + i),
                label: (*label).to_string(),
                project: Some("J.Doe_24.01".to_string()),
                project_udf: Udfs::default().with(Field::SequencingSetup, "151-10-10-151"),
            })
            .collect();
        let snapshot = Snapshot {
            process: ProcessInfo {
                id: "24-1234".to_string(),
                name: "Load to Flowcell (AVITI)".to_string(),
                technician: "Jane Doe".to_string(),
            },
            lane_pools: vec![LanePool {
                id: "2-1".to_string(),
                name: "Pool 1".to_string(),
                container: container.to_string(),
                location: "1:1".to_string(),
                udf: Udfs::default()
                    .with(Field::PhixPercent, 1.0)
                    .with(Field::PhixSet, "PhiX Control Library, Adept"),
                samples,
            }],
            transfers: Vec::new(),
        };
        SnapshotLims::new(snapshot, dir)
    }

    fn options<'a>(catalog: &'a IndexCatalog, dir: &'a Path) -> ManifestOptions<'a> {
        ManifestOptions {
            catalog,
            collision: CollisionConfig::default(),
            file_slot: "AVITI Run Manifest",
            timestamp: "240101_120000",
            out_dir: dir,
            archive_dir: None,
        }
    }

    #[test]
    fn test_manifest_step_uploads_archive() {
        let dir = tempdir().unwrap();
        let catalog = catalog();
        let mut lims = lims(dir.path(), "FC12345", &["ACGTACGTAC-TTTTGGGGCC", "TTGGCCAAGG-CCCCAAAATT"]);
        let mut log = RunLog::new();

        let outputs = manifest_step(&mut lims, &options(&catalog, dir.path()), &mut log).unwrap();
        assert_eq!(
            outputs,
            vec![dir.path().join("AVITI_run_manifest_FC12345_24-1234_240101_120000_JaneDoe.zip")]
        );
        assert!(outputs[0].exists());
        assert_eq!(lims.uploads().len(), 1);
        assert!(log.lines().iter().any(|l| l.contains("2 samples, 4 controls")));
        assert!(!log.has_warnings());
    }

    #[test]
    fn test_dashed_flowcell_warns() {
        let dir = tempdir().unwrap();
        let catalog = catalog();
        let mut lims = lims(dir.path(), "24-5678", &["ACGTACGTAC-TTTTGGGGCC"]);
        let mut log = RunLog::new();

        manifest_step(&mut lims, &options(&catalog, dir.path()), &mut log).unwrap();
        assert!(log.has_warnings());
        assert!(log.lines()[0].contains("contains a dash"));
    }

    #[test]
    fn test_duplicate_labels_abort() {
        let dir = tempdir().unwrap();
        let catalog = catalog();
        let mut lims = lims(dir.path(), "FC1", &["ACGTACGTAC-TTTTGGGGCC", "ACGTACGTAC-TTTTGGGGCC"]);
        let mut log = RunLog::new();

        let err = manifest_step(&mut lims, &options(&catalog, dir.path()), &mut log).unwrap_err();
        assert!(err.to_string().contains("non-unique reagent labels"));
        assert!(lims.uploads().is_empty());
    }
}
