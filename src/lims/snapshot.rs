//! A [`Lims`] backed by a JSON snapshot of one process.
//!
//! Write-backs are collected in memory and flushed to `udf_updates.json` in the
//! output directory; uploads are copied to `uploads/<slot>/`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::records::{LanePool, ProcessInfo, TransferRecord, UdfValue};
use super::{Field, Lims, LimsError};

/// File name of the flushed write-backs
pub const UDF_UPDATES_FILE: &str = "udf_updates.json";

/// Directory receiving uploaded files
pub const UPLOADS_DIR: &str = "uploads";

/// On-disk layout of a process snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub process: ProcessInfo,
    #[serde(default)]
    pub lane_pools: Vec<LanePool>,
    #[serde(default)]
    pub transfers: Vec<TransferRecord>,
}

/// Pending UDF writes keyed by artifact id, then field name
pub type UdfUpdates = BTreeMap<String, BTreeMap<String, UdfValue>>;

#[derive(Debug)]
pub struct SnapshotLims {
    snapshot: Snapshot,
    out_dir: PathBuf,
    artifact_ids: BTreeSet<String>,
    updates: UdfUpdates,
    uploads: Vec<PathBuf>,
}

impl SnapshotLims {
    #[must_use]
    pub fn new(snapshot: Snapshot, out_dir: impl Into<PathBuf>) -> Self {
        let mut artifact_ids = BTreeSet::new();
        for pool in &snapshot.lane_pools {
            artifact_ids.insert(pool.id.clone());
        }
        for record in &snapshot.transfers {
            artifact_ids.insert(record.input.id.clone());
            artifact_ids.insert(record.output.id.clone());
        }

        Self {
            snapshot,
            out_dir: out_dir.into(),
            artifact_ids,
            updates: UdfUpdates::new(),
            uploads: Vec::new(),
        }
    }

    /// Load a snapshot file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid snapshot.
    pub fn load(path: &Path, out_dir: impl Into<PathBuf>) -> Result<Self, LimsError> {
        let json = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&json)?;
        debug!(
            "Loaded snapshot of process {} ({} lane pools, {} transfers)",
            snapshot.process.id,
            snapshot.lane_pools.len(),
            snapshot.transfers.len()
        );
        Ok(Self::new(snapshot, out_dir))
    }

    #[must_use]
    pub fn updates(&self) -> &UdfUpdates {
        &self.updates
    }

    /// Paths of the copies made by [`Lims::upload`]
    #[must_use]
    pub fn uploads(&self) -> &[PathBuf] {
        &self.uploads
    }

    /// Write pending UDF updates to `udf_updates.json`
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn flush(&self) -> Result<PathBuf, LimsError> {
        std::fs::create_dir_all(&self.out_dir)?;
        let path = self.out_dir.join(UDF_UPDATES_FILE);
        std::fs::write(&path, serde_json::to_string_pretty(&self.updates)?)?;
        info!(
            "Wrote UDF updates for {} artifacts to {}",
            self.updates.len(),
            path.display()
        );
        Ok(path)
    }
}

impl Lims for SnapshotLims {
    fn process(&self) -> Result<ProcessInfo, LimsError> {
        Ok(self.snapshot.process.clone())
    }

    fn lane_pools(&self) -> Result<Vec<LanePool>, LimsError> {
        Ok(self.snapshot.lane_pools.clone())
    }

    fn transfers(&self) -> Result<Vec<TransferRecord>, LimsError> {
        Ok(self.snapshot.transfers.clone())
    }

    fn put_udf(
        &mut self,
        artifact_id: &str,
        field: Field,
        value: UdfValue,
    ) -> Result<(), LimsError> {
        if !self.artifact_ids.contains(artifact_id) {
            return Err(LimsError::UnknownArtifact(artifact_id.to_string()));
        }
        self.updates
            .entry(artifact_id.to_string())
            .or_default()
            .insert(field.udf_name().to_string(), value);
        Ok(())
    }

    fn upload(&mut self, slot: &str, path: &Path) -> Result<(), LimsError> {
        let slot_dir = self.out_dir.join(UPLOADS_DIR).join(slot);
        std::fs::create_dir_all(&slot_dir)?;
        let file_name = path.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a file: {}", path.display()),
            )
        })?;
        let target = slot_dir.join(file_name);
        std::fs::copy(path, &target)?;
        debug!("Uploaded {} to slot '{slot}'", path.display());
        self.uploads.push(target);
        Ok(())
    }
}
