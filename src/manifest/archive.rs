//! ZIP packaging of manifest files and the optional archive copy.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use zip::write::FileOptions;
use zip::ZipWriter;

use crate::manifest::builder::ManifestFile;
use crate::manifest::ManifestError;

/// Root name shared by the archive and every manifest in it
#[must_use]
pub fn manifest_root_name(flowcell: &str, process_id: &str, timestamp: &str, technician: &str) -> String {
    format!(
        "AVITI_run_manifest_{flowcell}_{process_id}_{timestamp}_{}",
        technician.replace(' ', "")
    )
}

/// Pack manifests into an in-memory ZIP archive, in the given order
///
/// # Errors
///
/// Returns an error if the archive cannot be written.
pub fn zip_manifests(files: &[ManifestFile]) -> Result<Vec<u8>, ManifestError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options: FileOptions<'_, ()> =
        FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for file in files {
        writer.start_file(file.name.as_str(), options)?;
        writer.write_all(file.content.as_bytes())?;
        debug!("Added {} to archive", file.name);
    }

    Ok(writer.finish()?.into_inner())
}

/// Write `<root>.zip` into `dir`
///
/// # Errors
///
/// Returns an error if the archive cannot be built or written.
pub fn write_archive(dir: &Path, root_name: &str, files: &[ManifestFile]) -> Result<PathBuf, ManifestError> {
    let path = dir.join(format!("{root_name}.zip"));
    std::fs::write(&path, zip_manifests(files)?)?;
    Ok(path)
}

/// Copy an archive into `<archive_dir>/<year>/`. Failure is logged and not propagated.
pub fn copy_to_archive(archive: &Path, archive_dir: &Path, year: i32) -> Option<PathBuf> {
    let target_dir = archive_dir.join(year.to_string());
    let file_name = archive.file_name()?;
    let target = target_dir.join(file_name);

    let result = std::fs::create_dir_all(&target_dir).and_then(|()| std::fs::copy(archive, &target));
    match result {
        Ok(_) => Some(target),
        Err(e) => {
            warn!("Failed to copy {} to {}: {e}", archive.display(), target_dir.display());
            None
        }
    }
}
