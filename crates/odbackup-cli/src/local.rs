//! Locating the local backup archive.

use std::path::{Path, PathBuf};

use odbackup_core::{BackupError, BackupResult};

/// Reject anything that is not a single, plain path component.
pub fn validate_segment(label: &str, value: &str) -> BackupResult<()> {
    if value.is_empty() || value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(BackupError::InvalidInput(format!(
            "{} must be a single path segment, got '{}'",
            label, value
        )));
    }
    Ok(())
}

/// Path of `{root}/{day_folder}/{filename}`, which must be an existing file.
pub fn locate_backup(root: &Path, day_folder: &str, filename: &str) -> BackupResult<PathBuf> {
    validate_segment("Day folder", day_folder)?;
    validate_segment("Backup filename", filename)?;

    let path = root.join(day_folder).join(filename);
    if !path.is_file() {
        return Err(BackupError::LocalFile(format!(
            "Backup file not found: {}",
            path.display()
        )));
    }
    Ok(path)
}
