// Displacement: move a live resource aside before a forced re-fetch.
//
// Order matters. The stale `<name>_old` is deleted before the rename, since
// renaming onto an existing directory fails, and leaving it would let backups
// pile up across refresh runs.
//
// The backup name is derived, not owned: if the user keeps unrelated data at
// `<name>_old`, a refresh deletes it. That is logged as a warning and not
// otherwise guarded.

use bootstrap_sdk::{IOUtil, TraceWriter};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::constants::BACKUP_SUFFIX;
use crate::errors::ProvisionError;

/// `<parent>/<name>_old` for `<parent>/<name>`.
pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(BACKUP_SUFFIX);
    target.with_file_name(name)
}

/// Move `target` to its backup name, deleting any earlier backup first.
///
/// Returns the backup path, or `None` when there was nothing to displace.
pub async fn displace(target: &Path, trace: &dyn TraceWriter) -> Result<Option<PathBuf>, ProvisionError> {
    if target.symlink_metadata().is_err() {
        return Ok(None);
    }

    let backup = backup_path(target);
    if backup.symlink_metadata().is_ok() {
        trace.warning(&format!(
            "Deleting stale backup '{}' left by an earlier refresh",
            backup.display()
        ));
        IOUtil::delete_directory_async(&backup)
            .await
            .map_err(|e| ProvisionError::Displace {
                path: backup.clone(),
                reason: format!("{e:#}"),
            })?;
    }

    trace.info(&format!(
        "Moving '{}' to '{}'",
        target.display(),
        backup.display()
    ));
    IOUtil::rename_directory(target, &backup).map_err(|e| ProvisionError::Displace {
        path: target.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    Ok(Some(backup))
}
