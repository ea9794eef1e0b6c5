use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use footprint_core::FailedEntry;
use tracing::{info, warn};

use crate::fs_utils::DirectoryEnsurer;

const MAX_BACKUP_DIR_ATTEMPTS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOutcome {
    pub backup_path: PathBuf,
    pub archived: Vec<PathBuf>,
    pub failed: Vec<FailedEntry>,
}

/// Copies `files` into a fresh timestamped directory under `destination_root`,
/// keeping each file's path relative to `target_root`.
///
/// Failing to create the backup directory is an error. A file that cannot be
/// copied is reported in `failed` and the remaining files are still archived.
pub fn archive_files(
    files: &[PathBuf],
    target_root: &Path,
    destination_root: &Path,
) -> Result<BackupOutcome> {
    let backup_path = create_backup_dir(destination_root)?;
    let mut ensurer = DirectoryEnsurer::new();
    let mut outcome = BackupOutcome {
        backup_path: backup_path.clone(),
        archived: Vec::new(),
        failed: Vec::new(),
    };

    for file in files {
        let relative = file
            .strip_prefix(target_root)
            .ok()
            .filter(|relative| !relative.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .or_else(|| file.file_name().map(PathBuf::from));
        let Some(relative) = relative else {
            outcome.failed.push(FailedEntry {
                path: file.clone(),
                reason: "backup failed: path has no file name".to_string(),
            });
            continue;
        };
        let destination = backup_path.join(relative);

        match copy_one(file, &destination, &mut ensurer) {
            Ok(()) => outcome.archived.push(file.clone()),
            Err(err) => {
                warn!(path = %file.display(), "backup copy failed: {err}");
                outcome.failed.push(FailedEntry {
                    path: file.clone(),
                    reason: format!("backup failed: {err}"),
                });
            }
        }
    }

    info!(
        backup = %backup_path.display(),
        archived = outcome.archived.len(),
        failed = outcome.failed.len(),
        "archived preserved files"
    );
    Ok(outcome)
}

fn copy_one(source: &Path, destination: &Path, ensurer: &mut DirectoryEnsurer) -> io::Result<()> {
    if let Some(parent) = destination.parent() {
        ensurer.ensure(parent)?;
    }
    fs::copy(source, destination)?;
    Ok(())
}

fn create_backup_dir(destination_root: &Path) -> Result<PathBuf> {
    fs::create_dir_all(destination_root)
        .with_context(|| format!("failed to create {}", destination_root.display()))?;

    let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
    for attempt in 0..MAX_BACKUP_DIR_ATTEMPTS {
        let name = if attempt == 0 {
            format!("backup-{stamp}")
        } else {
            format!("backup-{stamp}-{attempt}")
        };
        let candidate = destination_root.join(name);
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to create backup directory {}", candidate.display())
                });
            }
        }
    }

    Err(anyhow!(
        "failed to allocate a backup directory under {}",
        destination_root.display()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_keeps_relative_layout_and_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("install");
        fs::create_dir_all(root.join("conf")).expect("must create conf");
        fs::write(root.join("conf").join("app.toml"), b"edited").expect("must write");
        let backups = dir.path().join("backups");

        let outcome = archive_files(
            &[root.join("conf").join("app.toml"), root.join("gone.txt")],
            &root,
            &backups,
        )
        .expect("archive must run");

        assert!(outcome.backup_path.starts_with(&backups));
        let name = outcome
            .backup_path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("backup dir name");
        assert!(name.starts_with("backup-"));
        assert_eq!(
            fs::read(outcome.backup_path.join("conf").join("app.toml")).expect("backup copy"),
            b"edited"
        );
        assert_eq!(outcome.archived, vec![root.join("conf").join("app.toml")]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].path, root.join("gone.txt"));
    }

    #[test]
    fn consecutive_backups_never_share_a_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = create_backup_dir(dir.path()).expect("first");
        let second = create_backup_dir(dir.path()).expect("second");
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());
    }
}
