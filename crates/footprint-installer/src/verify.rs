use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use footprint_core::{Classifications, FileRecord, InstallationBaseline, VerificationResult};
use footprint_integrity::digest_file;
use tracing::debug;

use crate::fs_utils::parent_resolves_under_root;

pub fn verify_baseline(baseline: &InstallationBaseline) -> Classifications {
    verify_baseline_with(baseline, |_, _, _| {})
}

/// Classifies every tracked file, calling `on_file(done, total, path)` after each one.
pub fn verify_baseline_with<F>(baseline: &InstallationBaseline, mut on_file: F) -> Classifications
where
    F: FnMut(usize, usize, &Path),
{
    let total = baseline.files.len();
    let mut classifications = Classifications::new();
    for (index, record) in baseline.files.iter().enumerate() {
        let result = verify_record(&baseline.target_root, record);
        debug!(path = %record.path.display(), state = result.as_str(), "verified tracked file");
        classifications.insert(record.path.clone(), result);
        on_file(index + 1, total, &record.path);
    }
    classifications
}

/// Compares one tracked file against its recorded fingerprint.
///
/// Cheap checks run first: a missing file is `Deleted`, a size change is
/// `Modified`, and an unchanged size with an unchanged mtime is `Intact`.
/// A moved mtime costs one streaming read that yields both digests; the
/// secondary digest is compared first but the SHA-256 is always computed.
///
/// A path whose parent directory now resolves outside `target_root` is
/// `Corrupted`, since acting on it would touch files the baseline never owned.
pub fn verify_record(target_root: &Path, record: &FileRecord) -> VerificationResult {
    let link_metadata = match fs::symlink_metadata(&record.path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return VerificationResult::Deleted,
        Err(err) => return corrupted(format!("cannot stat tracked file: {err}")),
    };

    if !parent_resolves_under_root(target_root, &record.path) {
        return corrupted("tracked path now resolves outside target root".to_string());
    }

    if let Some(reason) = record.metadata_inconsistency() {
        return corrupted(reason);
    }

    let is_symlink_now = link_metadata.file_type().is_symlink();
    if record.is_symlink != is_symlink_now {
        return corrupted(if record.is_symlink {
            "tracked symlink was replaced by a non-symlink".to_string()
        } else {
            "tracked file was replaced by a symlink".to_string()
        });
    }

    let metadata = if is_symlink_now {
        match fs::metadata(&record.path) {
            Ok(metadata) => metadata,
            Err(err) => return corrupted(format!("symlink target is unreachable: {err}")),
        }
    } else {
        link_metadata
    };
    if !metadata.is_file() {
        return corrupted("tracked path is no longer a regular file".to_string());
    }

    if metadata.len() != record.size {
        return match digest_file(&record.path) {
            Ok(digests) => VerificationResult::Modified {
                current_hash: digests.sha256,
            },
            Err(err) => corrupted(format!("tracked file is unreadable: {err:#}")),
        };
    }

    let retargeted = is_symlink_now
        && fs::read_link(&record.path).ok().as_deref() != record.symlink_target.as_deref();
    let mtime_unchanged = metadata
        .modified()
        .map(|modified| DateTime::<Utc>::from(modified) == record.mtime)
        .unwrap_or(false);
    if mtime_unchanged && !retargeted {
        return VerificationResult::Intact;
    }

    let digests = match digest_file(&record.path) {
        Ok(digests) => digests,
        Err(err) => return corrupted(format!("tracked file is unreadable: {err:#}")),
    };
    if retargeted
        || digests.secondary != record.secondary_hash
        || digests.sha256 != record.sha256
    {
        return VerificationResult::Modified {
            current_hash: digests.sha256,
        };
    }
    VerificationResult::Intact
}

fn corrupted(reason: String) -> VerificationResult {
    VerificationResult::Corrupted { reason }
}
