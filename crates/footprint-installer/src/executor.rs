use std::fs;
use std::io;
use std::path::Path;

use footprint_core::{
    InstallScope, ProgressTracker, UninstallPolicy, UninstallReport, VerificationSummary,
};
use tracing::{debug, info, warn};

use crate::backup::archive_files;
use crate::fs_utils::{parent_resolves_under_root, prune_empty_ancestors};
use crate::{BaselineStore, UninstallPlan};

pub struct ExecutionContext<'a> {
    pub scope: InstallScope,
    pub policy: &'a UninstallPolicy,
    pub target_root: &'a Path,
    pub backup_root: &'a Path,
    pub total_files: usize,
    pub verification: VerificationSummary,
}

enum Removal {
    Removed,
    AlreadyGone,
}

/// Applies `plan`: backup first, then removals, then empty-directory pruning,
/// then deletion of the scope's baseline.
///
/// Per-file failures are collected in the report and never stop the run.
pub fn execute_plan(
    store: &BaselineStore,
    plan: &UninstallPlan,
    context: &ExecutionContext<'_>,
    tracker: &ProgressTracker<'_>,
) -> UninstallReport {
    let mut report = UninstallReport::new(
        context.scope,
        context.policy.as_str(),
        context.total_files,
    );
    report.verification = context.verification;
    report.preserved = plan.to_preserve.clone();

    if !plan.to_backup.is_empty() {
        tracker.report(50, &format!("backing up {} files", plan.to_backup.len()));
        match archive_files(&plan.to_backup, context.target_root, context.backup_root) {
            Ok(outcome) => {
                report.backup_path = Some(outcome.backup_path);
                report.backed_up = outcome.archived;
                report.failed.extend(outcome.failed);
            }
            Err(err) => {
                warn!("backup could not start: {err:#}");
                for path in &plan.to_backup {
                    report.record_failure(path.clone(), format!("backup failed: {err:#}"));
                }
            }
        }
    }

    let total = plan.to_remove.len();
    tracker.report(60, &format!("removing {total} files"));
    for (index, path) in plan.to_remove.iter().enumerate() {
        match remove_planned(context.target_root, path) {
            Ok(Removal::Removed) => {
                debug!(path = %path.display(), "removed");
                report.removed.push(path.clone());
            }
            Ok(Removal::AlreadyGone) => {
                debug!(path = %path.display(), "already gone");
            }
            Err(reason) => {
                warn!(path = %path.display(), "remove failed: {reason}");
                report.record_failure(path.clone(), reason);
            }
        }
        tracker.report_step(
            60,
            95,
            index + 1,
            total,
            &format!("removed {}/{}: {}", index + 1, total, path.display()),
        );
    }

    report.pruned_directories = prune_empty_ancestors(context.target_root, &report.removed);
    if !report.pruned_directories.is_empty() {
        debug!(
            count = report.pruned_directories.len(),
            "pruned empty directories"
        );
    }

    tracker.report(97, "removing installation baseline");
    match store.delete(context.scope) {
        Ok(_) => report.baseline_removed = true,
        Err(err) => {
            report.record_failure(
                store.baseline_path(context.scope),
                format!("failed to delete baseline: {err:#}"),
            );
        }
    }

    info!(
        scope = %context.scope,
        removed = report.removed.len(),
        preserved = report.preserved.len(),
        backed_up = report.backed_up.len(),
        failed = report.failed.len(),
        "uninstall executed"
    );
    report
}

fn remove_planned(root: &Path, path: &Path) -> Result<Removal, String> {
    if path == root || !path.starts_with(root) {
        return Err("refusing to remove a path outside the target root".to_string());
    }

    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Removal::AlreadyGone),
        Err(err) => return Err(format!("failed to stat: {err}")),
    };
    if metadata.is_dir() {
        return Err("refusing to remove a directory".to_string());
    }
    if !parent_resolves_under_root(root, path) {
        return Err("refusing to remove: path now resolves outside the target root".to_string());
    }

    match fs::remove_file(path) {
        Ok(()) => Ok(Removal::Removed),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Removal::AlreadyGone),
        Err(err) => Err(format!("failed to remove: {err}")),
    }
}
