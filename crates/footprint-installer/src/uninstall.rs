use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use footprint_core::{
    normalize_path, resolve_under_root, BundleInfo, InstallScope, InstallationBaseline,
    IntegrityReport, ProgressObserver, ProgressTracker, UninstallPolicy, UninstallReport,
};
use tracing::{info, warn};

use crate::executor::{execute_plan, ExecutionContext};
use crate::plan::{plan_uninstall, PlanInput};
use crate::verify::{verify_baseline, verify_baseline_with};
use crate::{BaselineStore, UninstallError};

#[derive(Debug, Clone)]
pub struct UninstallOptions {
    pub scope: InstallScope,
    pub policy: UninstallPolicy,
    pub target_dir: PathBuf,
    pub create_backup: bool,
    /// Files the user added after install. Only used when they exist and lie
    /// inside the target root.
    pub user_created: Vec<PathBuf>,
    pub backup_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationStatus {
    pub scope: InstallScope,
    pub installed_at: DateTime<Utc>,
    pub target_root: PathBuf,
    pub bundle: BundleInfo,
    pub tracked_files: usize,
}

pub struct Uninstaller {
    store: BaselineStore,
}

impl Uninstaller {
    pub fn new(store: BaselineStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Removes what the scope's baseline proves was installed.
    ///
    /// Without a baseline this returns `MissingBaseline` before touching the
    /// filesystem. Selection and target errors are also raised before any
    /// file is removed.
    pub fn uninstall(
        &self,
        options: &UninstallOptions,
        progress: &dyn ProgressObserver,
    ) -> Result<UninstallReport, UninstallError> {
        let tracker = ProgressTracker::new(progress);
        tracker.report(0, &format!("starting {} uninstall", options.policy.as_str()));

        let target = checked_target(&options.target_dir)?;
        tracker.report(5, "loading installation baseline");
        let baseline = self
            .store
            .load(options.scope)?
            .ok_or_else(|| UninstallError::MissingBaseline {
                scope: options.scope,
                target: target.clone(),
            })?;
        ensure_same_root(&baseline, &target)?;
        let root = baseline.target_root.as_path();
        tracker.report(10, &format!("loaded baseline with {} files", baseline.files.len()));

        let classifications = verify_baseline_with(&baseline, |done, total, path| {
            tracker.report_step(
                10,
                40,
                done,
                total,
                &format!("verified {done}/{total}: {}", path.display()),
            );
        });
        let summary = classifications.summary();
        info!(
            scope = %options.scope,
            intact = summary.intact,
            modified = summary.modified,
            deleted = summary.deleted,
            corrupted = summary.corrupted,
            "verified installation"
        );

        let user_created = existing_user_created(root, &options.user_created)?;
        let plan = plan_uninstall(&PlanInput {
            target_root: root,
            classifications: &classifications,
            user_created: &user_created,
            policy: &options.policy,
            verification_policy: &baseline.policy,
            create_backup: options.create_backup,
        })?;
        tracker.report(
            45,
            &format!(
                "planned {} removals, {} preserved",
                plan.to_remove.len(),
                plan.to_preserve.len()
            ),
        );

        let backup_root = options
            .backup_root
            .clone()
            .unwrap_or_else(|| self.store.layout().backups_dir());
        let report = execute_plan(
            &self.store,
            &plan,
            &ExecutionContext {
                scope: options.scope,
                policy: &options.policy,
                target_root: root,
                backup_root: &backup_root,
                total_files: baseline.files.len(),
                verification: summary,
            },
            &tracker,
        );
        tracker.report(100, "uninstall complete");
        Ok(report)
    }

    pub fn inspect(&self, scope: InstallScope) -> Result<IntegrityReport, UninstallError> {
        let baseline = self
            .store
            .load(scope)?
            .ok_or_else(|| UninstallError::MissingBaseline {
                scope,
                target: self.store.baseline_path(scope),
            })?;
        let classifications = verify_baseline(&baseline);
        Ok(
            IntegrityReport::from_classifications(scope, &classifications, Utc::now())
                .with_report_modifications(baseline.policy.report_modifications),
        )
    }

    pub fn status(&self) -> anyhow::Result<Vec<InstallationStatus>> {
        let mut statuses = Vec::new();
        for scope in self.store.list_scopes()? {
            let Some(baseline) = self.store.load(scope)? else {
                continue;
            };
            statuses.push(InstallationStatus {
                scope,
                installed_at: baseline.installed_at,
                tracked_files: baseline.files.len(),
                target_root: baseline.target_root,
                bundle: baseline.bundle_info,
            });
        }
        Ok(statuses)
    }
}

fn checked_target(target_dir: &Path) -> Result<PathBuf, UninstallError> {
    let absolute = if target_dir.is_absolute() {
        target_dir.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|err| UninstallError::InvalidTarget {
                path: target_dir.to_path_buf(),
                reason: format!("cannot resolve relative path: {err}"),
            })?
            .join(target_dir)
    };
    let target = normalize_path(&absolute);

    match fs::metadata(&target) {
        Ok(metadata) if metadata.is_dir() => Ok(target),
        Ok(_) => Err(UninstallError::InvalidTarget {
            path: target,
            reason: "not a directory".to_string(),
        }),
        Err(err) => Err(UninstallError::InvalidTarget {
            path: target,
            reason: err.to_string(),
        }),
    }
}

fn ensure_same_root(baseline: &InstallationBaseline, target: &Path) -> Result<(), UninstallError> {
    if baseline.target_root == target {
        return Ok(());
    }
    let same_canonical = matches!(
        (baseline.target_root.canonicalize(), target.canonicalize()),
        (Ok(recorded), Ok(requested)) if recorded == requested
    );
    if same_canonical {
        return Ok(());
    }
    Err(UninstallError::InvalidTarget {
        path: target.to_path_buf(),
        reason: format!(
            "baseline for scope '{}' was recorded for {}",
            baseline.scope,
            baseline.target_root.display()
        ),
    })
}

fn existing_user_created(
    root: &Path,
    candidates: &[PathBuf],
) -> Result<Vec<PathBuf>, UninstallError> {
    let mut existing = Vec::new();
    for candidate in candidates {
        let resolved = resolve_under_root(root, candidate).ok_or_else(|| {
            UninstallError::InvalidSelection {
                path: candidate.clone(),
                root: root.to_path_buf(),
            }
        })?;
        match fs::symlink_metadata(&resolved) {
            Ok(metadata) if !metadata.is_dir() => existing.push(resolved),
            Ok(_) => warn!(path = %resolved.display(), "ignoring user-created directory"),
            Err(_) => {}
        }
    }
    Ok(existing)
}
