use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use footprint_core::{
    normalize_path, resolve_under_root, BundleInfo, InstallScope, InstallationBaseline,
    ProgressObserver, VerificationPolicy, BASELINE_SCHEMA_VERSION,
};
use footprint_integrity::{fingerprint_batch, installation_hash, FingerprintFailure};
use tracing::{info, warn};

use crate::BaselineStore;

#[derive(Debug, Clone)]
pub struct InstallRequest {
    pub scope: InstallScope,
    pub target_root: PathBuf,
    pub bundle: BundleInfo,
    pub files: Vec<PathBuf>,
    pub policy: VerificationPolicy,
    pub concurrency: usize,
    pub replace_existing: bool,
}

#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub baseline_path: PathBuf,
    pub baseline: InstallationBaseline,
    pub failures: Vec<FingerprintFailure>,
}

/// Fingerprints the files an installer just wrote and records them as the
/// scope's baseline.
///
/// Files that cannot be fingerprinted are left out of the baseline and
/// returned in `failures`; a later uninstall will never remove them.
pub fn record_installation(
    store: &BaselineStore,
    request: &InstallRequest,
    progress: &dyn ProgressObserver,
) -> Result<InstallOutcome> {
    if !request.target_root.is_absolute() {
        return Err(anyhow!(
            "target root must be absolute: {}",
            request.target_root.display()
        ));
    }
    let target_root = normalize_path(&request.target_root);
    let root_metadata = fs::metadata(&target_root)
        .with_context(|| format!("failed to stat target root {}", target_root.display()))?;
    if !root_metadata.is_dir() {
        return Err(anyhow!(
            "target root is not a directory: {}",
            target_root.display()
        ));
    }

    if !request.replace_existing && store.exists(request.scope) {
        return Err(anyhow!(
            "baseline-exists: scope '{}' already has a recorded installation at {}",
            request.scope,
            store.baseline_path(request.scope).display()
        ));
    }

    let mut files = BTreeSet::new();
    for path in &request.files {
        let resolved = resolve_under_root(&target_root, path).ok_or_else(|| {
            anyhow!(
                "installed file {} is outside target root {}",
                path.display(),
                target_root.display()
            )
        })?;
        files.insert(resolved);
    }
    let files = files.into_iter().collect::<Vec<_>>();

    let batch = fingerprint_batch(&files, request.concurrency, progress)?;
    for failure in &batch.failures {
        warn!(
            path = %failure.path.display(),
            "file left out of baseline: {}",
            failure.reason
        );
    }

    let baseline = InstallationBaseline {
        schema_version: BASELINE_SCHEMA_VERSION,
        scope: request.scope,
        installed_at: Utc::now(),
        target_root,
        bundle_info: request.bundle.clone(),
        installation_hash: Some(installation_hash(&batch.records)),
        files: batch.records,
        policy: request.policy.clone(),
    };
    let baseline_path = store.save(&baseline)?;
    info!(
        scope = %baseline.scope,
        tracked = baseline.files.len(),
        skipped = batch.failures.len(),
        "recorded installation"
    );

    Ok(InstallOutcome {
        baseline_path,
        baseline,
        failures: batch.failures,
    })
}
