use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use footprint_core::{InstallScope, InstallationBaseline};
use footprint_integrity::installation_hash;
use tracing::{debug, info};

use crate::fs_utils::remove_file_if_exists;
use crate::StateLayout;

/// Persists one baseline document per scope under the state root.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    layout: StateLayout,
}

impl BaselineStore {
    pub fn new(layout: StateLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    pub fn baseline_path(&self, scope: InstallScope) -> PathBuf {
        self.layout.baseline_path(scope)
    }

    pub fn exists(&self, scope: InstallScope) -> bool {
        self.baseline_path(scope).is_file()
    }

    pub fn save(&self, baseline: &InstallationBaseline) -> Result<PathBuf> {
        baseline.validate()?;
        let dir = self.layout.baselines_dir();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let _lock = BaselineLock::acquire(&self.layout.baseline_lock_path(baseline.scope))?;
        let path = self.baseline_path(baseline.scope);
        let payload = baseline.to_json_pretty()?;
        let tmp_path = dir.join(format!(
            ".{}.json.{}.{}.tmp",
            baseline.scope,
            std::process::id(),
            unique_suffix()
        ));

        if let Err(err) = write_synced(&tmp_path, payload.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err).with_context(|| {
                format!(
                    "failed to move baseline into place: {} -> {}",
                    tmp_path.display(),
                    path.display()
                )
            });
        }
        sync_dir(&dir);

        info!(
            scope = %baseline.scope,
            files = baseline.files.len(),
            path = %path.display(),
            "saved installation baseline"
        );
        Ok(path)
    }

    /// Loads the baseline for `scope`, or `None` when nothing was recorded.
    ///
    /// A document that exists but cannot be trusted is an error, never `None`.
    pub fn load(&self, scope: InstallScope) -> Result<Option<InstallationBaseline>> {
        let path = self.baseline_path(scope);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!(scope = %scope, path = %path.display(), "no baseline recorded");
                return Ok(None);
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read baseline: {}", path.display()));
            }
        };

        let baseline = InstallationBaseline::from_json_str(&raw)
            .with_context(|| format!("failed to load baseline: {}", path.display()))?;
        if baseline.scope != scope {
            return Err(anyhow!(
                "baseline scope mismatch in {}: expected '{}', found '{}'",
                path.display(),
                scope,
                baseline.scope
            ));
        }
        if let Some(expected) = &baseline.installation_hash {
            let actual = installation_hash(&baseline.files);
            if &actual != expected {
                return Err(anyhow!(
                    "baseline installation hash mismatch in {}: expected {}, computed {}",
                    path.display(),
                    expected,
                    actual
                ));
            }
        }

        Ok(Some(baseline))
    }

    /// Removes the baseline for `scope`. Returns whether a document existed.
    pub fn delete(&self, scope: InstallScope) -> Result<bool> {
        let path = self.baseline_path(scope);
        let removed = remove_file_if_exists(&path)
            .with_context(|| format!("failed to delete baseline: {}", path.display()))?;
        if removed {
            info!(scope = %scope, path = %path.display(), "deleted installation baseline");
        }
        Ok(removed)
    }

    pub fn list_scopes(&self) -> Result<Vec<InstallScope>> {
        let dir = self.layout.baselines_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", dir.display()));
            }
        };

        let mut scopes = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| format!("failed to iterate {}", dir.display()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if let Ok(scope) = InstallScope::parse(stem) {
                scopes.push(scope);
            }
        }
        scopes.sort();
        Ok(scopes)
    }
}

struct BaselineLock {
    path: PathBuf,
}

impl BaselineLock {
    fn acquire(path: &Path) -> Result<Self> {
        let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(path)
                    .ok()
                    .map(|raw| raw.trim().to_string())
                    .filter(|raw| !raw.is_empty())
                    .map(|pid| format!(" (pid={pid})"))
                    .unwrap_or_default();
                return Err(anyhow!(
                    "baseline-locked: another writer holds {}{holder}",
                    path.display()
                ));
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to claim baseline lock: {}", path.display()));
            }
        };
        let _ = writeln!(file, "{}", std::process::id());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for BaselineLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default()
}
