use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use footprint_core::InstallScope;

pub const STATE_ROOT_ENV: &str = "FOOTPRINT_HOME";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateLayout {
    root: PathBuf,
}

impl StateLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn baselines_dir(&self) -> PathBuf {
        self.root.join("baselines")
    }

    pub fn baseline_path(&self, scope: InstallScope) -> PathBuf {
        self.baselines_dir().join(format!("{scope}.json"))
    }

    pub fn baseline_lock_path(&self, scope: InstallScope) -> PathBuf {
        self.baselines_dir().join(format!("{scope}.lock"))
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("footprint.toml")
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [self.baselines_dir(), self.backups_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

pub fn default_state_root() -> Result<PathBuf> {
    if let Some(explicit) = std::env::var_os(STATE_ROOT_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(explicit));
    }

    if cfg!(windows) {
        let app_data = std::env::var("LOCALAPPDATA")
            .context("LOCALAPPDATA is not set; cannot resolve Windows state root")?;
        return Ok(PathBuf::from(app_data).join("Footprint"));
    }

    let home = std::env::var("HOME").context("HOME is not set; cannot resolve state root")?;
    Ok(PathBuf::from(home).join(".footprint"))
}
