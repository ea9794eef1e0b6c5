use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use footprint_core::UninstallPolicy;
use footprint_installer::StateLayout;
use footprint_integrity::DEFAULT_CONCURRENCY;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FootprintConfig {
    pub version: u32,
    pub concurrency: usize,
    pub default_policy: String,
    pub backup_root: Option<PathBuf>,
    pub create_backup: bool,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            concurrency: DEFAULT_CONCURRENCY,
            default_policy: "smart".to_string(),
            backup_root: None,
            create_backup: false,
        }
    }
}

impl FootprintConfig {
    pub fn load(layout: &StateLayout) -> Result<Self> {
        let path = layout.config_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read config: {}", path.display()));
            }
        };
        Self::parse(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).context("failed to parse footprint.toml")?;
        if config.version != CONFIG_VERSION {
            return Err(anyhow!(
                "unsupported config version {} (expected {})",
                config.version,
                CONFIG_VERSION
            ));
        }
        if config.concurrency == 0 {
            return Err(anyhow!("concurrency must be at least 1"));
        }
        match UninstallPolicy::parse(&config.default_policy, &[])? {
            UninstallPolicy::Complete | UninstallPolicy::Smart => {}
            UninstallPolicy::Custom(_) => {
                return Err(anyhow!("default_policy cannot be custom"));
            }
        }
        Ok(config)
    }

    pub fn backup_root(&self, layout: &StateLayout) -> PathBuf {
        self.backup_root
            .clone()
            .unwrap_or_else(|| layout.backups_dir())
    }
}
