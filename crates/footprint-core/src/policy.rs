use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallPolicy {
    Complete,
    Smart,
    Custom(BTreeSet<PathBuf>),
}

impl UninstallPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Smart => "smart",
            Self::Custom(_) => "custom",
        }
    }

    /// Parses a policy token; `custom` takes its selection from `selection`.
    pub fn parse(value: &str, selection: &[PathBuf]) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "complete" => Ok(Self::Complete),
            "smart" | "safe" => Ok(Self::Smart),
            "custom" => {
                if selection.is_empty() {
                    return Err(anyhow!(
                        "custom uninstall policy requires at least one selected path"
                    ));
                }
                Ok(Self::Custom(selection.iter().cloned().collect()))
            }
            _ => Err(anyhow!("invalid uninstall policy: {value}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptedHandling {
    #[default]
    Preserve,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationPolicy {
    #[serde(default = "enabled")]
    pub auto_verify: bool,
    #[serde(default = "enabled")]
    pub preserve_modified: bool,
    #[serde(default = "enabled")]
    pub report_modifications: bool,
    #[serde(default)]
    pub corrupted: CorruptedHandling,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            auto_verify: true,
            preserve_modified: true,
            report_modifications: true,
            corrupted: CorruptedHandling::Preserve,
        }
    }
}

fn enabled() -> bool {
    true
}
