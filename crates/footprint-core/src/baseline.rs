use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::paths::normalize_path;
use crate::{FileRecord, InstallScope, VerificationPolicy};

pub const BASELINE_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleInfo {
    pub filename: String,
    pub size: u64,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,
}

impl BundleInfo {
    /// Pulls a `major.minor.patch` version out of names like `olaf-v1.2.3.zip`
    /// or `bundle_1.2.3.tar.gz`.
    pub fn version_from_filename(filename: &str) -> Option<Version> {
        let bytes = filename.as_bytes();
        let mut start = 0;
        while start < bytes.len() {
            if !bytes[start].is_ascii_digit() {
                start += 1;
                continue;
            }
            let preceded_by_digit = start > 0 && bytes[start - 1].is_ascii_digit();
            if !preceded_by_digit {
                if let Some(version) = parse_triplet(&filename[start..]) {
                    return Some(version);
                }
            }
            start += 1;
        }
        None
    }
}

fn parse_triplet(input: &str) -> Option<Version> {
    let mut parts = [0_u64; 3];
    let mut rest = input;
    for (index, slot) in parts.iter_mut().enumerate() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return None;
        }
        *slot = rest[..digits].parse().ok()?;
        rest = &rest[digits..];
        if index < 2 {
            rest = rest.strip_prefix('.')?;
        }
    }
    Some(Version::new(parts[0], parts[1], parts[2]))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationBaseline {
    pub schema_version: u32,
    pub scope: InstallScope,
    pub installed_at: DateTime<Utc>,
    pub target_root: PathBuf,
    pub bundle_info: BundleInfo,
    #[serde(default)]
    pub files: Vec<FileRecord>,
    #[serde(default)]
    pub policy: VerificationPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBundleInfo {
    filename: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    sha256: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyBaseline {
    #[serde(default)]
    version: Option<String>,
    scope: String,
    installed_at: DateTime<Utc>,
    extraction_path: PathBuf,
    bundle_info: LegacyBundleInfo,
    #[serde(default)]
    files: Vec<FileRecord>,
    #[serde(default)]
    verification_policy: Option<VerificationPolicy>,
}

impl InstallationBaseline {
    pub fn from_json_str(input: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(input).context("failed to parse baseline document")?;

        let mut baseline = match value.get("schemaVersion") {
            Some(raw_version) => {
                let version = raw_version
                    .as_u64()
                    .ok_or_else(|| anyhow!("baseline schemaVersion must be an integer"))?;
                if version != u64::from(BASELINE_SCHEMA_VERSION) {
                    return Err(anyhow!(
                        "unsupported baseline schema version {} (expected {})",
                        version,
                        BASELINE_SCHEMA_VERSION
                    ));
                }
                serde_json::from_value::<Self>(value)
                    .context("failed parsing versioned baseline document")?
            }
            None => {
                let legacy = serde_json::from_value::<LegacyBaseline>(value)
                    .context("failed parsing legacy baseline document")?;
                Self::from_legacy(legacy)?
            }
        };

        baseline.validate()?;
        baseline.files.sort_by(|left, right| left.path.cmp(&right.path));
        Ok(baseline)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize baseline document")
    }

    pub fn tracked_paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|record| record.path.as_path())
    }

    pub fn validate(&self) -> Result<()> {
        if !self.target_root.is_absolute() {
            return Err(anyhow!(
                "baseline target root must be absolute: {}",
                self.target_root.display()
            ));
        }
        if normalize_path(&self.target_root) != self.target_root {
            return Err(anyhow!(
                "baseline target root must be normalized: {}",
                self.target_root.display()
            ));
        }

        let mut seen = HashSet::with_capacity(self.files.len());
        for record in &self.files {
            if !record.path.is_absolute() || normalize_path(&record.path) != record.path {
                return Err(anyhow!(
                    "baseline file path must be absolute and normalized: {}",
                    record.path.display()
                ));
            }
            if record.path == self.target_root || !record.path.starts_with(&self.target_root) {
                return Err(anyhow!(
                    "baseline file path escapes target root {}: {}",
                    self.target_root.display(),
                    record.path.display()
                ));
            }
            if !seen.insert(record.path.as_path()) {
                return Err(anyhow!(
                    "duplicate baseline file path: {}",
                    record.path.display()
                ));
            }
        }

        Ok(())
    }

    fn from_legacy(legacy: LegacyBaseline) -> Result<Self> {
        let scope = InstallScope::parse(&legacy.scope)
            .context("failed parsing legacy baseline scope")?;
        let version = legacy
            .version
            .as_deref()
            .and_then(|raw| Version::parse(raw).ok())
            .or_else(|| BundleInfo::version_from_filename(&legacy.bundle_info.filename));

        Ok(Self {
            schema_version: BASELINE_SCHEMA_VERSION,
            scope,
            installed_at: legacy.installed_at,
            target_root: normalize_path(&legacy.extraction_path),
            bundle_info: BundleInfo {
                filename: legacy.bundle_info.filename,
                size: legacy.bundle_info.size,
                sha256: legacy.bundle_info.sha256,
                version,
            },
            files: legacy
                .files
                .into_iter()
                .map(|mut record| {
                    record.path = normalize_path(&record.path);
                    record
                })
                .collect(),
            policy: legacy.verification_policy.unwrap_or_default(),
            installation_hash: None,
        })
    }
}
