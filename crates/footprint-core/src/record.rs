use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub mtime: DateTime<Utc>,
    pub sha256: String,
    #[serde(alias = "xxhash64")]
    pub secondary_hash: String,
    #[serde(default = "default_permissions")]
    pub permissions: String,
    #[serde(default)]
    pub is_executable: bool,
    #[serde(default)]
    pub is_symlink: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symlink_target: Option<PathBuf>,
}

impl FileRecord {
    /// Describes why the stored fields contradict each other, if they do.
    pub fn metadata_inconsistency(&self) -> Option<String> {
        if !is_sha256_hex(&self.sha256) {
            return Some(format!("stored sha256 is malformed: '{}'", self.sha256));
        }
        if self.secondary_hash.is_empty()
            || !self
                .secondary_hash
                .chars()
                .all(|ch| ch.is_ascii_hexdigit())
        {
            return Some(format!(
                "stored secondary hash is malformed: '{}'",
                self.secondary_hash
            ));
        }
        if self.is_symlink && self.symlink_target.is_none() {
            return Some("symlink record has no target".to_string());
        }
        if !self.is_symlink && self.symlink_target.is_some() {
            return Some("regular file record carries a symlink target".to_string());
        }
        None
    }
}

pub fn is_sha256_hex(value: &str) -> bool {
    value.len() == 64
        && value
            .chars()
            .all(|ch| ch.is_ascii_digit() || ('a'..='f').contains(&ch))
}

fn default_permissions() -> String {
    "644".to_string()
}
