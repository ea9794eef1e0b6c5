use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum VerificationResult {
    Intact,
    Modified {
        #[serde(rename = "currentHash")]
        current_hash: String,
    },
    Deleted,
    Corrupted {
        reason: String,
    },
}

impl VerificationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intact => "intact",
            Self::Modified { .. } => "modified",
            Self::Deleted => "deleted",
            Self::Corrupted { .. } => "corrupted",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSummary {
    pub intact: usize,
    pub modified: usize,
    pub deleted: usize,
    pub corrupted: usize,
}

impl VerificationSummary {
    pub fn total(&self) -> usize {
        self.intact + self.modified + self.deleted + self.corrupted
    }
}

/// Per-file verification outcome keyed by tracked path, in path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classifications {
    entries: BTreeMap<PathBuf, VerificationResult>,
}

impl Classifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: PathBuf, result: VerificationResult) {
        self.entries.insert(path, result);
    }

    pub fn get(&self, path: &Path) -> Option<&VerificationResult> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &VerificationResult)> {
        self.entries.iter()
    }

    pub fn summary(&self) -> VerificationSummary {
        let mut summary = VerificationSummary::default();
        for result in self.entries.values() {
            match result {
                VerificationResult::Intact => summary.intact += 1,
                VerificationResult::Modified { .. } => summary.modified += 1,
                VerificationResult::Deleted => summary.deleted += 1,
                VerificationResult::Corrupted { .. } => summary.corrupted += 1,
            }
        }
        summary
    }
}

impl FromIterator<(PathBuf, VerificationResult)> for Classifications {
    fn from_iter<T: IntoIterator<Item = (PathBuf, VerificationResult)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
