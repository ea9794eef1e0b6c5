use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{Classifications, InstallScope, VerificationResult, VerificationSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntry {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UninstallOutcome {
    Completed,
    PartialFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UninstallReport {
    pub scope: InstallScope,
    pub policy: String,
    pub total_files: usize,
    pub verification: VerificationSummary,
    pub removed: Vec<PathBuf>,
    pub preserved: Vec<PathBuf>,
    pub backed_up: Vec<PathBuf>,
    pub failed: Vec<FailedEntry>,
    pub backup_path: Option<PathBuf>,
    pub pruned_directories: Vec<PathBuf>,
    pub baseline_removed: bool,
}

impl UninstallReport {
    pub fn new(scope: InstallScope, policy: &str, total_files: usize) -> Self {
        Self {
            scope,
            policy: policy.to_string(),
            total_files,
            verification: VerificationSummary::default(),
            removed: Vec::new(),
            preserved: Vec::new(),
            backed_up: Vec::new(),
            failed: Vec::new(),
            backup_path: None,
            pruned_directories: Vec::new(),
            baseline_removed: false,
        }
    }

    pub fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failed.push(FailedEntry {
            path,
            reason: reason.into(),
        });
    }

    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn outcome(&self) -> UninstallOutcome {
        if self.failed.is_empty() {
            UninstallOutcome::Completed
        } else {
            UninstallOutcome::PartialFailure
        }
    }

    pub fn errors(&self) -> Vec<String> {
        self.failed
            .iter()
            .map(|entry| format!("{}: {}", entry.path.display(), entry.reason))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    Remove,
    Preserve,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub path: PathBuf,
    pub result: VerificationResult,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    pub scope: InstallScope,
    pub total_files: usize,
    pub counts: VerificationSummary,
    pub entries: Vec<ReportEntry>,
    pub summary: String,
    /// When false, renderers list modified files only in the counts.
    pub report_modifications: bool,
    pub generated_at: DateTime<Utc>,
}

impl IntegrityReport {
    pub fn from_classifications(
        scope: InstallScope,
        classifications: &Classifications,
        generated_at: DateTime<Utc>,
    ) -> Self {
        let counts = classifications.summary();
        let entries = classifications
            .iter()
            .map(|(path, result)| ReportEntry {
                path: path.clone(),
                result: result.clone(),
                recommendation: match result {
                    VerificationResult::Intact => Recommendation::Remove,
                    VerificationResult::Modified { .. } | VerificationResult::Corrupted { .. } => {
                        Recommendation::Preserve
                    }
                    VerificationResult::Deleted => Recommendation::Ignore,
                },
            })
            .collect();

        Self {
            scope,
            total_files: classifications.len(),
            counts,
            entries,
            summary: format!(
                "integrity check: {} files tracked, {} intact, {} modified, {} deleted, {} corrupted",
                classifications.len(),
                counts.intact,
                counts.modified,
                counts.deleted,
                counts.corrupted
            ),
            report_modifications: true,
            generated_at,
        }
    }

    pub fn with_report_modifications(mut self, report_modifications: bool) -> Self {
        self.report_modifications = report_modifications;
        self
    }
}
