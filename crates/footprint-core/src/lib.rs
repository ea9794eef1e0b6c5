mod baseline;
mod paths;
mod policy;
mod progress;
mod record;
mod report;
mod scope;
mod verification;

pub use baseline::{BundleInfo, InstallationBaseline, BASELINE_SCHEMA_VERSION};
pub use paths::{normalize_path, resolve_under_root};
pub use policy::{CorruptedHandling, UninstallPolicy, VerificationPolicy};
pub use progress::{NoProgress, ProgressObserver, ProgressTracker};
pub use record::{is_sha256_hex, FileRecord};
pub use report::{
    FailedEntry, IntegrityReport, Recommendation, ReportEntry, UninstallOutcome, UninstallReport,
};
pub use scope::InstallScope;
pub use verification::{Classifications, VerificationResult, VerificationSummary};
