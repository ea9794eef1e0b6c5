use std::path::PathBuf;

use footprint_core::InstallScope;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UninstallError {
    #[error(
        "missing-baseline: no installation baseline recorded for scope '{scope}'; refusing to remove anything under {}",
        .target.display()
    )]
    MissingBaseline { scope: InstallScope, target: PathBuf },
    #[error(
        "invalid-selection: {} does not resolve inside target root {}",
        .path.display(),
        .root.display()
    )]
    InvalidSelection { path: PathBuf, root: PathBuf },
    #[error("invalid-target: {}: {reason}", .path.display())]
    InvalidTarget { path: PathBuf, reason: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
