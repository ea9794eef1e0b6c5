mod backup;
mod baseline_store;
mod error;
mod executor;
mod fs_utils;
mod install;
mod layout;
mod plan;
mod uninstall;
mod verify;

pub use backup::{archive_files, BackupOutcome};
pub use baseline_store::BaselineStore;
pub use error::UninstallError;
pub use executor::{execute_plan, ExecutionContext};
pub use fs_utils::{
    parent_resolves_under_root, prune_empty_ancestors, remove_file_if_exists, DirectoryEnsurer,
};
pub use install::{record_installation, InstallOutcome, InstallRequest};
pub use layout::{default_state_root, StateLayout};
pub use plan::{plan_uninstall, PlanInput, UninstallPlan};
pub use uninstall::{InstallationStatus, UninstallOptions, Uninstaller};
pub use verify::{verify_baseline, verify_baseline_with, verify_record};
