use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use footprint_core::{
    resolve_under_root, Classifications, CorruptedHandling, UninstallPolicy, VerificationPolicy,
    VerificationResult,
};

use crate::UninstallError;

pub struct PlanInput<'a> {
    pub target_root: &'a Path,
    pub classifications: &'a Classifications,
    pub user_created: &'a [PathBuf],
    pub policy: &'a UninstallPolicy,
    pub verification_policy: &'a VerificationPolicy,
    pub create_backup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallPlan {
    pub to_remove: Vec<PathBuf>,
    pub to_preserve: Vec<PathBuf>,
    pub to_backup: Vec<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Decision {
    Remove,
    Preserve,
}

/// Decides what happens to every tracked and user-created path.
///
/// Touches no files. Paths outside the target root fail the whole plan with
/// `InvalidSelection`, so nothing is removed on a bad selection. Tracked files
/// classified `Deleted` appear in neither list.
pub fn plan_uninstall(input: &PlanInput<'_>) -> Result<UninstallPlan, UninstallError> {
    let root = input.target_root;
    let user_created = resolve_all(root, input.user_created.iter())?
        .into_iter()
        .filter(|path| !input.classifications.contains(path))
        .collect::<BTreeSet<_>>();
    let selected = match input.policy {
        UninstallPolicy::Custom(selection) => Some(resolve_all(root, selection.iter())?),
        UninstallPolicy::Complete | UninstallPolicy::Smart => None,
    };

    let mut plan = UninstallPlan::default();
    let mut place = |path: &PathBuf, decision: Decision| match decision {
        Decision::Remove => plan.to_remove.push(path.clone()),
        Decision::Preserve => plan.to_preserve.push(path.clone()),
    };

    for (path, result) in input.classifications.iter() {
        if matches!(result, VerificationResult::Deleted) {
            continue;
        }
        let decision = match (input.policy, &selected) {
            (UninstallPolicy::Complete, _) => Decision::Remove,
            (UninstallPolicy::Smart, _) => smart_decision(result, input.verification_policy),
            (UninstallPolicy::Custom(_), Some(selected)) => selected_decision(selected, path),
            (UninstallPolicy::Custom(_), None) => Decision::Preserve,
        };
        place(path, decision);
    }

    for path in &user_created {
        let decision = match (input.policy, &selected) {
            (UninstallPolicy::Complete, _) => Decision::Remove,
            (UninstallPolicy::Custom(_), Some(selected)) => selected_decision(selected, path),
            _ => Decision::Preserve,
        };
        place(path, decision);
    }

    if let Some(selected) = &selected {
        for path in selected {
            if !input.classifications.contains(path) && !user_created.contains(path) {
                place(path, Decision::Remove);
            }
        }
    }

    plan.to_remove.sort();
    plan.to_preserve.sort();
    if input.create_backup {
        plan.to_backup = plan.to_preserve.clone();
    }
    Ok(plan)
}

fn smart_decision(result: &VerificationResult, policy: &VerificationPolicy) -> Decision {
    match result {
        VerificationResult::Intact => Decision::Remove,
        VerificationResult::Modified { .. } if policy.preserve_modified => Decision::Preserve,
        VerificationResult::Modified { .. } => Decision::Remove,
        VerificationResult::Corrupted { .. } => match policy.corrupted {
            CorruptedHandling::Preserve => Decision::Preserve,
            CorruptedHandling::Remove => Decision::Remove,
        },
        VerificationResult::Deleted => Decision::Preserve,
    }
}

fn selected_decision(selected: &BTreeSet<PathBuf>, path: &Path) -> Decision {
    if selected.contains(path) {
        Decision::Remove
    } else {
        Decision::Preserve
    }
}

fn resolve_all<'p>(
    root: &Path,
    paths: impl Iterator<Item = &'p PathBuf>,
) -> Result<BTreeSet<PathBuf>, UninstallError> {
    paths
        .map(|path| {
            resolve_under_root(root, path).ok_or_else(|| UninstallError::InvalidSelection {
                path: path.clone(),
                root: root.to_path_buf(),
            })
        })
        .collect()
}
