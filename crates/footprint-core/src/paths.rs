use std::path::{Component, Path, PathBuf};

/// Resolves `.` and `..` components without touching the filesystem.
///
/// `..` never climbs above the root of an absolute path.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => normalized.push(prefix.as_os_str()),
            Component::RootDir => normalized.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = normalized
                    .components()
                    .last()
                    .map(|last| matches!(last, Component::RootDir | Component::Prefix(_)))
                    .unwrap_or(false);
                if !at_root && !normalized.pop() {
                    normalized.push("..");
                }
            }
            Component::Normal(part) => normalized.push(part),
        }
    }
    normalized
}

/// Returns the normalized absolute form of `candidate` when it lies strictly
/// inside `root`.
///
/// Relative candidates are joined onto `root`. When the candidate exists on
/// disk its canonical form must also stay inside the canonical root, so a
/// symlinked directory cannot be used to reach outside the tree.
pub fn resolve_under_root(root: &Path, candidate: &Path) -> Option<PathBuf> {
    let root = normalize_path(root);
    if !root.is_absolute() {
        return None;
    }

    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };
    let resolved = normalize_path(&joined);
    if resolved == root || !resolved.starts_with(&root) {
        return None;
    }

    if let (Ok(canonical_root), Ok(canonical_candidate)) =
        (root.canonicalize(), resolved.canonicalize())
    {
        if canonical_candidate == canonical_root || !canonical_candidate.starts_with(&canonical_root)
        {
            return None;
        }
    }

    Some(resolved)
}
