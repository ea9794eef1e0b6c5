use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

/// Creates directories at most once per run.
#[derive(Debug, Default)]
pub struct DirectoryEnsurer {
    ensured: HashSet<PathBuf>,
}

impl DirectoryEnsurer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, dir: &Path) -> io::Result<()> {
        if self.ensured.contains(dir) {
            return Ok(());
        }
        fs::create_dir_all(dir)?;
        for ancestor in dir.ancestors() {
            if !self.ensured.insert(ancestor.to_path_buf()) {
                break;
            }
        }
        Ok(())
    }
}

/// Whether `path`'s parent directory, with symlinks resolved, is still
/// inside `root`. Fails closed when either side cannot be resolved.
pub fn parent_resolves_under_root(root: &Path, path: &Path) -> bool {
    let Some(parent) = path.parent() else {
        return false;
    };
    match (root.canonicalize(), parent.canonicalize()) {
        (Ok(canonical_root), Ok(canonical_parent)) => canonical_parent.starts_with(canonical_root),
        _ => false,
    }
}

/// Removes directories left empty by deleting `removed_files`, deepest first.
///
/// Only ancestors strictly below `root` are candidates. Directories that
/// still hold anything are skipped.
pub fn prune_empty_ancestors(root: &Path, removed_files: &[PathBuf]) -> Vec<PathBuf> {
    let mut candidates = HashSet::new();
    for file in removed_files {
        for ancestor in file.ancestors().skip(1) {
            if ancestor == root || !ancestor.starts_with(root) {
                break;
            }
            candidates.insert(ancestor.to_path_buf());
        }
    }

    let mut ordered = candidates.into_iter().collect::<Vec<_>>();
    ordered.sort_by(|left, right| {
        right
            .components()
            .count()
            .cmp(&left.components().count())
            .then_with(|| left.cmp(right))
    });

    let mut pruned = Vec::new();
    for dir in ordered {
        let is_real_dir = fs::symlink_metadata(&dir)
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if is_real_dir && parent_resolves_under_root(root, &dir) && fs::remove_dir(&dir).is_ok() {
            pruned.push(dir);
        }
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prune_removes_only_empty_directories_below_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("install");
        let nested = root.join("a").join("b");
        let kept = root.join("keep");
        fs::create_dir_all(&nested).expect("must create nested");
        fs::create_dir_all(&kept).expect("must create keep");
        fs::write(kept.join("note.txt"), b"mine").expect("must write note");

        let pruned = prune_empty_ancestors(
            &root,
            &[nested.join("gone.txt"), kept.join("gone.txt")],
        );

        assert_eq!(pruned, vec![nested.clone(), root.join("a")]);
        assert!(root.exists(), "root must never be pruned");
        assert!(kept.exists());
    }

    #[test]
    fn remove_file_if_exists_reports_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("file.txt");
        fs::write(&path, b"x").expect("must write");

        assert!(remove_file_if_exists(&path).expect("first remove"));
        assert!(!remove_file_if_exists(&path).expect("second remove"));
    }

    #[test]
    fn directory_ensurer_creates_nested_dirs_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("x").join("y");
        let mut ensurer = DirectoryEnsurer::new();

        ensurer.ensure(&nested).expect("first ensure");
        assert!(nested.is_dir());
        fs::remove_dir(&nested).expect("remove behind ensurer");
        ensurer.ensure(&nested).expect("second ensure is cached");
        assert!(!nested.exists());
    }
}
