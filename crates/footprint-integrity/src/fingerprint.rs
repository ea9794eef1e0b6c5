use std::fs::{self, File, Metadata};
use std::hash::Hasher;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use footprint_core::FileRecord;
use sha2::{Digest, Sha256};
use twox_hash::XxHash64;

pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigests {
    pub sha256: String,
    pub secondary: String,
    pub bytes_read: u64,
}

/// Streams the file once through both hash accumulators.
pub fn digest_file(path: &Path) -> Result<FileDigests> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut sha256 = Sha256::new();
    let mut secondary = XxHash64::with_seed(0);
    let mut buffer = vec![0_u8; HASH_CHUNK_SIZE];
    let mut bytes_read = 0_u64;

    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(err).with_context(|| format!("failed reading {}", path.display()));
            }
        };
        sha256.update(&buffer[..read]);
        secondary.write(&buffer[..read]);
        bytes_read += read as u64;
    }

    Ok(FileDigests {
        sha256: hex::encode(sha256.finalize()),
        secondary: format!("{:016x}", secondary.finish()),
        bytes_read,
    })
}

pub fn fingerprint(path: &Path) -> Result<FileRecord> {
    let link_metadata = fs::symlink_metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let is_symlink = link_metadata.file_type().is_symlink();
    let symlink_target = if is_symlink {
        Some(
            fs::read_link(path)
                .with_context(|| format!("failed to read symlink {}", path.display()))?,
        )
    } else {
        None
    };
    let metadata = if is_symlink {
        fs::metadata(path)
            .with_context(|| format!("failed to stat symlink target of {}", path.display()))?
    } else {
        link_metadata
    };
    if !metadata.is_file() {
        return Err(anyhow!("not a regular file: {}", path.display()));
    }

    let digests = digest_file(path)?;
    if digests.bytes_read != metadata.len() {
        return Err(anyhow!(
            "file changed while hashing: {} (stat size {}, read {} bytes)",
            path.display(),
            metadata.len(),
            digests.bytes_read
        ));
    }

    let modified = metadata
        .modified()
        .with_context(|| format!("failed to read mtime of {}", path.display()))?;
    let (permissions, is_executable) = permission_bits(&metadata);

    Ok(FileRecord {
        path: path.to_path_buf(),
        size: metadata.len(),
        mtime: DateTime::<Utc>::from(modified),
        sha256: digests.sha256,
        secondary_hash: digests.secondary,
        permissions,
        is_executable,
        is_symlink,
        symlink_target,
    })
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> (String, bool) {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode() & 0o777;
    (format!("{mode:o}"), mode & 0o100 != 0)
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> (String, bool) {
    if metadata.permissions().readonly() {
        ("444".to_string(), false)
    } else {
        ("644".to_string(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";
    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn digest_empty_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.txt");
        fs::write(&path, b"").expect("must write");

        let digests = digest_file(&path).expect("must digest");
        assert_eq!(digests.sha256, EMPTY_SHA256);
        assert_eq!(digests.secondary, "ef46db3751d8e999");
        assert_eq!(digests.bytes_read, 0);
    }

    #[test]
    fn fingerprint_records_hashes_and_stat_metadata() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hello.txt");
        fs::write(&path, b"hello world").expect("must write");

        let record = fingerprint(&path).expect("must fingerprint");
        assert_eq!(record.path, path);
        assert_eq!(record.size, 11);
        assert_eq!(record.sha256, HELLO_WORLD_SHA256);
        assert_eq!(record.secondary_hash.len(), 16);
        assert!(!record.is_symlink);
        assert!(record.symlink_target.is_none());
        assert!(record.metadata_inconsistency().is_none());
    }

    #[test]
    fn fingerprint_is_deterministic_for_unchanged_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("data.bin");
        let payload: Vec<u8> = (0..(HASH_CHUNK_SIZE * 3 + 17))
            .map(|index| (index % 251) as u8)
            .collect();
        fs::write(&path, &payload).expect("must write");

        let first = fingerprint(&path).expect("first fingerprint");
        let second = fingerprint(&path).expect("second fingerprint");
        assert_eq!(first, second);
        assert_eq!(first.size, payload.len() as u64);
    }

    #[test]
    fn secondary_hash_changes_with_same_size_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("f1.txt");
        fs::write(&path, b"hello world").expect("must write");
        let before = fingerprint(&path).expect("before");

        fs::write(&path, b"HELLO WORLD").expect("must rewrite");
        let after = fingerprint(&path).expect("after");

        assert_eq!(before.size, after.size);
        assert_ne!(before.sha256, after.sha256);
        assert_ne!(before.secondary_hash, after.secondary_hash);
    }

    #[test]
    fn fingerprint_fails_for_missing_file_and_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(fingerprint(&dir.path().join("absent.txt")).is_err());

        let err = fingerprint(dir.path()).expect_err("directories are not fingerprinted");
        assert!(err.to_string().contains("not a regular file"));
    }

    #[cfg(unix)]
    #[test]
    fn fingerprint_records_unix_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("run.sh");
        fs::write(&path, b"#!/bin/sh\necho ok\n").expect("must write");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");

        let record = fingerprint(&path).expect("must fingerprint");
        assert_eq!(record.permissions, "755");
        assert!(record.is_executable);
    }

    #[cfg(unix)]
    #[test]
    fn fingerprint_follows_symlink_and_records_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("real.txt");
        fs::write(&target, b"hello world").expect("must write");
        let link = dir.path().join("alias.txt");
        std::os::unix::fs::symlink(&target, &link).expect("symlink");

        let record = fingerprint(&link).expect("must fingerprint");
        assert!(record.is_symlink);
        assert_eq!(record.symlink_target.as_deref(), Some(target.as_path()));
        assert_eq!(record.sha256, HELLO_WORLD_SHA256);
        assert!(record.metadata_inconsistency().is_none());
    }
}
