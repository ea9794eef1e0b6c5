use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use footprint_core::{BundleInfo, FileRecord};
use sha2::{Digest, Sha256};

use crate::HASH_CHUNK_SIZE;

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file =
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0_u8; HASH_CHUNK_SIZE];
    loop {
        let read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(read) => read,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                return Err(err).with_context(|| format!("failed reading {}", path.display()));
            }
        };
        hasher.update(&buffer[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn bundle_info_from_file(path: &Path) -> Result<BundleInfo> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("bundle path has no usable file name: {}", path.display()))?
        .to_string();
    let size = path
        .metadata()
        .with_context(|| format!("failed to stat bundle {}", path.display()))?
        .len();
    if size == 0 {
        return Err(anyhow!("bundle file is empty: {}", path.display()));
    }

    Ok(BundleInfo {
        version: BundleInfo::version_from_filename(&filename),
        sha256: sha256_file(path)?,
        filename,
        size,
    })
}

/// Aggregate fingerprint over every record, independent of input order.
pub fn installation_hash(files: &[FileRecord]) -> String {
    let mut ordered = files.iter().collect::<Vec<_>>();
    ordered.sort_by(|left, right| left.path.cmp(&right.path));

    let mut hasher = Sha256::new();
    for record in ordered {
        hasher.update(
            format!(
                "{}:{}:{}\n",
                record.path.display(),
                record.sha256,
                record.secondary_hash
            )
            .as_bytes(),
        );
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint;
    use semver::Version;
    use std::fs;

    #[test]
    fn sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn bundle_info_reads_size_hash_and_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("olaf-v2.0.5.zip");
        fs::write(&bundle, b"hello world").expect("must write");

        let info = bundle_info_from_file(&bundle).expect("must describe bundle");
        assert_eq!(info.filename, "olaf-v2.0.5.zip");
        assert_eq!(info.size, 11);
        assert_eq!(info.sha256, sha256_hex(b"hello world"));
        assert_eq!(info.version, Some(Version::new(2, 0, 5)));
    }

    #[test]
    fn bundle_info_rejects_empty_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("empty.zip");
        fs::write(&bundle, b"").expect("must write");

        let err = bundle_info_from_file(&bundle).expect_err("empty bundle must fail");
        assert!(err.to_string().contains("bundle file is empty"));
    }

    #[test]
    fn installation_hash_ignores_record_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, b"alpha").expect("write a");
        fs::write(&b, b"beta").expect("write b");

        let records = vec![
            fingerprint(&a).expect("fingerprint a"),
            fingerprint(&b).expect("fingerprint b"),
        ];
        let mut reversed = records.clone();
        reversed.reverse();

        assert_eq!(installation_hash(&records), installation_hash(&reversed));
        assert_eq!(installation_hash(&records).len(), 64);
        assert_ne!(installation_hash(&records), installation_hash(&records[..1]));
    }
}
