mod batch;
mod checksum;
mod fingerprint;

pub use batch::{fingerprint_batch, BatchOutcome, FingerprintFailure, DEFAULT_CONCURRENCY};
pub use checksum::{bundle_info_from_file, installation_hash, sha256_file, sha256_hex};
pub use fingerprint::{digest_file, fingerprint, FileDigests, HASH_CHUNK_SIZE};
