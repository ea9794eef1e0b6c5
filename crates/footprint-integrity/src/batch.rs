use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use footprint_core::{FileRecord, ProgressObserver, ProgressTracker};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::fingerprint;

pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintFailure {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub records: Vec<FileRecord>,
    pub failures: Vec<FingerprintFailure>,
}

/// Fingerprints `paths` on a pool of at most `concurrency` workers.
///
/// Records come back sorted by path regardless of completion order. A file
/// that cannot be read lands in `failures` and the rest of the batch still
/// runs; only failing to build the pool is an error.
pub fn fingerprint_batch(
    paths: &[PathBuf],
    concurrency: usize,
    progress: &dyn ProgressObserver,
) -> Result<BatchOutcome> {
    let workers = concurrency.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|index| format!("footprint-hash-{index}"))
        .build()
        .context("failed to build fingerprint worker pool")?;

    let total = paths.len();
    let tracker = ProgressTracker::new(progress);
    let completed = Mutex::new(0_usize);
    debug!(files = total, workers, "fingerprinting batch");

    let results: Vec<(PathBuf, Result<FileRecord>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let result = fingerprint(path);
                let mut done = match completed.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                *done += 1;
                tracker.report_step(
                    0,
                    100,
                    *done,
                    total,
                    &format!("fingerprinted {}/{}: {}", *done, total, path.display()),
                );
                (path.clone(), result)
            })
            .collect()
    });

    let mut outcome = BatchOutcome::default();
    for (path, result) in results {
        match result {
            Ok(record) => outcome.records.push(record),
            Err(err) => {
                warn!(path = %path.display(), "fingerprint failed: {err:#}");
                outcome.failures.push(FingerprintFailure {
                    path,
                    reason: format!("{err:#}"),
                });
            }
        }
    }
    outcome
        .records
        .sort_by(|left, right| left.path.cmp(&right.path));
    outcome
        .failures
        .sort_by(|left, right| left.path.cmp(&right.path));
    Ok(outcome)
}
