//! Per-file deployment and checksum status.

use crate::config::ReportConfig;
use crate::error::HashError;
use crate::hasher::hash_file;
use crate::limiter::ConcurrencyLimiter;
use crate::manifest::ManifestLookup;
use crate::model::{FileEntry, MD5_NOT_CALCULATED};
use crate::walker::ListedEntry;
use futures_util::future::join_all;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Called with `(completed, total)` after each file has been examined.
pub type ProgressFn<'a> = dyn Fn(usize, usize) + Send + Sync + 'a;

/// What the builder needs to know about the mod being reported.
#[derive(Debug, Clone, Copy)]
pub struct FileReportInput<'a> {
    pub mod_id: &'a str,
    /// The mod's staging directory. Listed paths are relative to it.
    pub mod_root: &'a Path,
    /// Directory the mod's files are deployed into.
    pub deploy_target: &'a Path,
    pub manifest: &'a ManifestLookup<'a>,
}

/// Produces one [`FileEntry`] per non-directory entry in `listing`.
///
/// Files are hashed concurrently under `limiter`. When `generate_md5` is
/// false no file is opened and every entry carries [`MD5_NOT_CALCULATED`].
/// Entries come back sorted by path, case-insensitively.
pub async fn build_file_report(
    input: FileReportInput<'_>,
    listing: &[ListedEntry],
    limiter: &ConcurrencyLimiter<HashError>,
    generate_md5: bool,
    progress: Option<&ProgressFn<'_>>,
) -> Vec<FileEntry> {
    let files: Vec<&ListedEntry> = listing.iter().filter(|e| !e.is_directory).collect();
    let total = files.len();
    let completed = AtomicUsize::new(0);

    let tasks = files.into_iter().map(|listed| {
        let completed = &completed;
        async move {
            let entry = describe_file(input, &listed.path, limiter, generate_md5).await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(progress) = progress {
                progress(done, total);
            }
            entry
        }
    });

    let mut entries = join_all(tasks).await;
    entries.sort_by_cached_key(|e| e.path.to_lowercase());
    entries
}

async fn describe_file(
    input: FileReportInput<'_>,
    path: &Path,
    limiter: &ConcurrencyLimiter<HashError>,
    generate_md5: bool,
) -> FileEntry {
    let relative = path.strip_prefix(input.mod_root).unwrap_or(path);
    let rel_path = relative.to_string_lossy().into_owned();

    let manifest_entry = input.manifest.get(&rel_path);
    let deployed = manifest_entry.is_some();
    let overwritten_by = manifest_entry
        .filter(|record| record.source != input.mod_id)
        .map(|record| record.source.clone());

    if !generate_md5 {
        return FileEntry {
            path: rel_path,
            deployed,
            overwritten_by,
            md5sum: Some(MD5_NOT_CALCULATED.to_string()),
            error: None,
        };
    }

    let deployed_path = input.deploy_target.join(relative);
    let deployed_path = deployed_path.as_path();
    let (md5sum, error) = match limiter.run(move || hash_file(deployed_path)).await {
        Ok(digest) => (Some(digest), None),
        Err(err) => {
            log::debug!("{}", err);
            (None, Some(err.code))
        }
    };

    FileEntry {
        path: rel_path,
        deployed,
        overwritten_by,
        md5sum,
        error,
    }
}

/// Limiter used for hashing: retries descriptor exhaustion, nothing else.
pub fn hashing_limiter(config: &ReportConfig) -> ConcurrencyLimiter<HashError> {
    ConcurrencyLimiter::new(config.concurrency, config.retry.clone(), |e: &HashError| {
        e.is_descriptor_exhaustion()
    })
    .with_min_limit(config.min_concurrency)
}
