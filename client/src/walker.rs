// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::manifest::{DirectoryManifest, EntryKind, ManifestEntry};
use super::{CancelToken, Error, VeilFs};
use cid::Cid;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};
use veilfs_crypto::MasterKey;
use veilfs_db::ObjectStore;
use walkdir::WalkDir;

/// Name and size filters applied during traversal. Dot-prefixed entries are
/// always skipped.
#[derive(Clone, Debug, Default)]
pub struct WalkOptions {
    pub recursive: bool,
    /// Extensions to include; empty admits every extension.
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_size: Option<u64>,
}

impl WalkOptions {
    pub fn recursive() -> Self {
        WalkOptions {
            recursive: true,
            ..Default::default()
        }
    }

    /// Whether a file of `size` bytes at `path` passes the filters.
    pub fn admits(&self, path: &Path, size: u64) -> bool {
        if let Some(max) = self.max_size {
            if size > max {
                return false;
            }
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if self.exclude.iter().any(|e| e == ext) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|e| e == ext) {
            return false;
        }
        true
    }
}

/// Atomic traversal counters, readable from any thread while the walk runs.
#[derive(Debug, Default)]
pub struct WalkProgress {
    files_processed: AtomicU64,
    total_files: AtomicU64,
    bytes_processed: AtomicU64,
    total_bytes: AtomicU64,
}

impl WalkProgress {
    /// `(processed, total)` file counts.
    pub fn files(&self) -> (u64, u64) {
        (
            self.files_processed.load(Ordering::Relaxed),
            self.total_files.load(Ordering::Relaxed),
        )
    }

    /// `(processed, total)` byte counts.
    pub fn bytes(&self) -> (u64, u64) {
        (
            self.bytes_processed.load(Ordering::Relaxed),
            self.total_bytes.load(Ordering::Relaxed),
        )
    }
}

/// Result of a traversal: the root manifest address plus explicit success
/// and failure lists. Partial success is never silent.
#[derive(Debug)]
pub struct WalkOutcome {
    pub root_manifest: Cid,
    pub files: Vec<(PathBuf, Cid)>,
    pub failures: Vec<(PathBuf, String)>,
}

/// Applies the file pipeline to every regular file under a root and stores
/// one sealed manifest per directory visited.
///
/// Directory reads are single-threaded; the file payloads fan out through
/// the client's worker pool. Completed subdirectory manifests stay valid
/// even when the traversal is later cancelled.
pub struct DirectoryProcessor<'a, S> {
    client: &'a VeilFs<S>,
    master_key: MasterKey,
    options: WalkOptions,
    progress: Arc<WalkProgress>,
    cancel: CancelToken,
}

impl<'a, S: ObjectStore + Send + Sync + 'static> DirectoryProcessor<'a, S> {
    pub fn new(client: &'a VeilFs<S>, master_key: MasterKey) -> Self {
        DirectoryProcessor {
            client,
            master_key,
            options: WalkOptions::recursive(),
            progress: Arc::new(WalkProgress::default()),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn progress(&self) -> Arc<WalkProgress> {
        self.progress.clone()
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Walks `root` with the default error policy: abort on the first
    /// failure.
    pub fn process(&self, root: &Path) -> Result<WalkOutcome, Error> {
        self.process_with(root, |_, _| false)
    }

    /// Walks `root`, consulting `handler` on per-entry failures. Returning
    /// `true` skips the entry and keeps walking; `false` aborts the whole
    /// traversal. Cancellation and fatal errors always abort.
    pub fn process_with<F>(&self, root: &Path, mut handler: F) -> Result<WalkOutcome, Error>
    where
        F: FnMut(&Path, &Error) -> bool,
    {
        self.tally(root);
        let mut files = Vec::new();
        let mut failures = Vec::new();
        let root_manifest = self.process_dir(root, root, &mut handler, &mut files, &mut failures)?;
        Ok(WalkOutcome {
            root_manifest,
            files,
            failures,
        })
    }

    // Pre-pass filling the progress totals. Totals are best-effort: entries
    // that later fail stay counted.
    fn tally(&self, root: &Path) {
        let mut walk = WalkDir::new(root).min_depth(1);
        if !self.options.recursive {
            walk = walk.max_depth(1);
        }
        for entry in walk
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name()))
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(metadata) = entry.metadata() {
                if self.options.admits(entry.path(), metadata.len()) {
                    self.progress.total_files.fetch_add(1, Ordering::Relaxed);
                    self.progress
                        .total_bytes
                        .fetch_add(metadata.len(), Ordering::Relaxed);
                }
            }
        }
    }

    fn process_dir<F>(
        &self,
        root: &Path,
        dir: &Path,
        handler: &mut F,
        files: &mut Vec<(PathBuf, Cid)>,
        failures: &mut Vec<(PathBuf, String)>,
    ) -> Result<Cid, Error>
    where
        F: FnMut(&Path, &Error) -> bool,
    {
        self.cancel.checkpoint()?;
        let salt = dir
            .strip_prefix(root)
            .unwrap_or(dir)
            .to_string_lossy()
            .into_owned();
        let dir_key = self.master_key.derive_dir_key(salt.as_bytes());

        let mut children: Vec<_> = fs::read_dir(dir)?.collect::<Result<_, _>>()?;
        children.sort_by_key(|entry| entry.file_name());

        let mut manifest = DirectoryManifest::new();
        for child in children {
            self.cancel.checkpoint()?;
            let path = child.path();
            let name = child.file_name().to_string_lossy().into_owned();
            if is_hidden(child.file_name().as_os_str()) {
                continue;
            }

            // Resolve through symlinks; a dangling link is an unreadable
            // entry, not an ignorable one.
            let metadata = match fs::metadata(&path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    // Unreadable entry (permission, dangling symlink, ...).
                    let error = Error::Io(e);
                    warn!(path = %path.display(), %error, "skipping unreadable entry");
                    failures.push((path.clone(), error.to_string()));
                    if handler(&path, &error) {
                        continue;
                    }
                    return Err(error);
                }
            };
            let modified_at = modified_unix(&metadata);

            if metadata.is_dir() {
                if !self.options.recursive {
                    continue;
                }
                match self.process_dir(root, &path, handler, files, failures) {
                    Ok(child_manifest) => {
                        manifest.push(ManifestEntry::new(
                            &name,
                            &dir_key,
                            EntryKind::Dir,
                            0,
                            modified_at,
                            child_manifest,
                        )?);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        failures.push((path.clone(), e.to_string()));
                        if handler(&path, &e) {
                            continue;
                        }
                        return Err(e);
                    }
                }
            } else if metadata.is_file() {
                if !self.options.admits(&path, metadata.len()) {
                    debug!(path = %path.display(), "filtered out");
                    continue;
                }
                match self.upload_file(&path, &name) {
                    Ok(descriptor) => {
                        manifest.push(ManifestEntry::new(
                            &name,
                            &dir_key,
                            EntryKind::File,
                            metadata.len(),
                            modified_at,
                            descriptor,
                        )?);
                        files.push((path.clone(), descriptor));
                        self.progress.files_processed.fetch_add(1, Ordering::Relaxed);
                        self.progress
                            .bytes_processed
                            .fetch_add(metadata.len(), Ordering::Relaxed);
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "file failed");
                        failures.push((path.clone(), e.to_string()));
                        if handler(&path, &e) {
                            continue;
                        }
                        return Err(e);
                    }
                }
            }
            // Anything else (sockets, fifos) is ignored.
        }

        let sealed = manifest.seal(&dir_key)?;
        let cid = self.client.store().put_block(&sealed)?;
        debug!(dir = %dir.display(), %cid, entries = manifest.entries().len(), "manifest stored");
        Ok(cid)
    }

    fn upload_file(&self, path: &Path, name: &str) -> Result<Cid, Error> {
        let file = File::open(path)?;
        self.client
            .upload_with_cancel(file, name, &self.cancel)
    }

    /// Opens the sealed manifest stored for `salt` relative to the walk
    /// root. The inverse of what `process` writes, used by readers and
    /// tests.
    pub fn open_manifest(&self, manifest: &Cid, salt: &str) -> Result<DirectoryManifest, Error> {
        let sealed = self.client.store().get_block(manifest)?;
        let dir_key = self.master_key.derive_dir_key(salt.as_bytes());
        DirectoryManifest::open(&dir_key, &sealed)
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn modified_unix(metadata: &fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
