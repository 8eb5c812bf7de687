// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::open_client;
use anyhow::{bail, Context};
use human_repr::HumanCount;
use std::path::PathBuf;
use tracing::{info, warn};
use veilfs_client::{Config, DirectoryProcessor, WalkOptions};
use veilfs_crypto::MasterKey;

#[derive(Debug, clap::Args)]
pub struct IndexCommand {
    /// Directory tree to index
    #[arg(long)]
    source: PathBuf,
    /// Store directory receiving blocks and manifests
    #[arg(long)]
    index: PathBuf,
    /// Master key file for manifest encryption (see `veilfs keygen`)
    #[arg(long)]
    key: PathBuf,
    /// Override the configured block size in bytes
    #[arg(long)]
    block_size: Option<u32>,
    /// File extensions to include; defaults to all
    #[arg(long)]
    include: Vec<String>,
    /// File extensions to exclude
    #[arg(long)]
    exclude: Vec<String>,
    /// Skip files larger than this many bytes
    #[arg(long)]
    max_size: Option<u64>,
    /// List what would be indexed without writing anything
    #[arg(long)]
    dry_run: bool,
    /// Descend into subdirectories (default: true)
    #[arg(long)]
    recursive: Option<bool>,
}

impl IndexCommand {
    pub fn run(&self, mut config: Config) -> anyhow::Result<()> {
        if let Some(block_size) = self.block_size {
            config.block_size = block_size;
        }
        let options = WalkOptions {
            recursive: self.recursive.unwrap_or(true),
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            max_size: self.max_size,
        };

        if self.dry_run {
            return self.dry_run_listing(&options);
        }

        let master_key = MasterKey::load(&self.key)
            .with_context(|| format!("failed to load key from {}", self.key.display()))?;
        let client = open_client(&self.index, config)?;
        let processor =
            DirectoryProcessor::new(&client, master_key).with_options(options);

        let outcome = processor.process_with(&self.source, |path, error| {
            warn!(path = %path.display(), %error, "skipping entry");
            true
        })?;

        let (files, _) = processor.progress().files();
        let (bytes, _) = processor.progress().bytes();
        info!(
            files,
            bytes = %bytes.human_count_bytes(),
            manifest = %outcome.root_manifest,
            "index complete"
        );
        println!("{}", outcome.root_manifest);

        if !outcome.failures.is_empty() {
            for (path, reason) in &outcome.failures {
                warn!(path = %path.display(), %reason, "entry failed");
            }
            bail!("{} entries failed to index", outcome.failures.len());
        }
        Ok(())
    }

    fn dry_run_listing(&self, options: &WalkOptions) -> anyhow::Result<()> {
        let mut walk = walkdir::WalkDir::new(&self.source).min_depth(1);
        if !self.recursive.unwrap_or(true) {
            walk = walk.max_depth(1);
        }
        let mut total = 0u64;
        for entry in walk
            .into_iter()
            .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'))
        {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let size = entry.metadata()?.len();
            if options.admits(entry.path(), size) {
                println!("{}", entry.path().display());
                total += size;
            }
        }
        info!(bytes = %total.human_count_bytes(), "dry run, nothing written");
        Ok(())
    }
}
