// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::open_client;
use anyhow::Context;
use cid::Cid;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;
use veilfs_client::{CancelToken, Config};

#[derive(Debug, clap::Args)]
pub struct PutCommand {
    /// Store directory
    #[arg(long)]
    index: PathBuf,
    /// File to upload
    file: PathBuf,
}

impl PutCommand {
    pub fn run(&self, config: Config) -> anyhow::Result<()> {
        let client = open_client(&self.index, config)?;
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let reader = BufReader::new(
            File::open(&self.file)
                .with_context(|| format!("failed to open {}", self.file.display()))?,
        );
        let descriptor = client.upload(reader, &name)?;
        info!(file = %self.file.display(), %descriptor, "upload complete");
        println!("{descriptor}");
        Ok(())
    }
}

#[derive(Debug, clap::Args)]
pub struct GetCommand {
    /// Store directory
    #[arg(long)]
    index: PathBuf,
    /// Descriptor address to download
    cid: String,
    /// Output file path
    #[arg(short, long)]
    output: PathBuf,
}

impl GetCommand {
    pub fn run(&self, config: Config) -> anyhow::Result<()> {
        let client = open_client(&self.index, config)?;
        let descriptor = Cid::from_str(&self.cid).context("invalid descriptor address")?;
        let mut writer = BufWriter::new(
            File::create(&self.output)
                .with_context(|| format!("failed to create {}", self.output.display()))?,
        );
        client.download_with_cancel(&descriptor, &mut writer, &CancelToken::new())?;
        writer.flush()?;
        info!(output = %self.output.display(), "download complete");
        Ok(())
    }
}
