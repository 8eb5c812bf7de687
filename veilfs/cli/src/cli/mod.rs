// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod file_cmd;
mod index_cmd;
mod key_cmd;
mod stats_cmd;

pub use self::file_cmd::{GetCommand, PutCommand};
pub use self::index_cmd::IndexCommand;
pub use self::key_cmd::KeygenCommand;
pub use self::stats_cmd::StatsCommand;

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use veilfs_client::{Config, VeilFs};
use veilfs_db::DiskStore;

/// CLI structure generated when interacting with the veilfs binary
#[derive(Parser)]
#[command(name = "veilfs", version = env!("CARGO_PKG_VERSION"), about)]
pub struct Cli {
    #[command(flatten)]
    pub opts: CliOpts,
    #[command(subcommand)]
    pub cmd: Subcommand,
}

/// CLI options
#[derive(Debug, clap::Args)]
pub struct CliOpts {
    /// A TOML file containing relevant configurations
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl CliOpts {
    pub fn to_config(&self) -> anyhow::Result<Config> {
        match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config at {}", path.display()))?;
                toml::from_str(&raw).context("failed to parse config")
            }
            None => Ok(Config::default()),
        }
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Index a directory tree into encrypted manifests and anonymized blocks
    Index(IndexCommand),
    /// Upload a single file, printing its descriptor address
    Put(PutCommand),
    /// Download a file by descriptor address
    Get(GetCommand),
    /// Print store usage counters
    Stats(StatsCommand),
    /// Generate a master key file for manifest encryption
    Keygen(KeygenCommand),
}

pub fn process(cmd: Subcommand, config: Config) -> anyhow::Result<()> {
    match cmd {
        Subcommand::Index(cmd) => cmd.run(config),
        Subcommand::Put(cmd) => cmd.run(config),
        Subcommand::Get(cmd) => cmd.run(config),
        Subcommand::Stats(cmd) => cmd.run(),
        Subcommand::Keygen(cmd) => cmd.run(),
    }
}

/// Opens the content store at `index` and wires a client over it.
pub(crate) fn open_client(index: &Path, config: Config) -> anyhow::Result<VeilFs<DiskStore>> {
    let store = DiskStore::open(index)
        .with_context(|| format!("failed to open store at {}", index.display()))?;
    Ok(VeilFs::new(store, config)?)
}
