// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use anyhow::{bail, Context};
use std::path::PathBuf;
use tracing::info;
use veilfs_crypto::MasterKey;

#[derive(Debug, clap::Args)]
pub struct KeygenCommand {
    /// Destination for the generated key file
    #[arg(short, long)]
    output: PathBuf,
}

impl KeygenCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        if self.output.exists() {
            bail!("refusing to overwrite {}", self.output.display());
        }
        let key = MasterKey::generate();
        key.persist(&self.output)
            .with_context(|| format!("failed to write {}", self.output.display()))?;
        info!(path = %self.output.display(), "master key written");
        Ok(())
    }
}
