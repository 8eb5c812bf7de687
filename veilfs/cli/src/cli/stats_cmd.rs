// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use human_repr::HumanCount;
use std::path::PathBuf;

#[derive(Debug, clap::Args)]
pub struct StatsCommand {
    /// Store directory
    #[arg(long)]
    index: PathBuf,
}

impl StatsCommand {
    pub fn run(&self) -> anyhow::Result<()> {
        let mut blocks = 0u64;
        let mut bytes = 0u64;
        for entry in walkdir::WalkDir::new(&self.index) {
            let entry = entry?;
            if entry.file_type().is_file() {
                blocks += 1;
                bytes += entry.metadata()?.len();
            }
        }
        println!("store: {}", self.index.display());
        println!("blocks: {blocks}");
        println!("bytes: {}", bytes.human_count_bytes());
        Ok(())
    }
}
