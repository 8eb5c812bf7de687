// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod cli;
mod logger;

use clap::Parser;
use cli::{process, Cli};

fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    let Cli { opts, cmd } = Cli::parse();
    let config = opts.to_config()?;
    process(cmd, config)
}
