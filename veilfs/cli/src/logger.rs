// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Console logging, filtered through `RUST_LOG` with an `info` default.
pub fn setup_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();
}
