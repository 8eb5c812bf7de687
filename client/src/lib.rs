// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Anonymization data plane: block splitting, randomizer selection, XOR
//! 3-tuple transforms, descriptor construction, the parallel worker pool
//! and the recursive directory processor, wired together by the [VeilFs]
//! facade.
//!
//! Nothing in this crate owns global state; every cache, pool and client is
//! an explicit instance.

mod anonymizer;
mod cancel;
mod client;
mod config;
mod errors;
mod manifest;
mod randomizer;
mod walker;
mod worker;

pub use anonymizer::Anonymizer;
pub use cancel::CancelToken;
pub use client::{Metrics, VeilFs};
pub use config::Config;
pub use errors::Error;
pub use manifest::{DirectoryManifest, EntryKind, ManifestEntry, MANIFEST_VERSION};
pub use randomizer::RandomizerPool;
pub use walker::{DirectoryProcessor, WalkOptions, WalkOutcome, WalkProgress};
pub use worker::WorkerPool;
