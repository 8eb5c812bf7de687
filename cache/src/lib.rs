// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Bounded address-to-block cache with an embedded randomizer index.
//!
//! The cache and the index share one critical section: a randomizer entry
//! never exists in one and not the other. The index stores addresses only,
//! never blocks.

mod cache;
mod randomizer;
mod stats;

pub use cache::{BlockCache, BlockClass, EvictionMode};
pub use stats::CacheStats;
