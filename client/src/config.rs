// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;
use veilfs_blocks::MAX_BLOCK_SIZE;

/// Default block size: 128 KiB. Descriptors record the block size they were
/// written with, so readers do not depend on this value.
pub const DEFAULT_BLOCK_SIZE: u32 = 128 * 1024;

/// Runtime configuration for one store instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Block payload size in bytes. A single instance uses one block size
    /// consistently.
    pub block_size: u32,
    /// Cache bound, in entries.
    pub cache_capacity: NonZeroUsize,
    /// Worker lanes driving parallel XOR and fetch batches.
    pub worker_count: usize,
    /// Bounded submission queue; clamped to at least twice the lane count.
    pub worker_queue_capacity: usize,
    /// Recency credit (in cache ticks) protecting randomizer entries from
    /// eviction.
    pub randomizer_bias: u64,
    /// Use the value-weighted eviction score instead of plain LRU.
    pub weighted_eviction: bool,
    /// Retry budget for transient object-store failures.
    pub retry_max: u32,
    /// Initial backoff before the first retry; doubles per attempt.
    pub retry_backoff_initial_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let worker_count = num_cpus::get();
        Config {
            block_size: DEFAULT_BLOCK_SIZE,
            cache_capacity: NonZeroUsize::new(1024).expect("non-zero literal"),
            worker_count,
            worker_queue_capacity: 2 * worker_count,
            randomizer_bias: 64,
            weighted_eviction: false,
            retry_max: 3,
            retry_backoff_initial_ms: 100,
        }
    }
}

impl Config {
    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn retry_backoff_initial(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_initial_ms)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.block_size == 0 || self.block_size as usize > MAX_BLOCK_SIZE {
            return Err(Error::InvalidInput(format!(
                "block size {} outside 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.worker_count == 0 {
            return Err(Error::InvalidInput("worker count must be non-zero".into()));
        }
        Ok(())
    }
}
