// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use veilfs_blocks::Block;
use veilfs_cache::{BlockCache, BlockClass};
use veilfs_crypto::random_block_bytes;
use veilfs_db::ObjectStore;

/// Selects randomizers for anonymization, preferring the most reused
/// candidates of the right size and synthesizing fresh ones from OS entropy
/// when the cache cannot provide two.
///
/// Preferring popular randomizers maximizes block reuse across files;
/// distinctness of the returned pair avoids the `a ^ a = 0` identity.
pub struct RandomizerPool<S> {
    store: Arc<S>,
    cache: Arc<BlockCache>,
    synthesized: AtomicU64,
}

impl<S: ObjectStore> RandomizerPool<S> {
    pub fn new(store: Arc<S>, cache: Arc<BlockCache>) -> Self {
        RandomizerPool {
            store,
            cache,
            synthesized: AtomicU64::new(0),
        }
    }

    /// Two distinct randomizer blocks of exactly `size` bytes, most popular
    /// first. Selection counts as use: both blocks' use counts are bumped.
    pub fn select_two(&self, size: u32) -> Result<(Arc<Block>, Arc<Block>), Error> {
        if size == 0 {
            return Err(Error::InvalidInput(
                "zero-size randomizer request".to_string(),
            ));
        }
        let mut chosen = self.cache.best_randomizers(size, 2);
        while chosen.len() < 2 {
            let block = Arc::new(Block::new(random_block_bytes(size as usize))?);
            if chosen.contains(block.cid()) {
                continue;
            }
            // Persist before registering: a randomizer must never be
            // selectable without a stored copy backing it.
            self.store.put_block(block.data())?;
            self.cache.put(block.clone(), BlockClass::Randomizer);
            self.synthesized.fetch_add(1, Ordering::Relaxed);
            debug!(size, cid = %block.cid(), "synthesized randomizer");
            chosen.push(*block.cid());
        }
        let r1 = self.load(&chosen[0], size)?;
        let r2 = self.load(&chosen[1], size)?;
        Ok((r1, r2))
    }

    /// Randomizers synthesized since this pool was created.
    pub fn synthesized(&self) -> u64 {
        self.synthesized.load(Ordering::Relaxed)
    }

    // Loads a selected randomizer, bumping its use count. Selection raced
    // against eviction falls back to the stored copy.
    fn load(&self, cid: &cid::Cid, size: u32) -> Result<Arc<Block>, Error> {
        if let Some(block) = self.cache.get(cid) {
            return Ok(block);
        }
        let bytes = self.store.get_block(cid)?;
        let block = Arc::new(Block::new(bytes)?);
        if block.size() != size as usize {
            return Err(Error::Fatal(format!(
                "randomizer {cid} has size {}, expected {size}",
                block.size()
            )));
        }
        self.cache.put(block.clone(), BlockClass::Randomizer);
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilfs_db::MemoryDB;

    fn pool() -> RandomizerPool<MemoryDB> {
        RandomizerPool::new(Arc::new(MemoryDB::default()), Arc::new(BlockCache::default()))
    }

    #[test]
    fn zero_size_request_is_invalid() {
        assert!(matches!(
            pool().select_two(0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn synthesizes_when_the_cache_is_cold() {
        let pool = pool();
        let (r1, r2) = pool.select_two(64).unwrap();
        assert_ne!(r1.cid(), r2.cid());
        assert_eq!(r1.size(), 64);
        assert_eq!(r2.size(), 64);
        assert_eq!(pool.synthesized(), 2);
        // Both synthesized randomizers are backed by the store.
        assert!(pool.store.has(r1.cid()).unwrap());
        assert!(pool.store.has(r2.cid()).unwrap());
    }

    #[test]
    fn reuses_existing_randomizers() {
        let pool = pool();
        let (a1, a2) = pool.select_two(64).unwrap();
        let (b1, b2) = pool.select_two(64).unwrap();
        let first: std::collections::BTreeSet<_> = [a1.cid(), a2.cid()].into_iter().collect();
        let second: std::collections::BTreeSet<_> = [b1.cid(), b2.cid()].into_iter().collect();
        assert_eq!(first, second, "second selection reuses the pool");
        assert_eq!(pool.synthesized(), 2);
    }

    #[test]
    fn sizes_never_mix() {
        let pool = pool();
        let (small, _) = pool.select_two(16).unwrap();
        let (large, _) = pool.select_two(32).unwrap();
        assert_eq!(small.size(), 16);
        assert_eq!(large.size(), 32);
        assert_ne!(small.cid(), large.cid());
    }

    #[test]
    fn selection_counts_as_use() {
        let pool = pool();
        let (r1, _) = pool.select_two(64).unwrap();
        let size = r1.size() as u32;
        // The pair is ranked ahead of a fresh candidate on the next query.
        let best = pool.cache.best_randomizers(size, 2);
        assert!(best.contains(r1.cid()));
    }
}
