// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::randomizer::RandomizerIndex;
use crate::CacheStats;
use ahash::HashMap;
use cid::Cid;
use nonzero_ext::nonzero;
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::trace;
use veilfs_blocks::Block;

const RECENCY_WEIGHT: f64 = 1.0;
const FREQUENCY_WEIGHT: f64 = 0.5;

/// How a cached block is used. Randomizer-class entries are additionally
/// tracked by the randomizer index and carry an eviction bias.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockClass {
    Data,
    Randomizer,
    Descriptor,
}

impl BlockClass {
    fn weight(self) -> f64 {
        match self {
            BlockClass::Data => 0.0,
            BlockClass::Descriptor => 1.0,
            BlockClass::Randomizer => 2.0,
        }
    }
}

/// Eviction policy. `Lru` is the default: least-recently-used, ties broken
/// by lowest use count, then oldest insertion. `Weighted` folds recency,
/// frequency and class into a scalar score and evicts the lowest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionMode {
    #[default]
    Lru,
    Weighted,
}

#[derive(Debug)]
struct CacheEntry {
    block: Arc<Block>,
    class: BlockClass,
    inserted_at: u64,
    last_used_at: u64,
    use_count: u64,
    // Weighted-mode score, invalidated whenever a counter changes and
    // recomputed lazily during the next eviction scan.
    score: Option<f64>,
}

impl CacheEntry {
    fn scored(&mut self, clock: u64) -> f64 {
        *self.score.get_or_insert_with(|| {
            let age = (clock - self.last_used_at) as f64;
            RECENCY_WEIGHT / (1.0 + age)
                + FREQUENCY_WEIGHT * (1.0 + self.use_count as f64).ln()
                + self.class.weight()
        })
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<Cid, CacheEntry>,
    randomizers: RandomizerIndex,
    // Logical clock; every touching operation ticks it. Recency and age are
    // expressed in ticks, never wall time.
    clock: u64,
}

/// Bounded mapping of content address to block, shared between uploads and
/// downloads. The embedded randomizer index mutates only under the same
/// critical section as the primary map, so cross-view updates are atomic.
///
/// `get` and `stats` never contend: counters live outside the mutex.
/// `put` never fails; eviction absorbs pressure.
#[derive(Debug)]
pub struct BlockCache {
    inner: Mutex<Inner>,
    capacity: NonZeroUsize,
    mode: EvictionMode,
    randomizer_bias: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    len: AtomicUsize,
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new(nonzero!(1024usize))
    }
}

impl BlockCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        BlockCache {
            inner: Mutex::new(Inner::default()),
            capacity,
            mode: EvictionMode::default(),
            randomizer_bias: 64,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            len: AtomicUsize::new(0),
        }
    }

    pub fn with_mode(mut self, mode: EvictionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Recency credit, in logical ticks, granted to randomizer-class entries
    /// during LRU eviction so the randomizer working set outlives upload
    /// bursts.
    pub fn with_randomizer_bias(mut self, bias: u64) -> Self {
        self.randomizer_bias = bias;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Returns the cached block and refreshes its recency and use count.
    /// An absent key is a miss, not an error.
    pub fn get(&self, cid: &Cid) -> Option<Arc<Block>> {
        let found = {
            let mut guard = self.inner.lock();
            let Inner {
                entries,
                randomizers,
                clock,
            } = &mut *guard;
            entries.get_mut(cid).map(|entry| {
                *clock += 1;
                entry.last_used_at = *clock;
                let old = entry.use_count;
                entry.use_count += 1;
                entry.score = None;
                if entry.class == BlockClass::Randomizer {
                    randomizers.bump(entry.block.size() as u32, old, entry.use_count, cid);
                }
                entry.block.clone()
            })
        };
        match &found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Inserts or refreshes an entry, evicting per policy until the cache is
    /// within capacity. The address is the block's own content address.
    pub fn put(&self, block: Arc<Block>, class: BlockClass) {
        let mut evicted = 0u64;
        {
            let mut guard = self.inner.lock();
            let inner = &mut *guard;
            inner.clock += 1;
            let clock = inner.clock;
            let cid = *block.cid();
            let size = block.size() as u32;
            match inner.entries.entry(cid) {
                Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    entry.last_used_at = clock;
                    entry.score = None;
                    if entry.class != class {
                        // Reclassification moves the entry in or out of the
                        // randomizer index atomically.
                        if entry.class == BlockClass::Randomizer {
                            inner.randomizers.remove(size, entry.use_count, &cid);
                        }
                        if class == BlockClass::Randomizer {
                            inner.randomizers.insert(size, entry.use_count, cid);
                        }
                        entry.class = class;
                    }
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(CacheEntry {
                        block,
                        class,
                        inserted_at: clock,
                        last_used_at: clock,
                        use_count: 1,
                        score: None,
                    });
                    if class == BlockClass::Randomizer {
                        inner.randomizers.insert(size, 1, cid);
                    }
                }
            }
            while inner.entries.len() > self.capacity.get() {
                if let Some(victim) = self.pick_victim(inner) {
                    if let Some(entry) = inner.entries.remove(&victim) {
                        if entry.class == BlockClass::Randomizer {
                            inner.randomizers.remove(
                                entry.block.size() as u32,
                                entry.use_count,
                                &victim,
                            );
                        }
                        trace!(%victim, "evicted cache entry");
                        evicted += 1;
                    }
                } else {
                    break;
                }
            }
            self.len.store(inner.entries.len(), Ordering::Relaxed);
        }
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
        }
    }

    fn pick_victim(&self, inner: &mut Inner) -> Option<Cid> {
        match self.mode {
            EvictionMode::Lru => {
                let bias = self.randomizer_bias;
                inner
                    .entries
                    .iter()
                    .min_by_key(|(cid, e)| {
                        let effective_recency = if e.class == BlockClass::Randomizer {
                            e.last_used_at.saturating_add(bias)
                        } else {
                            e.last_used_at
                        };
                        (effective_recency, e.use_count, e.inserted_at, **cid)
                    })
                    .map(|(cid, _)| *cid)
            }
            EvictionMode::Weighted => {
                let clock = inner.clock;
                inner
                    .entries
                    .iter_mut()
                    .map(|(cid, e)| (*cid, e.scored(clock)))
                    .min_by(|(a_cid, a), (b_cid, b)| {
                        a.partial_cmp(b)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then_with(|| a_cid.cmp(b_cid))
                    })
                    .map(|(cid, _)| cid)
            }
        }
    }

    /// Explicitly drops an entry, keeping the randomizer index in sync.
    pub fn remove(&self, cid: &Cid) -> Option<Arc<Block>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let removed = match inner.entries.remove(cid) {
            Some(entry) => {
                if entry.class == BlockClass::Randomizer {
                    inner
                        .randomizers
                        .remove(entry.block.size() as u32, entry.use_count, cid);
                }
                Some(entry.block)
            }
            None => None,
        };
        self.len.store(inner.entries.len(), Ordering::Relaxed);
        removed
    }

    pub fn contains(&self, cid: &Cid) -> bool {
        self.inner.lock().entries.contains_key(cid)
    }

    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counter snapshot; does not take the cache lock.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            size: self.len.load(Ordering::Relaxed),
        }
    }

    /// The `want` most popular randomizer addresses of exactly `size` bytes.
    pub fn best_randomizers(&self, size: u32, want: usize) -> Vec<Cid> {
        self.inner.lock().randomizers.best(size, want)
    }

    /// Number of randomizer candidates of exactly `size` bytes.
    pub fn randomizer_candidates(&self, size: u32) -> usize {
        self.inner.lock().randomizers.candidates(size)
    }
}
