// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::worker::fetch_through_cache;
use super::{CancelToken, Error, RandomizerPool, WorkerPool};
use std::sync::Arc;
use veilfs_blocks::{Block, BlockTriple};
use veilfs_cache::{BlockCache, BlockClass};
use veilfs_db::ObjectStore;

/// Applies and reverses the XOR 3-tuple transform around the object store.
///
/// Only the anonymized block is ever written for a plaintext block; the two
/// randomizers it references are shared across files. No stored block
/// contains plaintext, and deleting one randomizer only affects the
/// ciphertexts that reference it.
pub struct Anonymizer<S> {
    store: Arc<S>,
    cache: Arc<BlockCache>,
    randomizers: RandomizerPool<S>,
}

impl<S: ObjectStore + Send + Sync + 'static> Anonymizer<S> {
    pub fn new(store: Arc<S>, cache: Arc<BlockCache>) -> Self {
        let randomizers = RandomizerPool::new(store.clone(), cache.clone());
        Anonymizer {
            store,
            cache,
            randomizers,
        }
    }

    pub fn randomizers(&self) -> &RandomizerPool<S> {
        &self.randomizers
    }

    /// Forward transform for one plaintext block: pick two randomizers of
    /// the block's size, XOR, persist the anonymized result.
    pub fn anonymize(&self, plain: &Block) -> Result<BlockTriple, Error> {
        let (r1, r2) = self.randomizers.select_two(plain.size() as u32)?;
        let anonymized = plain.xor3(&r1, &r2)?;
        let addr = self.store.put_block(anonymized.data())?;
        debug_assert_eq!(&addr, anonymized.cid());
        self.cache.put(Arc::new(anonymized), BlockClass::Data);
        Ok(BlockTriple {
            data: addr,
            rand1: *r1.cid(),
            rand2: *r2.cid(),
        })
    }

    /// Inverse transform for one descriptor triple.
    pub fn deanonymize(&self, triple: &BlockTriple) -> Result<Block, Error> {
        let data = fetch_through_cache(&*self.store, &self.cache, &triple.data, BlockClass::Data)?;
        let r1 = fetch_through_cache(
            &*self.store,
            &self.cache,
            &triple.rand1,
            BlockClass::Randomizer,
        )?;
        let r2 = fetch_through_cache(
            &*self.store,
            &self.cache,
            &triple.rand2,
            BlockClass::Randomizer,
        )?;
        verify_equal_sizes(triple, &data, &r1, &r2)?;
        Ok(data.xor3(&r1, &r2)?)
    }

    /// Forward transform for a whole file: XOR fan-out through the worker
    /// pool, then store the anonymized blocks and emit triples in plaintext
    /// block order.
    pub fn anonymize_batch(
        &self,
        plain: Vec<Block>,
        pool: &WorkerPool<S>,
        cancel: &CancelToken,
    ) -> Result<Vec<BlockTriple>, Error> {
        let plain: Vec<Arc<Block>> = plain.into_iter().map(Arc::new).collect();
        let mut rand1 = Vec::with_capacity(plain.len());
        let mut rand2 = Vec::with_capacity(plain.len());
        for block in &plain {
            cancel.checkpoint()?;
            let (r1, r2) = self.randomizers.select_two(block.size() as u32)?;
            rand1.push(r1);
            rand2.push(r2);
        }
        let anonymized = pool.parallel_xor(&plain, &rand1, &rand2, cancel)?;
        let mut triples = Vec::with_capacity(anonymized.len());
        for (index, block) in anonymized.into_iter().enumerate() {
            cancel.checkpoint()?;
            let addr = self.store.put_block(block.data())?;
            debug_assert_eq!(&addr, block.cid());
            self.cache.put(Arc::new(block), BlockClass::Data);
            triples.push(BlockTriple {
                data: addr,
                rand1: *rand1[index].cid(),
                rand2: *rand2[index].cid(),
            });
        }
        Ok(triples)
    }

    /// Inverse transform for a whole descriptor: fetch fan-out, size
    /// verification, then XOR fan-out, preserving triple order.
    pub fn deanonymize_batch(
        &self,
        triples: &[BlockTriple],
        pool: &WorkerPool<S>,
        cancel: &CancelToken,
    ) -> Result<Vec<Block>, Error> {
        let addresses: Vec<_> = triples
            .iter()
            .flat_map(|t| {
                [
                    (t.data, BlockClass::Data),
                    (t.rand1, BlockClass::Randomizer),
                    (t.rand2, BlockClass::Randomizer),
                ]
            })
            .collect();
        let fetched = pool.parallel_fetch(&addresses, cancel)?;
        let mut data = Vec::with_capacity(triples.len());
        let mut rand1 = Vec::with_capacity(triples.len());
        let mut rand2 = Vec::with_capacity(triples.len());
        for (triple, chunk) in triples.iter().zip(fetched.chunks_exact(3)) {
            verify_equal_sizes(triple, &chunk[0], &chunk[1], &chunk[2])?;
            data.push(chunk[0].clone());
            rand1.push(chunk[1].clone());
            rand2.push(chunk[2].clone());
        }
        Ok(pool.parallel_xor(&data, &rand1, &rand2, cancel)?)
    }
}

// Unequal operand sizes mean the descriptor references blocks that cannot
// reconstruct a plaintext; report the anonymized address as corrupt.
fn verify_equal_sizes(
    triple: &BlockTriple,
    data: &Block,
    r1: &Block,
    r2: &Block,
) -> Result<(), Error> {
    if data.size() != r1.size() || data.size() != r2.size() {
        return Err(Error::Store(veilfs_db::Error::Corrupt(triple.data)));
    }
    Ok(())
}
