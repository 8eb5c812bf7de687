// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{CancelToken, Error};
use cid::Cid;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};
use veilfs_blocks::Block;
use veilfs_cache::{BlockCache, BlockClass};
use veilfs_db::ObjectStore;

/// One unit of work. Every job sends exactly one reply, so batch collectors
/// can count replies instead of tracking completion order.
enum Job {
    Xor {
        index: usize,
        plain: Arc<Block>,
        rand1: Arc<Block>,
        rand2: Arc<Block>,
        cancel: CancelToken,
        reply: flume::Sender<(usize, Result<Block, Error>)>,
    },
    Fetch {
        index: usize,
        cid: Cid,
        class: BlockClass,
        cancel: CancelToken,
        reply: flume::Sender<(usize, Result<Arc<Block>, Error>)>,
    },
}

/// Loads a block through the cache, falling back to the object store on a
/// miss and installing the result. Never holds the cache lock across the
/// store call.
pub(crate) fn fetch_through_cache<S: ObjectStore>(
    store: &S,
    cache: &BlockCache,
    cid: &Cid,
    class: BlockClass,
) -> Result<Arc<Block>, Error> {
    if let Some(block) = cache.get(cid) {
        return Ok(block);
    }
    let bytes = store.get_block(cid)?;
    let block = Arc::new(Block::new(bytes)?);
    cache.put(block.clone(), class);
    Ok(block)
}

/// Bounded-concurrency executor: a fixed number of worker lanes consuming a
/// bounded submission queue. Producers block when the queue is full; that
/// backpressure is the only suspension point on the submit side.
///
/// Batch operations are deterministic in output order: the i-th output
/// corresponds to the i-th input, whatever the internal completion order.
/// The first error in a batch cancels its siblings and the batch returns
/// that error with partial results discarded.
pub struct WorkerPool<S> {
    submit_tx: Option<flume::Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    _store: std::marker::PhantomData<S>,
}

impl<S: ObjectStore + Send + Sync + 'static> WorkerPool<S> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<BlockCache>,
        workers: usize,
        queue_capacity: usize,
    ) -> Result<Self, Error> {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(2 * workers);
        let (submit_tx, submit_rx) = flume::bounded(queue_capacity);
        let mut handles = Vec::with_capacity(workers);
        for lane in 0..workers {
            let rx = submit_rx.clone();
            let store = store.clone();
            let cache = cache.clone();
            let handle = thread::Builder::new()
                .name(format!("veilfs-worker-{lane}"))
                .spawn(move || worker_loop(rx, store, cache))?;
            handles.push(handle);
        }
        debug!(workers, queue_capacity, "worker pool started");
        Ok(WorkerPool {
            submit_tx: Some(submit_tx),
            handles,
            _store: std::marker::PhantomData,
        })
    }

    fn sender(&self) -> Result<&flume::Sender<Job>, Error> {
        self.submit_tx
            .as_ref()
            .ok_or_else(|| Error::Fatal("worker pool is shut down".into()))
    }

    /// XORs each plaintext block with its randomizer pair, returning the
    /// anonymized blocks in input index order.
    pub fn parallel_xor(
        &self,
        plain: &[Arc<Block>],
        rand1: &[Arc<Block>],
        rand2: &[Arc<Block>],
        cancel: &CancelToken,
    ) -> Result<Vec<Block>, Error> {
        if plain.len() != rand1.len() || plain.len() != rand2.len() {
            return Err(Error::InvalidInput(format!(
                "operand column lengths differ: {}/{}/{}",
                plain.len(),
                rand1.len(),
                rand2.len()
            )));
        }
        let batch = cancel.child();
        let (reply_tx, reply_rx) = flume::unbounded();
        let sender = self.sender()?;
        for (index, ((p, r1), r2)) in plain.iter().zip(rand1).zip(rand2).enumerate() {
            sender
                .send(Job::Xor {
                    index,
                    plain: p.clone(),
                    rand1: r1.clone(),
                    rand2: r2.clone(),
                    cancel: batch.clone(),
                    reply: reply_tx.clone(),
                })
                .map_err(|_| Error::Fatal("worker pool disconnected".into()))?;
        }
        drop(reply_tx);
        collect_in_order(plain.len(), &reply_rx, &batch)
    }

    /// Fetches the addressed blocks through the cache, returning them in
    /// input index order. Cache hits short-circuit the store.
    pub fn parallel_fetch(
        &self,
        addresses: &[(Cid, BlockClass)],
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<Block>>, Error> {
        let batch = cancel.child();
        let (reply_tx, reply_rx) = flume::unbounded();
        let sender = self.sender()?;
        for (index, (cid, class)) in addresses.iter().enumerate() {
            sender
                .send(Job::Fetch {
                    index,
                    cid: *cid,
                    class: *class,
                    cancel: batch.clone(),
                    reply: reply_tx.clone(),
                })
                .map_err(|_| Error::Fatal("worker pool disconnected".into()))?;
        }
        drop(reply_tx);
        collect_in_order(addresses.len(), &reply_rx, &batch)
    }

    /// Stops accepting submissions and drains in-flight work.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.submit_tx.take() {
            drop(tx);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<S> Drop for WorkerPool<S> {
    fn drop(&mut self) {
        if let Some(tx) = self.submit_tx.take() {
            drop(tx);
        }
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

fn collect_in_order<T>(
    expected: usize,
    reply_rx: &flume::Receiver<(usize, Result<T, Error>)>,
    batch: &CancelToken,
) -> Result<Vec<T>, Error> {
    let mut slots: Vec<Option<T>> = Vec::with_capacity(expected);
    slots.resize_with(expected, || None);
    let mut first_error: Option<Error> = None;
    for _ in 0..expected {
        let (index, result) = reply_rx
            .recv()
            .map_err(|_| Error::Fatal("worker pool disconnected".into()))?;
        match result {
            Ok(value) => slots[index] = Some(value),
            Err(e) => {
                if first_error.is_none() {
                    // First error wins; siblings observe the batch token at
                    // their next checkpoint and abandon.
                    batch.cancel();
                    first_error = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| Error::Fatal("missing batch slot".into())))
        .collect()
}

fn worker_loop<S: ObjectStore>(rx: flume::Receiver<Job>, store: Arc<S>, cache: Arc<BlockCache>) {
    while let Ok(job) = rx.recv() {
        match job {
            Job::Xor {
                index,
                plain,
                rand1,
                rand2,
                cancel,
                reply,
            } => {
                let result = if cancel.is_cancelled() {
                    Err(Error::Cancelled)
                } else {
                    plain.xor3(&rand1, &rand2).map_err(Error::from)
                };
                trace!(index, "xor job finished");
                let _ = reply.send((index, result));
            }
            Job::Fetch {
                index,
                cid,
                class,
                cancel,
                reply,
            } => {
                let result = if cancel.is_cancelled() {
                    Err(Error::Cancelled)
                } else {
                    fetch_through_cache(store.as_ref(), cache.as_ref(), &cid, class)
                };
                trace!(index, %cid, "fetch job finished");
                let _ = reply.send((index, result));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use veilfs_db::MemoryDB;

    fn pool(workers: usize) -> (WorkerPool<MemoryDB>, Arc<MemoryDB>, Arc<BlockCache>) {
        let store = Arc::new(MemoryDB::default());
        let cache = Arc::new(BlockCache::default());
        let pool = WorkerPool::new(store.clone(), cache.clone(), workers, 0).unwrap();
        (pool, store, cache)
    }

    fn arc_block(data: Vec<u8>) -> Arc<Block> {
        Arc::new(Block::new(data).unwrap())
    }

    #[test]
    fn xor_results_follow_input_order() {
        let (pool, _, _) = pool(4);
        let cancel = CancelToken::new();
        let plain: Vec<_> = (0..64u8).map(|i| arc_block(vec![i; 32])).collect();
        let rand1: Vec<_> = (0..64u8).map(|i| arc_block(vec![i ^ 0x5a; 32])).collect();
        let rand2: Vec<_> = (0..64u8).map(|i| arc_block(vec![i ^ 0xa5; 32])).collect();

        let out = pool.parallel_xor(&plain, &rand1, &rand2, &cancel).unwrap();
        for (i, block) in out.iter().enumerate() {
            let expected = plain[i].xor3(&rand1[i], &rand2[i]).unwrap();
            assert_eq!(block, &expected);
        }
    }

    #[test]
    fn mismatched_columns_are_rejected() {
        let (pool, _, _) = pool(2);
        let cancel = CancelToken::new();
        let a = vec![arc_block(vec![1; 8])];
        assert!(matches!(
            pool.parallel_xor(&a, &[], &[], &cancel),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn first_error_cancels_the_batch() {
        let (pool, _, _) = pool(2);
        let cancel = CancelToken::new();
        let plain = vec![arc_block(vec![1; 8]), arc_block(vec![2; 8])];
        let rand1 = vec![arc_block(vec![3; 8]), arc_block(vec![4; 7])];
        let rand2 = vec![arc_block(vec![5; 8]), arc_block(vec![6; 8])];
        assert!(matches!(
            pool.parallel_xor(&plain, &rand1, &rand2, &cancel),
            Err(Error::Block(veilfs_blocks::Error::SizeMismatch(8, 7)))
        ));
    }

    #[test]
    fn cancelled_batch_returns_cancelled() {
        let (pool, _, _) = pool(2);
        let cancel = CancelToken::new();
        cancel.cancel();
        let plain = vec![arc_block(vec![1; 8])];
        let rand = vec![arc_block(vec![2; 8])];
        assert!(matches!(
            pool.parallel_xor(&plain, &rand.clone(), &rand, &cancel),
            Err(Error::Cancelled)
        ));
    }

    #[test]
    fn fetch_prefers_the_cache() {
        let (pool, store, cache) = pool(2);
        let cancel = CancelToken::new();
        let cached = arc_block(vec![7; 16]);
        cache.put(cached.clone(), BlockClass::Data);
        let stored_cid = store.put_block(&[9u8; 16]).unwrap();

        let out = pool
            .parallel_fetch(
                &[(*cached.cid(), BlockClass::Data), (stored_cid, BlockClass::Data)],
                &cancel,
            )
            .unwrap();
        assert_eq!(out[0], cached);
        assert_eq!(out[1].data(), &[9u8; 16]);
        assert!(cache.contains(&stored_cid), "miss populates the cache");
    }

    #[test]
    fn fetch_surfaces_missing_blocks() {
        let (pool, _, _) = pool(2);
        let cancel = CancelToken::new();
        let absent = veilfs_encoding::cid_from_raw(b"absent");
        assert!(matches!(
            pool.parallel_fetch(&[(absent, BlockClass::Data)], &cancel),
            Err(Error::Store(veilfs_db::Error::NotFound(_)))
        ));
    }

    #[test]
    fn shutdown_drains_and_joins() {
        let (mut pool, _, _) = pool(2);
        pool.shutdown();
        assert!(matches!(
            pool.parallel_fetch(&[], &CancelToken::new()),
            Err(Error::Fatal(_))
        ));
    }

    // Concurrent batches from many submitters stay order-deterministic.
    #[quickcheck]
    fn concurrent_batches_keep_order(seed: u8) -> bool {
        let (pool, _, _) = pool(4);
        let pool = Arc::new(pool);
        let mut threads = Vec::new();
        for t in 0..4u8 {
            let pool = pool.clone();
            threads.push(thread::spawn(move || {
                let cancel = CancelToken::new();
                let plain: Vec<_> = (0..16u8)
                    .map(|i| arc_block(vec![i.wrapping_add(seed).wrapping_add(t); 16]))
                    .collect();
                let rand1: Vec<_> = (0..16u8).map(|i| arc_block(vec![i ^ 0x33; 16])).collect();
                let rand2: Vec<_> = (0..16u8).map(|i| arc_block(vec![i ^ 0xcc; 16])).collect();
                let out = pool.parallel_xor(&plain, &rand1, &rand2, &cancel).unwrap();
                out.iter()
                    .enumerate()
                    .all(|(i, b)| b == &plain[i].xor3(&rand1[i], &rand2[i]).unwrap())
            }));
        }
        threads.into_iter().all(|t| t.join().unwrap())
    }
}
