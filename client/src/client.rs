// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Anonymizer, CancelToken, Config, Error, WorkerPool};
use cid::Cid;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use veilfs_blocks::{assemble, Block, Descriptor, Splitter};
use veilfs_cache::{BlockCache, BlockClass, CacheStats, EvictionMode};
use veilfs_db::ObjectStore;

/// Counter snapshot over one client instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct Metrics {
    pub cache: CacheStats,
    pub uploads: u64,
    pub downloads: u64,
    pub randomizers_synthesized: u64,
}

/// Client facade wiring splitter, anonymizer, worker pool, cache and object
/// store into the two end-user operations: `upload` a stream to a
/// descriptor address, `download` a descriptor address back to bytes.
///
/// An upload is not atomic across the object store: anonymized blocks may
/// persist on failure, but the descriptor is only written once every triple
/// is stored, so no recoverable handle exists for a failed upload.
pub struct VeilFs<S> {
    store: Arc<S>,
    cache: Arc<BlockCache>,
    anonymizer: Anonymizer<S>,
    pool: WorkerPool<S>,
    config: Config,
    uploads: AtomicU64,
    downloads: AtomicU64,
}

impl<S: ObjectStore + Send + Sync + 'static> VeilFs<S> {
    pub fn new(store: S, config: Config) -> Result<Self, Error> {
        config.validate()?;
        let store = Arc::new(store);
        let mode = if config.weighted_eviction {
            EvictionMode::Weighted
        } else {
            EvictionMode::Lru
        };
        let cache = Arc::new(
            BlockCache::new(config.cache_capacity)
                .with_mode(mode)
                .with_randomizer_bias(config.randomizer_bias),
        );
        let pool = WorkerPool::new(
            store.clone(),
            cache.clone(),
            config.worker_count,
            config.worker_queue_capacity,
        )?;
        let anonymizer = Anonymizer::new(store.clone(), cache.clone());
        Ok(VeilFs {
            store,
            cache,
            anonymizer,
            pool,
            config,
            uploads: AtomicU64::new(0),
            downloads: AtomicU64::new(0),
        })
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<BlockCache> {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Uploads a byte stream, returning the descriptor address. Empty input
    /// and empty names are rejected.
    pub fn upload<R: Read>(&self, reader: R, name: &str) -> Result<Cid, Error> {
        self.upload_with_cancel(reader, name, &CancelToken::new())
    }

    pub fn upload_with_cancel<R: Read>(
        &self,
        reader: R,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Cid, Error> {
        if name.is_empty() {
            return Err(Error::InvalidInput("empty file name".to_string()));
        }
        cancel.checkpoint()?;

        let mut splitter = Splitter::new(reader, self.config.block_size)?;
        let mut blocks = Vec::new();
        for block in &mut splitter {
            cancel.checkpoint()?;
            blocks.push(block?);
        }
        let file_size = splitter.total_read();
        if blocks.is_empty() {
            return Err(Error::InvalidInput("empty input stream".to_string()));
        }
        debug!(name, file_size, blocks = blocks.len(), "split input stream");

        let triples = self.anonymizer.anonymize_batch(blocks, &self.pool, cancel)?;

        let mut descriptor = Descriptor::new(
            name.to_string(),
            file_size,
            self.config.block_size,
            unix_now(),
        );
        for triple in triples {
            descriptor.add_triple(triple.data, triple.rand1, triple.rand2);
        }
        descriptor.validate()?;

        // The descriptor is written last; everything before this point is
        // recoverable garbage, not a file handle.
        cancel.checkpoint()?;
        let cid = self.store.put_obj(&descriptor)?;
        if let Ok(bytes) = descriptor.to_bytes() {
            if let Ok(block) = Block::new_cbor(bytes) {
                self.cache.put(Arc::new(block), BlockClass::Descriptor);
            }
        }
        self.uploads.fetch_add(1, Ordering::Relaxed);
        debug!(name, %cid, "upload complete");
        Ok(cid)
    }

    /// Downloads a descriptor address back into memory.
    pub fn download(&self, descriptor: &Cid) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.download_with_cancel(descriptor, &mut out, &CancelToken::new())?;
        Ok(out)
    }

    /// Streams a download into `writer`. Nothing is written until every
    /// block of the file is recovered, so a failed download emits no bytes.
    pub fn download_with_cancel<W: Write>(
        &self,
        descriptor: &Cid,
        writer: &mut W,
        cancel: &CancelToken,
    ) -> Result<(), Error> {
        cancel.checkpoint()?;
        let descriptor = self.load_descriptor(descriptor)?;
        let plain = self
            .anonymizer
            .deanonymize_batch(descriptor.triples(), &self.pool, cancel)?;
        assemble(&plain, descriptor.file_size(), writer)?;
        self.downloads.fetch_add(1, Ordering::Relaxed);
        debug!(
            name = descriptor.file_name(),
            file_size = descriptor.file_size(),
            "download complete"
        );
        Ok(())
    }

    /// Fetches and validates a descriptor by address.
    pub fn load_descriptor(&self, cid: &Cid) -> Result<Descriptor, Error> {
        if let Some(block) = self.cache.get(cid) {
            return Ok(Descriptor::from_bytes(block.data())?);
        }
        let bytes = self.store.get_block(cid)?;
        let descriptor = Descriptor::from_bytes(&bytes)?;
        if let Ok(block) = Block::new_cbor(bytes) {
            self.cache.put(Arc::new(block), BlockClass::Descriptor);
        }
        Ok(descriptor)
    }

    /// Exposes randomizer selection, used by the directory processor and by
    /// reuse tests.
    pub fn select_two_randomizers(&self, size: u32) -> Result<(Arc<Block>, Arc<Block>), Error> {
        self.anonymizer.randomizers().select_two(size)
    }

    /// Cache and client counter snapshot.
    pub fn metrics(&self) -> Metrics {
        Metrics {
            cache: self.cache.stats(),
            uploads: self.uploads.load(Ordering::Relaxed),
            downloads: self.downloads.load(Ordering::Relaxed),
            randomizers_synthesized: self.anonymizer.randomizers().synthesized(),
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
