// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, ObjectStore, Store};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Decorator retrying transient backend failures with exponential backoff.
/// `NotFound` and `Corrupt` are not retryable and surface immediately.
#[derive(Debug, Clone)]
pub struct RetryStore<S> {
    inner: S,
    retry_max: u32,
    backoff_initial: Duration,
}

impl<S> RetryStore<S> {
    pub fn new(inner: S, retry_max: u32, backoff_initial: Duration) -> Self {
        RetryStore {
            inner,
            retry_max,
            backoff_initial,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn with_retry<T>(&self, mut op: impl FnMut() -> Result<T, Error>) -> Result<T, Error> {
        let mut backoff = self.backoff_initial;
        let mut attempt = 0;
        loop {
            match op() {
                Err(Error::Transient(reason)) if attempt < self.retry_max => {
                    attempt += 1;
                    debug!(attempt, %reason, "retrying transient store failure");
                    thread::sleep(backoff);
                    backoff = backoff.saturating_mul(2);
                }
                other => return other,
            }
        }
    }
}

impl<S: Store> Store for RetryStore<S> {
    fn read<K>(&self, key: K) -> Result<Option<Vec<u8>>, Error>
    where
        K: AsRef<[u8]>,
    {
        self.with_retry(|| self.inner.read(&key))
    }

    fn write<K, V>(&self, key: K, value: V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.with_retry(|| self.inner.write(&key, &value))
    }

    fn delete<K>(&self, key: K) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
    {
        self.with_retry(|| self.inner.delete(&key))
    }

    fn exists<K>(&self, key: K) -> Result<bool, Error>
    where
        K: AsRef<[u8]>,
    {
        self.with_retry(|| self.inner.exists(&key))
    }
}

impl<S: Store> ObjectStore for RetryStore<S> {}
