// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Cooperative cancellation flag propagated through worker submissions.
/// Long-running loops check it between blocks; in-flight block operations
/// finish their current block, then stop.
///
/// A child token observes its parent, so a batch can be cancelled on first
/// error without disturbing the operation-wide token.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    parent: Option<Box<CancelToken>>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that is cancelled when either it or `self` is cancelled.
    pub fn child(&self) -> CancelToken {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            parent: Some(Box::new(self.clone())),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
            || self
                .parent
                .as_ref()
                .map(|p| p.is_cancelled())
                .unwrap_or(false)
    }

    /// Arms the token at a deadline. Timeouts are cancellation with a timer.
    pub fn cancel_after(&self, delay: Duration) {
        let token = self.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            token.cancel();
        });
    }

    /// Checkpoint between blocks: returns `Cancelled` once the signal is
    /// observed.
    pub fn checkpoint(&self) -> Result<(), Error> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
