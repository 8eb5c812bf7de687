// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Client layer error
#[derive(Debug, Error)]
pub enum Error {
    /// Argument outside the allowed range.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Block(#[from] veilfs_blocks::Error),
    #[error(transparent)]
    Store(#[from] veilfs_db::Error),
    #[error(transparent)]
    Crypto(#[from] veilfs_crypto::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// A cancellation signal was honored.
    #[error("Operation cancelled")]
    Cancelled,
    /// Invariant violation; the current operation aborts without retry.
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl Error {
    /// Whether the error must abort a traversal regardless of the caller's
    /// error handler.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Fatal(_))
    }
}
