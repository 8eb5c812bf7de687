// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use thiserror::Error;

/// Object store error
#[derive(Debug, Error)]
pub enum Error {
    /// The store reports the address as absent.
    #[error("Block not found: {0}")]
    NotFound(Cid),
    /// Returned bytes do not hash to the requested address, or a stored
    /// object failed decoding.
    #[error("Corrupt block for address {0}")]
    Corrupt(Cid),
    /// Retryable backend failure.
    #[error("Transient store failure: {0}")]
    Transient(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        use Error::*;

        match (self, other) {
            (NotFound(a), NotFound(b)) => a == b,
            (Corrupt(a), Corrupt(b)) => a == b,
            (Transient(a), Transient(b)) => a == b,
            (Io(a), Io(b)) => a.kind() == b.kind(),
            (Other(a), Other(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Error> for String {
    fn from(e: Error) -> Self {
        e.to_string()
    }
}
