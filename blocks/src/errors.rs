// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Block layer error
#[derive(Debug, PartialEq, Error)]
pub enum Error {
    /// Payload or requested block size outside the allowed range.
    #[error("Invalid block size: {0}, maximum is {1} bytes")]
    InvalidSize(usize, usize),
    /// XOR operands of unequal length. Indicates a descriptor inconsistency
    /// or a bug upstream.
    #[error("Size mismatch between XOR operands: {0} != {1}")]
    SizeMismatch(usize, usize),
    /// Descriptor bytes failed schema or integer decoding.
    #[error("Malformed descriptor: {0}")]
    Malformed(String),
    /// Descriptor carries a schema version this build does not understand.
    #[error("Unknown descriptor schema version: {0}")]
    SchemaVersion(u32),
    /// Descriptor metadata disagrees with its triple list.
    #[error("Inconsistent descriptor: expected {expected} triples, found {found}")]
    Inconsistent { expected: u64, found: u64 },
    /// Error reading the input stream while splitting.
    #[error("Error reading input stream: {0}")]
    InputStream(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::InputStream(e.to_string())
    }
}
