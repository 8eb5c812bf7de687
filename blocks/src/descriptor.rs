// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{block_count, Error};
use cid::Cid;
use veilfs_encoding::tuple::*;
use veilfs_encoding::Cbor;

/// Current descriptor schema version.
pub const DESCRIPTOR_VERSION: u32 = 1;

/// One anonymized block reference: the stored XOR block plus the two
/// randomizers that reconstruct the plaintext at this position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct BlockTriple {
    pub data: Cid,
    pub rand1: Cid,
    pub rand2: Cid,
}

impl Cbor for BlockTriple {}

/// Content-addressed record enumerating the block triples and metadata
/// needed to reconstruct one file.
///
/// The wire form is DAG-CBOR with tuple (fixed-order) fields, so
/// re-serialization is byte-identical and the descriptor's own content
/// address is deterministic. The descriptor is stored as a block; its
/// address is the file handle handed back to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct Descriptor {
    version: u32,
    file_name: String,
    file_size: u64,
    block_size: u32,
    created_at: i64,
    triples: Vec<BlockTriple>,
}

impl Cbor for Descriptor {}

impl Descriptor {
    pub fn new(file_name: String, file_size: u64, block_size: u32, created_at: i64) -> Self {
        Descriptor {
            version: DESCRIPTOR_VERSION,
            file_name,
            file_size,
            block_size,
            created_at,
            triples: Vec::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Original byte length; the authoritative trim point for the padded
    /// final block.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Creation time in unix seconds.
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Triples in plaintext block order. Reassembly is position dependent.
    pub fn triples(&self) -> &[BlockTriple] {
        &self.triples
    }

    /// Appends one triple. Append-only; order follows plaintext block order
    /// unconditionally.
    pub fn add_triple(&mut self, data: Cid, rand1: Cid, rand2: Cid) {
        self.triples.push(BlockTriple { data, rand1, rand2 });
    }

    /// Triple count implied by the recorded file and block sizes.
    pub fn expected_triples(&self) -> u64 {
        block_count(self.file_size, self.block_size)
    }

    /// Checks schema version and metadata/triple agreement.
    pub fn validate(&self) -> Result<(), Error> {
        if self.version != DESCRIPTOR_VERSION {
            return Err(Error::SchemaVersion(self.version));
        }
        let expected = self.expected_triples();
        let found = self.triples.len() as u64;
        if expected != found {
            return Err(Error::Inconsistent { expected, found });
        }
        Ok(())
    }

    /// Canonical wire bytes. Fails if the descriptor is not internally
    /// consistent; an inconsistent descriptor must never be persisted.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        self.validate()?;
        self.marshal_cbor()
            .map_err(|e| Error::Malformed(e.to_string()))
    }

    /// Decodes and validates canonical wire bytes.
    pub fn from_bytes(bz: &[u8]) -> Result<Self, Error> {
        let desc = Self::unmarshal_cbor(bz).map_err(|e| Error::Malformed(e.to_string()))?;
        desc.validate()?;
        Ok(desc)
    }
}
