// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use cid::Cid;
use veilfs_encoding::{cid_from_cbor, cid_from_raw};

/// Hard upper bound on a block payload. A store instance uses one configured
/// block size consistently; this bound caps all admissible configurations.
pub const MAX_BLOCK_SIZE: usize = 1 << 20;

/// An immutable byte payload addressed by the BLAKE2b-256 hash of its
/// contents. Plaintext blocks, randomizers and anonymized blocks are all
/// `Block`s; nothing at this level distinguishes them. The only labeling
/// lives in descriptor triple positions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    data: Vec<u8>,
    cid: Cid,
}

impl Block {
    /// Wraps payload bytes, computing the content address.
    pub fn new(data: Vec<u8>) -> Result<Self, Error> {
        if data.len() > MAX_BLOCK_SIZE {
            return Err(Error::InvalidSize(data.len(), MAX_BLOCK_SIZE));
        }
        let cid = cid_from_raw(&data);
        Ok(Block { data, cid })
    }

    /// Wraps DAG-CBOR payload bytes (a serialized descriptor), addressing
    /// them under the DAG-CBOR codec instead of RAW. The multihash is the
    /// same either way.
    pub fn new_cbor(data: Vec<u8>) -> Result<Self, Error> {
        if data.len() > MAX_BLOCK_SIZE {
            return Err(Error::InvalidSize(data.len(), MAX_BLOCK_SIZE));
        }
        let cid = cid_from_cbor(&data);
        Ok(Block { data, cid })
    }

    /// Returns the block's content address.
    pub fn cid(&self) -> &Cid {
        &self.cid
    }

    /// Returns the payload length in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns a view of the payload bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the block, returning the payload bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// XORs this block with two others of equal size, producing a block with
    /// a freshly computed content address. XOR is self-inverse in every
    /// position, so the same call both anonymizes and deanonymizes.
    pub fn xor3(&self, a: &Block, b: &Block) -> Result<Block, Error> {
        if self.size() != a.size() {
            return Err(Error::SizeMismatch(self.size(), a.size()));
        }
        if self.size() != b.size() {
            return Err(Error::SizeMismatch(self.size(), b.size()));
        }
        let data = self
            .data
            .iter()
            .zip(a.data.iter())
            .zip(b.data.iter())
            .map(|((x, y), z)| x ^ y ^ z)
            .collect();
        Block::new(data)
    }
}
