// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};

use crate::{DAG_CBOR, RAW};

/// Constructs a content identifier for a raw block payload.
/// Default is BLAKE2b-256 multihash.
pub fn cid_from_raw(bz: &[u8]) -> Cid {
    Cid::new_v1(RAW, Code::Blake2b256.digest(bz))
}

/// Constructs a content identifier for DAG-CBOR encoded bytes.
/// Default is BLAKE2b-256 multihash.
pub fn cid_from_cbor(bz: &[u8]) -> Cid {
    Cid::new_v1(DAG_CBOR, Code::Blake2b256.digest(bz))
}
