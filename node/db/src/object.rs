// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, Store};
use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use std::sync::Arc;
use veilfs_encoding::{cid_from_cbor, cid_from_raw, Cbor};

/// Content-addressed layer over a [Store]. Addresses are computed on write,
/// so `put` is idempotent: identical bytes always land at the identical
/// address. `get` re-hashes the returned payload and refuses to hand out
/// bytes that do not match the requested address.
pub trait ObjectStore: Store {
    /// Store raw block bytes and return the content address.
    fn put_block(&self, bytes: &[u8]) -> Result<Cid, Error> {
        let cid = cid_from_raw(bytes);
        self.write(cid.to_bytes(), bytes)?;
        Ok(cid)
    }

    /// Store a canonically serializable object as a DAG-CBOR block.
    fn put_obj<S: Cbor>(&self, obj: &S) -> Result<Cid, Error> {
        let bytes = obj.marshal_cbor().map_err(|e| Error::Other(e.to_string()))?;
        let cid = cid_from_cbor(&bytes);
        self.write(cid.to_bytes(), &bytes)?;
        Ok(cid)
    }

    /// Fetch block bytes by address, verifying the payload hashes back to it.
    fn get_block(&self, cid: &Cid) -> Result<Vec<u8>, Error> {
        let bytes = self
            .read(cid.to_bytes())?
            .ok_or(Error::NotFound(*cid))?;
        let digest = Code::Blake2b256.digest(&bytes);
        if &digest != cid.hash() {
            return Err(Error::Corrupt(*cid));
        }
        Ok(bytes)
    }

    /// Fetch and decode a DAG-CBOR object by address.
    fn get_obj<T: Cbor>(&self, cid: &Cid) -> Result<T, Error> {
        let bytes = self.get_block(cid)?;
        T::unmarshal_cbor(&bytes).map_err(|_| Error::Corrupt(*cid))
    }

    /// Opportunistic existence check; no payload verification.
    fn has(&self, cid: &Cid) -> Result<bool, Error> {
        self.exists(cid.to_bytes())
    }
}

impl<BS: ObjectStore> ObjectStore for &BS {}
impl<BS: ObjectStore> ObjectStore for Arc<BS> {}
