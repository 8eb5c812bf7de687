// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::Error;
use cid::Cid;
use veilfs_crypto::DirKey;
use veilfs_encoding::repr::*;
use veilfs_encoding::serde_bytes;
use veilfs_encoding::tuple::*;
use veilfs_encoding::Cbor;

/// Current manifest schema version.
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum EntryKind {
    File = 0,
    Dir = 1,
}

/// One child of a directory. The name is sealed under the directory's
/// subkey; `target` addresses a file descriptor (`File`) or another sealed
/// manifest (`Dir`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct ManifestEntry {
    #[serde(with = "serde_bytes")]
    pub encrypted_name: Vec<u8>,
    pub kind: EntryKind,
    pub size: u64,
    pub modified_at: i64,
    pub target: Cid,
}

impl ManifestEntry {
    pub fn new(
        name: &str,
        key: &DirKey,
        kind: EntryKind,
        size: u64,
        modified_at: i64,
        target: Cid,
    ) -> Result<Self, Error> {
        Ok(ManifestEntry {
            encrypted_name: key.seal(name.as_bytes())?,
            kind,
            size,
            modified_at,
            target,
        })
    }

    /// Recovers the plaintext name under the directory's subkey.
    pub fn name(&self, key: &DirKey) -> Result<String, Error> {
        let bytes = key.open(&self.encrypted_name)?;
        String::from_utf8(bytes)
            .map_err(|_| Error::Fatal("manifest entry name is not UTF-8".to_string()))
    }
}

/// Ordered record of one directory's children. Stored only in sealed form;
/// the plaintext never reaches the object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize_tuple, Deserialize_tuple)]
pub struct DirectoryManifest {
    version: u32,
    entries: Vec<ManifestEntry>,
}

impl Cbor for DirectoryManifest {}

impl Default for DirectoryManifest {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryManifest {
    pub fn new() -> Self {
        DirectoryManifest {
            version: MANIFEST_VERSION,
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    /// Canonical plaintext bytes, sealed with the directory key. A random
    /// nonce per seal keeps equal manifests unlinkable across writes.
    pub fn seal(&self, key: &DirKey) -> Result<Vec<u8>, Error> {
        let bytes = self
            .marshal_cbor()
            .map_err(|e| Error::Fatal(e.to_string()))?;
        Ok(key.seal(&bytes)?)
    }

    /// Opens and decodes a sealed manifest.
    pub fn open(key: &DirKey, sealed: &[u8]) -> Result<Self, Error> {
        let bytes = key.open(sealed)?;
        let manifest: DirectoryManifest = Self::unmarshal_cbor(&bytes)
            .map_err(|_| Error::Fatal("sealed bytes decode to no manifest".to_string()))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(Error::Fatal(format!(
                "unknown manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }
}
