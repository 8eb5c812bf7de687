// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Error, ObjectStore, Store};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem-backed store: one file per key under a two-character hex
/// fan-out directory. Writes go through a temporary file and an atomic
/// rename, so readers never observe a partial value. Concurrent writers to
/// the same key race benignly: keys are content addresses, so the contents
/// are identical.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(DiskStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // Keys are content addresses and therefore never empty; the fan-out
    // subdirectory takes the first two hex characters and the file keeps
    // the full hex name, so short keys still map to a regular file path.
    fn key_path<K: AsRef<[u8]>>(&self, key: K) -> PathBuf {
        debug_assert!(!key.as_ref().is_empty(), "store keys must be non-empty");
        let name = hex::encode(key.as_ref());
        let fan = &name[..2.min(name.len())];
        self.root.join(fan).join(&name)
    }
}

impl Store for DiskStore {
    fn write<K, V>(&self, key: K, value: V) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let path = self.key_path(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value.as_ref())?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn read<K>(&self, key: K) -> Result<Option<Vec<u8>>, Error>
    where
        K: AsRef<[u8]>,
    {
        match fs::read(self.key_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete<K>(&self, key: K) -> Result<(), Error>
    where
        K: AsRef<[u8]>,
    {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists<K>(&self, key: K) -> Result<bool, Error>
    where
        K: AsRef<[u8]>,
    {
        Ok(self.key_path(key).exists())
    }
}

impl ObjectStore for DiskStore {}
