// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use blake2b_simd::Params;
use crypto_secretbox::aead::{Aead, AeadCore, KeyInit, OsRng};
use crypto_secretbox::{Key, Nonce, XSalsa20Poly1305};
use rand::RngCore;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 24;

const DIR_KEY_CONTEXT: &[u8] = b"veilfs/dir";

/// Root secret of a store instance. It never encrypts payloads directly;
/// per-directory manifest keys are derived from it so that manifests at
/// different paths produce unlinkable ciphertexts.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut key);
        MasterKey(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != KEY_SIZE {
            return Err(Error::InvalidKeyLength(bytes.len(), KEY_SIZE));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(bytes);
        Ok(MasterKey(key))
    }

    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::KeyFile(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Derives the manifest key for one directory: keyed BLAKE2b-256 over a
    /// fixed context string and the directory's path salt.
    pub fn derive_dir_key(&self, path_salt: &[u8]) -> DirKey {
        let digest = Params::new()
            .hash_length(KEY_SIZE)
            .key(&self.0)
            .to_state()
            .update(DIR_KEY_CONTEXT)
            .update(path_salt)
            .finalize();
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(digest.as_bytes());
        DirKey(key)
    }

    /// Reads a hex-encoded key file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let mut buf = String::new();
        File::open(path)?.read_to_string(&mut buf)?;
        Self::from_hex(&buf)
    }

    /// Writes the key hex-encoded. Permissions are restricted to the owner,
    /// the same guarantee the keystore gives private key files.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let mut file = File::create(path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perm = file.metadata()?.permissions();
            perm.set_mode(0o600);
            file.set_permissions(perm)?;
        }
        file.write_all(self.to_hex().as_bytes())?;
        Ok(())
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs.
        write!(f, "MasterKey(..)")
    }
}

/// Per-directory manifest key.
/// XSalsa20-Poly1305 authenticated encryption;
/// random nonce per seal, appended after the ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct DirKey([u8; KEY_SIZE]);

impl DirKey {
    pub fn seal(&self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.0));
        let nonce = XSalsa20Poly1305::generate_nonce(&mut OsRng);
        let mut ciphertext = cipher
            .encrypt(&nonce, msg)
            .map_err(|_| Error::EncryptionError)?;
        ciphertext.extend_from_slice(nonce.as_slice());
        Ok(ciphertext)
    }

    pub fn open(&self, msg: &[u8]) -> Result<Vec<u8>, Error> {
        if msg.len() < NONCE_SIZE {
            return Err(Error::DecryptionError);
        }
        let (ciphertext, nonce) = msg.split_at(msg.len() - NONCE_SIZE);
        let cipher = XSalsa20Poly1305::new(Key::from_slice(&self.0));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::DecryptionError)
    }
}

impl std::fmt::Debug for DirKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DirKey(..)")
    }
}
