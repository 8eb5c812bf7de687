// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use thiserror::Error;

/// Crypto layer error
#[derive(Debug, PartialEq, Error)]
pub enum Error {
    #[error("Invalid key length {0}, expected {1} bytes")]
    InvalidKeyLength(usize, usize),
    /// Possibly indicates a wrong master key or a tampered ciphertext
    #[error("Error decrypting data")]
    DecryptionError,
    /// An error occurred while encrypting a manifest
    #[error("Error encrypting data")]
    EncryptionError,
    #[error("Error reading key file: {0}")]
    KeyFile(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Error {
        Error::KeyFile(e.to_string())
    }
}
