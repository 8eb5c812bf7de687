// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

mod errors;
mod keys;
mod randomness;

pub use errors::Error;
pub use keys::{DirKey, MasterKey, KEY_SIZE, NONCE_SIZE};
pub use randomness::random_block_bytes;
