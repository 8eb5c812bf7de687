// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use rand::rngs::OsRng;
use rand::RngCore;

/// Fresh bytes for a new randomizer block, drawn from the operating system
/// entropy source.
pub fn random_block_bytes(size: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; size];
    OsRng.fill_bytes(&mut bytes);
    bytes
}
