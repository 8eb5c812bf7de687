// Copyright 2019-2023 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{Block, Error, MAX_BLOCK_SIZE};
use std::io::{Read, Write};

/// Number of blocks a payload of `file_size` bytes splits into.
pub fn block_count(file_size: u64, block_size: u32) -> u64 {
    let bs = block_size as u64;
    (file_size + bs - 1) / bs
}

/// Splits a byte stream into fixed-size blocks, zero-padding the final one.
///
/// Yields exactly `ceil(total/block_size)` blocks; an empty stream yields no
/// blocks at all. The padded tail is recovered by [`assemble`], which trims
/// the output to the authoritative file size recorded in the descriptor.
pub struct Splitter<R> {
    reader: R,
    block_size: usize,
    total_read: u64,
    done: bool,
}

impl<R: Read> Splitter<R> {
    pub fn new(reader: R, block_size: u32) -> Result<Self, Error> {
        let block_size = block_size as usize;
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(Error::InvalidSize(block_size, MAX_BLOCK_SIZE));
        }
        Ok(Splitter {
            reader,
            block_size,
            total_read: 0,
            done: false,
        })
    }

    /// Bytes consumed from the stream so far, excluding padding.
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    // Fills as much of `buf` as the stream can provide, tolerating short
    // reads from unbuffered sources.
    fn read_exact_or_eof(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for Splitter<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.block_size];
        let filled = match self.read_exact_or_eof(&mut buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };
        if filled == 0 {
            self.done = true;
            return None;
        }
        if filled < self.block_size {
            // Short read means EOF; the zeroed tail is the padding.
            self.done = true;
        }
        self.total_read += filled as u64;
        Some(Block::new(buf))
    }
}

/// Reassembles plaintext blocks into the original stream, trimming the final
/// block's zero padding down to `file_size`.
pub fn assemble<W: Write>(blocks: &[Block], file_size: u64, writer: &mut W) -> Result<(), Error> {
    let available: u64 = blocks.iter().map(|b| b.size() as u64).sum();
    if available < file_size {
        return Err(Error::Inconsistent {
            expected: file_size,
            found: available,
        });
    }
    let mut remaining = file_size;
    for block in blocks {
        if remaining == 0 {
            break;
        }
        let take = remaining.min(block.size() as u64) as usize;
        writer.write_all(&block.data()[..take])?;
        remaining -= take as u64;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn empty_stream_yields_no_blocks() {
        let mut splitter = Splitter::new(&[][..], 16).unwrap();
        assert!(splitter.next().is_none());
        assert_eq!(splitter.total_read(), 0);
    }

    #[test]
    fn zero_block_size_is_rejected() {
        assert_eq!(
            Splitter::new(&[][..], 0).unwrap_err(),
            Error::InvalidSize(0, MAX_BLOCK_SIZE)
        );
    }

    #[test]
    fn final_block_is_zero_padded() {
        let data = b"hello world";
        let blocks: Vec<Block> = Splitter::new(&data[..], 16)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].size(), 16);
        assert_eq!(&blocks[0].data()[..11], data);
        assert!(blocks[0].data()[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn multi_block_split_counts() {
        let data: Vec<u8> = (0..200u32).map(|i| (i * 7) as u8).collect();
        let blocks: Vec<Block> = Splitter::new(&data[..], 64)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(blocks.len() as u64, block_count(200, 64));
        assert_eq!(blocks.len(), 4);
        assert!(blocks.iter().all(|b| b.size() == 64));
    }

    #[test]
    fn assemble_rejects_short_input() {
        let blocks = vec![Block::new(vec![0u8; 8]).unwrap()];
        let mut out = Vec::new();
        assert!(assemble(&blocks, 20, &mut out).is_err());
    }

    #[quickcheck]
    fn split_then_assemble_is_identity(data: Vec<u8>, raw_bs: u8) -> bool {
        let block_size = 1 + (raw_bs as u32 % 64);
        let blocks: Vec<Block> = Splitter::new(&data[..], block_size)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        if blocks.len() as u64 != block_count(data.len() as u64, block_size) {
            return false;
        }
        let mut out = Vec::new();
        assemble(&blocks, data.len() as u64, &mut out).unwrap();
        out == data
    }
}
