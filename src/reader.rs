// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Streaming-codec decompressor handle.
//!
//! The compressed file is mapped read-only; blocks are decoded on demand
//! and their bytes accumulate until complete length-prefixed words can be
//! carved off into the word queue. Iteration yields words in the exact
//! order they were added.

use std::collections::VecDeque;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::bits::{BitReader, BitState};
use crate::constants::*;
use crate::decode::BlockDecoder;
use crate::error::{Error, Result};

/// Reads words back from a file written by [`crate::Compressor`].
pub struct Decompressor {
    mmap: Mmap,
    total_words: u32,
    total_blocks: u32,

    decoder: BlockDecoder,
    bit_state: BitState,
    blocks_decoded: u32,
    block_buf: Vec<u8>,

    /// Decoded bytes not yet carved into complete words.
    pending: Vec<u8>,
    queue: VecDeque<Vec<u8>>,
    words_returned: u32,
}

impl Decompressor {
    /// Map `path` read-only and read the stream header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < HEADER_SIZE {
            return Err(Error::Corrupt);
        }
        let total_words = u32::from_be_bytes(mmap[0..4].try_into().unwrap());
        let total_blocks = u32::from_be_bytes(mmap[4..8].try_into().unwrap());

        log::debug!(
            "opened stream of {} words in {} blocks ({} bytes)",
            total_words,
            total_blocks,
            mmap.len()
        );

        Ok(Decompressor {
            mmap,
            total_words,
            total_blocks,
            decoder: BlockDecoder::new(),
            bit_state: BitState::default(),
            blocks_decoded: 0,
            block_buf: Vec::with_capacity(BLOCK_SIZE),
            pending: Vec::new(),
            queue: VecDeque::new(),
            words_returned: 0,
        })
    }

    /// Total number of words in the file.
    pub fn count(&self) -> usize {
        self.total_words as usize
    }

    /// Size of the mapped file in bytes.
    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    /// Whether another word can be returned.
    pub fn has_next(&self) -> bool {
        self.words_returned < self.total_words
    }

    /// Copy the next word into `buf` (cleared first) and return its
    /// length, or `None` when the stream is exhausted.
    pub fn next(&mut self, buf: &mut Vec<u8>) -> Option<usize> {
        if !self.has_next() || !self.ensure_word() {
            return None;
        }
        let word = self.queue.pop_front().unwrap();
        self.words_returned += 1;
        buf.clear();
        buf.extend_from_slice(&word);
        Some(word.len())
    }

    /// Skip the next word, returning its length.
    pub fn skip(&mut self) -> Option<usize> {
        if !self.has_next() || !self.ensure_word() {
            return None;
        }
        let word = self.queue.pop_front().unwrap();
        self.words_returned += 1;
        Some(word.len())
    }

    /// Compare the next word against `word`; consumes it only on a match.
    pub fn match_word(&mut self, word: &[u8]) -> bool {
        if !self.has_next() || !self.ensure_word() {
            return false;
        }
        if self.queue.front().map(Vec::as_slice) == Some(word) {
            self.queue.pop_front();
            self.words_returned += 1;
            true
        } else {
            false
        }
    }

    /// Whether the next word starts with `prefix`. Does not consume it.
    pub fn match_prefix(&mut self, prefix: &[u8]) -> bool {
        if !self.has_next() || !self.ensure_word() {
            return false;
        }
        self.queue.front().unwrap().starts_with(prefix)
    }

    /// Restart iteration from the first word.
    pub fn reset(&mut self) {
        self.decoder.reset();
        self.bit_state = BitState::default();
        self.blocks_decoded = 0;
        self.pending.clear();
        self.queue.clear();
        self.words_returned = 0;
    }

    /// Decode blocks until at least one complete word is queued. Returns
    /// false if the stream ends first (truncated input).
    fn ensure_word(&mut self) -> bool {
        while self.queue.is_empty() && self.blocks_decoded < self.total_blocks {
            self.decode_one_block();
            self.carve_words();
        }
        !self.queue.is_empty()
    }

    fn decode_one_block(&mut self) {
        let data = &self.mmap[HEADER_SIZE..];
        let mut reader = BitReader::resume(data, self.bit_state);
        let n = self.decoder.decode_block(&mut reader, &mut self.block_buf);
        self.bit_state = reader.state();
        self.blocks_decoded += 1;
        self.pending.extend_from_slice(&self.block_buf[..n]);
    }

    /// Carve complete `(len_be24, bytes)` words off the front of the
    /// pending buffer.
    fn carve_words(&mut self) {
        let mut pos = 0;
        while pos + 3 <= self.pending.len() {
            let size = (self.pending[pos] as usize) << 16
                | (self.pending[pos + 1] as usize) << 8
                | self.pending[pos + 2] as usize;
            if pos + 3 + size > self.pending.len() {
                break;
            }
            self.queue
                .push_back(self.pending[pos + 3..pos + 3 + size].to_vec());
            pos += 3 + size;
        }
        if pos > 0 {
            self.pending.drain(..pos);
        }
    }
}
