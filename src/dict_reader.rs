// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Static-dictionary decompressor handle.
//!
//! The container is mapped read-only, the dictionary is decoded eagerly,
//! and every block's alphabet is restored up front. Words then decode on
//! demand, in order, with the same iteration surface as the streaming
//! codec's reader.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::dict::Dictionary;
use crate::dict_codec;
use crate::error::{Error, Result};
use crate::varint::decode_varint;
use crate::word_codec::WordBlockDecoder;

struct Block {
    decoder: WordBlockDecoder,
    /// Payload bounds within the mapped file.
    offset: usize,
    len: usize,
}

/// Reads words back from a file written by [`crate::DictCompressor`].
pub struct DictDecompressor {
    mmap: Mmap,
    num_words: u64,
    max_word: usize,
    dict: Dictionary,
    blocks: Vec<Block>,
    current_block: usize,
    words_returned: u64,
    scratch: Vec<u8>,
}

impl DictDecompressor {
    /// Map `path` read-only, decode the dictionary and prepare each
    /// block's decode state.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_mmap(mmap)
    }

    fn from_mmap(mmap: Mmap) -> Result<Self> {
        if mmap.len() < 16 {
            return Err(Error::Corrupt);
        }
        let num_words = u64::from_be_bytes(mmap[0..8].try_into().unwrap());
        let num_blocks = u32::from_be_bytes(mmap[8..12].try_into().unwrap());
        let max_word = u32::from_be_bytes(mmap[12..16].try_into().unwrap()) as usize;

        let mut offset = 16;
        let (dict_len, n) = decode_varint(&mmap[offset..])?;
        offset += n;
        let dict_len = dict_len as usize;
        if offset + dict_len > mmap.len() {
            return Err(Error::Corrupt);
        }
        let dict = dict_codec::decode(&mmap[offset..offset + dict_len]);
        offset += dict_len;

        let mut blocks = Vec::with_capacity(num_blocks as usize);
        for _ in 0..num_blocks {
            let (payload_len, n) = decode_varint(&mmap[offset..])?;
            offset += n;
            let payload_len = payload_len as usize;
            if offset + payload_len > mmap.len() {
                return Err(Error::Corrupt);
            }
            blocks.push(Block {
                decoder: WordBlockDecoder::new(&mmap[offset..offset + payload_len]),
                offset,
                len: payload_len,
            });
            offset += payload_len;
        }
        if offset != mmap.len() {
            return Err(Error::Corrupt);
        }

        log::debug!(
            "opened dictionary stream: {} words, {} blocks, {} entries",
            num_words,
            num_blocks,
            dict.len()
        );

        Ok(DictDecompressor {
            mmap,
            num_words,
            max_word,
            dict,
            blocks,
            current_block: 0,
            words_returned: 0,
            scratch: Vec::new(),
        })
    }

    /// Total number of words in the file.
    pub fn count(&self) -> usize {
        self.num_words as usize
    }

    /// Length of the longest stored word.
    pub fn max_word_size(&self) -> usize {
        self.max_word
    }

    /// Number of entries in the decoded dictionary.
    pub fn dictionary_len(&self) -> usize {
        self.dict.len()
    }

    /// Size of the mapped file in bytes.
    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    /// Whether another word can be returned.
    pub fn has_next(&self) -> bool {
        self.words_returned < self.num_words
    }

    /// Copy the next word into `buf` (cleared first) and return its
    /// length, or `None` when the stream is exhausted.
    pub fn next(&mut self, buf: &mut Vec<u8>) -> Option<usize> {
        let (block, next_start) = self.decode_one(true, buf)?;
        self.commit(block, next_start);
        Some(buf.len())
    }

    /// Skip the next word, returning its length.
    pub fn skip(&mut self) -> Option<usize> {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.decode_one(true, &mut scratch);
        let len = scratch.len();
        self.scratch = scratch;
        let (block, next_start) = result?;
        self.commit(block, next_start);
        Some(len)
    }

    /// Compare the next word against `word`; consumes it only on a match.
    pub fn match_word(&mut self, word: &[u8]) -> bool {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.decode_one(true, &mut scratch);
        let matched = result.is_some() && scratch == word;
        self.scratch = scratch;
        if matched {
            let (block, next_start) = result.unwrap();
            self.commit(block, next_start);
        }
        matched
    }

    /// Whether the next word starts with `prefix`. Does not consume it.
    pub fn match_prefix(&mut self, prefix: &[u8]) -> bool {
        let mut scratch = std::mem::take(&mut self.scratch);
        let result = self.decode_one(false, &mut scratch);
        let matched = result.is_some() && scratch.starts_with(prefix);
        self.scratch = scratch;
        matched
    }

    /// Restart iteration from the first word.
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.decoder.next_start = block.decoder.word_start;
        }
        self.current_block = 0;
        self.words_returned = 0;
    }

    /// Decode the next word without consuming it. When `advance` is set,
    /// exhausted blocks are skipped permanently first.
    fn decode_one(&mut self, advance: bool, out: &mut Vec<u8>) -> Option<(usize, usize)> {
        if !self.has_next() {
            return None;
        }

        let mut block_idx = self.current_block;
        while block_idx < self.blocks.len() {
            let block = &self.blocks[block_idx];
            let payload = &self.mmap[block.offset..block.offset + block.len];
            if block.decoder.exhausted(payload) {
                block_idx += 1;
                if advance {
                    self.current_block = block_idx;
                }
                continue;
            }
            let next_start = block.decoder.peek_word(payload, &self.dict, out)?;
            return Some((block_idx, next_start));
        }
        None
    }

    fn commit(&mut self, block: usize, next_start: usize) {
        self.blocks[block].decoder.next_start = next_start;
        self.words_returned += 1;
    }

    /// Invariant check used by tests: every dictionary entry respects the
    /// length bounds.
    #[cfg(test)]
    fn dictionary_is_well_formed(&self) -> bool {
        use crate::constants::{DICT_MAX_MATCH, DICT_MIN_MATCH};
        self.dict
            .entries()
            .iter()
            .all(|e| e.len() >= DICT_MIN_MATCH && e.len() <= DICT_MAX_MATCH)
    }
}
