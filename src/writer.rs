// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Streaming-codec compressor handle.
//!
//! Words are appended with a 3-byte big-endian length prefix into a
//! 65,535-byte block buffer; every time the buffer fills, the block is
//! compressed into the output and becomes the previous-block snapshot for
//! the next one. `finish` compresses the residual bytes and rewrites the
//! 24-byte file header.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use rand::Rng;

use crate::bits::BitWriter;
use crate::constants::*;
use crate::encode::encode_block;
use crate::error::{Error, Result};
use crate::lz77::MatchFinder;

/// Compresses a sequence of words into a self-contained file.
///
/// # Example
///
/// ```no_run
/// use wordzip::Compressor;
///
/// let mut compressor = Compressor::create("words.wz").unwrap();
/// compressor.add_word(b"hello").unwrap();
/// compressor.add_word(b"world").unwrap();
/// compressor.finish().unwrap();
/// ```
pub struct Compressor<W: Write + Seek> {
    bits: BitWriter<W>,
    finder: MatchFinder,
    block: Vec<u8>,
    prev_block: Vec<u8>,
    total_words: u32,
    total_blocks: u32,
    finished: bool,
}

impl Compressor<BufWriter<File>> {
    /// Create (or truncate) `path` and return a compressor writing to it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> Compressor<W> {
    /// Start a compressed stream on `sink`. A 24-byte header area is
    /// reserved at the front and filled in by `finish`.
    pub fn new(mut sink: W) -> Result<Self> {
        sink.write_all(&[0u8; HEADER_SIZE])?;

        let seed = rand::thread_rng().gen_range(0x0100_0001u32..=0x0FFF_FFFF) | 1;

        Ok(Compressor {
            bits: BitWriter::new(sink),
            finder: MatchFinder::new(seed),
            block: Vec::with_capacity(BLOCK_SIZE),
            prev_block: Vec::with_capacity(BLOCK_SIZE),
            total_words: 0,
            total_blocks: 0,
            finished: false,
        })
    }

    /// Number of words added so far.
    pub fn count(&self) -> usize {
        self.total_words as usize
    }

    /// Append one word. Words of length 0 are valid; words longer than
    /// 2^24 - 1 bytes are rejected.
    pub fn add_word(&mut self, word: &[u8]) -> Result<()> {
        debug_assert!(!self.finished);
        if word.len() > MAX_WORD_SIZE {
            return Err(Error::WordTooLarge(word.len()));
        }

        let len = word.len() as u32;
        self.push_byte((len >> 16) as u8)?;
        self.push_byte((len >> 8) as u8)?;
        self.push_byte(len as u8)?;
        for &byte in word {
            self.push_byte(byte)?;
        }

        self.total_words += 1;
        Ok(())
    }

    /// Compress any residual bytes, pad the stream and rewrite the header.
    /// Further `add_word` calls are invalid after this.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;

        if !self.block.is_empty() {
            self.compress_block()?;
        }
        self.bits.flush()?;

        log::debug!(
            "finished stream: {} words in {} blocks, {} compressed bytes",
            self.total_words,
            self.total_blocks,
            self.bits.bytes_written()
        );

        let mut header = [0u8; HEADER_SIZE];
        header[0..4].copy_from_slice(&self.total_words.to_be_bytes());
        header[4..8].copy_from_slice(&self.total_blocks.to_be_bytes());

        let sink = self.bits.get_mut();
        sink.seek(SeekFrom::Start(0))?;
        sink.write_all(&header)?;
        sink.seek(SeekFrom::End(0))?;
        sink.flush()?;
        Ok(())
    }

    fn push_byte(&mut self, byte: u8) -> io::Result<()> {
        self.block.push(byte);
        if self.block.len() == BLOCK_SIZE {
            self.compress_block()?;
        }
        Ok(())
    }

    fn compress_block(&mut self) -> io::Result<()> {
        let prev = if self.prev_block.is_empty() {
            None
        } else {
            Some(self.prev_block.as_slice())
        };

        let records = self.finder.find_records(&self.block, prev);
        encode_block(&mut self.bits, &self.block, prev, &records)?;
        self.total_blocks += 1;

        self.prev_block.clear();
        self.prev_block.extend_from_slice(&self.block);
        self.block.clear();
        self.finder.roll();
        Ok(())
    }
}

impl<W: Write + Seek> Drop for Compressor<W> {
    fn drop(&mut self) {
        // Best effort on drop; errors need an explicit finish call
        let _ = self.finish();
    }
}
