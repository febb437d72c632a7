// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Static-dictionary compressor handle.
//!
//! Two-phase: train the trie on sample byte sequences, add the words to
//! compress, then `write_to` builds the dictionary (pre-compress, score,
//! reduce), compresses it, and emits the container: fixed header, the
//! length-prefixed compressed dictionary, then the length-prefixed blocks.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::constants::*;
use crate::dict::{DictBuilder, Triple};
use crate::dict_codec;
use crate::error::{Error, Result};
use crate::trie::Trie;
use crate::varint::encode_varint;
use crate::word_codec;

/// Compresses a sequence of words against a dictionary built from
/// training samples.
///
/// ```no_run
/// use wordzip::DictCompressor;
///
/// let mut compressor = DictCompressor::new();
/// let words: [&[u8]; 3] = [b"hello", b"help", b"hello"];
/// for word in words {
///     compressor.train(word).unwrap();
///     compressor.add_word(word).unwrap();
/// }
/// compressor.write_to_path("words.wzd").unwrap();
/// ```
pub struct DictCompressor {
    trie: Trie,
    data: Vec<u8>,
    sizes: Vec<u32>,
    words: u64,
    max_word: usize,
}

impl DictCompressor {
    pub fn new() -> Self {
        DictCompressor {
            trie: Trie::new(),
            data: Vec::new(),
            sizes: Vec::new(),
            words: 0,
            max_word: 0,
        }
    }

    /// Feed one training sample into the trie. Fails with
    /// [`Error::TrieFull`] once the node cap is reached; the dictionary
    /// can still be built from the partial trie.
    pub fn train(&mut self, sample: &[u8]) -> Result<()> {
        self.trie.insert(sample)
    }

    /// Append one word to compress.
    pub fn add_word(&mut self, word: &[u8]) -> Result<()> {
        if word.len() > MAX_WORD_SIZE {
            return Err(Error::WordTooLarge(word.len()));
        }
        self.data.extend_from_slice(word);
        self.sizes.push(word.len() as u32);
        self.words += 1;
        self.max_word = self.max_word.max(word.len());
        Ok(())
    }

    /// Number of words added so far.
    pub fn count(&self) -> usize {
        self.words as usize
    }

    /// Build the dictionary and write the complete container to `sink`.
    pub fn write_to<W: Write>(&mut self, mut sink: W) -> Result<()> {
        // Partition words into blocks of at most 2^24 data bytes
        let mut blocks: Vec<(usize, usize)> = Vec::new(); // (first word, count)
        let mut first = 0;
        let mut bytes = 0usize;
        for (i, &size) in self.sizes.iter().enumerate() {
            if i > first && bytes + size as usize > DICT_BLOCK_SIZE {
                blocks.push((first, i - first));
                first = i;
                bytes = 0;
            }
            bytes += size as usize;
        }
        if first < self.sizes.len() {
            blocks.push((first, self.sizes.len() - first));
        }

        // Pre-compress and score everything before reducing
        let mut builder = DictBuilder::from_trie(&mut self.trie)?;
        let mut triples: Vec<Triple> = Vec::new();
        let mut block_triples: Vec<(usize, usize)> = Vec::new(); // (first triple, count)
        let mut start = 0usize;
        for &(first, count) in &blocks {
            let triple_start = triples.len();
            for &size in &self.sizes[first..first + count] {
                let word = &self.data[start..start + size as usize];
                builder.precompress(&self.trie, word, &mut triples);
                start += size as usize;
            }
            block_triples.push((triple_start, triples.len() - triple_start));
        }
        builder.score(&triples);
        let (dict, remap) = builder.reduce();

        // Header: word count, block count, largest word
        let mut header = [0u8; 16];
        header[0..8].copy_from_slice(&self.words.to_be_bytes());
        header[8..12].copy_from_slice(&(blocks.len() as u32).to_be_bytes());
        header[12..16].copy_from_slice(&(self.max_word as u32).to_be_bytes());
        sink.write_all(&header)?;

        // Length-prefixed compressed dictionary
        let mut varint = [0u8; 10];
        let dict_bytes = dict_codec::encode(&dict)?;
        let n = encode_varint(&mut varint, dict_bytes.len() as u64);
        sink.write_all(&varint[..n])?;
        sink.write_all(&dict_bytes)?;

        // Length-prefixed blocks
        let mut start = 0usize;
        for (&(first, count), &(triple_start, triple_count)) in
            blocks.iter().zip(&block_triples)
        {
            let sizes = &self.sizes[first..first + count];
            let data_len: usize = sizes.iter().map(|&s| s as usize).sum();
            let payload = word_codec::encode_block(
                &self.data[start..start + data_len],
                sizes,
                &triples[triple_start..triple_start + triple_count],
                &dict,
                &remap,
            )?;
            start += data_len;

            let n = encode_varint(&mut varint, payload.len() as u64);
            sink.write_all(&varint[..n])?;
            sink.write_all(&payload)?;
        }

        log::debug!(
            "wrote {} words in {} blocks, {} dictionary entries",
            self.words,
            blocks.len(),
            dict.len()
        );

        sink.flush()?;
        Ok(())
    }

    /// Build the dictionary and write the container to a new file.
    pub fn write_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }
}

impl Default for DictCompressor {
    fn default() -> Self {
        Self::new()
    }
}
