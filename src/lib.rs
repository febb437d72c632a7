// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! # wordzip
//!
//! Compression for collections of short byte strings ("words") with two
//! codecs sharing one canonical-coding core:
//!
//! - **Streaming codec** ([`Compressor`] / [`Decompressor`]): words are
//!   packed into 64 KiB blocks, each compressed independently with LZ77
//!   back-references (which may reach into the previous block) and
//!   per-block canonical Huffman tables, DEFLATE-style.
//! - **Static-dictionary codec** ([`DictCompressor`] /
//!   [`DictDecompressor`]): a trie built from training samples yields a
//!   dictionary of common prefixes; words are then encoded as literals
//!   plus `(length, dictionary index)` references, and the dictionary
//!   itself travels compressed with the same LZ77 + Huffman machinery.
//!
//! Both decoders iterate words in insertion order over a read-only memory
//! map of the compressed file.
//!
//! ## Example
//!
//! ```
//! use wordzip::{Compressor, Decompressor};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("words.wz");
//!
//! let mut compressor = Compressor::create(&path).unwrap();
//! compressor.add_word(b"hello").unwrap();
//! compressor.add_word(b"world").unwrap();
//! compressor.finish().unwrap();
//!
//! let mut decompressor = Decompressor::open(&path).unwrap();
//! let mut word = Vec::new();
//! decompressor.next(&mut word).unwrap();
//! assert_eq!(word, b"hello");
//! decompressor.next(&mut word).unwrap();
//! assert_eq!(word, b"world");
//! assert!(!decompressor.has_next());
//! ```

mod bits;
mod constants;
mod decode;
mod dict;
mod dict_codec;
mod dict_reader;
mod dict_writer;
mod encode;
mod error;
mod huffman;
mod lz77;
mod reader;
mod tables;
mod trie;
mod varint;
mod word_codec;
mod writer;

pub use dict::{DictBuilder, Dictionary, Remap, Triple};
pub use dict_reader::DictDecompressor;
pub use dict_writer::DictCompressor;
pub use error::{Error, Result};
pub use reader::Decompressor;
pub use trie::Trie;
pub use writer::Compressor;

#[cfg(test)]
mod tests;
