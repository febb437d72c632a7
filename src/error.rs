// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

use thiserror::Error;

/// Result type for wordzip operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for compression/decompression
#[derive(Error, Debug)]
pub enum Error {
    /// The input data is corrupt or truncated
    #[error("wordzip: corrupt input")]
    Corrupt,

    /// A single word exceeds the 2^24 - 1 byte limit
    #[error("wordzip: word of {0} bytes exceeds the maximum word size")]
    WordTooLarge(usize),

    /// The trie reached its 2^24 node cap during training
    #[error("wordzip: trie node limit reached")]
    TrieFull,

    /// I/O failure from the underlying sink or mapped file
    #[error("wordzip: io error: {0}")]
    Io(#[from] std::io::Error),
}
