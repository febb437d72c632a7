// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

/// Logical block size for the streaming codec (64 KiB minus one).
pub const BLOCK_SIZE: usize = u16::MAX as usize;

/// Size of the streaming-codec file header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Largest representable word: the in-block length prefix is 3 bytes.
pub const MAX_WORD_SIZE: usize = (1 << 24) - 1;

/// End-of-block / end-of-word sentinel, shared by both codecs.
pub const EOB: u16 = 256;

/// Literal/length alphabet size for the streaming codec (0..=255 literals,
/// 256 end-of-block, 257..=285 length codes).
pub const LL_ALPHABET: usize = 286;

/// Distance alphabet size (codes 0..=29).
pub const DISTANCE_ALPHABET: usize = 30;

/// Alphabet size for the static-dictionary codec (0..=255 literals,
/// 256 end-of-word, 257..=283 match-length codes).
pub const DICT_ALPHABET: usize = 284;

/// Longest permitted prefix code, both codecs.
pub const MAX_BIT_LEN: u8 = 15;

/// Minimum back-reference length for the streaming codec.
pub const MIN_MATCH: usize = 3;

/// Maximum back-reference length for the streaming codec.
pub const MAX_MATCH: usize = 258;

/// Sliding-window limit for back-references, both codecs.
pub const MAX_DISTANCE: usize = 32768;

/// Minimum match length against the static dictionary.
pub const DICT_MIN_MATCH: usize = 4;

/// Maximum match length against the static dictionary.
pub const DICT_MAX_MATCH: usize = 255;

/// Two-bit block headers for the streaming codec.
pub const BLOCK_STORED: u32 = 0b00;
pub const BLOCK_COMPRESSED: u32 = 0b11;

/// Fixed width of a raw bit-length in the alphabet descriptor.
pub const DESCRIPTOR_BITS: u8 = 5;

/// Descriptor escapes: repeat the previous bit-length 3..=6 times (2 extra
/// bits), emit 3..=10 zeros (3 extra bits), emit 11..=138 zeros (7 extra
/// bits).
pub const COPY_PREV: u32 = 21;
pub const REPEAT_0_SHORT: u32 = 22;
pub const REPEAT_0_LONG: u32 = 23;

pub const COPY_PREV_BITS: u8 = 2;
pub const REPEAT_0_SHORT_BITS: u8 = 3;
pub const REPEAT_0_LONG_BITS: u8 = 7;

pub const COPY_PREV_MIN: usize = 3;
pub const COPY_PREV_MAX: usize = 6;
pub const REPEAT_0_SHORT_MIN: usize = 3;
pub const REPEAT_0_SHORT_MAX: usize = 10;
pub const REPEAT_0_LONG_MIN: usize = 11;
pub const REPEAT_0_LONG_MAX: usize = 138;

/// Hash-table shift for the streaming-codec match finder: 16,384 buckets.
pub const LZ_SHIFT: u32 = 14;

/// Hash-table shift for the dictionary compressor: 65,536 buckets.
pub const DICT_LZ_SHIFT: u32 = 16;

/// Fixed multiplier for the dictionary compressor's 4-byte hash. The
/// streaming codec draws a fresh odd seed per encoder instead.
pub const DICT_LZ_SEED: u32 = 0x14E60CD;

/// Fixed multiplier for the candidate membership filter.
pub const FILTER_SEED: u32 = 0x9E37_79B1;

/// The membership filter holds 2^27 bits (16 MiB).
pub const FILTER_BITS: u32 = 27;

/// Hard cap on trie nodes; `Trie::insert` fails once it is reached.
pub const MAX_TRIE_NODES: usize = 1 << 24;

/// Hard cap on final dictionary entries, set by the 32-bucket index schedule.
pub const MAX_DICT_ENTRIES: usize = 1_064_956;

/// No more max-length-4 entries are admitted once the dictionary holds this
/// many entries.
pub const MAX_QUAD_ENTRIES: usize = 4092;

/// No more max-length-5 entries are admitted past this bound.
pub const MAX_LEN5_ENTRIES: usize = 540_668;

/// Data bytes per static-dictionary block.
pub const DICT_BLOCK_SIZE: usize = 1 << 24;

/// Bytes buffered by the bit writer before it hands them to the sink.
pub const WRITE_BUF_SIZE: usize = 1 << 16;
