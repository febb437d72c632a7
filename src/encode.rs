// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Streaming-codec block encoder.
//!
//! A block is encoded as a 2-bit header followed either by the raw bytes
//! (stored) or by the two alphabet descriptors and the Huffman-coded
//! literal/length/distance stream terminated by the end-of-block symbol.
//! The choice is made by a cost model over the would-be compressed
//! representation; the model excludes the 2-bit header, a lower bound.

use std::io::{self, Write};

use crate::bits::BitWriter;
use crate::constants::*;
use crate::huffman;
use crate::lz77::Record;
use crate::tables;

fn count_frequencies(
    src: &[u8],
    prev_len: usize,
    records: &[Record],
) -> ([u32; LL_ALPHABET], [u32; DISTANCE_ALPHABET]) {
    let mut ll_freq = [0u32; LL_ALPHABET];
    let mut dd_freq = [0u32; DISTANCE_ALPHABET];

    let mut next = 0;
    let mut i = 0;
    while i < src.len() {
        if let Some(rec) = records.get(next).filter(|r| r.pos == i) {
            let (lcode, _, _) = tables::length_code(rec.len);
            ll_freq[lcode as usize] += 1;
            let (dcode, _, _) = tables::distance_code(rec.distance(prev_len));
            dd_freq[dcode as usize] += 1;
            i += rec.len;
            next += 1;
        } else {
            ll_freq[src[i] as usize] += 1;
            i += 1;
        }
    }
    ll_freq[EOB as usize] += 1;

    (ll_freq, dd_freq)
}

fn compressed_cost(
    prev_len: usize,
    records: &[Record],
    ll_freq: &[u32; LL_ALPHABET],
    ll_lengths: &[u8],
    dd_lengths: &[u8],
) -> u64 {
    let mut bits = 0u64;

    for rec in records {
        let (lcode, lx, _) = tables::length_code(rec.len);
        bits += ll_lengths[lcode as usize] as u64 + lx as u64;
        let (dcode, dx, _) = tables::distance_code(rec.distance(prev_len));
        bits += dd_lengths[dcode as usize] as u64 + dx as u64;
    }

    // Literals and the end-of-block symbol; length and distance codes are
    // already accounted per record
    for sym in 0..=EOB as usize {
        let freq = ll_freq[sym] as u64;
        if freq > 0 {
            debug_assert!(ll_lengths[sym] > 0);
            bits += freq * ll_lengths[sym] as u64;
        }
    }

    bits += huffman::descriptor_cost(ll_lengths);
    bits += huffman::descriptor_cost(dd_lengths);
    bits
}

/// Encode one block into the bit stream. `records` must be the match
/// records for `src` in position order, `prev` the previous block
/// snapshot if one exists.
pub(crate) fn encode_block<W: Write>(
    w: &mut BitWriter<W>,
    src: &[u8],
    prev: Option<&[u8]>,
    records: &[Record],
) -> io::Result<()> {
    let prev_len = prev.map_or(0, |p| p.len());

    let (ll_freq, dd_freq) = count_frequencies(src, prev_len, records);
    let ll_lengths = huffman::limited_lengths(&ll_freq, MAX_BIT_LEN);
    let dd_lengths = huffman::limited_lengths(&dd_freq, MAX_BIT_LEN);

    let cost_bits = compressed_cost(prev_len, records, &ll_freq, &ll_lengths, &dd_lengths);
    let cost_bytes = (cost_bits + 7) / 8;

    if cost_bytes >= src.len() as u64 {
        log::trace!(
            "block stored: {} estimated vs {} raw bytes",
            cost_bytes,
            src.len()
        );
        w.add_bits(BLOCK_STORED, 2)?;
        for &byte in src {
            w.add_bits(byte as u32, 8)?;
        }
        return Ok(());
    }

    log::trace!(
        "block compressed: {} estimated vs {} raw bytes, {} records",
        cost_bytes,
        src.len(),
        records.len()
    );

    let ll_codes = huffman::canonical_codes(&ll_lengths);
    let dd_codes = huffman::canonical_codes(&dd_lengths);

    w.add_bits(BLOCK_COMPRESSED, 2)?;
    huffman::write_descriptor(w, &ll_lengths)?;
    huffman::write_descriptor(w, &dd_lengths)?;

    let mut next = 0;
    let mut i = 0;
    while i < src.len() {
        if let Some(rec) = records.get(next).filter(|r| r.pos == i) {
            let (lcode, lx, lextra) = tables::length_code(rec.len);
            emit(w, &ll_codes, &ll_lengths, lcode)?;
            if lx > 0 {
                w.add_bits(lextra, lx)?;
            }

            let distance = rec.distance(prev_len);
            debug_assert!((1..=MAX_DISTANCE).contains(&distance));
            let (dcode, dx, dextra) = tables::distance_code(distance);
            emit(w, &dd_codes, &dd_lengths, dcode)?;
            if dx > 0 {
                w.add_bits(dextra, dx)?;
            }

            i += rec.len;
            next += 1;
        } else {
            emit(w, &ll_codes, &ll_lengths, src[i] as u16)?;
            i += 1;
        }
    }

    emit(w, &ll_codes, &ll_lengths, EOB)
}

#[inline]
fn emit<W: Write>(
    w: &mut BitWriter<W>,
    codes: &[u16],
    lengths: &[u8],
    sym: u16,
) -> io::Result<()> {
    let len = lengths[sym as usize];
    debug_assert!(len > 0, "symbol {} has no code", sym);
    w.add_bits(codes[sym as usize] as u32, len)
}
