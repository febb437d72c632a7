// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Streaming-codec block decoder.
//!
//! Codes are matched shortest-first against per-alphabet tables: codes of
//! up to 8 bits are bucketed by their value, longer codes by their leading
//! byte with the remainder as a discriminator. Back-references may reach
//! into the previous block snapshot and wrap around to the head of the
//! block being decoded.

use crate::bits::BitReader;
use crate::constants::*;
use crate::huffman;
use crate::tables;

/// Decode table for one alphabet.
///
/// Bucket entries are `(rest, extra, symbol)` where `extra` is the code
/// length minus 8: negative entries live in the value-indexed buckets,
/// positive ones in the leading-byte buckets with `rest` holding the code's
/// low bits.
struct SymbolTable {
    buckets: Vec<Vec<(u16, i8, u16)>>,
    min_len: u8,
    max_len: u8,
}

impl SymbolTable {
    fn build(lengths: &[u8], codes: &[u16]) -> Self {
        let mut table = SymbolTable {
            buckets: vec![Vec::new(); 256],
            min_len: u8::MAX,
            max_len: 0,
        };

        for (sym, (&len, &code)) in lengths.iter().zip(codes).enumerate() {
            if len == 0 {
                continue;
            }
            table.min_len = table.min_len.min(len);
            table.max_len = table.max_len.max(len);

            let extra = len as i8 - 8;
            if len > 8 {
                let first = (code >> extra) as usize;
                let rest = code & ((1 << extra) - 1);
                table.buckets[first].push((rest, extra, sym as u16));
            } else {
                table.buckets[code as usize].push((0, extra, sym as u16));
            }
        }
        table
    }

    fn lookup(&self, first: usize, rest: u16, extra: i8) -> Option<u16> {
        self.buckets[first]
            .iter()
            .find(|&&(r, e, _)| e == extra && r == rest)
            .map(|&(_, _, sym)| sym)
    }

    /// Try to decode one symbol at the reader's current position, scanning
    /// code lengths shortest-first. Consumes the code bits on success.
    fn decode(&self, r: &mut BitReader) -> Option<u16> {
        let mut j = self.min_len;
        while r.bits_left() >= self.min_len as i32 && j <= self.max_len {
            if (j as i32) > r.bits_left() {
                return None;
            }
            let bits = r.peek(j);
            let extra = j as i8 - 8;
            let (first, rest) = if j > 8 {
                ((bits >> extra) as usize, (bits & ((1 << extra) - 1)) as u16)
            } else {
                (bits as usize, 0)
            };

            if let Some(sym) = self.lookup(first, rest, extra) {
                r.consume(j);
                return Some(sym);
            }
            j += 1;
        }
        None
    }
}

/// Stateful block decoder; keeps the previous-block snapshot that
/// cross-block back-references resolve against.
pub(crate) struct BlockDecoder {
    prev_block: Vec<u8>,
}

impl BlockDecoder {
    pub fn new() -> Self {
        BlockDecoder {
            prev_block: Vec::with_capacity(BLOCK_SIZE),
        }
    }

    pub fn reset(&mut self) {
        self.prev_block.clear();
    }

    /// Decode the next block from the bit stream into `out` (cleared
    /// first). Returns the number of bytes produced; a truncated stream
    /// ends silently with whatever was decoded.
    pub fn decode_block(&mut self, r: &mut BitReader, out: &mut Vec<u8>) -> usize {
        out.clear();

        r.refill();
        let header = r.peek(2);
        r.consume(2);

        if header == BLOCK_STORED {
            loop {
                r.refill();
                if r.bits_left() < 8 && r.exhausted() {
                    break;
                }
                out.push(r.peek(8) as u8);
                r.consume(8);
                if out.len() == BLOCK_SIZE {
                    break;
                }
            }
            self.prev_block.clear();
            self.prev_block.extend_from_slice(out);
            return out.len();
        }

        debug_assert_eq!(header, BLOCK_COMPRESSED);

        let lengths = huffman::read_descriptor(r, LL_ALPHABET + DISTANCE_ALPHABET);
        let (ll_lengths, dd_lengths) = lengths.split_at(LL_ALPHABET);
        let ll_codes = huffman::canonical_codes(ll_lengths);
        let dd_codes = huffman::canonical_codes(dd_lengths);
        let ll_table = SymbolTable::build(ll_lengths, &ll_codes);
        let dd_table = SymbolTable::build(dd_lengths, &dd_codes);

        loop {
            r.refill();
            if r.bits_left() < ll_table.min_len as i32 && r.exhausted() {
                break;
            }

            let sym = match ll_table.decode(r) {
                Some(sym) => sym,
                None => {
                    // A full-width peek that matches nothing is corrupt
                    // input; stop silently. Otherwise refill and retry.
                    if r.exhausted() || r.bits_left() >= ll_table.max_len as i32 {
                        break;
                    }
                    continue;
                }
            };

            if sym == EOB {
                self.prev_block.clear();
                self.prev_block.extend_from_slice(out);
                return out.len();
            }

            if sym > EOB {
                let (length, distance) = self.decode_pair(r, &dd_table, sym);
                self.copy_match(out, length, distance);
            } else {
                out.push(sym as u8);
            }
        }

        // Stream ended without an end-of-block symbol
        self.prev_block.clear();
        self.prev_block.extend_from_slice(out);
        out.len()
    }

    fn decode_pair(&self, r: &mut BitReader, dd_table: &SymbolTable, sym: u16) -> (usize, usize) {
        let (min_len, lx) = tables::length_base(sym);
        r.refill();
        let length = min_len + r.peek(lx) as usize;
        r.consume(lx);

        let mut distance = 0;
        loop {
            r.refill();
            if r.bits_left() < dd_table.min_len as i32 && r.exhausted() {
                break;
            }
            if let Some(dcode) = dd_table.decode(r) {
                let (min_dist, dx) = tables::distance_base(dcode);
                r.refill();
                distance = min_dist + r.peek(dx) as usize;
                r.consume(dx);
                break;
            }
            if r.exhausted() || r.bits_left() >= dd_table.max_len as i32 {
                break;
            }
        }

        (length, distance)
    }

    fn copy_match(&self, out: &mut Vec<u8>, mut length: usize, distance: usize) {
        debug_assert!(distance >= 1 && distance <= MAX_DISTANCE);
        if distance == 0 {
            return;
        }

        if distance > out.len() {
            // The run starts in the previous block and may wrap into the
            // head of this one
            let prev_len = self.prev_block.len();
            debug_assert!(prev_len + out.len() >= distance);
            if prev_len + out.len() < distance {
                return;
            }
            let mut start = prev_len + out.len() - distance;

            while length > 0 && start < prev_len {
                out.push(self.prev_block[start]);
                start += 1;
                length -= 1;
            }
            let mut k = 0;
            while length > 0 {
                out.push(out[k]);
                k += 1;
                length -= 1;
            }
        } else {
            let mut k = out.len() - distance;
            while length > 0 {
                out.push(out[k]);
                k += 1;
                length -= 1;
            }
        }
    }
}
