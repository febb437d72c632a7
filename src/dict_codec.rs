// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Compression of the static dictionary itself.
//!
//! The dictionary is flattened into a symbol stream: the bytes of each
//! entry followed by an end-of-word marker. LZ77 with a dedicated 65,536
//! bucket table finds repeats (matches never contain a marker), and the
//! stream is emitted with the 284-symbol canonical alphabet; distances go
//! out as raw 5-bit distance codes plus extra bits.

use std::io;

use crate::bits::{BitReader, BitWriter};
use crate::constants::*;
use crate::dict::Dictionary;
use crate::huffman::{self, CodeMap};
use crate::tables;

struct DictMatch {
    pos: usize,
    dist: usize,
    len: usize,
}

#[inline]
fn sym_key(stream: &[u16], i: usize) -> Option<u32> {
    let (a, b, c, d) = (stream[i], stream[i + 1], stream[i + 2], stream[i + 3]);
    if a == EOB || b == EOB || c == EOB || d == EOB {
        return None;
    }
    Some((a as u32) << 24 | (b as u32) << 16 | (c as u32) << 8 | d as u32)
}

fn find_matches(stream: &[u16]) -> Vec<DictMatch> {
    let mut table: Vec<Vec<u32>> = vec![Vec::new(); 1 << DICT_LZ_SHIFT];
    let mut matches = Vec::new();
    let size = stream.len();

    let mut i = 0;
    while i + 4 <= size {
        let key = match sym_key(stream, i) {
            Some(key) => key,
            None => {
                i += 1;
                continue;
            }
        };
        let h = (DICT_LZ_SEED.wrapping_mul(key) >> (32 - DICT_LZ_SHIFT)) as usize;

        let mut best_len = 0;
        let mut best_dist = 0;
        for &idx in table[h].iter().rev() {
            let idx = idx as usize;
            if i - idx > MAX_DISTANCE {
                break;
            }
            if sym_key(stream, idx) != Some(key) {
                continue;
            }

            let mut len = 4;
            let (mut j, mut k) = (i + 4, idx + 4);
            while j < size && len < DICT_MAX_MATCH && stream[j] == stream[k] {
                if stream[j] == EOB {
                    break;
                }
                j += 1;
                k += 1;
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_dist = i - idx;
            }
        }

        table[h].push(i as u32);
        if best_len >= DICT_MIN_MATCH {
            matches.push(DictMatch {
                pos: i,
                dist: best_dist,
                len: best_len,
            });
            i += best_len;
        } else {
            i += 1;
        }
    }
    matches
}

/// Compress the dictionary. An empty dictionary encodes to zero bytes.
pub(crate) fn encode(dict: &Dictionary) -> io::Result<Vec<u8>> {
    if dict.is_empty() {
        return Ok(Vec::new());
    }

    let mut stream: Vec<u16> = Vec::new();
    for entry in dict.entries() {
        debug_assert!((DICT_MIN_MATCH..=DICT_MAX_MATCH).contains(&entry.len()));
        stream.extend(entry.iter().map(|&b| b as u16));
        stream.push(EOB);
    }

    let matches = find_matches(&stream);
    log::debug!(
        "dictionary: {} entries, {} symbols, {} repeats",
        dict.len(),
        stream.len(),
        matches.len()
    );

    let mut freq = [0u32; DICT_ALPHABET];
    let mut next = 0;
    let mut i = 0;
    while i < stream.len() {
        if let Some(m) = matches.get(next).filter(|m| m.pos == i) {
            let (code, _, _) = tables::match_len_code(m.len);
            freq[code as usize] += 1;
            i += m.len;
            next += 1;
        } else {
            freq[stream[i] as usize] += 1;
            i += 1;
        }
    }

    let lengths = huffman::package_merge_lengths(&freq, MAX_BIT_LEN);
    let codes = huffman::canonical_codes(&lengths);

    let mut w = BitWriter::new(Vec::new());
    huffman::write_descriptor(&mut w, &lengths)?;
    w.align()?;

    let mut next = 0;
    let mut i = 0;
    while i < stream.len() {
        if let Some(m) = matches.get(next).filter(|m| m.pos == i) {
            let (code, xbits, extra) = tables::match_len_code(m.len);
            w.add_bits(codes[code as usize] as u32, lengths[code as usize])?;
            if xbits > 0 {
                w.add_bits(extra, xbits)?;
            }

            let (dcode, dxbits, dextra) = tables::distance_code(m.dist);
            w.add_bits(dcode as u32, 5)?;
            if dxbits > 0 {
                w.add_bits(dextra, dxbits)?;
            }

            i += m.len;
            next += 1;
        } else {
            let sym = stream[i] as usize;
            w.add_bits(codes[sym] as u32, lengths[sym])?;
            i += 1;
        }
    }

    w.into_inner()
}

/// Restore the dictionary from its compressed form.
pub(crate) fn decode(src: &[u8]) -> Dictionary {
    if src.is_empty() {
        return Dictionary::default();
    }

    let mut r = BitReader::new(src);
    let lengths = huffman::read_descriptor(&mut r, DICT_ALPHABET);
    let codes = huffman::canonical_codes(&lengths);
    let map = CodeMap::build(&lengths, &codes);

    // The word stream is byte-aligned after the descriptor
    let mut r = BitReader::new(&src[r.byte_pos()..]);

    let mut stream: Vec<u16> = Vec::new();
    loop {
        r.refill();
        if r.exhausted() && r.bits_left() < map.min_len as i32 {
            break;
        }

        let sym = match map.decode(&mut r) {
            Some(sym) => sym,
            None => {
                if r.exhausted() || r.bits_left() >= map.max_len as i32 {
                    break;
                }
                continue;
            }
        };

        if sym > EOB {
            let (base, xbits) = tables::match_len_base(sym);
            r.refill();
            let len = base + r.peek(xbits) as usize;
            r.consume(xbits);

            r.refill();
            let dcode = r.peek(5) as u16;
            r.consume(5);
            let (dbase, dxbits) = tables::distance_base(dcode);
            r.refill();
            let dist = dbase + r.peek(dxbits) as usize;
            r.consume(dxbits);

            if dist == 0 || dist > stream.len() {
                break;
            }
            let mut k = stream.len() - dist;
            for _ in 0..len {
                stream.push(stream[k]);
                k += 1;
            }
        } else {
            stream.push(sym);
        }
    }

    let mut entries = Vec::new();
    let mut entry = Vec::new();
    for &sym in &stream {
        if sym == EOB {
            entries.push(std::mem::take(&mut entry));
        } else {
            debug_assert!(sym <= 255);
            entry.push(sym as u8);
        }
    }
    // Symbols conjured out of the final byte's zero padding can only form
    // runt entries; real entries are never shorter than the minimum match
    entries.retain(|e| e.len() >= DICT_MIN_MATCH);
    Dictionary::from_entries(entries)
}
