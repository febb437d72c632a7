// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Static-dictionary construction.
//!
//! Candidates are the root-to-leaf paths of the training trie with length
//! at least 4. Their first four bytes set bits in a 2^27-bit membership
//! filter used to pre-screen word positions before walking the trie. A
//! scoring replay over the training words counts exact-4 and >=5 matches
//! per candidate; reduction keeps the candidates worth referencing, trims
//! each to its longest observed use, and assigns final dictionary indexes
//! in priority order under the sub-population caps.

use crate::constants::*;
use crate::error::Result;
use crate::trie::{Trie, NIL};

/// One pre-compression step: `literals` raw bytes, then `match_len` bytes
/// taken from candidate `candidate`. A terminating step has
/// `match_len == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Triple {
    pub literals: u32,
    pub match_len: u32,
    pub candidate: u32,
}

/// The final, index-ordered dictionary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dictionary {
    entries: Vec<Vec<u8>>,
}

impl Dictionary {
    pub(crate) fn from_entries(entries: Vec<Vec<u8>>) -> Self {
        debug_assert!(entries.len() <= MAX_DICT_ENTRIES);
        Dictionary { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> &[u8] {
        &self.entries[index]
    }

    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }
}

/// Maps pre-reduction candidate ids to final dictionary indexes.
pub struct Remap(Vec<i32>);

impl Remap {
    /// Final index for a candidate, or `None` if it was rejected.
    pub fn get(&self, candidate: u32) -> Option<usize> {
        match self.0.get(candidate as usize) {
            Some(&idx) if idx >= 0 => Some(idx as usize),
            _ => None,
        }
    }
}

/// Accumulates candidates and match statistics between the two training
/// passes.
pub struct DictBuilder {
    filter: Vec<u32>,
    candidates: Vec<Vec<u8>>,
    quad_count: Vec<u32>,
    large_count: Vec<u32>,
    max_match: Vec<u8>,
    min_match: Vec<u8>,
}

#[inline]
fn filter_slot(prefix: [u8; 4]) -> (usize, u32) {
    let n = u32::from_be_bytes(prefix).wrapping_mul(FILTER_SEED) >> (32 - FILTER_BITS);
    ((n >> 5) as usize, 1u32 << (31 - (n & 31)))
}

impl DictBuilder {
    /// Walk the trie in order, stamping every node with the id of the
    /// first candidate through it and collecting all leaf paths of length
    /// at least 4 as candidates.
    pub fn from_trie(trie: &mut Trie) -> Result<Self> {
        let mut builder = DictBuilder {
            filter: vec![0u32; 1 << (FILTER_BITS - 5)],
            candidates: Vec::new(),
            quad_count: Vec::new(),
            large_count: Vec::new(),
            max_match: Vec::new(),
            min_match: Vec::new(),
        };

        let mut prefix = Vec::with_capacity(DICT_MAX_MATCH);
        let mut order = 0u32;
        let root = trie.root;
        builder.fetch(trie, root, &mut prefix, &mut order);

        let count = builder.candidates.len();
        builder.quad_count = vec![0; count];
        builder.large_count = vec![0; count];
        builder.max_match = vec![0; count];
        builder.min_match = vec![u8::MAX; count];

        log::debug!("extracted {} dictionary candidates", count);
        Ok(builder)
    }

    fn fetch(&mut self, trie: &mut Trie, node: u32, prefix: &mut Vec<u8>, order: &mut u32) {
        if node == NIL {
            return;
        }

        let (left, right) = {
            let n = &trie.nodes[node as usize];
            (n.left, n.right)
        };

        self.fetch(trie, left, prefix, order);

        trie.nodes[node as usize].order_num = *order;
        prefix.push(trie.nodes[node as usize].key);

        let children = trie.nodes[node as usize].children;
        if children != NIL {
            self.fetch(trie, children, prefix, order);
        } else if prefix.len() >= DICT_MIN_MATCH {
            *order += 1;
            let (slot, mask) = filter_slot([prefix[0], prefix[1], prefix[2], prefix[3]]);
            self.filter[slot] |= mask;
            self.candidates.push(prefix.clone());
        }

        prefix.pop();
        self.fetch(trie, right, prefix, order);
    }

    /// Number of extracted candidates.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Greedily pre-compress one word into `(literals, match_len,
    /// candidate)` triples, appended to `out` with the terminating
    /// `(tail, 0, 0)` step. Returns the number of triples appended.
    pub fn precompress(&self, trie: &Trie, word: &[u8], out: &mut Vec<Triple>) -> usize {
        let before = out.len();
        let size = word.len();
        let mut literals = 0u32;
        let mut i = 0;

        while i + DICT_MIN_MATCH <= size {
            let (slot, mask) = filter_slot([word[i], word[i + 1], word[i + 2], word[i + 3]]);
            if self.filter[slot] & mask == 0 {
                i += 1;
                literals += 1;
                continue;
            }

            // Confirm the filter hit with a trie walk; a hashed filter
            // can report positions no candidate starts at
            let mut match_len = 0usize;
            let mut last_order = 0u32;
            let mut j = i;
            let mut node = trie.child(None, word[j]);
            while let Some(n) = node {
                last_order = trie.nodes[n as usize].order_num;
                match_len += 1;
                j += 1;
                if j >= size || match_len == DICT_MAX_MATCH {
                    break;
                }
                node = trie.child(Some(n), word[j]);
            }

            if match_len >= DICT_MIN_MATCH {
                debug_assert!((last_order as usize) < self.candidates.len());
                debug_assert_eq!(
                    &self.candidates[last_order as usize][..match_len],
                    &word[i..i + match_len]
                );
                out.push(Triple {
                    literals,
                    match_len: match_len as u32,
                    candidate: last_order,
                });
                i += match_len;
                literals = 0;
            } else {
                i += 1;
                literals += 1;
            }
        }

        literals += (size - i) as u32;
        out.push(Triple {
            literals,
            match_len: 0,
            candidate: 0,
        });
        out.len() - before
    }

    /// Accumulate match statistics from a pre-compressed stream.
    pub fn score(&mut self, triples: &[Triple]) {
        for t in triples {
            if t.match_len == 0 {
                continue;
            }
            let id = t.candidate as usize;
            if t.match_len == DICT_MIN_MATCH as u32 {
                self.quad_count[id] += 1;
            } else {
                self.large_count[id] += 1;
            }
            let len = t.match_len as u8;
            if len > self.max_match[id] {
                self.max_match[id] = len;
            }
            if len < self.min_match[id] {
                self.min_match[id] = len;
            }
        }
    }

    /// Reduce the candidates to the final dictionary and the candidate
    /// remap. Deterministic for a given training set.
    pub fn reduce(mut self) -> (Dictionary, Remap) {
        let count = self.candidates.len();
        let mut remap = vec![-1i32; count];

        // Priority, secondary key and admission order
        let mut order: Vec<(u32, u8, u32)> = Vec::new();
        for id in 0..count {
            let quads = self.quad_count[id];
            let large = self.large_count[id];
            if quads < 2 && large < 2 {
                continue;
            }
            order.push((quads + large, self.min_match[id], id as u32));
        }
        order.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| a.1.cmp(&b.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        let mut entries: Vec<Vec<u8>> = Vec::new();
        for &(priority, _, id) in &order {
            if priority < 2 || entries.len() == MAX_DICT_ENTRIES {
                break;
            }
            let id = id as usize;
            let max_match = self.max_match[id] as usize;
            debug_assert!(max_match >= DICT_MIN_MATCH);

            if max_match == 4 && entries.len() >= MAX_QUAD_ENTRIES {
                continue;
            }
            if max_match == 5 && entries.len() >= MAX_LEN5_ENTRIES {
                continue;
            }

            let mut entry = std::mem::take(&mut self.candidates[id]);
            entry.truncate(max_match);
            remap[id] = entries.len() as i32;
            entries.push(entry);
        }

        log::debug!(
            "reduced {} candidates to {} dictionary entries",
            count,
            entries.len()
        );

        (Dictionary::from_entries(entries), Remap(remap))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder_for(words: &[&[u8]]) -> (Trie, DictBuilder, Vec<Triple>) {
        let mut trie = Trie::new();
        for w in words {
            trie.insert(w).unwrap();
        }
        let mut builder = DictBuilder::from_trie(&mut trie).unwrap();
        let mut triples = Vec::new();
        for w in words {
            builder.precompress(&trie, w, &mut triples);
        }
        builder.score(&triples);
        (trie, builder, triples)
    }

    #[test]
    fn test_candidates_are_leaf_paths() {
        let mut trie = Trie::new();
        trie.insert(b"abcd").unwrap();
        trie.insert(b"abcz").unwrap();
        trie.insert(b"ab").unwrap();
        let builder = DictBuilder::from_trie(&mut trie).unwrap();

        assert_eq!(builder.candidate_count(), 2);
        assert_eq!(builder.candidates[0], b"abcd");
        assert_eq!(builder.candidates[1], b"abcz");
    }

    #[test]
    fn test_precompress_roundtrip_against_candidates() {
        let words: &[&[u8]] = &[b"hello world", b"hello there", b"say hello"];
        let (trie, builder, _) = builder_for(words);

        let mut triples = Vec::new();
        for &word in words {
            triples.clear();
            builder.precompress(&trie, word, &mut triples);

            // Replaying literals + candidate bytes must rebuild the word
            let mut rebuilt = Vec::new();
            let mut pos = 0;
            for t in &triples {
                rebuilt.extend_from_slice(&word[pos..pos + t.literals as usize]);
                pos += t.literals as usize;
                if t.match_len > 0 {
                    let entry = &builder.candidates[t.candidate as usize];
                    rebuilt.extend_from_slice(&entry[..t.match_len as usize]);
                    pos += t.match_len as usize;
                }
            }
            assert_eq!(rebuilt, word);
        }
    }

    #[test]
    fn test_precompress_empty_and_short_words() {
        let (trie, builder, _) = builder_for(&[b"abcdef"]);
        let mut triples = Vec::new();

        assert_eq!(builder.precompress(&trie, b"", &mut triples), 1);
        assert_eq!(
            triples[0],
            Triple {
                literals: 0,
                match_len: 0,
                candidate: 0
            }
        );

        triples.clear();
        builder.precompress(&trie, b"abc", &mut triples);
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].literals, 3);
    }

    #[test]
    fn test_scoring_and_reduction() {
        // "tails" appears 3 times with length >= 5, "quadx" only once
        let words: &[&[u8]] = &[b"tails", b"tails", b"tails", b"quadx"];
        let (_, builder, _) = builder_for(words);

        let (dict, remap) = builder.reduce();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.entry(0), b"tails");
        // The rejected candidate maps to nothing
        let mapped: Vec<Option<usize>> = (0..2).map(|id| remap.get(id)).collect();
        assert!(mapped.contains(&Some(0)));
        assert!(mapped.contains(&None));
    }

    #[test]
    fn test_entries_truncate_to_max_match() {
        // The candidate is "abcdefgh" but every use matches only 6 bytes
        let mut trie = Trie::new();
        trie.insert(b"abcdefgh").unwrap();
        let mut builder = DictBuilder::from_trie(&mut trie).unwrap();

        let mut triples = Vec::new();
        for _ in 0..3 {
            builder.precompress(&trie, b"abcdefxy", &mut triples);
        }
        builder.score(&triples);

        let (dict, _) = builder.reduce();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.entry(0), b"abcdef");
    }

    #[test]
    fn test_reduction_is_deterministic() {
        let words: &[&[u8]] = &[b"alpha", b"alpha", b"betas", b"betas", b"gamma", b"gamma"];
        let (_, b1, _) = builder_for(words);
        let (_, b2, _) = builder_for(words);
        let (d1, _) = b1.reduce();
        let (d2, _) = b2.reduce();
        assert_eq!(d1, d2);
    }
}
