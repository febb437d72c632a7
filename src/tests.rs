// Copyright 2024 Karpeles Lab Inc.
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! End-to-end tests across both codecs.

use crate::constants::{BLOCK_SIZE, HEADER_SIZE, MAX_TRIE_NODES};
use crate::dict::DictBuilder;
use crate::trie::Trie;
use crate::{Compressor, Decompressor, DictCompressor, DictDecompressor};

use rand::{Rng, SeedableRng};

fn stream_roundtrip(words: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = Compressor::create(tmp.path()).unwrap();
    for w in words {
        c.add_word(w).unwrap();
    }
    c.finish().unwrap();

    let mut d = Decompressor::open(tmp.path()).unwrap();
    assert_eq!(d.count(), words.len());
    let mut out = Vec::new();
    let mut buf = Vec::new();
    while d.next(&mut buf).is_some() {
        out.push(buf.clone());
    }
    assert!(!d.has_next());
    out
}

fn dict_roundtrip(words: &[Vec<u8>]) -> Vec<Vec<u8>> {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = DictCompressor::new();
    for w in words {
        c.train(w).unwrap();
        c.add_word(w).unwrap();
    }
    c.write_to_path(tmp.path()).unwrap();

    let mut d = DictDecompressor::open(tmp.path()).unwrap();
    assert_eq!(d.count(), words.len());
    let mut out = Vec::new();
    let mut buf = Vec::new();
    while d.next(&mut buf).is_some() {
        out.push(buf.clone());
    }
    assert!(!d.has_next());
    out
}

#[test]
fn test_single_byte_word() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = Compressor::create(tmp.path()).unwrap();
    c.add_word(&[0xab]).unwrap();
    c.finish().unwrap();

    let raw = std::fs::read(tmp.path()).unwrap();
    assert!(raw.len() > HEADER_SIZE);
    assert_eq!(u32::from_be_bytes(raw[0..4].try_into().unwrap()), 1);
    assert_eq!(u32::from_be_bytes(raw[4..8].try_into().unwrap()), 1);

    let mut d = Decompressor::open(tmp.path()).unwrap();
    let mut buf = Vec::new();
    assert_eq!(d.next(&mut buf), Some(1));
    assert_eq!(buf, [0xab]);
    assert!(!d.has_next());
}

#[test]
fn test_window_crossing_match() {
    // Two 40,000-byte zero words: block 2 must reference block 1, and the
    // whole stream compresses to a sliver of the input
    let words = vec![vec![0u8; 40000], vec![0u8; 40000]];

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = Compressor::create(tmp.path()).unwrap();
    for w in &words {
        c.add_word(w).unwrap();
    }
    c.finish().unwrap();
    assert!(std::fs::read(tmp.path()).unwrap().len() < 2000);

    let mut d = Decompressor::open(tmp.path()).unwrap();
    let mut buf = Vec::new();
    for w in &words {
        d.next(&mut buf).unwrap();
        assert_eq!(&buf, w);
    }
}

#[test]
fn test_incompressible_block_is_stored_and_roundtrips() {
    // One word filling exactly one block with uniform random bytes: the
    // encoder must fall back to a stored block
    let mut rng = rand::rngs::StdRng::seed_from_u64(0xbadc0de);
    let word: Vec<u8> = (0..BLOCK_SIZE - 3).map(|_| rng.gen()).collect();
    let words = vec![word];

    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = Compressor::create(tmp.path()).unwrap();
    c.add_word(&words[0]).unwrap();
    c.finish().unwrap();

    // Stored block: 24-byte header + 2 bits + the raw bytes
    let raw = std::fs::read(tmp.path()).unwrap();
    assert!(raw.len() >= HEADER_SIZE + BLOCK_SIZE);

    assert_eq!(stream_roundtrip(&words), words);
}

#[test]
fn test_word_straddles_many_blocks() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(3);
    let mut word = vec![0u8; 200_000];
    // Half structure, half noise
    for chunk in word.chunks_mut(100) {
        let b: u8 = rng.gen();
        for (i, slot) in chunk.iter_mut().enumerate() {
            *slot = if i % 2 == 0 { b } else { rng.gen() };
        }
    }
    let words = vec![word, b"tail".to_vec()];
    assert_eq!(stream_roundtrip(&words), words);
}

#[test]
fn test_stream_with_empty_words() {
    let words = vec![
        Vec::new(),
        b"middle".to_vec(),
        Vec::new(),
        Vec::new(),
        b"end".to_vec(),
    ];
    assert_eq!(stream_roundtrip(&words), words);
}

#[test]
fn test_stream_many_words() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(11);
    let vocabulary: Vec<Vec<u8>> = (0..50)
        .map(|i| format!("field-{}-of-record", i).into_bytes())
        .collect();
    let words: Vec<Vec<u8>> = (0..20_000)
        .map(|_| vocabulary[rng.gen_range(0..vocabulary.len())].clone())
        .collect();
    assert_eq!(stream_roundtrip(&words), words);
}

#[test]
fn test_dict_identical_words_use_one_reference() {
    // With the dictionary ["hello"], each word is one reference plus the
    // end-of-word symbol
    let words = vec![b"hello".to_vec(); 8];

    let mut trie = Trie::new();
    for w in &words {
        trie.insert(w).unwrap();
    }
    let mut builder = DictBuilder::from_trie(&mut trie).unwrap();
    let mut triples = Vec::new();
    for w in &words {
        let n = builder.precompress(&trie, w, &mut triples);
        assert_eq!(n, 2);
    }
    // One full-length match step and the terminator per word
    assert_eq!(triples[0].literals, 0);
    assert_eq!(triples[0].match_len, 5);
    builder.score(&triples);
    let (dict, remap) = builder.reduce();
    assert_eq!(dict.len(), 1);
    assert_eq!(dict.entry(0), b"hello");
    assert_eq!(remap.get(0), Some(0));

    assert_eq!(dict_roundtrip(&words), words);
}

#[test]
fn test_dict_roundtrip_mixed_words() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(21);
    let mut words: Vec<Vec<u8>> = Vec::new();
    for i in 0..5_000 {
        match i % 4 {
            0 => words.push(format!("account/{:06}/balance", i % 97).into_bytes()),
            1 => words.push(format!("account/{:06}/nonce", i % 97).into_bytes()),
            2 => words.push((0..rng.gen_range(0..40)).map(|_| rng.gen()).collect()),
            _ => words.push(Vec::new()),
        }
    }
    assert_eq!(dict_roundtrip(&words), words);
}

#[test]
fn test_dict_without_training_is_all_literals() {
    let mut c = DictCompressor::new();
    let words = vec![b"plain one".to_vec(), b"plain two".to_vec()];
    for w in &words {
        c.add_word(w).unwrap();
    }
    let tmp = tempfile::NamedTempFile::new().unwrap();
    c.write_to_path(tmp.path()).unwrap();

    let mut d = DictDecompressor::open(tmp.path()).unwrap();
    assert_eq!(d.dictionary_len(), 0);
    let mut buf = Vec::new();
    for w in &words {
        d.next(&mut buf).unwrap();
        assert_eq!(&buf, w);
    }
}

#[test]
fn test_dict_large_word_set_spans_blocks() {
    // More than 2^24 bytes of words forces multiple blocks
    let word = vec![0x55u8; 200_000];
    let words = vec![word; 90];

    let mut c = DictCompressor::new();
    for w in &words {
        c.train(&w[..255]).unwrap();
        c.add_word(w).unwrap();
    }
    let tmp = tempfile::NamedTempFile::new().unwrap();
    c.write_to_path(tmp.path()).unwrap();

    let raw = std::fs::read(tmp.path()).unwrap();
    let num_blocks = u32::from_be_bytes(raw[8..12].try_into().unwrap());
    assert!(num_blocks >= 2);

    let mut d = DictDecompressor::open(tmp.path()).unwrap();
    let mut buf = Vec::new();
    let mut count = 0;
    while d.next(&mut buf).is_some() {
        assert_eq!(buf, words[count]);
        count += 1;
    }
    assert_eq!(count, words.len());
}

#[test]
#[ignore = "allocates the full 2^24-node trie"]
fn test_trie_node_cap_and_partial_dictionary() {
    let mut trie = Trie::new();
    let mut failed = false;
    let mut sample = [0u8; 6];
    let mut rng = rand::rngs::StdRng::seed_from_u64(5);

    for _ in 0..4_000_000 {
        rng.fill(&mut sample);
        if trie.insert(&sample).is_err() {
            failed = true;
            break;
        }
    }
    assert!(failed, "the node cap was never reached");
    assert!(trie.len() >= MAX_TRIE_NODES);

    // A dictionary built from the partial trie must still work
    let mut builder = DictBuilder::from_trie(&mut trie).unwrap();
    let mut triples = Vec::new();
    rng.fill(&mut sample);
    builder.precompress(&trie, &sample, &mut triples);
    builder.score(&triples);
    let (dict, _) = builder.reduce();
    let encoded = crate::dict_codec::encode(&dict).unwrap();
    assert_eq!(crate::dict_codec::decode(&encoded), dict);
}
