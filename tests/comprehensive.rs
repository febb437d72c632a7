// Copyright 2024 Karpeles Lab Inc.
// Comprehensive tests across both word codecs

use wordzip::{Compressor, Decompressor, DictCompressor, DictDecompressor};

fn stream_file(words: &[Vec<u8>]) -> tempfile::NamedTempFile {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = Compressor::create(tmp.path()).unwrap();
    for w in words {
        c.add_word(w).unwrap();
    }
    c.finish().unwrap();
    tmp
}

fn dict_file(words: &[Vec<u8>]) -> tempfile::NamedTempFile {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let mut c = DictCompressor::new();
    for w in words {
        c.train(w).unwrap();
        c.add_word(w).unwrap();
    }
    c.write_to_path(tmp.path()).unwrap();
    tmp
}

fn test_cases() -> Vec<(&'static str, Vec<Vec<u8>>)> {
    vec![
        ("empty_set", Vec::new()),
        ("one_empty_word", vec![Vec::new()]),
        ("single_byte", vec![vec![0xab]]),
        ("small_text", vec![b"Hello, World!".to_vec()]),
        ("repeated", vec![vec![b'a'; 1000]; 3]),
        (
            "pattern",
            vec![(0..1000).map(|i| (i % 256) as u8).collect(); 5],
        ),
        (
            "lorem",
            b"Lorem ipsum dolor sit amet, consectetur adipiscing elit. "
                .chunks(7)
                .map(|c| c.to_vec())
                .collect(),
        ),
        (
            "mixed_sizes",
            (0..200)
                .map(|i| vec![(i % 251) as u8; (i * 37) % 512])
                .collect(),
        ),
    ]
}

#[test]
fn test_stream_roundtrip_all_cases() {
    for (name, words) in test_cases() {
        let tmp = stream_file(&words);
        let mut d = Decompressor::open(tmp.path())
            .unwrap_or_else(|_| panic!("{}: open failed", name));
        assert_eq!(d.count(), words.len(), "{}: word count", name);

        let mut buf = Vec::new();
        for (i, want) in words.iter().enumerate() {
            assert!(d.has_next(), "{}: has_next at {}", name, i);
            let len = d.next(&mut buf);
            assert_eq!(len, Some(want.len()), "{}: length of word {}", name, i);
            assert_eq!(&buf, want, "{}: word {}", name, i);
        }
        assert!(!d.has_next(), "{}: exhausted", name);
    }
}

#[test]
fn test_dict_roundtrip_all_cases() {
    for (name, words) in test_cases() {
        let tmp = dict_file(&words);
        let mut d = DictDecompressor::open(tmp.path())
            .unwrap_or_else(|_| panic!("{}: open failed", name));
        assert_eq!(d.count(), words.len(), "{}: word count", name);

        let mut buf = Vec::new();
        for (i, want) in words.iter().enumerate() {
            let len = d.next(&mut buf);
            assert_eq!(len, Some(want.len()), "{}: length of word {}", name, i);
            assert_eq!(&buf, want, "{}: word {}", name, i);
        }
        assert!(!d.has_next(), "{}: exhausted", name);
    }
}

#[test]
fn test_stream_reset_gives_identical_sequence() {
    let words: Vec<Vec<u8>> = (0..500)
        .map(|i| format!("row {} of the table", i).into_bytes())
        .collect();
    let tmp = stream_file(&words);
    let mut d = Decompressor::open(tmp.path()).unwrap();

    let mut first = Vec::new();
    let mut buf = Vec::new();
    while d.next(&mut buf).is_some() {
        first.push(buf.clone());
    }

    d.reset();
    let mut second = Vec::new();
    while d.next(&mut buf).is_some() {
        second.push(buf.clone());
    }
    assert_eq!(first, second);
    assert_eq!(first, words);
}

#[test]
fn test_dict_reset_gives_identical_sequence() {
    let words: Vec<Vec<u8>> = (0..500)
        .map(|i| format!("column {} of the table", i % 7).into_bytes())
        .collect();
    let tmp = dict_file(&words);
    let mut d = DictDecompressor::open(tmp.path()).unwrap();

    let mut first = Vec::new();
    let mut buf = Vec::new();
    while d.next(&mut buf).is_some() {
        first.push(buf.clone());
    }

    d.reset();
    let mut second = Vec::new();
    while d.next(&mut buf).is_some() {
        second.push(buf.clone());
    }
    assert_eq!(first, second);
    assert_eq!(first, words);
}

#[test]
fn test_stream_skip_interleaved_with_next() {
    let words: Vec<Vec<u8>> = (0..100).map(|i| vec![i as u8; i]).collect();
    let tmp = stream_file(&words);
    let mut d = Decompressor::open(tmp.path()).unwrap();

    let mut buf = Vec::new();
    for (i, w) in words.iter().enumerate() {
        if i % 2 == 0 {
            assert_eq!(d.skip(), Some(w.len()));
        } else {
            d.next(&mut buf).unwrap();
            assert_eq!(&buf, w);
        }
    }
    assert!(!d.has_next());
}

#[test]
fn test_dict_match_queries() {
    let words = vec![
        b"shared stem alpha".to_vec(),
        b"shared stem beta".to_vec(),
        b"other".to_vec(),
    ];
    let tmp = dict_file(&words);
    let mut d = DictDecompressor::open(tmp.path()).unwrap();

    assert!(d.match_prefix(b"shared"));
    assert!(!d.match_word(b"shared stem beta"));
    assert!(d.match_word(b"shared stem alpha"));
    assert!(d.match_prefix(b"shared stem b"));
    assert_eq!(d.skip(), Some(16));
    assert!(d.match_word(b"other"));
    assert!(!d.has_next());
}

#[test]
fn test_compression_ratio_on_structured_words() {
    // Heavily repetitive record-shaped words should shrink well under
    // both codecs
    let words: Vec<Vec<u8>> = (0..10_000)
        .map(|i| format!("/storage/contract/{:04}/slot/{:02}", i % 50, i % 25).into_bytes())
        .collect();
    let raw: usize = words.iter().map(Vec::len).sum();

    let tmp = stream_file(&words);
    let stream_size = std::fs::metadata(tmp.path()).unwrap().len() as usize;
    assert!(stream_size < raw / 3, "stream: {} vs {}", stream_size, raw);

    let tmp = dict_file(&words);
    let dict_size = std::fs::metadata(tmp.path()).unwrap().len() as usize;
    assert!(dict_size < raw / 3, "dict: {} vs {}", dict_size, raw);
}
