#![no_main]

use libfuzzer_sys::fuzz_target;
use wordzip::{Compressor, Decompressor};

fuzz_target!(|data: &[u8]| {
    // Skip very large inputs to avoid OOM
    if data.len() > 1_000_000 {
        return;
    }

    // Carve the fuzz input into words: first byte picks the chunk width
    let width = data.first().map_or(17, |&b| 1 + b as usize % 64);
    let words: Vec<&[u8]> = data.chunks(width).collect();

    let tmp = tempfile::NamedTempFile::new().unwrap();
    {
        let mut c = Compressor::create(tmp.path()).unwrap();
        for w in &words {
            c.add_word(w).unwrap();
        }
        c.finish().unwrap();
    }

    let mut d = Decompressor::open(tmp.path()).unwrap();
    let mut buf = Vec::new();
    for (i, w) in words.iter().enumerate() {
        assert_eq!(d.next(&mut buf), Some(w.len()), "word {} length", i);
        assert_eq!(&buf, w, "word {} bytes", i);
    }
    assert!(!d.has_next());
});
