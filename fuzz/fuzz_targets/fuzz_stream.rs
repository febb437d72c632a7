#![no_main]

use libfuzzer_sys::fuzz_target;
use wordzip::{DictCompressor, DictDecompressor};

fuzz_target!(|data: &[u8]| {
    // Skip very large inputs
    if data.len() > 500_000 {
        return;
    }

    let width = data.first().map_or(11, |&b| 1 + b as usize % 48);
    let words: Vec<&[u8]> = data.chunks(width).collect();

    let tmp = tempfile::NamedTempFile::new().unwrap();
    {
        let mut c = DictCompressor::new();
        for w in &words {
            c.train(w).unwrap();
            c.add_word(w).unwrap();
        }
        c.write_to_path(tmp.path()).unwrap();
    }

    let mut d = DictDecompressor::open(tmp.path()).unwrap();
    let mut buf = Vec::new();
    for (i, w) in words.iter().enumerate() {
        assert_eq!(d.next(&mut buf), Some(w.len()), "word {} length", i);
        assert_eq!(&buf, w, "word {} bytes", i);
    }
    assert!(!d.has_next());
});
