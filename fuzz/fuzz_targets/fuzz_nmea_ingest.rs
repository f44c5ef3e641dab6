//! Fuzz target: NMEA ring → `segment` / `segment_latest` → `decode_sentences`
//!
//! Arbitrary bytes are written into a small receive ring in two bursts so
//! the second one usually wraps.  Segmentation must never panic, every
//! accepted view must start with `$` and stay under the sentence bound,
//! and decoding whatever survives must not panic either.
//!
//! cargo fuzz run fuzz_nmea_ingest

#![no_main]

use libfuzzer_sys::fuzz_target;
use vipv_node::location::decode_sentences;
use vipv_node::nmea::{check, segment, segment_latest, RxRing, MAX_SENTENCE_LEN};

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let cut = usize::from(split).min(rest.len());
    let (first, second) = rest.split_at(cut);

    let mut ring = RxRing::<512>::new();
    ring.push_bytes(first);
    ring.push_bytes(second);
    let (old_pos, pos) = ring.cursors();

    for segments in [segment(&ring, old_pos, pos), segment_latest(&ring)] {
        let Ok(segments) = segments else {
            continue;
        };
        for sentence in segments.iter() {
            assert_eq!(sentence.first(), Some(&b'$'));
            assert!(sentence.len() < MAX_SENTENCE_LEN);
            let _ = check(sentence, true);
        }
        let _ = decode_sentences(segments.iter());
    }
});
