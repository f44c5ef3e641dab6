//! Sentence segmentation over a wrapping receive span.
//!
//! The span between two cursor snapshots is copied into a scratch buffer
//! (head then wrapped tail), cut at NUL, and split on `$`.  A chunk runs
//! from one `$` to the next (or to the end of the span).  Chunks of an
//! acceptable length whose prefix is in [`ACCEPTED`] become sentence
//! views; everything else is skipped.
//!
//! Equal cursors cannot tell "nothing new" from "a full rotation", so
//! [`segment`] scans a fixed window from the start of the buffer in that
//! case.  [`segment_latest`] uses the ring's event length and has no such
//! ambiguity.

use heapless::Vec as HVec;
use log::{debug, warn};

use super::{ring::RxRing, ACCEPTED, INDICATOR_LEN, MAX_SENTENCES, MAX_SENTENCE_LEN};
use crate::error::{Error, Result};

/// Bytes scanned when the cursors have not moved.
pub const STALE_SCAN_LEN: usize = MAX_SENTENCE_LEN * MAX_SENTENCES;

/// Accepted sentences found in one scan.  Owns the scratch copy.
#[derive(Debug, Default)]
pub struct Segments {
    scratch: Vec<u8>,
    ranges: HVec<(usize, usize), MAX_SENTENCES>,
}

impl Segments {
    /// Number of accepted sentences.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&[u8]> {
        self.ranges
            .get(index)
            .map(|&(start, end)| &self.scratch[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.ranges
            .iter()
            .map(move |&(start, end)| &self.scratch[start..end])
    }
}

fn copy_parts(head: &[u8], tail: &[u8]) -> Result<Vec<u8>> {
    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(head.len() + tail.len())
        .map_err(|_| Error::Exhausted("nmea scratch buffer"))?;
    scratch.extend_from_slice(head);
    scratch.extend_from_slice(tail);

    if let Some(nul) = scratch.iter().position(|&b| b == 0) {
        scratch.truncate(nul);
    }
    Ok(scratch)
}

fn stale_window<const CAP: usize>(ring: &RxRing<CAP>) -> &[u8] {
    &ring.as_bytes()[..STALE_SCAN_LEN.min(CAP)]
}

fn is_accepted(chunk: &[u8]) -> bool {
    ACCEPTED.iter().any(|prefix| chunk.starts_with(&prefix[..]))
}

/// Extract the accepted sentences received between `old_pos` and `pos`.
///
/// At most [`MAX_SENTENCES`] chunks are examined.  Fails only when the
/// scratch copy cannot be allocated; callers treat that as "no fix".
pub fn segment<const CAP: usize>(ring: &RxRing<CAP>, old_pos: usize, pos: usize) -> Result<Segments> {
    let scratch = if old_pos % CAP == pos % CAP {
        copy_parts(stale_window(ring), &[])?
    } else {
        let (head, tail) = ring.span(old_pos, pos);
        copy_parts(head, tail)?
    };
    Ok(split(scratch, CAP))
}

/// Extract the accepted sentences of the ring's most recent receive event.
///
/// Uses the event's byte count, so a burst that filled the whole ring is
/// scanned in full.  An empty event falls back to the stale window.
pub fn segment_latest<const CAP: usize>(ring: &RxRing<CAP>) -> Result<Segments> {
    let scratch = if ring.last_len() == 0 {
        copy_parts(stale_window(ring), &[])?
    } else {
        let (head, tail) = ring.latest();
        copy_parts(head, tail)?
    };
    Ok(split(scratch, CAP))
}

fn split(scratch: Vec<u8>, cap: usize) -> Segments {
    let mut ranges = HVec::new();

    let Some(mut start) = scratch.iter().position(|&b| b == b'$') else {
        return Segments { scratch, ranges };
    };

    let mut examined = 0;
    let mut scanned = 0;
    loop {
        let next = scratch[start + 1..]
            .iter()
            .position(|&b| b == b'$')
            .map(|p| start + 1 + p);
        let end = next.unwrap_or(scratch.len());
        let len = end - start;
        scanned += len;

        if (INDICATOR_LEN..MAX_SENTENCE_LEN).contains(&len) {
            let chunk = &scratch[start..end];
            if is_accepted(chunk) {
                // Capacity equals the examined-chunk limit, so this cannot overflow.
                let _ = ranges.push((start, end));
            } else {
                debug!("NMEA: skipping {:?}", core::str::from_utf8(&chunk[..INDICATOR_LEN]));
            }
        } else if len >= MAX_SENTENCE_LEN {
            warn!("NMEA: oversize chunk ({} bytes) skipped", len);
        }

        examined += 1;
        match next {
            Some(n) if examined < MAX_SENTENCES && scanned < cap => start = n,
            _ => break,
        }
    }

    Segments { scratch, ranges }
}
