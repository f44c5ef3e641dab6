//! Fixed-capacity receive ring with wrapping span access.
//!
//! The UART driver writes continuously; every RX event moves the write
//! cursor and remembers the previous one, so a consumer can ask for the
//! bytes received between two events as (at most) two slices.

use super::RING_CAPACITY;

/// Receive ring sized for the GPS UART.
pub type NmeaRing = RxRing<RING_CAPACITY>;

pub struct RxRing<const CAP: usize> {
    buf: [u8; CAP],
    old_pos: usize,
    pos: usize,
    last_len: usize,
}

impl<const CAP: usize> Default for RxRing<CAP> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAP: usize> RxRing<CAP> {
    pub const fn new() -> Self {
        Self {
            buf: [0; CAP],
            old_pos: 0,
            pos: 0,
            last_len: 0,
        }
    }

    pub const fn capacity(&self) -> usize {
        CAP
    }

    /// Write `data` at the cursor, wrapping at capacity, and record the
    /// event as `(previous pos, new pos)`.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.old_pos = self.pos;
        self.last_len = data.len().min(CAP);
        for &b in data {
            self.buf[self.pos] = b;
            self.pos = (self.pos + 1) % CAP;
        }
    }

    /// Cursor pair recorded by the most recent receive event.
    pub fn cursors(&self) -> (usize, usize) {
        (self.old_pos, self.pos)
    }

    /// Bytes written by the most recent receive event, capped at capacity.
    pub fn last_len(&self) -> usize {
        self.last_len
    }

    /// The most recent receive event, oldest byte first.  A full-capacity
    /// event covers the whole ring even though its cursors are equal.
    pub fn latest(&self) -> (&[u8], &[u8]) {
        if self.last_len == CAP {
            (&self.buf[self.pos..], &self.buf[..self.pos])
        } else {
            self.span(self.old_pos, self.pos)
        }
    }

    /// Raw backing storage.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes from `old_pos` up to `pos`, as a head slice and a wrapped
    /// tail slice.  `old_pos == pos` yields an empty span; out-of-range
    /// cursors are reduced modulo capacity.
    pub fn span(&self, old_pos: usize, pos: usize) -> (&[u8], &[u8]) {
        let old_pos = old_pos % CAP;
        let pos = pos % CAP;
        if pos >= old_pos {
            (&self.buf[old_pos..pos], &[])
        } else {
            (&self.buf[old_pos..], &self.buf[..pos])
        }
    }

    /// Byte count between two cursors, accounting for wraparound.
    pub fn span_len(old_pos: usize, pos: usize) -> usize {
        let old_pos = old_pos % CAP;
        let pos = pos % CAP;
        if pos >= old_pos {
            pos - old_pos
        } else {
            CAP - old_pos + pos
        }
    }
}
