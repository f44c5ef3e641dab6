//! GPS receiver adapter.
//!
//! Implements [`GpsPort`].  Bytes drained from the UART are collected into
//! a burst; when a poll finds the line quiet, the burst is committed to the
//! [`NmeaRing`] as one receive event, so the ring's `(old_pos, pos)` pair
//! always brackets the most recent complete burst.
//!
//! - **`target_os = "espidf"`**: non-blocking reads from a
//!   `esp_idf_hal::uart::UartDriver` (9600 8N1).
//! - **all other targets**: chunks queued with [`GpsUart::feed`].

use log::debug;

use crate::app::ports::GpsPort;
use crate::nmea::{NmeaRing, RING_CAPACITY};

#[cfg(target_os = "espidf")]
use esp_idf_hal::{delay::NON_BLOCK, uart::UartDriver};

/// Receiver baud rate.
pub const GPS_BAUD: u32 = 9600;

const READ_CHUNK: usize = 128;

pub struct GpsUart {
    ring: NmeaRing,
    burst: heapless::Vec<u8, RING_CAPACITY>,
    #[cfg(target_os = "espidf")]
    uart: UartDriver<'static>,
    #[cfg(not(target_os = "espidf"))]
    pending: std::collections::VecDeque<Vec<u8>>,
}

impl GpsUart {
    #[cfg(target_os = "espidf")]
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self {
            ring: NmeaRing::new(),
            burst: heapless::Vec::new(),
            uart,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ring: NmeaRing::new(),
            burst: heapless::Vec::new(),
            pending: std::collections::VecDeque::new(),
        }
    }

    /// Simulation: queue bytes to arrive on subsequent polls.
    #[cfg(not(target_os = "espidf"))]
    pub fn feed(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(READ_CHUNK) {
            self.pending.push_back(chunk.to_vec());
        }
    }

    fn absorb(&mut self, data: &[u8]) {
        if self.burst.extend_from_slice(data).is_err() {
            // Burst longer than the ring: commit what we have and go on.
            self.commit();
            let keep = &data[data.len().saturating_sub(RING_CAPACITY)..];
            let _ = self.burst.extend_from_slice(keep);
        }
    }

    fn commit(&mut self) {
        if !self.burst.is_empty() {
            debug!("GPS: burst of {} bytes", self.burst.len());
            self.ring.push_bytes(&self.burst);
            self.burst.clear();
        }
    }

    #[cfg(target_os = "espidf")]
    fn platform_read(&mut self, buf: &mut [u8]) -> usize {
        self.uart.read(buf, NON_BLOCK).unwrap_or(0)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_read(&mut self, buf: &mut [u8]) -> usize {
        match self.pending.pop_front() {
            Some(chunk) => {
                let n = chunk.len().min(buf.len());
                buf[..n].copy_from_slice(&chunk[..n]);
                n
            }
            None => 0,
        }
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for GpsUart {
    fn default() -> Self {
        Self::new()
    }
}

impl GpsPort for GpsUart {
    fn poll_idle(&mut self) -> bool {
        let mut chunk = [0u8; READ_CHUNK];
        let n = self.platform_read(&mut chunk);
        if n > 0 {
            self.absorb(&chunk[..n]);
            return false;
        }
        self.commit();
        true
    }

    fn ring(&self) -> &NmeaRing {
        &self.ring
    }
}
