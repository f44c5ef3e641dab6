//! NMEA 0183 ingestion for the GPS receiver.
//!
//! ```text
//!  UART DMA ──▶ RxRing ──▶ segment() ──▶ sentence views ──▶ parse_*()
//!               (old_pos, pos)            (accepted set)     (scan)
//! ```
//!
//! The ring is written by the UART receiver; segmentation copies the span
//! between two cursor snapshots, splits it on `$` and keeps the sentences
//! the location decoder understands.  Parsing is format-driven: each
//! sentence type is a field layout string fed to [`scan`].

pub mod checksum;
pub mod ring;
pub mod scan;
pub mod segment;
pub mod sentences;
pub mod types;

pub use checksum::check;
pub use ring::{NmeaRing, RxRing};
pub use scan::{scan, Field, Fields};
pub use segment::{segment, segment_latest, Segments};
pub use sentences::{sentence_id, SentenceId};
pub use types::{NmeaDate, NmeaTime, ScaledFloat};

/// Longest sentence the segmenter will accept (exclusive bound).
pub const MAX_SENTENCE_LEN: usize = 80;

/// Sentences examined per segmentation call.
pub const MAX_SENTENCES: usize = 8;

/// Length of the `$TTSSS` talker + sentence prefix.
pub const INDICATOR_LEN: usize = 6;

/// Prefixes the segmenter hands on to the decoder.
pub const ACCEPTED: [&[u8; INDICATOR_LEN]; 4] = [b"$GPRMC", b"$GPGSV", b"$GPGGA", b"$GPGSA"];

/// Default capacity of the UART receive ring.
pub const RING_CAPACITY: usize = 1024;
