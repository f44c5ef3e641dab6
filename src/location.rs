//! GPS location decoding.
//!
//! ```text
//!  GpsPort ──poll_idle()──▶ RxRing (latest event) ──▶ segment_latest() ──▶ parse_rmc / gga / gsv
//!                                                                              │
//!                                                                  LocationReading ◀┘
//! ```
//!
//! The decoder waits for the UART line to go idle so a sentence still
//! being written by DMA is not cut in half, then decodes whatever complete
//! sentences the last receive burst produced.

use embedded_hal::delay::DelayNs;
use log::{debug, warn};

use crate::app::ports::GpsPort;
use crate::config::NodeConfig;
use crate::nmea::sentences::{parse_gga, parse_gsv, parse_rmc};
use crate::nmea::{segment_latest, sentence_id, SentenceId};

/// Knots to km/h.
pub const KNOTS_TO_KMH: f32 = 1.851_984;

/// Satellites in view needed, together with a fix, to trust a reading.
pub const MIN_SATELLITES: i32 = 7;

/// Output of one decode.  Unset fields are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationReading {
    pub fixed: bool,
    /// Decimal degrees, south negative.
    pub latitude: f32,
    /// Decimal degrees, west negative.
    pub longitude: f32,
    /// Metres above mean sea level.
    pub altitude: f32,
    /// km/h
    pub speed: f32,
}

impl Default for LocationReading {
    fn default() -> Self {
        Self {
            fixed: false,
            latitude: f32::NAN,
            longitude: f32::NAN,
            altitude: f32::NAN,
            speed: f32::NAN,
        }
    }
}

/// Decode a set of sentences into one reading.
///
/// RMC gives position and speed, GGA fix quality and altitude, GSV the
/// satellite count; GSA is accepted and ignored.  With no sentence at all
/// the reading is unfixed with every field NaN.
pub fn decode_sentences<'a>(sentences: impl IntoIterator<Item = &'a [u8]>) -> LocationReading {
    let mut out = LocationReading::default();
    let mut seen = 0usize;
    let mut all_parsed = true;
    let mut fix_quality = 0;
    let mut satellites = 0;

    for sentence in sentences {
        seen += 1;
        let parsed = match sentence_id(sentence, false) {
            SentenceId::Rmc => parse_rmc(sentence).map(|rmc| {
                out.latitude = rmc.latitude.to_coord();
                out.longitude = rmc.longitude.to_coord();
                out.speed = rmc.speed.to_f32() * KNOTS_TO_KMH;
            }),
            SentenceId::Gga => parse_gga(sentence).map(|gga| {
                fix_quality = gga.fix_quality;
                out.altitude = gga.altitude.to_f32();
            }),
            SentenceId::Gsv => parse_gsv(sentence).map(|gsv| {
                satellites = gsv.total_sats;
            }),
            SentenceId::Gsa => Ok(()),
            other => {
                debug!("GPS: skipping {:?} sentence", other);
                all_parsed = false;
                continue;
            }
        };
        if let Err(e) = parsed {
            debug!("GPS: parse failed: {}", e);
            all_parsed = false;
        }
    }

    if seen == 0 {
        return out;
    }

    out.fixed = (satellites >= MIN_SATELLITES && fix_quality > 0) || all_parsed || fix_quality > 0;
    out
}

/// Waits for an idle UART line and decodes the latest receive burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationDecoder {
    poll_ms: u32,
    max_polls: Option<u32>,
}

impl LocationDecoder {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            poll_ms: config.uart_idle_poll_ms,
            max_polls: config.uart_idle_max_polls,
        }
    }

    /// Returns `false` if the poll ceiling was reached first.
    fn wait_idle(&self, gps: &mut dyn GpsPort, delay: &mut dyn DelayNs) -> bool {
        let mut polls = 0u32;
        while !gps.poll_idle() {
            if self.max_polls.is_some_and(|max| polls >= max) {
                return false;
            }
            delay.delay_ms(self.poll_ms);
            polls = polls.saturating_add(1);
        }
        true
    }

    pub fn decode(&self, gps: &mut dyn GpsPort, delay: &mut dyn DelayNs) -> LocationReading {
        if !self.wait_idle(gps, delay) {
            warn!("GPS: UART never went idle, decoding the current span anyway");
        }

        match segment_latest(gps.ring()) {
            Ok(segments) => decode_sentences(segments.iter()),
            Err(e) => {
                warn!("GPS: {}", e);
                LocationReading::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::NmeaRing;

    const RMC: &[u8] = b"$GPRMC,081836,A,3751.65,S,14507.36,E,000.0,360.0,130998,011.3,E*62\r\n";
    const GGA: &[u8] =
        b"$GPGGA,123204.00,5106.94086,N,01701.51680,E,1,06,3.86,127.9,M,40.5,M,,*51\r\n";
    const GSV: &[u8] = b"$GPGSV,3,3,11,22,42,067,42,24,14,311,43,27,05,244,00,,,,*4D\r\n";

    struct FakeGps {
        ring: NmeaRing,
        busy_polls: u32,
        polls: u32,
    }

    impl FakeGps {
        fn with(data: &[u8], busy_polls: u32) -> Self {
            let mut ring = NmeaRing::new();
            ring.push_bytes(data);
            Self {
                ring,
                busy_polls,
                polls: 0,
            }
        }
    }

    impl GpsPort for FakeGps {
        fn poll_idle(&mut self) -> bool {
            self.polls += 1;
            self.polls > self.busy_polls
        }

        fn ring(&self) -> &NmeaRing {
            &self.ring
        }
    }

    #[derive(Default)]
    struct CountingDelay {
        ms: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.ms += ms;
        }
    }

    #[test]
    fn rmc_gives_position_and_speed() {
        let r = decode_sentences([RMC]);
        assert!(r.fixed);
        assert!((r.latitude + 37.860_833).abs() < 1e-4);
        assert!((r.longitude - 145.122_67).abs() < 1e-4);
        assert_eq!(r.speed, 0.0);
        assert!(r.altitude.is_nan());
    }

    #[test]
    fn gga_and_gsv_fill_altitude_and_fix() {
        let r = decode_sentences([RMC, GGA, GSV]);
        assert!(r.fixed);
        assert!((r.altitude - 127.9).abs() < 1e-3);
    }

    #[test]
    fn unparseable_sentence_without_fix_is_unfixed() {
        let broken: &[u8] = b"$GPRMC,081836,A,3751.65,Q,14507.36,E,000.0,360.0,130998,011.3,E\r\n";
        let r = decode_sentences([broken]);
        assert!(!r.fixed);
    }

    #[test]
    fn fix_quality_alone_declares_a_fix() {
        let bad_gsv: &[u8] = b"$GPGSV,3,3,11,22,42,067,42*FF\r\n";
        let r = decode_sentences([GGA, bad_gsv]);
        assert!(r.fixed);
    }

    #[test]
    fn no_sentences_leaves_outputs_untouched() {
        let r = decode_sentences(core::iter::empty());
        assert!(!r.fixed);
        assert!(r.latitude.is_nan());
        assert!(r.speed.is_nan());
    }

    #[test]
    fn speed_is_converted_to_kmh() {
        let rmc: &[u8] = b"$GPRMC,225446,A,4916.45,N,12311.12,W,010.0,054.7,191194,020.3,E";
        let r = decode_sentences([rmc]);
        assert!((r.speed - 18.519_84).abs() < 1e-3);
        assert!(r.longitude < 0.0);
    }

    #[test]
    fn decoder_waits_for_idle_line() {
        let mut gps = FakeGps::with(RMC, 3);
        let mut delay = CountingDelay::default();
        let decoder = LocationDecoder::new(&NodeConfig::default());
        let r = decoder.decode(&mut gps, &mut delay);
        assert!(r.fixed);
        assert_eq!(delay.ms, 3 * NodeConfig::default().uart_idle_poll_ms);
    }

    #[test]
    fn poll_ceiling_bounds_the_wait() {
        let mut gps = FakeGps::with(RMC, u32::MAX);
        let mut delay = CountingDelay::default();
        let config = NodeConfig {
            uart_idle_max_polls: Some(4),
            ..NodeConfig::default()
        };
        let r = LocationDecoder::new(&config).decode(&mut gps, &mut delay);
        assert_eq!(delay.ms, 4 * config.uart_idle_poll_ms);
        assert!(r.fixed);
    }

    #[test]
    fn empty_ring_has_no_fix() {
        let mut gps = FakeGps::with(b"", 0);
        let mut delay = CountingDelay::default();
        let r = LocationDecoder::new(&NodeConfig::default()).decode(&mut gps, &mut delay);
        assert!(!r.fixed);
        assert!(r.latitude.is_nan());
    }
}
