//! Raw-series rendering of a window.
//!
//! Every channel becomes one string with a `;` after each sample, e.g.
//! `"812.4;809.9;"`.  Times are rendered `HH-MM-SS;`.  Precision per
//! channel: one decimal for irradiance, environment and speed; three for
//! orientation and altitude; six for coordinates.

use core::fmt::Write;

use super::{SampleRecord, Timestamp, IRRADIANCE_CHANNELS};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConcatRecord {
    pub irradiance: [String; IRRADIANCE_CHANNELS],
    pub temperature: String,
    pub pressure: String,
    pub humidity: String,
    pub roll: String,
    pub pitch: String,
    pub yaw: String,
    pub latitude: String,
    pub longitude: String,
    pub altitude: String,
    pub speed: String,
    pub time: String,
    /// Timestamp of the newest sample.
    pub timestamp: Timestamp,
}

fn push(series: &mut String, value: f32, decimals: usize) {
    // Writing into a String cannot fail.
    let _ = write!(series, "{value:.decimals$};");
}

/// Render `samples` as per-channel series.  `None` for an empty window.
pub fn concatenate(samples: &[SampleRecord]) -> Option<ConcatRecord> {
    let last = samples.last()?;
    let mut out = ConcatRecord {
        timestamp: last.timestamp,
        ..ConcatRecord::default()
    };

    for s in samples {
        let t = &s.timestamp;
        let _ = write!(out.time, "{:02}-{:02}-{:02};", t.hour, t.minute, t.second);

        for (series, value) in out.irradiance.iter_mut().zip(s.irradiance) {
            push(series, value, 1);
        }
        push(&mut out.temperature, s.temperature, 1);
        push(&mut out.pressure, s.pressure, 1);
        push(&mut out.humidity, s.humidity, 1);
        push(&mut out.roll, s.orientation.roll, 3);
        push(&mut out.pitch, s.orientation.pitch, 3);
        push(&mut out.yaw, s.orientation.yaw, 3);
        push(&mut out.latitude, s.latitude, 6);
        push(&mut out.longitude, s.longitude, 6);
        push(&mut out.altitude, s.altitude, 3);
        push(&mut out.speed, s.speed, 1);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::Orientation;

    fn sample(second: u8, irr: f32) -> SampleRecord {
        SampleRecord {
            irradiance: [irr; IRRADIANCE_CHANNELS],
            temperature: 23.46,
            orientation: Orientation {
                roll: 1.23456,
                pitch: 0.0,
                yaw: -90.5,
            },
            latitude: 40.453_333,
            longitude: -3.726_944,
            altitude: 655.5,
            speed: 12.04,
            timestamp: Timestamp {
                year: 2024,
                month: 3,
                day: 1,
                hour: 9,
                minute: 5,
                second,
            },
            ..SampleRecord::default()
        }
    }

    #[test]
    fn series_are_semicolon_terminated_with_fixed_precision() {
        let c = concatenate(&[sample(1, 812.44), sample(2, 809.9)]).unwrap();
        assert_eq!(c.irradiance[0], "812.4;809.9;");
        assert_eq!(c.temperature, "23.5;23.5;");
        assert_eq!(c.roll, "1.235;1.235;");
        assert_eq!(c.yaw, "-90.500;-90.500;");
        assert_eq!(c.altitude, "655.500;655.500;");
        assert_eq!(c.speed, "12.0;12.0;");
        assert_eq!(c.time, "09-05-01;09-05-02;");
        assert!(c.latitude.starts_with("40.4533"));
        assert_eq!(c.latitude.matches(';').count(), 2);
        assert_eq!(c.timestamp.second, 2);
    }

    #[test]
    fn empty_window_renders_nothing() {
        assert!(concatenate(&[]).is_none());
    }
}
