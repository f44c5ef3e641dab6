//! Telemetry records and the per-interval sample pipeline.
//!
//! ```text
//!  read phase ──▶ RollingWindow ──▶ aggregate() ──▶ AggregatedRecord
//!                   (N slots)    └─▶ concatenate() ─▶ ConcatRecord
//! ```

pub mod aggregate;
pub mod concat;
pub mod window;

pub use aggregate::aggregate;
pub use concat::{concatenate, ConcatRecord};
pub use window::RollingWindow;

use serde::{Deserialize, Serialize};

/// Photovoltaic modules sampled per read.
pub const IRRADIANCE_CHANNELS: usize = 5;

/// Wall-clock timestamp of a reading (RTC civil time).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Roll / pitch / yaw in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// One set of node measurements.
///
/// The same shape serves as a per-second sample and as the mean of a
/// publication window.  Irradiance is in W/m², temperature in °C,
/// pressure in hPa, humidity in %RH, altitude in metres and speed in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub irradiance: [f32; IRRADIANCE_CHANNELS],
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub orientation: Orientation,
    pub latitude: f32,
    pub longitude: f32,
    pub altitude: f32,
    pub speed: f32,
    pub location_fix: bool,
    pub timestamp: Timestamp,
}

/// A single read-phase capture.
pub type SampleRecord = TelemetryRecord;

/// The mean of one publication window.
pub type AggregatedRecord = TelemetryRecord;

impl TelemetryRecord {
    /// Whether this sample may contribute to a location mean.
    pub fn has_usable_location(&self) -> bool {
        self.location_fix
            && self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.altitude.is_finite()
            && self.speed.is_finite()
            && self.latitude != 0.0
            && self.longitude != 0.0
            && self.altitude != 0.0
    }
}
