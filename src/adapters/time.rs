//! Real-time clock adapter.
//!
//! Implements [`ClockPort`] as civil UTC time.
//!
//! - **`target_os = "espidf"`**: `gettimeofday()` on the RTC-backed system
//!   clock.  Times before 2020 mean the clock was never set.
//! - **`not(target_os = "espidf")`**: a fixed epoch advanced by
//!   `std::time::Instant` for host-side testing and simulation.

use crate::app::ports::ClockPort;
use crate::error::SensorError;
use crate::telemetry::Timestamp;

/// 2020-01-01T00:00:00Z
pub const EPOCH_2020: i64 = 1_577_836_800;

/// Civil UTC time of a Unix timestamp.
pub fn civil_from_unix(secs: i64) -> Timestamp {
    let days = secs.div_euclid(86_400);
    let of_day = secs.rem_euclid(86_400);

    // Days-to-civil over 400-year eras starting 0000-03-01.
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + i64::from(month <= 2);

    Timestamp {
        year: year as u16,
        month: month as u8,
        day: day as u8,
        hour: (of_day / 3600) as u8,
        minute: (of_day % 3600 / 60) as u8,
        second: (of_day % 60) as u8,
    }
}

/// Clock adapter for the ESP32 platform.
pub struct RtcClock {
    #[cfg(not(target_os = "espidf"))]
    base_unix: i64,
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for RtcClock {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcClock {
    #[cfg(target_os = "espidf")]
    pub fn new() -> Self {
        Self {}
    }

    /// Simulation starts at 2024-06-21T12:00:00Z.
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self::starting_at(1_718_971_200)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn starting_at(base_unix: i64) -> Self {
        Self {
            base_unix,
            start: std::time::Instant::now(),
        }
    }

    #[cfg(target_os = "espidf")]
    fn unix_secs(&self) -> Result<i64, SensorError> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: gettimeofday writes into a valid stack timeval; a null
        // timezone pointer is accepted.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return Err(SensorError::RtcUnavailable);
        }
        let secs = i64::from(tv.tv_sec);
        if secs < EPOCH_2020 {
            return Err(SensorError::RtcUnavailable);
        }
        Ok(secs)
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_secs(&self) -> Result<i64, SensorError> {
        Ok(self.base_unix + self.start.elapsed().as_secs() as i64)
    }
}

impl ClockPort for RtcClock {
    fn now(&mut self) -> Result<Timestamp, SensorError> {
        self.unix_secs().map(civil_from_unix)
    }
}
