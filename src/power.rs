//! Sun times, night sleep and idle low-power tracking.
//!
//! The node only produces useful irradiance data in daylight.  With night
//! sleep enabled it shuts down from sunset to the next sunrise; sunrise and
//! sunset are estimated from the day of year and the node's position.
//!
//! ## Sun model
//!
//! ```text
//!  δ   = 23.45° · sin(2π (d + 284) / 365)          declination
//!  H   = acos(−tan δ · tan φ)                      half-day hour angle (h)
//!  EoT = 229.18 (−0.0334 sin θ + 0.04184 sin(2θ + 3.5884)) min,  θ = 2πd / 365.24
//!  noon    = 12 − EoT − λ / 15
//!  sunrise = noon − H
//!  sunset  = noon + H + 0.5
//! ```
//!
//! Times are decimal hours in the RTC's time zone (UTC).  Sunset carries a
//! half-hour margin for late-afternoon measurements.

use core::f32::consts::PI;

use log::info;

use crate::telemetry::Timestamp;

/// `h + m/60 + s/3600`
pub fn hour_to_decimal(hour: u8, minute: u8, second: u8) -> f32 {
    f32::from(hour) + f32::from(minute) / 60.0 + f32::from(second) / 3600.0
}

/// Days before the first of each month (non-leap year).
const MONTH_OFFSET: [u16; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

/// Day of year, 1-based.  An invalid month falls back to mid-year.
pub fn day_of_year(month: u8, day: u8) -> u16 {
    match month {
        1..=12 => MONTH_OFFSET[usize::from(month - 1)] + u16::from(day),
        _ => 365 / 2,
    }
}

/// Sunrise and sunset in decimal hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SunTimes {
    pub sunrise: f32,
    pub sunset: f32,
}

impl SunTimes {
    /// Estimate for `day` of the year at `latitude`/`longitude` (degrees).
    pub fn compute(day: u16, latitude: f32, longitude: f32) -> Self {
        let d = f32::from(day);
        let declination = 23.45_f32.to_radians() * (2.0 * PI * (d + 284.0) / 365.0).sin();

        // Polar day / night: clamp so the hour angle stays defined.
        let cos_h = (-declination.tan() * latitude.to_radians().tan()).clamp(-1.0, 1.0);
        let half_day = cos_h.acos() / (PI / 12.0);

        let theta = 2.0 * PI * d / 365.24;
        let eot_minutes = 229.18 * (-0.0334 * theta.sin() + 0.04184 * (2.0 * theta + 3.5884).sin());
        let noon = 12.0 - eot_minutes / 60.0 - longitude / 15.0;

        Self {
            sunrise: noon - half_day,
            sunset: noon + half_day + 0.5,
        }
    }

    pub fn for_date(now: &Timestamp, latitude: f32, longitude: f32) -> Self {
        Self::compute(day_of_year(now.month, now.day), latitude, longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPeriod {
    Day,
    Night,
}

/// `now` as decimal hours; `None` when the RTC could not be read.
pub fn day_period(now: Option<f32>, sun: &SunTimes) -> DayPeriod {
    match now {
        Some(h) if h < sun.sunrise || h > sun.sunset => DayPeriod::Night,
        _ => DayPeriod::Day,
    }
}

/// Seconds from `now` (decimal hours) until `sunrise`.
pub fn sleep_duration_secs(now: f32, sunrise: f32) -> u32 {
    let hours = if now > 12.0 {
        24.0 - now + sunrise
    } else {
        sunrise - now
    };
    (hours * 3600.0).max(0.0) as u32
}

// ───────────────────────────────────────────────────────────────
// Sun clock
// ───────────────────────────────────────────────────────────────

/// Sun times kept fresh from the node's last good position.
#[derive(Debug, Clone, Copy)]
pub struct SunClock {
    sun: SunTimes,
    /// `(day of year, hour)` of the last refresh.
    refreshed_at: Option<(u16, u8)>,
}

impl SunClock {
    /// Seeded from a reference position for use before the first fix.
    pub fn new(now: Option<&Timestamp>, latitude: f32, longitude: f32) -> Self {
        let day = now.map_or(365 / 2, |t| day_of_year(t.month, t.day));
        Self {
            sun: SunTimes::compute(day, latitude, longitude),
            refreshed_at: None,
        }
    }

    pub fn sun_times(&self) -> SunTimes {
        self.sun
    }

    /// Recompute from `position` at most once per clock hour.
    pub fn refresh(&mut self, now: &Timestamp, position: Option<(f32, f32)>) {
        let Some((latitude, longitude)) = position else {
            return;
        };
        let stamp = (day_of_year(now.month, now.day), now.hour);
        if self.refreshed_at == Some(stamp) {
            return;
        }
        self.sun = SunTimes::for_date(now, latitude, longitude);
        self.refreshed_at = Some(stamp);
        info!(
            "Power: sunrise {:.2}h sunset {:.2}h at ({:.4}, {:.4})",
            self.sun.sunrise, self.sun.sunset, latitude, longitude
        );
    }
}

// ───────────────────────────────────────────────────────────────
// Idle tracking
// ───────────────────────────────────────────────────────────────

/// Counts scheduler iterations in which no phase ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleTracker {
    limit: u32,
    idle_loops: u32,
    low_power: bool,
}

impl IdleTracker {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            idle_loops: 0,
            low_power: false,
        }
    }

    pub fn in_low_power(&self) -> bool {
        self.low_power
    }

    /// A phase is about to run.  Returns `true` if low power must be left.
    pub fn wake(&mut self) -> bool {
        self.idle_loops = 0;
        core::mem::replace(&mut self.low_power, false)
    }

    /// An iteration ran no phase.  Returns `true` when low power should be
    /// entered now.
    pub fn idle(&mut self) -> bool {
        if self.idle_loops >= self.limit && !self.low_power {
            self.low_power = true;
            return true;
        }
        self.idle_loops = self.idle_loops.saturating_add(1);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(month: u8, day: u8, hour: u8) -> Timestamp {
        Timestamp {
            year: 2024,
            month,
            day,
            hour,
            minute: 0,
            second: 0,
        }
    }

    #[test]
    fn decimal_hours() {
        assert_eq!(hour_to_decimal(0, 0, 0), 0.0);
        assert!((hour_to_decimal(13, 30, 36) - 13.51).abs() < 1e-5);
    }

    #[test]
    fn day_of_year_table() {
        assert_eq!(day_of_year(1, 1), 1);
        assert_eq!(day_of_year(3, 1), 60);
        assert_eq!(day_of_year(12, 31), 365);
        assert_eq!(day_of_year(0, 5), 182);
    }

    #[test]
    fn madrid_summer_solstice() {
        // Sunrise ≈ 04:45 UTC, sunset ≈ 19:48 UTC (+0.5 h margin).
        let sun = SunTimes::compute(day_of_year(6, 21), 40.453_333, -3.726_944);
        assert!((sun.sunrise - 4.75).abs() < 0.25, "sunrise {}", sun.sunrise);
        assert!((sun.sunset - 20.3).abs() < 0.25, "sunset {}", sun.sunset);
    }

    #[test]
    fn winter_days_are_shorter() {
        let summer = SunTimes::compute(day_of_year(6, 21), 40.45, -3.72);
        let winter = SunTimes::compute(day_of_year(12, 21), 40.45, -3.72);
        assert!(winter.sunset - winter.sunrise < summer.sunset - summer.sunrise);
    }

    #[test]
    fn polar_latitudes_stay_finite() {
        let sun = SunTimes::compute(day_of_year(6, 21), 89.0, 0.0);
        assert!(sun.sunrise.is_finite() && sun.sunset.is_finite());
    }

    #[test]
    fn period_of_day() {
        let sun = SunTimes {
            sunrise: 6.0,
            sunset: 20.0,
        };
        assert_eq!(day_period(Some(6.0), &sun), DayPeriod::Day);
        assert_eq!(day_period(Some(20.0), &sun), DayPeriod::Day);
        assert_eq!(day_period(Some(22.5), &sun), DayPeriod::Night);
        assert_eq!(day_period(Some(3.0), &sun), DayPeriod::Night);
        assert_eq!(day_period(None, &sun), DayPeriod::Day);
    }

    #[test]
    fn sleep_until_sunrise() {
        assert_eq!(sleep_duration_secs(22.0, 6.0), 8 * 3600);
        assert_eq!(sleep_duration_secs(3.0, 6.0), 3 * 3600);
    }

    #[test]
    fn refresh_at_most_hourly() {
        let mut clock = SunClock::new(Some(&at(6, 21, 10)), 40.45, -3.72);
        let seeded = clock.sun_times();

        clock.refresh(&at(6, 21, 10), None);
        assert_eq!(clock.sun_times(), seeded);

        clock.refresh(&at(6, 21, 10), Some((60.0, -3.72)));
        let north = clock.sun_times();
        assert_ne!(north, seeded);

        clock.refresh(&at(6, 21, 10), Some((40.45, -3.72)));
        assert_eq!(clock.sun_times(), north);

        clock.refresh(&at(6, 21, 11), Some((40.45, -3.72)));
        assert_eq!(clock.sun_times(), seeded);
    }

    #[test]
    fn idle_enters_low_power_once_past_limit() {
        let mut idle = IdleTracker::new(3);
        assert!(!idle.idle());
        assert!(!idle.idle());
        assert!(!idle.idle());
        assert!(idle.idle());
        assert!(idle.in_low_power());
        assert!(!idle.idle());

        assert!(idle.wake());
        assert!(!idle.in_low_power());
        assert!(!idle.wake());
        assert!(!idle.idle());
    }
}
