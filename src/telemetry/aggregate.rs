//! Window mean.
//!
//! Environment, irradiance and orientation are averaged over every
//! sample.  Location is averaged only over samples with a usable fix
//! (see [`TelemetryRecord::has_usable_location`]); the record counts as
//! located when at most half the samples were unusable.  A window with no
//! usable sample reports zeros and no fix.

use super::{AggregatedRecord, Orientation, SampleRecord, TelemetryRecord, IRRADIANCE_CHANNELS};

#[derive(Default)]
struct Sums {
    irradiance: [f64; IRRADIANCE_CHANNELS],
    temperature: f64,
    pressure: f64,
    humidity: f64,
    roll: f64,
    pitch: f64,
    yaw: f64,
    latitude: f64,
    longitude: f64,
    altitude: f64,
    speed: f64,
}

/// Mean of `samples`, timestamped with the newest one.  `None` for an
/// empty window.
///
/// Sums are kept in `f64` so a window of identical samples averages back
/// to exactly that sample.
pub fn aggregate(samples: &[SampleRecord]) -> Option<AggregatedRecord> {
    let last = samples.last()?;
    let count = samples.len();

    let mut sum = Sums::default();
    let mut invalid = 0usize;

    for s in samples {
        for (acc, v) in sum.irradiance.iter_mut().zip(s.irradiance) {
            *acc += f64::from(v);
        }
        sum.temperature += f64::from(s.temperature);
        sum.pressure += f64::from(s.pressure);
        sum.humidity += f64::from(s.humidity);
        sum.roll += f64::from(s.orientation.roll);
        sum.pitch += f64::from(s.orientation.pitch);
        sum.yaw += f64::from(s.orientation.yaw);

        if s.has_usable_location() {
            sum.latitude += f64::from(s.latitude);
            sum.longitude += f64::from(s.longitude);
            sum.altitude += f64::from(s.altitude);
            sum.speed += f64::from(s.speed);
        } else {
            invalid += 1;
        }
    }

    let n = count as f64;
    let mean_of = |acc: f64| (acc / n) as f32;
    let mut mean = TelemetryRecord {
        irradiance: sum.irradiance.map(mean_of),
        temperature: mean_of(sum.temperature),
        pressure: mean_of(sum.pressure),
        humidity: mean_of(sum.humidity),
        orientation: Orientation {
            roll: mean_of(sum.roll),
            pitch: mean_of(sum.pitch),
            yaw: mean_of(sum.yaw),
        },
        latitude: 0.0,
        longitude: 0.0,
        altitude: 0.0,
        speed: 0.0,
        location_fix: false,
        timestamp: last.timestamp,
    };

    let valid = count - invalid;
    if valid > 0 {
        let v = valid as f64;
        mean.latitude = (sum.latitude / v) as f32;
        mean.longitude = (sum.longitude / v) as f32;
        mean.altitude = (sum.altitude / v) as f32;
        mean.speed = (sum.speed / v) as f32;
        mean.location_fix = invalid <= count / 2;
    }

    Some(mean)
}
