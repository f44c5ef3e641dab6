//! Channel payloads and delivery.
//!
//! Each record goes out as `key=value&...` payloads on the ingestion
//! service's channels:
//!
//! | Channel | Content                                           |
//! |---------|---------------------------------------------------|
//! | 1       | irradiance ×5, temperature, pressure, humidity    |
//! | 2       | position, speed, orientation                      |
//! | 3       | raw irradiance / temperature / speed series       |
//! | 4       | raw position / orientation / time series          |
//!
//! Channels 1 and 2 carry `lat`, `long` and `elevation` only when the
//! record has a fix.  A channel counts as delivered when both its publish
//! and the following yield succeed; each transport failure raises the
//! connection distrust score.

use core::fmt::Write;

use log::{debug, info, warn};

use crate::app::ports::{IndicatorPort, MqttPort};
use crate::config::{NodeConfig, Topic, CHANNEL_COUNT};
use crate::error::CommsError;
use crate::telemetry::{AggregatedRecord, ConcatRecord, Timestamp};

/// Capacity of an averaged-channel payload.
pub const PAYLOAD_CAPACITY: usize = 600;

pub type Payload = heapless::String<PAYLOAD_CAPACITY>;

struct CreatedAt(Timestamp);

impl core::fmt::Display for CreatedAt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let t = &self.0;
        write!(
            f,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            t.year, t.month, t.day, t.hour, t.minute, t.second
        )
    }
}

// ───────────────────────────────────────────────────────────────
// Payload formatting
// ───────────────────────────────────────────────────────────────

/// Channel 1: irradiance and environment.
pub fn format_channel1(r: &AggregatedRecord) -> Result<Payload, CommsError> {
    let mut p = Payload::new();
    let [g1, g2, g3, g4, g5] = r.irradiance;
    write!(
        p,
        "field1={:.6}&field2={:.6}&field3={:.6}&field4={:.6}&field5={:.6}\
         &field6={:.6}&field7={:.6}&field8={:.6}",
        g1, g2, g3, g4, g5, r.temperature, r.pressure, r.humidity
    )
    .map_err(|_| CommsError::PayloadFormat)?;
    if r.location_fix {
        write!(
            p,
            "&lat={:.6}&long={:.6}&elevation={:.6}",
            r.latitude, r.longitude, r.altitude
        )
        .map_err(|_| CommsError::PayloadFormat)?;
    }
    write!(p, "&created_at={}", CreatedAt(r.timestamp)).map_err(|_| CommsError::PayloadFormat)?;
    Ok(p)
}

/// Channel 2: position and orientation.
pub fn format_channel2(r: &AggregatedRecord) -> Result<Payload, CommsError> {
    let mut p = Payload::new();
    let o = &r.orientation;
    let written = if r.location_fix {
        write!(
            p,
            "field1={:.6}&field2={:.6}&field3={:.6}&field4={:.6}\
             &field5={:.6}&field6={:.6}&field7={:.6}\
             &lat={:.6}&long={:.6}&elevation={:.6}",
            r.latitude,
            r.longitude,
            r.altitude,
            r.speed,
            o.roll,
            o.pitch,
            o.yaw,
            r.latitude,
            r.longitude,
            r.altitude
        )
    } else {
        write!(p, "field5={:.6}&field6={:.6}&field7={:.6}", o.roll, o.pitch, o.yaw)
    };
    written.map_err(|_| CommsError::PayloadFormat)?;
    write!(p, "&created_at={}", CreatedAt(r.timestamp)).map_err(|_| CommsError::PayloadFormat)?;
    Ok(p)
}

/// Channel 3: irradiance, temperature and speed series.
pub fn format_channel3(c: &ConcatRecord) -> String {
    let mut p = String::new();
    for (i, series) in c.irradiance.iter().enumerate() {
        let _ = write!(p, "field{}={}&", i + 1, series);
    }
    let _ = write!(
        p,
        "field6={}&field7={}&created_at={}",
        c.temperature,
        c.speed,
        CreatedAt(c.timestamp)
    );
    p
}

/// Channel 4: position, orientation and sample-time series.
pub fn format_channel4(c: &ConcatRecord) -> String {
    let mut p = String::new();
    let _ = write!(
        p,
        "field1={}&field2={}&field3={}&field5={}&field6={}&field7={}&field8={}&created_at={}",
        c.latitude,
        c.longitude,
        c.altitude,
        c.roll,
        c.pitch,
        c.yaw,
        c.time,
        CreatedAt(c.timestamp)
    );
    p
}

// ───────────────────────────────────────────────────────────────
// Publisher
// ───────────────────────────────────────────────────────────────

pub struct Publisher {
    topics: [Topic; CHANNEL_COUNT],
    yield_timeout_ms: u32,
}

impl Publisher {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            topics: config.channels.clone(),
            yield_timeout_ms: config.yield_timeout_ms,
        }
    }

    /// One request/response exchange plus a bounded yield.  The yield
    /// runs even after a rejected publish, and each failed step adds one
    /// to the distrust score.
    fn send(&self, channel: usize, payload: &str, mqtt: &mut dyn MqttPort, distrust: &mut u32) -> bool {
        let topic = self.topics[channel].as_str();
        let mut delivered = true;
        if let Err(e) = mqtt.publish(topic, payload.as_bytes()) {
            *distrust += 1;
            delivered = false;
            warn!("Publish: channel {} {} (distrust={})", channel + 1, e, distrust);
        }
        if let Err(e) = mqtt.yield_for(self.yield_timeout_ms) {
            *distrust += 1;
            delivered = false;
            warn!("Publish: channel {} {} (distrust={})", channel + 1, e, distrust);
        }
        if delivered {
            debug!("Publish: channel {} ok ({} bytes)", channel + 1, payload.len());
        }
        delivered
    }

    /// Deliver an averaged record on channels 1 and 2.
    ///
    /// Every channel is attempted even after an earlier one failed.  Full
    /// success blinks the activity indicator.
    pub fn publish(
        &self,
        record: &AggregatedRecord,
        mqtt: &mut dyn MqttPort,
        indicator: &mut dyn IndicatorPort,
        distrust: &mut u32,
    ) -> bool {
        let payloads = [format_channel1(record), format_channel2(record)];
        let mut delivered = true;
        for (channel, payload) in payloads.iter().enumerate() {
            delivered &= match payload {
                Ok(p) => self.send(channel, p, mqtt, distrust),
                Err(e) => {
                    warn!("Publish: channel {} {}", channel + 1, e);
                    false
                }
            };
        }
        if delivered {
            info!("Publish: record delivered");
            indicator.heartbeat();
        }
        delivered
    }

    /// Deliver a raw-series record on channels 3 and 4.
    pub fn publish_series(&self, series: &ConcatRecord, mqtt: &mut dyn MqttPort, distrust: &mut u32) -> bool {
        let ch3 = self.send(2, &format_channel3(series), mqtt, distrust);
        let ch4 = self.send(3, &format_channel4(series), mqtt, distrust);
        ch3 && ch4
    }
}
