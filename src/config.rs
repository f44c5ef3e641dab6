//! Node configuration parameters
//!
//! All tunable parameters for the VIPV sensor node.  Values can be
//! overridden through the [`ConfigPort`](crate::app::ports::ConfigPort)
//! (postcard blob in NVS on the device, JSON on the host).

use serde::{Deserialize, Serialize};

/// Capacity of a channel topic string.
pub const TOPIC_CAPACITY: usize = 100;

/// Channel topic (the channel's write API key on the ingestion service).
pub type Topic = heapless::String<TOPIC_CAPACITY>;

/// Number of publish channels: two for averages, two for raw series.
pub const CHANNEL_COUNT: usize = 4;

/// Largest accepted rolling window, ten minutes of 1 Hz samples.
pub const MAX_WINDOW_SIZE: usize = 600;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Timing ---
    /// Sensor read period (seconds)
    pub read_period_secs: u32,
    /// Publication period (seconds); window size is publish / read
    pub publish_period_secs: u32,
    /// Recovery attempt period (seconds)
    pub recover_period_secs: u32,
    /// Base period of the slow timer driving publish/recover (seconds)
    pub slow_timer_period_secs: u32,
    /// Inertial fusion step rate (Hz)
    pub fusion_rate_hz: u32,
    /// Idle scheduler iterations tolerated before entering low power
    pub idle_loops_before_low_power: u32,

    // --- MQTT ---
    /// MQTT command timeout (milliseconds)
    pub mqtt_command_timeout_ms: u32,
    /// Yield budget after each channel publish (milliseconds)
    pub yield_timeout_ms: u32,
    /// Distrust level at which the network interface is considered down
    pub max_socket_errors_before_netif_reset: u32,

    // --- GPS UART ---
    /// Delay between UART idle polls (milliseconds)
    pub uart_idle_poll_ms: u32,
    /// Optional ceiling on idle polls; `None` waits indefinitely
    pub uart_idle_max_polls: Option<u32>,

    // --- Features ---
    /// Publish per-sample raw series on channels 3 and 4
    pub concat_publishing: bool,
    /// Shut down between sunset and sunrise
    pub night_sleep: bool,

    // --- Location ---
    /// Reference latitude used for sun times before the first fix
    pub default_latitude: f32,
    /// Reference longitude used for sun times before the first fix
    pub default_longitude: f32,

    // --- Channels ---
    /// Topics for channels 1..=4
    pub channels: [Topic; CHANNEL_COUNT],
}

fn topic(s: &str) -> Topic {
    let mut t = Topic::new();
    // Default topics are short literals; an overlong literal would be clipped.
    let _ = t.push_str(&s[..s.len().min(TOPIC_CAPACITY)]);
    t
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Timing
            read_period_secs: 1,
            publish_period_secs: 10,
            recover_period_secs: 5,
            slow_timer_period_secs: 10,
            fusion_rate_hz: 50,
            idle_loops_before_low_power: 3,

            // MQTT
            mqtt_command_timeout_ms: 5000,
            yield_timeout_ms: 500,
            max_socket_errors_before_netif_reset: 3,

            // GPS UART
            uart_idle_poll_ms: 5,
            uart_idle_max_polls: None,

            // Features
            concat_publishing: false,
            night_sleep: false,

            // Location (Madrid reference)
            default_latitude: 40.453_333,
            default_longitude: -3.726_944,

            // Channels
            channels: [
                topic("channels/1/publish"),
                topic("channels/2/publish"),
                topic("channels/3/publish"),
                topic("channels/4/publish"),
            ],
        }
    }
}

impl NodeConfig {
    /// Rolling-window size: samples per publication interval.
    pub fn window_size(&self) -> usize {
        (self.publish_period_secs / self.read_period_secs.max(1)).max(1) as usize
    }

    /// Slow-timer ticks between publish flags.
    pub fn publish_divider(&self) -> u32 {
        (self.publish_period_secs / self.slow_timer_period_secs.max(1)).max(1)
    }

    /// Slow-timer ticks between recover flags.
    pub fn recover_divider(&self) -> u32 {
        (self.recover_period_secs / self.slow_timer_period_secs.max(1)).max(1)
    }

    /// Range-check every field.  Rejects rather than clamps.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.read_period_secs == 0 {
            return Err("read_period_secs must be > 0");
        }
        if self.publish_period_secs == 0 || self.recover_period_secs == 0 {
            return Err("publish/recover periods must be > 0");
        }
        if self.slow_timer_period_secs == 0 {
            return Err("slow_timer_period_secs must be > 0");
        }
        if self.publish_period_secs % self.read_period_secs != 0 {
            return Err("publish period must be a multiple of the read period");
        }
        if self.publish_period_secs % self.slow_timer_period_secs != 0 {
            return Err("publish period must be a multiple of the slow timer period");
        }
        if self.window_size() > MAX_WINDOW_SIZE {
            return Err("publish period holds more than MAX_WINDOW_SIZE reads");
        }
        if self.fusion_rate_hz == 0 || self.fusion_rate_hz > 1000 {
            return Err("fusion_rate_hz must be in 1..=1000");
        }
        if self.channels.iter().any(|c| c.is_empty()) {
            return Err("every channel needs a topic");
        }
        if !self.default_latitude.is_finite() || self.default_latitude.abs() > 90.0 {
            return Err("default_latitude out of range");
        }
        if !self.default_longitude.is_finite() || self.default_longitude.abs() > 180.0 {
            return Err("default_longitude out of range");
        }
        Ok(())
    }

    /// Parse a JSON override.  Missing fields keep their defaults; the
    /// result is validated.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|_| crate::Error::Config("malformed JSON"))?;
        config.validate().map_err(crate::Error::Config)?;
        Ok(config)
    }
}
