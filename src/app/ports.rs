//! Port traits: the hexagonal boundary between the node core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ NodeService / Session (domain)
//! ```
//!
//! Driven adapters (sensors, GPS UART, MQTT transport, Wi-Fi, LEDs,
//! power, storage) implement these traits.  Phases receive them bundled
//! in a [`Ports`] value, so the domain core never touches hardware
//! directly and every phase runs against mocks on the host.
//!
//! ## Security notes
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - **CredentialPort** implementations keep keys out of plaintext logs.
//! - All port errors are typed; callers must handle every variant explicitly.

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::config::NodeConfig;
use crate::error::SensorError;
use crate::nmea::NmeaRing;
use crate::telemetry::{Orientation, Timestamp};

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One environmental sensor reading.  A channel reading exactly 0.0
/// signals a sensor error.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvironmentReading {
    /// °C
    pub temperature: f32,
    /// hPa
    pub pressure: f32,
    /// %RH
    pub humidity: f32,
}

impl EnvironmentReading {
    pub fn is_valid(&self) -> bool {
        self.temperature != 0.0 && self.pressure != 0.0 && self.humidity != 0.0
    }
}

/// Averaged 12-bit ADC levels of the irradiance front end.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IrradianceLevels {
    /// Reference channel sampled first; subtracted from every module.
    pub offset: f32,
    pub modules: [f32; crate::telemetry::IRRADIANCE_CHANNELS],
}

/// Read-side port for the analog and I²C sensors.
pub trait SensorPort {
    fn read_environment(&mut self) -> Result<EnvironmentReading, SensorError>;

    fn read_irradiance_levels(&mut self) -> Result<IrradianceLevels, SensorError>;
}

/// Battery-backed real-time clock.
pub trait ClockPort {
    fn now(&mut self) -> Result<Timestamp, SensorError>;
}

/// GPS receiver behind a DMA-fed UART.
pub trait GpsPort {
    /// Move any received bytes into the ring and report whether the
    /// line is idle (no sentence mid-transfer).
    fn poll_idle(&mut self) -> bool;

    /// The receive ring with its latest `(old_pos, pos)` snapshot.
    fn ring(&self) -> &NmeaRing;
}

/// Inertial unit running the orientation filter.
pub trait FusionPort {
    /// Advance the filter by one sample period.
    fn step(&mut self) -> Result<Orientation, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Connectivity ports (driven adapters: domain ↔ network)
// ───────────────────────────────────────────────────────────────

/// Transport security requested for the broker socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketSecurity<'a> {
    /// Plain TCP.
    None,
    /// TLS without verifying the server certificate.
    ServerNoAuth { server_name: &'a str, ca: &'a [u8] },
    /// TLS verifying the server against `ca`.
    ServerAuth { server_name: &'a str, ca: &'a [u8] },
    /// TLS with server verification and a client certificate.
    MutualAuth {
        server_name: &'a str,
        ca: &'a [u8],
        cert: &'a [u8],
        key: &'a [u8],
    },
}

impl SocketSecurity<'_> {
    pub fn is_tls(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Broker socket endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub host: &'a str,
    pub port: u16,
    pub security: SocketSecurity<'a>,
}

/// MQTT CONNECT parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MqttConnectOptions<'a> {
    pub client_id: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub command_timeout_ms: u32,
}

/// Synchronous MQTT client over a socket owned by the adapter.
///
/// Every call blocks for at most the configured command timeout.
pub trait MqttPort {
    fn open_transport(&mut self, endpoint: &Endpoint<'_>) -> Result<(), MqttError>;

    fn close_transport(&mut self);

    fn connect(&mut self, options: &MqttConnectOptions<'_>) -> Result<(), MqttError>;

    /// QoS 0 publish of `payload` on `topic`.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), MqttError>;

    /// Service the session (keep-alive, inbound traffic) for `timeout_ms`.
    fn yield_for(&mut self, timeout_ms: u32) -> Result<(), MqttError>;

    fn disconnect(&mut self) -> Result<(), MqttError>;
}

/// Wi-Fi station.
pub trait NetworkPort {
    /// Bring the interface up and join the access point, retrying
    /// internally.
    fn init(&mut self) -> Result<(), NetworkError>;

    /// One re-join attempt after a link loss.
    fn reinit(&mut self) -> Result<(), NetworkError>;

    /// Station MAC address.
    fn mac(&self) -> [u8; 6];
}

// ───────────────────────────────────────────────────────────────
// Output ports (driven adapters: domain → board)
// ───────────────────────────────────────────────────────────────

/// Status LEDs.
pub trait IndicatorPort {
    /// Link LED follows Connected / Disconnected.
    fn set_link(&mut self, on: bool);

    fn toggle_link(&mut self);

    /// Visible activity blink after a fully delivered publish.
    fn heartbeat(&mut self);
}

/// Power management.
pub trait PowerPort {
    fn enter_low_power(&mut self);

    fn exit_low_power(&mut self);

    /// Shut down and wake after `secs`.
    fn sleep_for_secs(&mut self, secs: u32);

    /// Full device reset after `after_ms`.
    fn reset(&mut self, after_ms: u32);
}

/// Periodic tick sources (read, slow, fusion).
pub trait TimerPort {
    fn start(&mut self) -> Result<(), crate::error::Error>;

    fn stop(&mut self);
}

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, a
/// diagnostics topic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage ports (driven adapters: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Loads and persists node configuration.
///
/// # Security
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Returns [`NodeConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError>;
}

/// Provisioned secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential {
    /// `HostName=..;HostPort=..;...` device connection string.
    ConnectionString,
    RootCa,
    DeviceCert,
    DeviceKey,
    WifiSsid,
    WifiPassword,
}

impl Credential {
    pub const fn key(self) -> &'static str {
        match self {
            Self::ConnectionString => "conn_str",
            Self::RootCa => "root_ca",
            Self::DeviceCert => "dev_cert",
            Self::DeviceKey => "dev_key",
            Self::WifiSsid => "wifi_ssid",
            Self::WifiPassword => "wifi_pass",
        }
    }
}

pub trait CredentialPort {
    /// Raw bytes of `which`.  [`ConfigError::NotFound`] when unprovisioned.
    fn credential(&self, which: Credential) -> Result<Vec<u8>, ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples tick counting from phase flags)
// ───────────────────────────────────────────────────────────────

/// A flag-gated scheduler phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Read,
    Publish,
    Recover,
    Fusion,
}

/// Callback the [`TickScheduler`](crate::scheduler::TickScheduler)
/// invokes when a phase becomes due.  The main loop implements it by
/// raising the phase flag.
pub trait SchedulerDelegate {
    fn on_phase_due(&mut self, phase: Phase);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Everything a scheduler phase may touch, borrowed for one call.
pub struct Ports<'a> {
    pub sensors: &'a mut dyn SensorPort,
    pub clock: &'a mut dyn ClockPort,
    pub gps: &'a mut dyn GpsPort,
    pub fusion: &'a mut dyn FusionPort,
    pub mqtt: &'a mut dyn MqttPort,
    pub network: &'a mut dyn NetworkPort,
    pub indicator: &'a mut dyn IndicatorPort,
    pub power: &'a mut dyn PowerPort,
    pub delay: &'a mut dyn DelayNs,
    pub sink: &'a mut dyn EventSink,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] and [`CredentialPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Nothing stored under the key (first boot).
    NotFound,
    /// Stored blob failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`NetworkPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkError {
    /// Every join attempt failed.
    JoinFailed,
    /// The station driver could not be started.
    DriverFailed,
    /// No SSID provisioned.
    NoCredentials,
    /// SSID or passphrase out of range.
    InvalidCredentials,
}

/// Errors from [`MqttPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqttError {
    /// TCP/TLS socket could not be opened.
    Transport,
    /// CONNECT refused or timed out; carries the return code.
    Connect(i32),
    Publish,
    Yield,
    /// Operation needs an open session.
    NotConnected,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JoinFailed => write!(f, "could not join access point"),
            Self::DriverFailed => write!(f, "station driver failed"),
            Self::NoCredentials => write!(f, "no Wi-Fi credentials"),
            Self::InvalidCredentials => write!(f, "SSID must be 1-32 printable bytes, passphrase empty or 8-64 bytes"),
        }
    }
}

impl fmt::Display for MqttError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "socket open failed"),
            Self::Connect(rc) => write!(f, "connect refused (rc={})", rc),
            Self::Publish => write!(f, "publish failed"),
            Self::Yield => write!(f, "yield failed"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_channel_marks_environment_invalid() {
        let ok = EnvironmentReading {
            temperature: 21.0,
            pressure: 1009.0,
            humidity: 55.0,
        };
        assert!(ok.is_valid());
        assert!(!EnvironmentReading { humidity: 0.0, ..ok }.is_valid());
        assert!(!EnvironmentReading::default().is_valid());
    }

    #[test]
    fn only_plain_tcp_is_not_tls() {
        assert!(!SocketSecurity::None.is_tls());
        let s = SocketSecurity::ServerAuth {
            server_name: "broker",
            ca: b"pem",
        };
        assert!(s.is_tls());
    }
}
