//! Unified error types for the VIPV sensor node.
//!
//! A single `Error` enum that every subsystem can convert into, keeping
//! the scheduler's error handling uniform.  All variants are `Copy` so
//! they can be passed through the phase functions without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An NMEA sentence could not be validated or decoded.
    Nmea(NmeaError),
    /// A sensor could not be read or returned implausible data.
    Sensor(SensorError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
    /// An allocation or fixed-capacity buffer ran out of room.
    Exhausted(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nmea(e) => write!(f, "nmea: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Exhausted(what) => write!(f, "out of memory: {what}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// NMEA errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NmeaError {
    /// A mandatory field was requested but the sentence ran out.
    MissingField,
    /// Talker field is not `$` followed by five printable characters.
    BadTalker,
    /// Direction field held something other than N/E/S/W.
    BadDirection,
    /// Integer mantissa overflowed before a decimal point was seen.
    Overflow,
    /// A field contained characters its type does not allow.
    BadField,
    /// Sentence suffix does not match the requested sentence type.
    WrongSentence,
    /// A field-level semantic check failed (unit chars, offsets).
    OutOfRange,
    /// Checksum missing (strict mode) or mismatched.
    Checksum,
    /// Sentence is longer than the protocol allows or lacks a `$`.
    Malformed,
}

impl fmt::Display for NmeaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "mandatory field missing"),
            Self::BadTalker => write!(f, "bad talker id"),
            Self::BadDirection => write!(f, "bad direction"),
            Self::Overflow => write!(f, "integer overflow"),
            Self::BadField => write!(f, "bad field"),
            Self::WrongSentence => write!(f, "unexpected sentence type"),
            Self::OutOfRange => write!(f, "field out of range"),
            Self::Checksum => write!(f, "checksum mismatch"),
            Self::Malformed => write!(f, "malformed sentence"),
        }
    }
}

impl From<NmeaError> for Error {
    fn from(e: NmeaError) -> Self {
        Self::Nmea(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Environmental sensor reported 0.0 on one of its channels.
    EnvironmentInvalid,
    /// The real-time clock could not be read.
    RtcUnavailable,
    /// The inertial unit did not produce a fusion step.
    ImuUnavailable,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::EnvironmentInvalid => write!(f, "environment reading invalid"),
            Self::RtcUnavailable => write!(f, "RTC unavailable"),
            Self::ImuUnavailable => write!(f, "IMU unavailable"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    WifiJoinFailed,
    WifiRejoinFailed,
    SocketOpenFailed,
    MqttConnectFailed,
    MqttPublishFailed,
    MqttYieldFailed,
    PayloadFormat,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WifiJoinFailed => write!(f, "WiFi join failed"),
            Self::WifiRejoinFailed => write!(f, "WiFi rejoin failed"),
            Self::SocketOpenFailed => write!(f, "socket open failed"),
            Self::MqttConnectFailed => write!(f, "MQTT connect failed"),
            Self::MqttPublishFailed => write!(f, "MQTT publish failed"),
            Self::MqttYieldFailed => write!(f, "MQTT yield failed"),
            Self::PayloadFormat => write!(f, "payload does not fit its buffer"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
