//! VIPV sensor node firmware library.
//!
//! Solar irradiance, environment, inertial and GPS sampling with windowed
//! aggregation, MQTT publication and store-and-forward recovery.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module, so the whole pipeline builds and runs on the host
//! against simulation adapters.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod connection;
pub mod delivery;
pub mod events;
pub mod location;
pub mod nmea;
pub mod power;
pub mod publisher;
pub mod scheduler;
pub mod session;
pub mod telemetry;

pub mod error;
pub mod pins;

// The adapters and drivers carry cfg-gated device and simulation halves.
pub mod adapters;
pub mod drivers;
pub mod sensors;

pub use error::{Error, Result};
