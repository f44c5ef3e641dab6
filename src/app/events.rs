//! Outbound application events.
//!
//! The [`NodeService`](super::service::NodeService) and the session loop
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them (serial log,
//! status display, test recorder).

use crate::session::SessionState;

/// Broker reachability as seen by the publish and recover phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connected,
    Disconnected,
}

impl LinkState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// One publication window has been aggregated.
    Telemetry(TelemetryData),

    /// The link state flipped.
    LinkChanged { from: LinkState, to: LinkState },

    /// A record was parked in the delivery queue.
    Queued { pending: usize },

    /// The oldest parked record was delivered.
    Drained { pending: usize },

    /// A record could not be parked and was lost.
    Dropped,

    /// The button toggled publishing.
    PublishingToggled(bool),

    /// The node is shutting down until sunrise.
    NightSleep { secs: u32 },

    /// The outer connection session changed state.
    Session(SessionState),

    /// The node service has started.
    Started { window_size: usize },
}

/// A publication-window summary suitable for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    /// Mean over the five modules.
    pub irradiance_mean: f32,
    pub temperature: f32,
    pub pressure: f32,
    pub humidity: f32,
    pub latitude: f32,
    pub longitude: f32,
    pub location_fix: bool,
    pub link: LinkState,
    pub pending: usize,
}
