//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | G={:.1}W | T={:.1}\u{00b0}C P={:.1}hPa H={:.1}% | \
                     pos={} ({:.6}, {:.6}) | link={} pending={}",
                    t.irradiance_mean,
                    t.temperature,
                    t.pressure,
                    t.humidity,
                    if t.location_fix { "FIX" } else { "NOFIX" },
                    t.latitude,
                    t.longitude,
                    t.link.as_str(),
                    t.pending,
                );
            }
            AppEvent::LinkChanged { from, to } => {
                info!("LINK | {} -> {}", from.as_str(), to.as_str());
            }
            AppEvent::Queued { pending } => {
                info!("QUEUE | parked, pending={}", pending);
            }
            AppEvent::Drained { pending } => {
                info!("QUEUE | delivered, pending={}", pending);
            }
            AppEvent::Dropped => {
                info!("QUEUE | full, record dropped");
            }
            AppEvent::PublishingToggled(on) => {
                info!("USER | publishing={}", if *on { "on" } else { "off" });
            }
            AppEvent::NightSleep { secs } => {
                info!("POWER | night sleep {}s", secs);
            }
            AppEvent::Session(state) => {
                info!("SESSION | {}", state.as_str());
            }
            AppEvent::Started { window_size } => {
                info!("START | window={}", window_size);
            }
        }
    }
}
