//! Outer connection session.
//!
//! Owns the broker settings resolved at boot and drives one connection
//! lifecycle per iteration until the node's distrust score reaches zero:
//!
//! ```text
//!  ┌──────────┐   ┌───────────────┐   ┌─────────────┐   ┌───────────┐
//!  │   Init   │──▶│ SocketAttempt │──▶│ MqttConnect │──▶│ Connected │
//!  └──────────┘   └───────┬───────┘   └──────┬──────┘   └─────┬─────┘
//!                         │ fail             │ fail           │ restart / stop
//!                         ▼                  ▼                ▼
//!                 ┌──────────────────────────────────────────────────┐
//!                 │ Disconnected: network re-join (on failure),      │
//!                 │ MQTT disconnect, socket close, repeat while      │
//!                 │ distrust > 0                                     │
//!                 └──────────────────────────────────────────────────┘
//! ```
//!
//! While Connected the inner loop drains timer events into phase flags and
//! hands them to [`NodeService::run_iteration`].

use log::{error, info, warn};

use crate::adapters::device_id;
use crate::app::events::AppEvent;
use crate::app::ports::{CredentialPort, EventSink, NetworkPort, Ports, PowerPort, TimerPort};
use crate::app::service::{IterationOutcome, NodeService};
use crate::connection::BrokerSettings;
use crate::error::Result;
use crate::events::{Event, EventQueue};
use crate::scheduler::{PhaseFlags, TickScheduler};

/// Delay before the device resets after a boot configuration failure.
pub const BOOT_FAILURE_RESET_MS: u32 = 1500;

/// Pause between scheduler iterations with nothing pending.
const IDLE_SPIN_MS: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    SocketAttempt,
    MqttConnect,
    Connected,
    Disconnected,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SocketAttempt => "socket",
            Self::MqttConnect => "mqtt",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Why [`Session::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The distrust score reached zero.
    Settled,
    /// `keep_running` asked to stop.
    Stopped,
}

pub struct Session {
    settings: BrokerSettings,
    device_id: device_id::DeviceIdString,
    state: SessionState,
    mqtt_open: bool,
    command_timeout_ms: u32,
    yield_timeout_ms: u32,
}

impl Session {
    /// Bring up the network and resolve the provisioned connection string.
    ///
    /// Any failure requests a device reset after
    /// [`BOOT_FAILURE_RESET_MS`] and is returned to the caller.
    pub fn boot(
        service: &NodeService,
        credentials: &dyn CredentialPort,
        network: &mut dyn NetworkPort,
        power: &mut dyn PowerPort,
    ) -> Result<Self> {
        let settings = network
            .init()
            .map_err(|e| {
                error!("Session: network init failed: {}", e);
                crate::error::Error::Init("network init failed")
            })
            .and_then(|()| BrokerSettings::load(credentials))
            .inspect_err(|e| {
                error!("Session: boot failed ({}), resetting in {}ms", e, BOOT_FAILURE_RESET_MS);
                power.reset(BOOT_FAILURE_RESET_MS);
            })?;

        let mac = network.mac();
        let device_id = device_id::device_id(&mac);
        info!(
            "Session: device {} (MAC {}) -> {}:{} ({:?})",
            device_id,
            device_id::mac_hex(&mac),
            settings.host,
            settings.port,
            settings.security
        );
        Ok(Self {
            settings,
            device_id,
            state: SessionState::Init,
            mqtt_open: false,
            command_timeout_ms: service.config().mqtt_command_timeout_ms,
            yield_timeout_ms: service.config().yield_timeout_ms,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn settings(&self) -> &BrokerSettings {
        &self.settings
    }

    /// Run connection iterations until the distrust score reaches zero or
    /// `keep_running` returns `false`.
    pub fn run(
        &mut self,
        service: &mut NodeService,
        events: &EventQueue,
        timers: &mut dyn TimerPort,
        ports: &mut Ports<'_>,
        keep_running: &mut dyn FnMut() -> bool,
    ) -> SessionExit {
        loop {
            let connected = self.connect(service, ports);

            let exit = if connected {
                self.serve(service, events, timers, ports, keep_running)
            } else {
                service.rejoin_network(ports);
                None
            };

            self.teardown(ports);

            if let Some(exit) = exit {
                return exit;
            }
            if service.distrust() == 0 {
                return SessionExit::Settled;
            }
            if !keep_running() {
                return SessionExit::Stopped;
            }
        }
    }

    /// Open the socket and the MQTT session.
    fn connect(&mut self, service: &mut NodeService, ports: &mut Ports<'_>) -> bool {
        self.set_state(SessionState::SocketAttempt, &mut *ports.sink);
        let endpoint = self.settings.endpoint();
        if let Err(e) = ports.mqtt.open_transport(&endpoint) {
            service.on_socket_failed();
            warn!(
                "Session: socket to {}:{} failed: {} (distrust={})",
                endpoint.host,
                endpoint.port,
                e,
                service.distrust()
            );
            return false;
        }

        self.set_state(SessionState::MqttConnect, &mut *ports.sink);
        let options = self.settings.connect_options(self.command_timeout_ms);
        if let Err(e) = ports.mqtt.connect(&options) {
            warn!("Session: {}", e);
            return false;
        }
        self.mqtt_open = true;
        service.on_session_connected(ports);

        if let Err(e) = ports.mqtt.yield_for(self.yield_timeout_ms) {
            warn!("Session: first {}", e);
            return false;
        }
        true
    }

    /// Inner loop.  `None` means the session must be rebuilt.
    fn serve(
        &mut self,
        service: &mut NodeService,
        events: &EventQueue,
        timers: &mut dyn TimerPort,
        ports: &mut Ports<'_>,
        keep_running: &mut dyn FnMut() -> bool,
    ) -> Option<SessionExit> {
        self.set_state(SessionState::Connected, &mut *ports.sink);
        if let Err(e) = timers.start() {
            error!("Session: {}", e);
            service.on_socket_failed();
            return None;
        }

        let mut scheduler = TickScheduler::new(service.config());
        let mut flags = PhaseFlags::default();
        let exit = loop {
            if !keep_running() {
                break Some(SessionExit::Stopped);
            }
            events.drain(|event| match event {
                Event::ButtonPress => flags.toggle_publishing = true,
                tick => scheduler.on_tick(tick, service.needs_recovery(), &mut flags),
            });
            if service.run_iteration(&mut flags, ports) == IterationOutcome::Restart {
                info!("Session: restart requested");
                break None;
            }
            if !flags.any() {
                ports.delay.delay_ms(IDLE_SPIN_MS);
            }
        };

        timers.stop();
        exit
    }

    fn teardown(&mut self, ports: &mut Ports<'_>) {
        if core::mem::take(&mut self.mqtt_open) {
            if let Err(e) = ports.mqtt.disconnect() {
                warn!("Session: disconnect {}", e);
            }
        }
        ports.mqtt.close_transport();
        self.set_state(SessionState::Disconnected, &mut *ports.sink);
    }

    fn set_state(&mut self, to: SessionState, sink: &mut dyn EventSink) {
        if to != self.state {
            info!("Session: {} -> {}", self.state.as_str(), to.as_str());
            self.state = to;
            sink.emit(&AppEvent::Session(to));
        }
    }
}
