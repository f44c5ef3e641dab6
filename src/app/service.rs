//! Node service, the hexagonal core.
//!
//! [`NodeService`] owns the rolling window, the delivery queue and the
//! link state.  It exposes a clean, hardware-agnostic API.  All I/O flows
//! through the [`Ports`] bundle injected at call sites, making the entire
//! service testable with mock adapters.
//!
//! The session loop turns timer ticks into [`PhaseFlags`] and calls
//! [`NodeService::run_iteration`], which runs the due phases in a fixed
//! order:
//!
//! ```text
//!  toggle ─▶ read ─▶ publish ─▶ recover ─▶ fusion ─▶ idle accounting
//!                                  │
//!                                  └─ network re-joined ─▶ Restart
//! ```

use log::{debug, info, warn};

use crate::config::NodeConfig;
use crate::delivery::DeliveryQueue;
use crate::location::LocationDecoder;
use crate::power::{day_period, hour_to_decimal, sleep_duration_secs, DayPeriod, IdleTracker, SunClock};
use crate::publisher::Publisher;
use crate::scheduler::PhaseFlags;
use crate::sensors::irradiance;
use crate::telemetry::{aggregate, concatenate, AggregatedRecord, Orientation, RollingWindow};

use super::commands::AppCommand;
use super::events::{AppEvent, LinkState, TelemetryData};
use super::ports::{ClockPort, EventSink, Phase, Ports};

/// What the session loop does after one scheduler iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Continue,
    /// The network was re-joined; tear the session down and reconnect.
    Restart,
}

/// Orientation accumulated by fusion steps between two reads.
#[derive(Debug, Clone, Copy, Default)]
struct FusionSums {
    roll: f32,
    pitch: f32,
    yaw: f32,
    steps: u32,
}

impl FusionSums {
    fn add(&mut self, o: Orientation) {
        self.roll += o.roll;
        self.pitch += o.pitch;
        self.yaw += o.yaw;
        self.steps += 1;
    }

    /// Mean since the last call, `None` if no step ran.
    fn take_mean(&mut self) -> Option<Orientation> {
        let sums = core::mem::take(self);
        (sums.steps > 0).then(|| {
            let n = sums.steps as f32;
            Orientation {
                roll: sums.roll / n,
                pitch: sums.pitch / n,
                yaw: sums.yaw / n,
            }
        })
    }
}

// ───────────────────────────────────────────────────────────────
// NodeService
// ───────────────────────────────────────────────────────────────

pub struct NodeService {
    config: NodeConfig,
    window: RollingWindow,
    queue: DeliveryQueue,
    link: LinkState,
    publisher: Publisher,
    decoder: LocationDecoder,
    fusion: FusionSums,
    idle: IdleTracker,
    sun: SunClock,
    /// Failure score; the session reconnects while it is above zero.
    distrust: u32,
    publishing_enabled: bool,
}

impl NodeService {
    /// Construct the service from configuration.
    ///
    /// The link starts Disconnected and the distrust score at 1 so the
    /// first session iteration connects.
    pub fn new(config: NodeConfig) -> Self {
        Self {
            window: RollingWindow::new(config.window_size()),
            queue: DeliveryQueue::new(),
            link: LinkState::Disconnected,
            publisher: Publisher::new(&config),
            decoder: LocationDecoder::new(&config),
            fusion: FusionSums::default(),
            idle: IdleTracker::new(config.idle_loops_before_low_power),
            sun: SunClock::new(None, config.default_latitude, config.default_longitude),
            distrust: 1,
            publishing_enabled: true,
            config,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Seed the sun clock from the RTC date and announce the service.
    pub fn start(&mut self, clock: &mut dyn ClockPort, sink: &mut dyn EventSink) {
        let now = clock.now().ok();
        self.sun = SunClock::new(
            now.as_ref(),
            self.config.default_latitude,
            self.config.default_longitude,
        );
        info!(
            "NodeService: started, window {} x {}s",
            self.window.capacity(),
            self.config.read_period_secs
        );
        sink.emit(&AppEvent::Started {
            window_size: self.window.capacity(),
        });
    }

    /// MQTT session established.
    pub fn on_session_connected(&mut self, ports: &mut Ports<'_>) {
        self.distrust = 0;
        self.set_link(LinkState::Connected, ports);
    }

    /// Socket could not be opened.
    pub fn on_socket_failed(&mut self) {
        self.distrust += 1;
    }

    /// One network re-join attempt.  Success leaves the distrust score
    /// at 1 so the session rebuilds the connection.
    pub fn rejoin_network(&mut self, ports: &mut Ports<'_>) -> bool {
        info!(
            "NodeService: network {} down, re-joining",
            if self.distrust > self.config.max_socket_errors_before_netif_reset {
                "may be"
            } else {
                "is"
            }
        );
        match ports.network.reinit() {
            Ok(()) => {
                info!("NodeService: network re-joined");
                self.distrust = 1;
                self.set_link(LinkState::Connected, ports);
                true
            }
            Err(e) => {
                warn!("NodeService: re-join failed: {}", e);
                self.set_link(LinkState::Disconnected, ports);
                false
            }
        }
    }

    // ── Scheduler ─────────────────────────────────────────────

    /// Run every due phase once.
    ///
    /// Publish waits (flag kept) until the window holds a sample and
    /// publishing is enabled; recover waits until something is queued.
    pub fn run_iteration(&mut self, flags: &mut PhaseFlags, ports: &mut Ports<'_>) -> IterationOutcome {
        if core::mem::take(&mut flags.toggle_publishing) {
            self.handle_command(AppCommand::TogglePublishing, ports);
        }

        let mut ran = false;

        if flags.take(Phase::Read) {
            self.read(ports);
            ran = true;
        }

        if flags.is_set(Phase::Publish) && !self.window.is_empty() && self.publishing_enabled {
            flags.take(Phase::Publish);
            self.publish(ports);
            ran = true;
        }

        if flags.is_set(Phase::Recover) && !self.queue.is_empty() && self.publishing_enabled {
            flags.take(Phase::Recover);
            ran = true;
            if self.recover(ports) {
                return IterationOutcome::Restart;
            }
        }

        if flags.take(Phase::Fusion) {
            self.fuse(ports);
            ran = true;
        }

        if !ran && self.idle.idle() {
            debug!("NodeService: idle, entering low power");
            ports.power.enter_low_power();
        }
        IterationOutcome::Continue
    }

    // ── Command handling ──────────────────────────────────────

    pub fn handle_command(&mut self, cmd: AppCommand, ports: &mut Ports<'_>) {
        match cmd {
            AppCommand::TogglePublishing => {
                self.publishing_enabled = !self.publishing_enabled;
                ports.indicator.toggle_link();
                info!(
                    "NodeService: publishing {}",
                    if self.publishing_enabled { "enabled" } else { "paused" }
                );
                ports.sink.emit(&AppEvent::PublishingToggled(self.publishing_enabled));
            }
            AppCommand::UpdateConfig(new_config) => {
                if let Err(reason) = new_config.validate() {
                    warn!("NodeService: config rejected: {}", reason);
                    return;
                }
                if new_config.window_size() != self.window.capacity() {
                    info!(
                        "NodeService: window resized {} -> {}, {} samples dropped",
                        self.window.capacity(),
                        new_config.window_size(),
                        self.window.len()
                    );
                    self.window = RollingWindow::new(new_config.window_size());
                }
                self.publisher = Publisher::new(&new_config);
                self.decoder = LocationDecoder::new(&new_config);
                self.idle = IdleTracker::new(new_config.idle_loops_before_low_power);
                self.config = new_config;
                info!("Configuration updated at runtime");
            }
        }
    }

    // ── Phases ────────────────────────────────────────────────

    /// Capture one sample into the window.
    pub fn read(&mut self, ports: &mut Ports<'_>) {
        self.wake(ports);

        let now = ports.clock.now();
        let environment = ports.sensors.read_environment();
        let irradiance = ports.sensors.read_irradiance_levels();
        let orientation = self.fusion.take_mean();
        let location = self.decoder.decode(&mut *ports.gps, &mut *ports.delay);

        let slot = self.window.current_mut();
        match now {
            Ok(ts) => slot.timestamp = ts,
            Err(e) => warn!("Read: {}, timestamp kept", e),
        }
        match environment {
            Ok(env) if env.is_valid() => {
                slot.temperature = env.temperature;
                slot.pressure = env.pressure;
                slot.humidity = env.humidity;
            }
            Ok(_) => debug!("Read: environment sample has a zero channel, kept previous"),
            Err(e) => warn!("Read: {}", e),
        }
        if let Some(o) = orientation {
            slot.orientation = o;
        }

        slot.location_fix = location.fixed;
        if location.fixed || (location.latitude.is_finite() && location.longitude.is_finite()) {
            let usable = |v: f32| v.is_finite() && v != 0.0;
            if usable(location.latitude) {
                slot.latitude = location.latitude;
            }
            if usable(location.longitude) {
                slot.longitude = location.longitude;
            }
            if usable(location.altitude) {
                slot.altitude = location.altitude;
            }
            if location.speed.is_finite() {
                slot.speed = location.speed;
            }
        }

        match irradiance {
            Ok(levels) => slot.irradiance = irradiance::to_watts(&levels),
            Err(e) => warn!("Read: {}", e),
        }

        self.window.advance();
        debug!("Read: sample {}/{}", self.window.len(), self.window.capacity());
    }

    /// Aggregate the window and deliver or park the result.
    pub fn publish(&mut self, ports: &mut Ports<'_>) {
        self.wake(ports);

        let Some(record) = aggregate(self.window.samples()) else {
            return;
        };
        let series = if self.config.concat_publishing {
            concatenate(self.window.samples())
        } else {
            None
        };
        self.window.reset();

        if self.config.night_sleep && self.queue.is_empty() {
            if let Some(secs) = self.night_sleep_secs(&record, ports) {
                info!("Publish: night, sleeping {}s until sunrise", secs);
                ports.sink.emit(&AppEvent::NightSleep { secs });
                ports.power.sleep_for_secs(secs);
                return;
            }
        }

        if self.queue.is_empty() {
            if self
                .publisher
                .publish(&record, &mut *ports.mqtt, &mut *ports.indicator, &mut self.distrust)
            {
                self.set_link(LinkState::Connected, ports);
            } else {
                self.park(record, ports);
                self.set_link(LinkState::Disconnected, ports);
            }
        } else {
            // Keep delivery order: newer records wait behind the backlog.
            self.park(record, ports);
        }

        if let Some(series) = series {
            if self.link == LinkState::Connected {
                self.publisher.publish_series(&series, &mut *ports.mqtt, &mut self.distrust);
            } else {
                debug!("Publish: offline, raw series discarded");
            }
        }

        ports.sink.emit(&AppEvent::Telemetry(self.telemetry(&record)));
    }

    /// Re-join the network, or deliver the oldest queued record.
    ///
    /// Returns `true` when the network was re-joined and the session must
    /// be rebuilt.
    pub fn recover(&mut self, ports: &mut Ports<'_>) -> bool {
        self.wake(ports);

        if self.link == LinkState::Disconnected {
            return self.rejoin_network(ports);
        }

        let Some(record) = self.queue.peek().copied() else {
            return false;
        };
        if self
            .publisher
            .publish(&record, &mut *ports.mqtt, &mut *ports.indicator, &mut self.distrust)
        {
            self.queue.pop();
            info!("Recover: delivered, {} pending", self.queue.len());
            ports.sink.emit(&AppEvent::Drained {
                pending: self.queue.len(),
            });
            self.set_link(LinkState::Connected, ports);
        } else {
            self.set_link(LinkState::Disconnected, ports);
        }
        false
    }

    /// Advance the orientation filter one step.
    pub fn fuse(&mut self, ports: &mut Ports<'_>) {
        self.wake(ports);
        match ports.fusion.step() {
            Ok(o) => self.fusion.add(o),
            Err(e) => debug!("Fusion: {}", e),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn queue(&self) -> &DeliveryQueue {
        &self.queue
    }

    pub fn link(&self) -> LinkState {
        self.link
    }

    pub fn distrust(&self) -> u32 {
        self.distrust
    }

    pub fn publishing_enabled(&self) -> bool {
        self.publishing_enabled
    }

    pub fn in_low_power(&self) -> bool {
        self.idle.in_low_power()
    }

    /// Whether the slow timer should count towards a recover phase.
    pub fn needs_recovery(&self) -> bool {
        self.link == LinkState::Disconnected || !self.queue.is_empty()
    }

    // ── Internal ──────────────────────────────────────────────

    fn wake(&mut self, ports: &mut Ports<'_>) {
        if self.idle.wake() {
            debug!("NodeService: leaving low power");
            ports.power.exit_low_power();
        }
    }

    fn set_link(&mut self, to: LinkState, ports: &mut Ports<'_>) {
        ports.indicator.set_link(to == LinkState::Connected);
        if to != self.link {
            info!("Link: {} -> {}", self.link.as_str(), to.as_str());
            ports.sink.emit(&AppEvent::LinkChanged { from: self.link, to });
            self.link = to;
        }
    }

    fn park(&mut self, record: AggregatedRecord, ports: &mut Ports<'_>) {
        match self.queue.push(record) {
            Ok(()) => {
                info!("Publish: queued, {} pending", self.queue.len());
                ports.sink.emit(&AppEvent::Queued {
                    pending: self.queue.len(),
                });
            }
            Err(e) => {
                warn!("Publish: {}, record lost", e);
                ports.sink.emit(&AppEvent::Dropped);
            }
        }
    }

    /// Seconds to sleep if it is night now, refreshing the sun times from
    /// the record's position first.
    fn night_sleep_secs(&mut self, record: &AggregatedRecord, ports: &mut Ports<'_>) -> Option<u32> {
        let now = match ports.clock.now() {
            Ok(now) => now,
            Err(e) => {
                warn!("Publish: {}, assuming day", e);
                return None;
            }
        };
        let position = record
            .location_fix
            .then_some((record.latitude, record.longitude));
        self.sun.refresh(&now, position);

        let hours = hour_to_decimal(now.hour, now.minute, now.second);
        let sun = self.sun.sun_times();
        (day_period(Some(hours), &sun) == DayPeriod::Night).then(|| sleep_duration_secs(hours, sun.sunrise))
    }

    fn telemetry(&self, r: &AggregatedRecord) -> TelemetryData {
        TelemetryData {
            irradiance_mean: r.irradiance.iter().sum::<f32>() / r.irradiance.len() as f32,
            temperature: r.temperature,
            pressure: r.pressure,
            humidity: r.humidity,
            latitude: r.latitude,
            longitude: r.longitude,
            location_fix: r.location_fix,
            link: self.link,
            pending: self.queue.len(),
        }
    }
}
