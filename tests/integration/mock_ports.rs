//! Mock adapters for integration tests.
//!
//! Every port a phase can touch is backed by a recorder here, owned by a
//! single [`Rig`] that hands out a [`Ports`] bundle on demand.  MQTT uses
//! the library's own simulated client so failure scripting stays in one
//! place.

use std::collections::{HashMap, VecDeque};

use embedded_hal::delay::DelayNs;
use vipv_node::adapters::mqtt::SimMqtt;
use vipv_node::app::events::AppEvent;
use vipv_node::app::ports::{
    ClockPort, ConfigError, Credential, CredentialPort, Endpoint, EnvironmentReading, EventSink,
    FusionPort, GpsPort, IndicatorPort, IrradianceLevels, MqttConnectOptions, MqttPort, NetworkError,
    NetworkPort, Ports, PowerPort, SensorPort, SocketSecurity, TimerPort,
};
use vipv_node::error::SensorError;
use vipv_node::nmea::NmeaRing;
use vipv_node::session::SessionState;
use vipv_node::telemetry::{Orientation, Timestamp};

// ── Sensors ───────────────────────────────────────────────────

pub struct MockSensors {
    pub environment: EnvironmentReading,
    pub levels: IrradianceLevels,
    pub reads: u32,
}

impl MockSensors {
    pub fn new() -> Self {
        Self {
            environment: EnvironmentReading {
                temperature: 24.5,
                pressure: 1013.0,
                humidity: 40.0,
            },
            levels: IrradianceLevels {
                offset: 100.0,
                modules: [1100.0; 5],
            },
            reads: 0,
        }
    }
}

impl SensorPort for MockSensors {
    fn read_environment(&mut self) -> Result<EnvironmentReading, SensorError> {
        self.reads += 1;
        Ok(self.environment)
    }

    fn read_irradiance_levels(&mut self) -> Result<IrradianceLevels, SensorError> {
        Ok(self.levels)
    }
}

// ── Clock ─────────────────────────────────────────────────────

pub struct MockClock {
    pub now: Timestamp,
}

impl MockClock {
    pub fn at(hour: u8, minute: u8) -> Self {
        Self {
            now: Timestamp {
                year: 2024,
                month: 6,
                day: 21,
                hour,
                minute,
                second: 0,
            },
        }
    }
}

impl ClockPort for MockClock {
    fn now(&mut self) -> Result<Timestamp, SensorError> {
        Ok(self.now)
    }
}

// ── GPS (quiet line, empty ring) ──────────────────────────────

pub struct MockGps {
    ring: NmeaRing,
}

impl MockGps {
    pub fn new() -> Self {
        Self { ring: NmeaRing::new() }
    }
}

impl GpsPort for MockGps {
    fn poll_idle(&mut self) -> bool {
        true
    }

    fn ring(&self) -> &NmeaRing {
        &self.ring
    }
}

// ── Fusion ────────────────────────────────────────────────────

pub struct MockFusion {
    pub steps: u32,
}

impl FusionPort for MockFusion {
    fn step(&mut self) -> Result<Orientation, SensorError> {
        self.steps += 1;
        Ok(Orientation {
            roll: 1.0,
            pitch: 2.0,
            yaw: 3.0,
        })
    }
}

// ── Network ───────────────────────────────────────────────────

pub struct MockNetwork {
    pub init_result: Result<(), NetworkError>,
    /// Results for successive `reinit` calls; `Ok` once exhausted.
    pub reinit_results: VecDeque<Result<(), NetworkError>>,
    pub init_calls: u32,
    pub reinit_calls: u32,
}

#[allow(dead_code)]
impl MockNetwork {
    pub fn new() -> Self {
        Self {
            init_result: Ok(()),
            reinit_results: VecDeque::new(),
            init_calls: 0,
            reinit_calls: 0,
        }
    }

    pub fn fail_reinit(&mut self, times: usize) {
        self.reinit_results
            .extend(std::iter::repeat_n(Err(NetworkError::JoinFailed), times));
    }
}

impl NetworkPort for MockNetwork {
    fn init(&mut self) -> Result<(), NetworkError> {
        self.init_calls += 1;
        self.init_result
    }

    fn reinit(&mut self) -> Result<(), NetworkError> {
        self.reinit_calls += 1;
        self.reinit_results.pop_front().unwrap_or(Ok(()))
    }

    fn mac(&self) -> [u8; 6] {
        [0x24, 0x6F, 0x28, 0x0A, 0x0B, 0x0C]
    }
}

// ── Indicator ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorCall {
    SetLink(bool),
    ToggleLink,
    Heartbeat,
}

pub struct MockIndicator {
    pub calls: Vec<IndicatorCall>,
}

#[allow(dead_code)]
impl MockIndicator {
    pub fn heartbeats(&self) -> usize {
        self.calls.iter().filter(|c| **c == IndicatorCall::Heartbeat).count()
    }

    pub fn link_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                IndicatorCall::SetLink(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl IndicatorPort for MockIndicator {
    fn set_link(&mut self, on: bool) {
        self.calls.push(IndicatorCall::SetLink(on));
    }

    fn toggle_link(&mut self) {
        self.calls.push(IndicatorCall::ToggleLink);
    }

    fn heartbeat(&mut self) {
        self.calls.push(IndicatorCall::Heartbeat);
    }
}

// ── Power ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum PowerCall {
    EnterLowPower,
    ExitLowPower,
    Sleep(u32),
    Reset(u32),
}

pub struct MockPower {
    pub calls: Vec<PowerCall>,
}

#[allow(dead_code)]
impl MockPower {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    pub fn count(&self, call: &PowerCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn sleeps(&self) -> Vec<u32> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                PowerCall::Sleep(secs) => Some(*secs),
                _ => None,
            })
            .collect()
    }
}

impl PowerPort for MockPower {
    fn enter_low_power(&mut self) {
        self.calls.push(PowerCall::EnterLowPower);
    }

    fn exit_low_power(&mut self) {
        self.calls.push(PowerCall::ExitLowPower);
    }

    fn sleep_for_secs(&mut self, secs: u32) {
        self.calls.push(PowerCall::Sleep(secs));
    }

    fn reset(&mut self, after_ms: u32) {
        self.calls.push(PowerCall::Reset(after_ms));
    }
}

// ── Timers ────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTimers {
    pub fail_start: bool,
    pub starts: u32,
    pub stops: u32,
}

impl TimerPort for MockTimers {
    fn start(&mut self) -> Result<(), vipv_node::Error> {
        self.starts += 1;
        if self.fail_start {
            return Err(vipv_node::Error::Init("timer create failed"));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

// ── Delay ─────────────────────────────────────────────────────

pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// ── Event sink ────────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn sessions(&self) -> Vec<SessionState> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Session(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, pred: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.iter().any(pred)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Credentials ───────────────────────────────────────────────

pub struct MockCredentials {
    store: HashMap<&'static str, Vec<u8>>,
}

#[allow(dead_code)]
impl MockCredentials {
    pub fn empty() -> Self {
        Self { store: HashMap::new() }
    }

    pub fn plain(host: &str, port: u16) -> Self {
        let mut creds = Self::empty();
        creds.set(
            Credential::ConnectionString,
            &format!(
                "HostName={};HostPort={};ConnSecurity=0;MQClientId=node-7;MQUserName=u7;MQUserPwd=secret;",
                host, port
            ),
        );
        creds
    }

    pub fn set(&mut self, which: Credential, value: &str) {
        self.store.insert(which.key(), value.as_bytes().to_vec());
    }
}

impl CredentialPort for MockCredentials {
    fn credential(&self, which: Credential) -> Result<Vec<u8>, ConfigError> {
        self.store.get(which.key()).cloned().ok_or(ConfigError::NotFound)
    }
}

// ── Rig ───────────────────────────────────────────────────────

/// Owns one of every mock.
pub struct Rig {
    pub sensors: MockSensors,
    pub clock: MockClock,
    pub gps: MockGps,
    pub fusion: MockFusion,
    pub mqtt: SimMqtt,
    pub network: MockNetwork,
    pub indicator: MockIndicator,
    pub power: MockPower,
    pub delay: NoDelay,
    pub sink: RecordingSink,
}

#[allow(dead_code)]
impl Rig {
    pub fn new() -> Self {
        Self {
            sensors: MockSensors::new(),
            clock: MockClock::at(12, 0),
            gps: MockGps::new(),
            fusion: MockFusion { steps: 0 },
            mqtt: SimMqtt::new(),
            network: MockNetwork::new(),
            indicator: MockIndicator { calls: Vec::new() },
            power: MockPower::new(),
            delay: NoDelay,
            sink: RecordingSink { events: Vec::new() },
        }
    }

    pub fn ports(&mut self) -> Ports<'_> {
        Ports {
            sensors: &mut self.sensors,
            clock: &mut self.clock,
            gps: &mut self.gps,
            fusion: &mut self.fusion,
            mqtt: &mut self.mqtt,
            network: &mut self.network,
            indicator: &mut self.indicator,
            power: &mut self.power,
            delay: &mut self.delay,
            sink: &mut self.sink,
        }
    }

    /// Open a plain socket and an MQTT session on the simulated broker.
    pub fn connect_broker(&mut self) {
        let endpoint = Endpoint {
            host: "broker.local",
            port: 1883,
            security: SocketSecurity::None,
        };
        let options = MqttConnectOptions {
            client_id: "node-7",
            username: "u7",
            password: "secret",
            command_timeout_ms: 1000,
        };
        assert!(self.mqtt.open_transport(&endpoint).is_ok());
        assert!(self.mqtt.connect(&options).is_ok());
    }
}
