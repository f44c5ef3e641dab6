//! VIPV sensor node firmware: main entry point.
//!
//! Hexagonal architecture with timer-driven phase flags.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter  FusionAdapter  GpsUart   RtcClock            │
//! │  (SensorPort)     (FusionPort)   (GpsPort) (ClockPort)         │
//! │  EspMqtt          WifiAdapter    NvsAdapter StatusLeds         │
//! │  (MqttPort)       (NetworkPort)  (Config+Credentials)          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │ Session (outer MQTT loop) ─▶ NodeService (phases)       │    │
//! │  │ read · publish · recover · fusion                       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickTimers ─▶ EVENTS ─▶ TickScheduler ─▶ PhaseFlags           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_hal::uart::{self, UartDriver};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

use vipv_node::adapters::gps::{GpsUart, GPS_BAUD};
use vipv_node::adapters::hardware::{FusionAdapter, HardwareAdapter};
use vipv_node::adapters::log_sink::LogEventSink;
use vipv_node::adapters::mqtt::EspMqtt;
use vipv_node::adapters::nvs::NvsAdapter;
use vipv_node::adapters::power::PowerManager;
use vipv_node::adapters::time::RtcClock;
use vipv_node::adapters::wifi::WifiAdapter;
use vipv_node::app::ports::{ConfigPort, Credential, CredentialPort, Ports};
use vipv_node::app::service::NodeService;
use vipv_node::config::NodeConfig;
use vipv_node::drivers::hw_init;
use vipv_node::drivers::hw_timer::TickTimers;
use vipv_node::drivers::status_led::StatusLeds;
use vipv_node::events::EVENTS;
use vipv_node::pins;
use vipv_node::sensors::environment::EnvironmentSensor;
use vipv_node::sensors::imu::ImuFusion;
use vipv_node::sensors::irradiance::IrradianceSensor;
use vipv_node::sensors::SensorHub;
use vipv_node::session::{Session, SessionExit};

fn credential_text(store: &dyn CredentialPort, which: Credential) -> String {
    store
        .credential(which)
        .map(|bytes| String::from_utf8_lossy(&bytes).trim_end_matches('\0').to_owned())
        .unwrap_or_default()
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  VIPV node v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    hw_init::init_peripherals().map_err(anyhow::Error::msg)?;

    // ── 2. Config + credentials from NVS ──────────────────────
    let nvs = NvsAdapter::new().map_err(anyhow::Error::msg)?;
    let config = nvs.load().unwrap_or_else(|e| {
        warn!("NVS config load failed ({}), using defaults", e);
        NodeConfig::default()
    });

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // Pin numbers mirror `pins`.
    let i2c_config = I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz());
    let env_bus = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio8,
        peripherals.pins.gpio9,
        &i2c_config,
    )?;
    let imu_bus = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio10,
        peripherals.pins.gpio11,
        &i2c_config,
    )?;
    let gps_uart = UartDriver::new(
        peripherals.uart1,
        peripherals.pins.gpio17,
        peripherals.pins.gpio18,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        Option::<esp_idf_hal::gpio::AnyIOPin>::None,
        &uart::config::Config::default().baudrate(Hertz(GPS_BAUD)),
    )?;

    let mut wifi = WifiAdapter::new(BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sysloop.clone(), None)?,
        sysloop,
    )?);
    wifi.set_credentials(
        &credential_text(&nvs, Credential::WifiSsid),
        &credential_text(&nvs, Credential::WifiPassword),
    )
    .map_err(anyhow::Error::msg)
    .context("Wi-Fi credentials")?;

    // ── 4. Adapters ───────────────────────────────────────────
    let mut sensors = HardwareAdapter::new(SensorHub::new(
        EnvironmentSensor::new(env_bus),
        IrradianceSensor::new(FreeRtos),
    ));
    let mut fusion = FusionAdapter::new(ImuFusion::new(imu_bus, config.fusion_rate_hz));
    let mut gps = GpsUart::new(gps_uart);
    let mut clock = RtcClock::new();
    let mut mqtt = EspMqtt::new();
    let mut leds = StatusLeds::new(FreeRtos);
    let mut power = PowerManager::new();
    let mut sink = LogEventSink::new();
    let mut delay = FreeRtos;
    let mut timers = TickTimers::new(&config);

    // ── 5. Service + session ──────────────────────────────────
    let mut service = NodeService::new(config);
    service.start(&mut clock, &mut sink);

    if let Err(e) = hw_init::init_isr_service() {
        warn!("ISR service init failed ({}), continuing without the button", e);
    }

    let mut session = Session::boot(&service, &nvs, &mut wifi, &mut power)?;
    info!("System ready as {}. Entering session loop.", session.device_id());

    let mut ports = Ports {
        sensors: &mut sensors,
        clock: &mut clock,
        gps: &mut gps,
        fusion: &mut fusion,
        mqtt: &mut mqtt,
        network: &mut wifi,
        indicator: &mut leds,
        power: &mut power,
        delay: &mut delay,
        sink: &mut sink,
    };

    // ── 6. Session loop ───────────────────────────────────────
    loop {
        match session.run(&mut service, &EVENTS, &mut timers, &mut ports, &mut || true) {
            SessionExit::Settled => info!("Session settled, reconnecting"),
            SessionExit::Stopped => warn!("Session stopped"),
        }
    }
}
