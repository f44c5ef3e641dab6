//! WiFi station-mode adapter.
//!
//! Implements [`NetworkPort`], the hexagonal boundary for network
//! connectivity.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Join policy
//!
//! Boot joins with up to [`INIT_JOIN_ATTEMPTS`] tries; a re-join after a
//! lost link makes a single attempt and leaves retry pacing to the
//! recover timer.

use log::{error, info, warn};

use crate::adapters::device_id::{self, MacAddress};
use crate::app::ports::{NetworkError, NetworkPort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

/// Join attempts made by [`NetworkPort::init`].
pub const INIT_JOIN_ATTEMPTS: u32 = 17;

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), NetworkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(NetworkError::InvalidCredentials);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), NetworkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(NetworkError::InvalidCredentials);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    driver: BlockingWifi<EspWifi<'static>>,
    /// Simulation: join attempts that will fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u32,
    /// Simulation: counts platform_join() calls.
    #[cfg(not(target_os = "espidf"))]
    sim_joins: u32,
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(driver: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            driver,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_failures: 0,
            sim_joins: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), NetworkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| NetworkError::InvalidCredentials)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| NetworkError::InvalidCredentials)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Simulation: make the next `n` join attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_join_count(&self) -> u32 {
        self.sim_joins
    }

    fn join(&mut self, attempts: u32) -> Result<(), NetworkError> {
        if self.ssid.is_empty() {
            return Err(NetworkError::NoCredentials);
        }
        self.state = WifiState::Connecting;
        for attempt in 1..=attempts {
            match self.platform_join() {
                Ok(()) => {
                    self.state = WifiState::Connected;
                    info!("WiFi: joined '{}' (attempt {}/{})", self.ssid, attempt, attempts);
                    return Ok(());
                }
                Err(e) => warn!("WiFi: attempt {}/{} failed: {}", attempt, attempts, e),
            }
        }
        self.state = WifiState::Failed;
        error!("WiFi: could not join '{}'", self.ssid);
        Err(NetworkError::JoinFailed)
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<(), NetworkError> {
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| NetworkError::InvalidCredentials)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| NetworkError::InvalidCredentials)?,
            auth_method: if self.password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        self.driver.set_configuration(&config).map_err(|e| {
            error!("WiFi: configuration rejected: {}", e);
            NetworkError::DriverFailed
        })?;
        self.driver.start().map_err(|e| {
            error!("WiFi: driver start failed: {}", e);
            NetworkError::DriverFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<(), NetworkError> {
        info!("WiFi(sim): station started");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_join(&mut self) -> Result<(), NetworkError> {
        if self.driver.is_connected().unwrap_or(false) {
            let _ = self.driver.disconnect();
        }
        self.driver.connect().map_err(|_| NetworkError::JoinFailed)?;
        self.driver.wait_netif_up().map_err(|_| NetworkError::JoinFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_join(&mut self) -> Result<(), NetworkError> {
        self.sim_joins += 1;
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            return Err(NetworkError::JoinFailed);
        }
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_mac(&self) -> MacAddress {
        self.driver
            .wifi()
            .sta_netif()
            .get_mac()
            .unwrap_or_else(|_| device_id::read_mac())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_mac(&self) -> MacAddress {
        device_id::read_mac()
    }
}

// ───────────────────────────────────────────────────────────────
// NetworkPort
// ───────────────────────────────────────────────────────────────

impl NetworkPort for WifiAdapter {
    fn init(&mut self) -> Result<(), NetworkError> {
        if self.ssid.is_empty() {
            return Err(NetworkError::NoCredentials);
        }
        info!("WiFi: starting station for '{}'", self.ssid);
        self.platform_start()?;
        self.join(INIT_JOIN_ATTEMPTS)
    }

    fn reinit(&mut self) -> Result<(), NetworkError> {
        self.join(1)
    }

    fn mac(&self) -> [u8; 6] {
        self.platform_mac()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
