//! Power management adapter.
//!
//! Implements [`PowerPort`].
//!
//! - **`target_os = "espidf"`**: idle low power drops the CPU clock and
//!   enables automatic light sleep through `esp_pm_configure`; night sleep
//!   is a timer-woken deep sleep; reset is `esp_restart`.
//! - **all other targets**: records every request for host-side tests.

use log::{info, warn};

use crate::app::ports::PowerPort;

/// CPU clock while active.
pub const ACTIVE_CPU_MHZ: i32 = 240;
/// CPU clock ceiling in idle low power.
pub const IDLE_CPU_MHZ: i32 = 80;
/// Clock floor when the power manager scales down.
pub const MIN_CPU_MHZ: i32 = 40;

#[derive(Debug, Default)]
pub struct PowerManager {
    low_power: bool,
    #[cfg(not(target_os = "espidf"))]
    sleeps: Vec<u32>,
    #[cfg(not(target_os = "espidf"))]
    resets: Vec<u32>,
}

impl PowerManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_low_power(&self) -> bool {
        self.low_power
    }

    /// Simulation: durations passed to `sleep_for_secs`.
    #[cfg(not(target_os = "espidf"))]
    pub fn sleeps(&self) -> &[u32] {
        &self.sleeps
    }

    /// Simulation: delays passed to `reset`.
    #[cfg(not(target_os = "espidf"))]
    pub fn resets(&self) -> &[u32] {
        &self.resets
    }

    #[cfg(target_os = "espidf")]
    fn configure_pm(max_mhz: i32, light_sleep: bool) {
        let cfg = esp_idf_svc::sys::esp_pm_config_t {
            max_freq_mhz: max_mhz,
            min_freq_mhz: MIN_CPU_MHZ,
            light_sleep_enable: light_sleep,
        };
        // SAFETY: `cfg` is a valid esp_pm_config_t for the duration of the call.
        let ret = unsafe {
            esp_idf_svc::sys::esp_pm_configure(&cfg as *const _ as *const core::ffi::c_void)
        };
        if ret != esp_idf_svc::sys::ESP_OK {
            warn!("Power: esp_pm_configure failed (rc={})", ret);
        }
    }
}

impl PowerPort for PowerManager {
    fn enter_low_power(&mut self) {
        if core::mem::replace(&mut self.low_power, true) {
            return;
        }
        info!("Power: entering idle low power");
        #[cfg(target_os = "espidf")]
        Self::configure_pm(IDLE_CPU_MHZ, true);
    }

    fn exit_low_power(&mut self) {
        if !core::mem::take(&mut self.low_power) {
            return;
        }
        info!("Power: leaving idle low power");
        #[cfg(target_os = "espidf")]
        Self::configure_pm(ACTIVE_CPU_MHZ, false);
    }

    fn sleep_for_secs(&mut self, secs: u32) {
        warn!("Power: shutting down for {}s", secs);
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: plain register configuration, then a call that does
            // not return; the device boots fresh on wakeup.
            unsafe {
                esp_idf_svc::sys::esp_sleep_enable_timer_wakeup(u64::from(secs) * 1_000_000);
                esp_idf_svc::sys::esp_deep_sleep_start();
            }
        }
        #[cfg(not(target_os = "espidf"))]
        self.sleeps.push(secs);
    }

    fn reset(&mut self, after_ms: u32) {
        warn!("Power: reset in {}ms", after_ms);
        #[cfg(target_os = "espidf")]
        {
            esp_idf_hal::delay::FreeRtos::delay_ms(after_ms);
            // SAFETY: esp_restart does not return.
            unsafe { esp_idf_svc::sys::esp_restart() };
        }
        #[cfg(not(target_os = "espidf"))]
        self.resets.push(after_ms);
    }
}
