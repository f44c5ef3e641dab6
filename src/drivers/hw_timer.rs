//! Periodic tick timers using ESP-IDF's esp_timer API.
//!
//! Three timers push events into the lock-free SPSC queue:
//!
//! | Timer  | Period                     | Event        |
//! |--------|----------------------------|--------------|
//! | read   | `read_period_secs`         | `ReadTick`   |
//! | slow   | `slow_timer_period_secs`   | `SlowTick`   |
//! | fusion | `1 / fusion_rate_hz`       | `FusionTick` |
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event() which uses AtomicU8.  On simulation
//! targets nothing fires; tests push events themselves.

use log::info;

use crate::app::ports::TimerPort;
use crate::config::NodeConfig;
use crate::error::{Error, Result};

#[cfg(target_os = "espidf")]
use crate::events::{push_event, Event};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Timer periods in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickPeriods {
    pub read_us: u64,
    pub slow_us: u64,
    pub fusion_us: u64,
}

impl TickPeriods {
    pub fn from_config(config: &NodeConfig) -> Self {
        Self {
            read_us: u64::from(config.read_period_secs) * 1_000_000,
            slow_us: u64::from(config.slow_timer_period_secs) * 1_000_000,
            fusion_us: 1_000_000 / u64::from(config.fusion_rate_hz.max(1)),
        }
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn read_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ReadTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn slow_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::SlowTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn fusion_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::FusionTick);
}

pub struct TickTimers {
    periods: TickPeriods,
    running: bool,
    #[cfg(target_os = "espidf")]
    handles: [esp_timer_handle_t; 3],
    #[cfg(not(target_os = "espidf"))]
    fail_next_start: bool,
    #[cfg(not(target_os = "espidf"))]
    starts: u32,
}

impl TickTimers {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            periods: TickPeriods::from_config(config),
            running: false,
            #[cfg(target_os = "espidf")]
            handles: [core::ptr::null_mut(); 3],
            #[cfg(not(target_os = "espidf"))]
            fail_next_start: false,
            #[cfg(not(target_os = "espidf"))]
            starts: 0,
        }
    }

    pub fn periods(&self) -> TickPeriods {
        self.periods
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Simulation: make the next `start()` fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_start(&mut self) {
        self.fail_next_start = true;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_start_count(&self) -> u32 {
        self.starts
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self) -> Result<()> {
        type Callback = unsafe extern "C" fn(*mut core::ffi::c_void);
        let specs: [(Callback, &'static [u8], u64); 3] = [
            (read_tick_cb, b"read\0", self.periods.read_us),
            (slow_tick_cb, b"slow\0", self.periods.slow_us),
            (fusion_tick_cb, b"fusion\0", self.periods.fusion_us),
        ];
        for (handle, (cb, name, period)) in self.handles.iter_mut().zip(specs) {
            if handle.is_null() {
                let args = esp_timer_create_args_t {
                    callback: Some(cb),
                    arg: core::ptr::null_mut(),
                    dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                    name: name.as_ptr() as *const _,
                    skip_unhandled_events: true,
                };
                // SAFETY: `args` outlives the call and `name` is a static
                // NUL-terminated string; the handle slot is owned by self.
                let ret = unsafe { esp_timer_create(&args, handle) };
                if ret != ESP_OK {
                    log::error!("hw_timer: create failed (rc={})", ret);
                    return Err(Error::Init("tick timer create failed"));
                }
            }
            // SAFETY: `handle` was created above and is not running.
            let ret = unsafe { esp_timer_start_periodic(*handle, period) };
            if ret != ESP_OK {
                log::error!("hw_timer: start failed (rc={})", ret);
                return Err(Error::Init("tick timer start failed"));
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self) -> Result<()> {
        if core::mem::take(&mut self.fail_next_start) {
            return Err(Error::Init("tick timer start failed"));
        }
        self.starts += 1;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        for &handle in &self.handles {
            if !handle.is_null() {
                // SAFETY: valid handle; stopping an idle timer is harmless.
                unsafe { esp_timer_stop(handle) };
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {}
}

impl TimerPort for TickTimers {
    fn start(&mut self) -> Result<()> {
        if self.running {
            return Ok(());
        }
        if let Err(e) = self.platform_start() {
            self.platform_stop();
            return Err(e);
        }
        self.running = true;
        info!(
            "hw_timer: read={}ms slow={}ms fusion={}us started",
            self.periods.read_us / 1000,
            self.periods.slow_us / 1000,
            self.periods.fusion_us
        );
        Ok(())
    }

    fn stop(&mut self) {
        if core::mem::take(&mut self.running) {
            self.platform_stop();
            info!("hw_timer: stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods_follow_config() {
        let p = TickPeriods::from_config(&NodeConfig::default());
        assert_eq!(p.read_us, 1_000_000);
        assert_eq!(p.slow_us, 10_000_000);
        assert_eq!(p.fusion_us, 20_000);
    }

    #[test]
    fn start_is_idempotent() {
        let mut t = TickTimers::new(&NodeConfig::default());
        t.start().unwrap();
        t.start().unwrap();
        assert_eq!(t.sim_start_count(), 1);
        t.stop();
        assert!(!t.is_running());
    }

    #[test]
    fn failed_start_leaves_timers_stopped() {
        let mut t = TickTimers::new(&NodeConfig::default());
        t.sim_fail_next_start();
        assert!(t.start().is_err());
        assert!(!t.is_running());
        assert!(t.start().is_ok());
    }
}
