//! Link and activity LEDs.
//!
//! Implements [`IndicatorPort`].  The link LED mirrors the broker session
//! and doubles as the publishing-toggle acknowledgement; the activity LED
//! blinks a heartbeat after each fully delivered publication.
//!
//! On ESP-IDF: plain GPIO outputs via hw_init.
//! On host/test: tracks state in-memory only.

use embedded_hal::delay::DelayNs;

use crate::app::ports::IndicatorPort;
use crate::drivers::hw_init;
use crate::pins;

/// Activity LED toggles per heartbeat.
pub const HEARTBEAT_TOGGLES: u32 = 10;
/// Pause between heartbeat toggles.
pub const HEARTBEAT_STEP_MS: u32 = 15;

pub struct StatusLeds<D> {
    delay: D,
    link: bool,
    activity: bool,
    heartbeats: u32,
}

impl<D: DelayNs> StatusLeds<D> {
    pub fn new(delay: D) -> Self {
        hw_init::gpio_write(pins::LINK_LED_GPIO, false);
        hw_init::gpio_write(pins::ACTIVITY_LED_GPIO, false);
        Self {
            delay,
            link: false,
            activity: false,
            heartbeats: 0,
        }
    }

    pub fn link(&self) -> bool {
        self.link
    }

    pub fn activity(&self) -> bool {
        self.activity
    }

    pub fn heartbeats(&self) -> u32 {
        self.heartbeats
    }

    fn write_link(&mut self, on: bool) {
        self.link = on;
        hw_init::gpio_write(pins::LINK_LED_GPIO, on);
    }
}

impl<D: DelayNs> IndicatorPort for StatusLeds<D> {
    fn set_link(&mut self, on: bool) {
        self.write_link(on);
    }

    fn toggle_link(&mut self) {
        self.write_link(!self.link);
    }

    fn heartbeat(&mut self) {
        for _ in 0..HEARTBEAT_TOGGLES {
            self.activity = !self.activity;
            hw_init::gpio_write(pins::ACTIVITY_LED_GPIO, self.activity);
            self.delay.delay_ms(HEARTBEAT_STEP_MS);
        }
        self.heartbeats += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingDelay {
        ms: u32,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.ms += ms;
        }
    }

    #[test]
    fn toggle_flips_link() {
        let mut leds = StatusLeds::new(CountingDelay::default());
        leds.toggle_link();
        assert!(leds.link());
        leds.toggle_link();
        assert!(!leds.link());
    }

    #[test]
    fn heartbeat_ends_where_it_started() {
        let mut leds = StatusLeds::new(CountingDelay::default());
        leds.heartbeat();
        assert!(!leds.activity());
        assert_eq!(leds.heartbeats(), 1);
        assert_eq!(leds.delay.ms, HEARTBEAT_TOGGLES * HEARTBEAT_STEP_MS);
    }
}
