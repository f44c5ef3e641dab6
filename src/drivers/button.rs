//! ISR-debounced user button.
//!
//! ## Hardware
//!
//! Active-low momentary switch with external pull-up.  The GPIO fires on
//! the falling edge and the ISR passes its timestamp to the debouncer,
//! which turns every edge at least [`DEBOUNCE_MS`] after the last accepted
//! one into an [`Event::ButtonPress`].  The session loop maps that event
//! to the publishing toggle.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::events::{Event, EventQueue, EVENTS};

pub const DEBOUNCE_MS: u32 = 200;

/// Edge filter shared between the ISR and tests.
pub struct Debouncer {
    last_ms: AtomicU32,
    armed: AtomicBool,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            last_ms: AtomicU32::new(0),
            armed: AtomicBool::new(false),
        }
    }

    /// Returns `true` when the edge at `now_ms` counts as a new press.
    pub fn accept(&self, now_ms: u32) -> bool {
        let seen = self.armed.swap(true, Ordering::AcqRel);
        let last = self.last_ms.load(Ordering::Acquire);
        if seen && now_ms.wrapping_sub(last) < DEBOUNCE_MS {
            return false;
        }
        self.last_ms.store(now_ms, Ordering::Release);
        true
    }

    /// Debounce one edge and queue the press.
    pub fn on_edge(&self, now_ms: u32, queue: &EventQueue) -> bool {
        self.accept(now_ms) && queue.push(Event::ButtonPress)
    }
}

static BUTTON: Debouncer = Debouncer::new();

/// ISR handler, registered on the button GPIO falling edge.
/// Safe to call from interrupt context (atomics only).
#[allow(unused)]
pub fn button_isr_handler(now_ms: u32) {
    BUTTON.on_edge(now_ms, &EVENTS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_edge_is_a_press() {
        let d = Debouncer::new();
        assert!(d.accept(0));
    }

    #[test]
    fn bounce_within_window_is_ignored() {
        let d = Debouncer::new();
        assert!(d.accept(1000));
        assert!(!d.accept(1010));
        assert!(!d.accept(1000 + DEBOUNCE_MS - 1));
        assert!(d.accept(1000 + DEBOUNCE_MS));
    }

    #[test]
    fn press_lands_in_the_queue() {
        let d = Debouncer::new();
        let q = EventQueue::new();
        assert!(d.on_edge(500, &q));
        assert!(!d.on_edge(510, &q));
        assert_eq!(q.pop(), Some(Event::ButtonPress));
        assert!(q.is_empty());
    }

    #[test]
    fn survives_timer_wraparound() {
        let d = Debouncer::new();
        assert!(d.accept(u32::MAX - 50));
        assert!(!d.accept(20));
        assert!(d.accept(DEBOUNCE_MS));
    }
}
