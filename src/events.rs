//! Interrupt-driven tick events.
//!
//! Events are produced by:
//! - Timer callbacks (read tick, slow publish/recover tick, fusion tick)
//! - GPIO ISR (debounced button press)
//!
//! Events are consumed by the session loop, which drains them into phase
//! flags before each scheduler iteration.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐     ┌────────────┐
//! │ Read timer  │────▶│              │     │              │     │            │
//! │ Slow timer  │────▶│  EventQueue  │────▶│ TickScheduler│────▶│ PhaseFlags │
//! │ Fusion timer│────▶│  (lock-free) │     │  (counters)  │     │  (bools)   │
//! │ Button ISR  │────▶│              │     │              │     │            │
//! └─────────────┘     └──────────────┘     └──────────────┘     └────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
pub const EVENT_QUEUE_CAP: usize = 32;

/// Node event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Timers ────────────────────────────────────────────
    /// Fast timer: one sensor read is due.
    ReadTick = 10,
    /// Slow timer: drives the publish and recover counters.
    SlowTick = 20,
    /// Fusion timer: one orientation filter step is due.
    FusionTick = 21,

    // ── User input ────────────────────────────────────────
    /// Debounced short button press.
    ButtonPress = 32,
}

impl Event {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            10 => Some(Self::ReadTick),
            20 => Some(Self::SlowTick),
            21 => Some(Self::FusionTick),
            32 => Some(Self::ButtonPress),
            _ => None,
        }
    }
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Timer callbacks / ISRs write (produce), the session loop reads
// (consume).  Slots are atomics so the queue can live in a static
// without `unsafe`.

/// Single-producer single-consumer event ring.
pub struct EventQueue {
    head: AtomicU8,
    tail: AtomicU8,
    slots: [AtomicU8; EVENT_QUEUE_CAP],
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
            slots: [const { AtomicU8::new(0) }; EVENT_QUEUE_CAP],
        }
    }

    /// Push an event.  Safe to call from ISR context (lock-free).
    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: Event) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

        if next_head == tail {
            return false; // Full, drop.
        }

        self.slots[head as usize].store(event as u8, Ordering::Relaxed);
        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Pop the oldest event.  Single consumer only.
    pub fn pop(&self) -> Option<Event> {
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            let head = self.head.load(Ordering::Acquire);

            if tail == head {
                return None;
            }

            let raw = self.slots[tail as usize].load(Ordering::Relaxed);
            self.tail
                .store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

            // Unknown discriminants cannot be pushed; skip defensively.
            if let Some(event) = Event::from_u8(raw) {
                return Some(event);
            }
        }
    }

    /// Drain all pending events in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(Event)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed) as usize;
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
    }
}

// ── Global queue for timer callbacks ──────────────────────────

/// Queue shared by the hardware timer callbacks and the button ISR.
pub static EVENTS: EventQueue = EventQueue::new();

/// Push into the global queue.  ISR-safe.
pub fn push_event(event: Event) -> bool {
    EVENTS.push(event)
}
