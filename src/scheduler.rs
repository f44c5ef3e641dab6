//! Tick scheduling and phase flags.
//!
//! Timer events are turned into phase flags here.  The read and fusion
//! ticks map one-to-one onto their phases; the slow tick feeds two
//! counters that divide it down to the publish period and, while there is
//! something to recover, the recover period.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Tick Sources                             │
//! │                                                              │
//! │  ┌───────────┐        ┌───────────┐        ┌───────────┐     │
//! │  │ ReadTick  │        │ SlowTick  │        │FusionTick │     │
//! │  └─────┬─────┘        └─────┬─────┘        └─────┬─────┘     │
//! │        │           ┌────────┴────────┐           │           │
//! │        │           ▼                 ▼           │           │
//! │        │     publish counter   recover counter   │           │
//! │        │     (÷ publish/slow)  (÷ recover/slow,  │           │
//! │        │                        recovery only)   │           │
//! │        ▼           ▼                 ▼           ▼           │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │              SchedulerDelegate (PhaseFlags)            │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                 NodeService::run_iteration()                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use log::debug;

use crate::app::ports::{Phase, SchedulerDelegate};
use crate::config::NodeConfig;
use crate::events::Event;

// ═══════════════════════════════════════════════════════════════
//  Phase flags
// ═══════════════════════════════════════════════════════════════

/// Pending phases.  Flags are booleans: several ticks that arrive before
/// a phase runs collapse into a single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseFlags {
    pub read: bool,
    pub publish: bool,
    pub recover: bool,
    pub fusion: bool,
    /// User asked to toggle publishing.
    pub toggle_publishing: bool,
}

impl PhaseFlags {
    pub fn raise(&mut self, phase: Phase) {
        *self.flag_mut(phase) = true;
    }

    /// Clear and return the flag of `phase`.
    pub fn take(&mut self, phase: Phase) -> bool {
        core::mem::take(self.flag_mut(phase))
    }

    pub fn is_set(&self, phase: Phase) -> bool {
        match phase {
            Phase::Read => self.read,
            Phase::Publish => self.publish,
            Phase::Recover => self.recover,
            Phase::Fusion => self.fusion,
        }
    }

    pub fn any(&self) -> bool {
        self.read || self.publish || self.recover || self.fusion || self.toggle_publishing
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn flag_mut(&mut self, phase: Phase) -> &mut bool {
        match phase {
            Phase::Read => &mut self.read,
            Phase::Publish => &mut self.publish,
            Phase::Recover => &mut self.recover,
            Phase::Fusion => &mut self.fusion,
        }
    }
}

impl SchedulerDelegate for PhaseFlags {
    fn on_phase_due(&mut self, phase: Phase) {
        self.raise(phase);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tick scheduler
// ═══════════════════════════════════════════════════════════════

/// Divides the slow tick into publish and recover periods.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    publish_divider: u32,
    recover_divider: u32,
    publish_ticks: u32,
    recover_ticks: u32,
}

impl TickScheduler {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            publish_divider: config.publish_divider(),
            recover_divider: config.recover_divider(),
            publish_ticks: 0,
            recover_ticks: 0,
        }
    }

    /// Route one timer event.  `needs_recovery` is true while the link is
    /// down or records are queued; the recover counter only runs then.
    ///
    /// Button presses are not ticks and are ignored here.
    pub fn on_tick(&mut self, event: Event, needs_recovery: bool, delegate: &mut dyn SchedulerDelegate) {
        match event {
            Event::ReadTick => delegate.on_phase_due(Phase::Read),
            Event::FusionTick => delegate.on_phase_due(Phase::Fusion),
            Event::SlowTick => {
                self.publish_ticks += 1;
                if self.publish_ticks >= self.publish_divider {
                    self.publish_ticks = 0;
                    delegate.on_phase_due(Phase::Publish);
                }
                if needs_recovery {
                    self.recover_ticks += 1;
                    if self.recover_ticks >= self.recover_divider {
                        self.recover_ticks = 0;
                        debug!("Scheduler: recover due");
                        delegate.on_phase_due(Phase::Recover);
                    }
                }
            }
            Event::ButtonPress => {}
        }
    }

    /// Restart both counters (new session).
    pub fn reset(&mut self) {
        self.publish_ticks = 0;
        self.recover_ticks = 0;
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    /// A test delegate that records every phase the scheduler raises.
    struct RecordingDelegate {
        fired: Vec<Phase>,
    }

    impl RecordingDelegate {
        fn new() -> Self {
            Self { fired: Vec::new() }
        }
    }

    impl SchedulerDelegate for RecordingDelegate {
        fn on_phase_due(&mut self, phase: Phase) {
            self.fired.push(phase);
        }
    }

    fn config(publish: u32, recover: u32, slow: u32) -> NodeConfig {
        NodeConfig {
            publish_period_secs: publish,
            recover_period_secs: recover,
            slow_timer_period_secs: slow,
            ..NodeConfig::default()
        }
    }

    #[test]
    fn read_and_fusion_map_directly() {
        let mut s = TickScheduler::new(&NodeConfig::default());
        let mut d = RecordingDelegate::new();
        s.on_tick(Event::ReadTick, false, &mut d);
        s.on_tick(Event::FusionTick, false, &mut d);
        s.on_tick(Event::ButtonPress, false, &mut d);
        assert_eq!(d.fired, vec![Phase::Read, Phase::Fusion]);
    }

    #[test]
    fn publish_divides_the_slow_tick() {
        let mut s = TickScheduler::new(&config(60, 5, 10));
        let mut d = RecordingDelegate::new();
        for _ in 0..12 {
            s.on_tick(Event::SlowTick, false, &mut d);
        }
        assert_eq!(d.fired, vec![Phase::Publish, Phase::Publish]);
    }

    #[test]
    fn recover_only_counts_while_needed() {
        let mut s = TickScheduler::new(&config(60, 20, 10));
        let mut d = RecordingDelegate::new();
        s.on_tick(Event::SlowTick, false, &mut d);
        s.on_tick(Event::SlowTick, false, &mut d);
        assert!(d.fired.is_empty());

        s.on_tick(Event::SlowTick, true, &mut d);
        assert!(d.fired.is_empty());
        s.on_tick(Event::SlowTick, true, &mut d);
        assert_eq!(d.fired, vec![Phase::Recover]);
    }

    #[test]
    fn short_recover_period_fires_every_slow_tick() {
        let mut s = TickScheduler::new(&NodeConfig::default());
        let mut d = RecordingDelegate::new();
        s.on_tick(Event::SlowTick, true, &mut d);
        s.on_tick(Event::SlowTick, true, &mut d);
        assert_eq!(
            d.fired,
            vec![Phase::Publish, Phase::Recover, Phase::Publish, Phase::Recover]
        );
    }

    #[test]
    fn repeated_ticks_collapse_into_one_flag() {
        let mut s = TickScheduler::new(&NodeConfig::default());
        let mut flags = PhaseFlags::default();
        for _ in 0..5 {
            s.on_tick(Event::ReadTick, false, &mut flags);
        }
        assert!(flags.take(Phase::Read));
        assert!(!flags.take(Phase::Read));
        assert!(!flags.any());
    }

    #[test]
    fn reset_restarts_counters() {
        let mut s = TickScheduler::new(&config(30, 5, 10));
        let mut d = RecordingDelegate::new();
        s.on_tick(Event::SlowTick, false, &mut d);
        s.on_tick(Event::SlowTick, false, &mut d);
        s.reset();
        s.on_tick(Event::SlowTick, false, &mut d);
        s.on_tick(Event::SlowTick, false, &mut d);
        assert!(d.fired.is_empty());
        s.on_tick(Event::SlowTick, false, &mut d);
        assert_eq!(d.fired, vec![Phase::Publish]);
    }
}
