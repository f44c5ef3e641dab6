//! Integration tests for the read → publish → recover pipeline.
//!
//! Drive `NodeService::run_iteration` with hand-raised phase flags against
//! the mock rig and check what reached the broker, the delivery queue and
//! the event sink.

use crate::mock_ports::{MockClock, PowerCall, Rig};

use vipv_node::app::commands::AppCommand;
use vipv_node::app::events::{AppEvent, LinkState};
use vipv_node::app::ports::Phase;
use vipv_node::app::service::{IterationOutcome, NodeService};
use vipv_node::config::NodeConfig;
use vipv_node::scheduler::PhaseFlags;

fn make_service(config: NodeConfig) -> (NodeService, Rig) {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(config);
    svc.start(&mut rig.clock, &mut rig.sink);
    (svc, rig)
}

fn run(svc: &mut NodeService, rig: &mut Rig, phase: Phase) -> IterationOutcome {
    let mut flags = PhaseFlags::default();
    flags.raise(phase);
    svc.run_iteration(&mut flags, &mut rig.ports())
}

fn fill_window(svc: &mut NodeService, rig: &mut Rig) {
    for _ in 0..svc.window().capacity() {
        run(svc, rig, Phase::Read);
    }
}

/// Connected session, as the session loop leaves it after CONNACK.
fn online(svc: &mut NodeService, rig: &mut Rig) {
    rig.connect_broker();
    svc.on_session_connected(&mut rig.ports());
}

// ── Failed publish, re-join, then drain ──────────────────────

#[test]
fn failed_publish_is_queued_and_drained_after_rejoin() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    online(&mut svc, &mut rig);
    assert_eq!(svc.distrust(), 0);

    fill_window(&mut svc, &mut rig);
    assert_eq!(svc.window().len(), 10);
    assert_eq!(svc.window().cursor(), 9, "cursor saturates at the last slot");

    // Both channel publishes rejected.
    rig.mqtt.fail_publish_next(2);
    assert_eq!(run(&mut svc, &mut rig, Phase::Publish), IterationOutcome::Continue);
    assert_eq!(svc.queue().len(), 1);
    assert_eq!(svc.link(), LinkState::Disconnected);
    assert_eq!(svc.distrust(), 2);
    assert!(svc.window().is_empty());
    assert!(rig.sink.contains(|e| *e == AppEvent::Queued { pending: 1 }));

    // Disconnected: recover re-joins instead of draining.
    assert_eq!(run(&mut svc, &mut rig, Phase::Recover), IterationOutcome::Restart);
    assert_eq!(rig.network.reinit_calls, 1);
    assert_eq!(svc.link(), LinkState::Connected);
    assert_eq!(svc.queue().len(), 1);
    assert_eq!(svc.distrust(), 1);

    // Connected: the next recover delivers the queued record.
    assert_eq!(run(&mut svc, &mut rig, Phase::Recover), IterationOutcome::Continue);
    assert_eq!(svc.queue().len(), 0);
    assert!(rig.sink.contains(|e| *e == AppEvent::Drained { pending: 0 }));
    assert_eq!(rig.mqtt.published().len(), 2);
    assert_eq!(rig.indicator.heartbeats(), 1);
}

#[test]
fn queued_record_keeps_the_window_mean() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    online(&mut svc, &mut rig);
    fill_window(&mut svc, &mut rig);

    rig.mqtt.fail_publish_next(1);
    run(&mut svc, &mut rig, Phase::Publish);

    let parked = svc.queue().peek().copied().expect("record parked");
    assert_eq!(parked.temperature, 24.5);
    assert_eq!(parked.pressure, 1013.0);
    assert_eq!(parked.humidity, 40.0);
    assert!(!parked.location_fix, "quiet GPS never yields a fix");
}

#[test]
fn new_records_wait_behind_the_backlog() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    online(&mut svc, &mut rig);

    fill_window(&mut svc, &mut rig);
    rig.mqtt.fail_publish_next(2);
    run(&mut svc, &mut rig, Phase::Publish);
    let sent_before = rig.mqtt.published().len();

    // Broker healthy again, but the queue is not empty.
    fill_window(&mut svc, &mut rig);
    run(&mut svc, &mut rig, Phase::Publish);
    assert_eq!(svc.queue().len(), 2);
    assert_eq!(rig.mqtt.published().len(), sent_before);
}

#[test]
fn failed_recover_publish_keeps_the_record() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    online(&mut svc, &mut rig);
    fill_window(&mut svc, &mut rig);
    rig.mqtt.fail_publish_next(2);
    run(&mut svc, &mut rig, Phase::Publish);
    run(&mut svc, &mut rig, Phase::Recover);
    assert_eq!(svc.link(), LinkState::Connected);

    rig.mqtt.fail_publish_next(1);
    run(&mut svc, &mut rig, Phase::Recover);
    assert_eq!(svc.queue().len(), 1);
    assert_eq!(svc.link(), LinkState::Disconnected);
}

#[test]
fn recover_waits_while_nothing_is_queued() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    let mut flags = PhaseFlags::default();
    flags.raise(Phase::Recover);
    svc.run_iteration(&mut flags, &mut rig.ports());
    assert!(flags.is_set(Phase::Recover), "flag stays pending");
    assert_eq!(rig.network.reinit_calls, 0);
}

#[test]
fn failed_rejoin_stays_disconnected() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    fill_window(&mut svc, &mut rig);
    run(&mut svc, &mut rig, Phase::Publish);
    assert_eq!(svc.queue().len(), 1);

    rig.network.fail_reinit(1);
    assert_eq!(run(&mut svc, &mut rig, Phase::Recover), IterationOutcome::Continue);
    assert_eq!(svc.link(), LinkState::Disconnected);
    assert!(!rig.indicator.link_on());
}

// ── Publishing toggle ────────────────────────────────────────

#[test]
fn toggle_pauses_publish_until_resumed() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    online(&mut svc, &mut rig);
    fill_window(&mut svc, &mut rig);

    let mut flags = PhaseFlags {
        toggle_publishing: true,
        ..PhaseFlags::default()
    };
    flags.raise(Phase::Publish);
    svc.run_iteration(&mut flags, &mut rig.ports());

    assert!(!svc.publishing_enabled());
    assert!(flags.is_set(Phase::Publish), "publish kept pending while paused");
    assert!(rig.mqtt.published().is_empty());
    assert!(rig.sink.contains(|e| *e == AppEvent::PublishingToggled(false)));

    flags.toggle_publishing = true;
    svc.run_iteration(&mut flags, &mut rig.ports());
    assert!(svc.publishing_enabled());
    assert!(!flags.is_set(Phase::Publish));
    assert_eq!(rig.mqtt.published().len(), 2);
}

// ── Raw series ───────────────────────────────────────────────

#[test]
fn series_goes_out_on_channels_three_and_four_when_online() {
    let config = NodeConfig {
        concat_publishing: true,
        ..NodeConfig::default()
    };
    let (mut svc, mut rig) = make_service(config.clone());
    online(&mut svc, &mut rig);
    fill_window(&mut svc, &mut rig);
    run(&mut svc, &mut rig, Phase::Publish);

    let topics: Vec<&str> = rig.mqtt.published().iter().map(|(t, _)| t.as_str()).collect();
    let expected: Vec<&str> = config.channels.iter().map(|t| t.as_str()).collect();
    assert_eq!(topics, expected);
}

#[test]
fn series_is_discarded_while_offline() {
    let config = NodeConfig {
        concat_publishing: true,
        ..NodeConfig::default()
    };
    let (mut svc, mut rig) = make_service(config);
    fill_window(&mut svc, &mut rig);
    run(&mut svc, &mut rig, Phase::Publish);

    assert_eq!(svc.queue().len(), 1);
    assert!(rig.mqtt.published().is_empty());
    // Only channels 1 and 2 were attempted: publish and yield fail on each.
    assert_eq!(svc.distrust(), 5);
}

// ── Night sleep ──────────────────────────────────────────────

#[test]
fn publish_at_night_sleeps_until_sunrise() {
    let config = NodeConfig {
        night_sleep: true,
        ..NodeConfig::default()
    };
    let mut rig = Rig::new();
    rig.clock = MockClock::at(23, 0);
    let mut svc = NodeService::new(config);
    svc.start(&mut rig.clock, &mut rig.sink);
    online(&mut svc, &mut rig);

    fill_window(&mut svc, &mut rig);
    run(&mut svc, &mut rig, Phase::Publish);

    let sleeps = rig.power.sleeps();
    assert_eq!(sleeps.len(), 1);
    assert!(
        (4 * 3600..8 * 3600).contains(&sleeps[0]),
        "midsummer night in Madrid is short, got {}s",
        sleeps[0]
    );
    assert!(rig.mqtt.published().is_empty());
    assert!(svc.queue().is_empty());
    assert!(rig.sink.contains(|e| matches!(e, AppEvent::NightSleep { .. })));
}

#[test]
fn publish_at_noon_does_not_sleep() {
    let config = NodeConfig {
        night_sleep: true,
        ..NodeConfig::default()
    };
    let (mut svc, mut rig) = make_service(config);
    online(&mut svc, &mut rig);
    fill_window(&mut svc, &mut rig);
    run(&mut svc, &mut rig, Phase::Publish);

    assert!(rig.power.sleeps().is_empty());
    assert_eq!(rig.mqtt.published().len(), 2);
}

// ── Idle low power ───────────────────────────────────────────

#[test]
fn idle_iterations_enter_low_power_once() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    let limit = svc.config().idle_loops_before_low_power;

    let mut flags = PhaseFlags::default();
    for _ in 0..=limit + 3 {
        svc.run_iteration(&mut flags, &mut rig.ports());
    }
    assert!(svc.in_low_power());
    assert_eq!(rig.power.count(&PowerCall::EnterLowPower), 1);

    run(&mut svc, &mut rig, Phase::Read);
    assert!(!svc.in_low_power());
    assert_eq!(rig.power.count(&PowerCall::ExitLowPower), 1);
}

#[test]
fn fusion_steps_feed_the_next_sample() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    online(&mut svc, &mut rig);
    for _ in 0..5 {
        run(&mut svc, &mut rig, Phase::Fusion);
    }
    assert_eq!(rig.fusion.steps, 5);

    run(&mut svc, &mut rig, Phase::Read);
    let sample = svc.window().samples()[0];
    assert_eq!(sample.orientation.roll, 1.0);
    assert_eq!(sample.orientation.yaw, 3.0);
}

// ── Runtime configuration ────────────────────────────────────

#[test]
fn update_config_resizes_the_window() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    run(&mut svc, &mut rig, Phase::Read);

    let wider = NodeConfig {
        publish_period_secs: 20,
        ..NodeConfig::default()
    };
    svc.handle_command(AppCommand::UpdateConfig(wider), &mut rig.ports());
    assert_eq!(svc.window().capacity(), 20);
    assert!(svc.window().is_empty());
    assert_eq!(svc.config().publish_period_secs, 20);
}

#[test]
fn update_config_rejects_invalid_values() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    let broken = NodeConfig {
        read_period_secs: 0,
        ..NodeConfig::default()
    };
    svc.handle_command(AppCommand::UpdateConfig(broken), &mut rig.ports());
    assert_eq!(svc.config(), &NodeConfig::default());
    assert_eq!(svc.window().capacity(), 10);
}

#[test]
fn update_config_rejects_an_oversized_window() {
    let (mut svc, mut rig) = make_service(NodeConfig::default());
    let huge = NodeConfig {
        publish_period_secs: 3_600_000,
        ..NodeConfig::default()
    };
    svc.handle_command(AppCommand::UpdateConfig(huge), &mut rig.ports());
    assert_eq!(svc.window().capacity(), 10);
    assert_eq!(svc.config().publish_period_secs, 10);
}
