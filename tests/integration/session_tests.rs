//! Integration tests for the outer MQTT session.
//!
//! Boot resolves the connection string from mock credentials; `run`
//! drives the simulated broker through connect, serve and teardown with
//! a local event queue standing in for the timer interrupts.

use crate::mock_ports::{MockCredentials, MockTimers, PowerCall, Rig};

use vipv_node::app::ports::{Credential, NetworkError};
use vipv_node::app::service::NodeService;
use vipv_node::app::events::LinkState;
use vipv_node::config::NodeConfig;
use vipv_node::connection::ConnSecurity;
use vipv_node::events::{Event, EventQueue};
use vipv_node::session::{Session, SessionExit, SessionState, BOOT_FAILURE_RESET_MS};

fn boot(rig: &mut Rig, svc: &NodeService) -> Session {
    let creds = MockCredentials::plain("broker.local", 1883);
    Session::boot(svc, &creds, &mut rig.network, &mut rig.power).expect("boot")
}

/// `keep_running` that allows `n` checks before asking to stop.
fn stop_after(n: u32) -> impl FnMut() -> bool {
    let mut calls = 0;
    move || {
        calls += 1;
        calls <= n
    }
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_resolves_the_connection_string() {
    let mut rig = Rig::new();
    let svc = NodeService::new(NodeConfig::default());
    let session = boot(&mut rig, &svc);

    assert_eq!(rig.network.init_calls, 1);
    assert_eq!(session.state(), SessionState::Init);
    assert_eq!(session.device_id(), "VIPV-0A0B0C");
    let s = session.settings();
    assert_eq!(s.host, "broker.local");
    assert_eq!(s.port, 1883);
    assert_eq!(s.security, ConnSecurity::None);
    assert_eq!(s.client_id, "node-7");
    assert_eq!(s.username, "u7");
    assert_eq!(s.password, "secret");
    assert!(rig.power.calls.is_empty());
}

#[test]
fn boot_without_credentials_resets_the_device() {
    let mut rig = Rig::new();
    let svc = NodeService::new(NodeConfig::default());
    let result = Session::boot(&svc, &MockCredentials::empty(), &mut rig.network, &mut rig.power);
    assert!(result.is_err());
    assert_eq!(rig.power.calls, vec![PowerCall::Reset(BOOT_FAILURE_RESET_MS)]);
}

#[test]
fn boot_with_network_down_resets_the_device() {
    let mut rig = Rig::new();
    rig.network.init_result = Err(NetworkError::JoinFailed);
    let svc = NodeService::new(NodeConfig::default());
    let creds = MockCredentials::plain("broker.local", 1883);
    assert!(Session::boot(&svc, &creds, &mut rig.network, &mut rig.power).is_err());
    assert_eq!(rig.power.calls, vec![PowerCall::Reset(1500)]);
}

#[test]
fn boot_with_server_auth_needs_a_root_ca() {
    let mut rig = Rig::new();
    let svc = NodeService::new(NodeConfig::default());
    let mut creds = MockCredentials::empty();
    creds.set(
        Credential::ConnectionString,
        "HostName=broker.local;HostPort=8883;ConnSecurity=2;MQClientId=node-7;",
    );
    assert!(Session::boot(&svc, &creds, &mut rig.network, &mut rig.power).is_err());

    creds.set(Credential::RootCa, "-----BEGIN CERTIFICATE-----");
    rig.power.calls.clear();
    let session = Session::boot(&svc, &creds, &mut rig.network, &mut rig.power).expect("boot");
    assert_eq!(session.settings().security, ConnSecurity::ServerAuth);
    assert!(rig.power.calls.is_empty());
}

// ── Run ───────────────────────────────────────────────────────

#[test]
fn run_connects_serves_and_stops() {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(NodeConfig::default());
    let mut session = boot(&mut rig, &svc);
    let events = EventQueue::new();
    let mut timers = MockTimers::default();

    assert!(events.push(Event::ReadTick));
    let exit = session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(1));

    assert_eq!(exit, SessionExit::Stopped);
    assert_eq!(svc.window().len(), 1, "one read tick served");
    assert_eq!(svc.distrust(), 0);
    assert_eq!(svc.link(), LinkState::Connected);
    assert_eq!((timers.starts, timers.stops), (1, 1));
    assert_eq!(rig.mqtt.url(), "mqtt://broker.local:1883");
    assert!(!rig.mqtt.is_connected(), "teardown disconnects");
    assert_eq!(
        rig.sink.sessions(),
        vec![
            SessionState::SocketAttempt,
            SessionState::MqttConnect,
            SessionState::Connected,
            SessionState::Disconnected,
        ]
    );
}

#[test]
fn socket_failure_rejoins_and_retries() {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(NodeConfig::default());
    let mut session = boot(&mut rig, &svc);
    let events = EventQueue::new();
    let mut timers = MockTimers::default();

    rig.mqtt.fail_transport_next(1);
    let exit = session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(2));

    assert_eq!(exit, SessionExit::Stopped);
    assert_eq!(rig.network.reinit_calls, 1);
    assert_eq!(timers.starts, 1, "second attempt reached the inner loop");
    assert_eq!(
        rig.sink.sessions(),
        vec![
            SessionState::SocketAttempt,
            SessionState::Disconnected,
            SessionState::SocketAttempt,
            SessionState::MqttConnect,
            SessionState::Connected,
            SessionState::Disconnected,
        ]
    );
}

#[test]
fn refused_connect_with_a_trusted_link_settles() {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(NodeConfig::default());
    let mut session = boot(&mut rig, &svc);
    let events = EventQueue::new();
    let mut timers = MockTimers::default();

    // First session connects, which clears the distrust score.
    session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(1));
    assert_eq!(svc.distrust(), 0);

    rig.mqtt.fail_connect_next(1);
    rig.network.fail_reinit(1);
    let exit = session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(5));
    assert_eq!(exit, SessionExit::Settled);
    assert_eq!(svc.link(), LinkState::Disconnected);
}

#[test]
fn timer_failure_counts_against_the_session() {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(NodeConfig::default());
    let mut session = boot(&mut rig, &svc);
    let events = EventQueue::new();
    let mut timers = MockTimers {
        fail_start: true,
        ..MockTimers::default()
    };

    let exit = session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(0));
    assert_eq!(exit, SessionExit::Stopped);
    assert_eq!(svc.distrust(), 1);
    assert_eq!(timers.stops, 0);
}

#[test]
fn button_press_toggles_publishing() {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(NodeConfig::default());
    let mut session = boot(&mut rig, &svc);
    let events = EventQueue::new();
    let mut timers = MockTimers::default();

    assert!(events.push(Event::ButtonPress));
    session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(1));
    assert!(!svc.publishing_enabled());
    assert!(events.is_empty());
}

#[test]
fn slow_tick_drains_the_backlog_once_connected() {
    let mut rig = Rig::new();
    let mut svc = NodeService::new(NodeConfig::default());

    // Offline window: the publish fails and the record is parked.
    let mut flags = vipv_node::scheduler::PhaseFlags::default();
    for _ in 0..svc.window().capacity() {
        flags.raise(vipv_node::app::ports::Phase::Read);
        svc.run_iteration(&mut flags, &mut rig.ports());
    }
    flags.raise(vipv_node::app::ports::Phase::Publish);
    svc.run_iteration(&mut flags, &mut rig.ports());
    assert_eq!(svc.queue().len(), 1);

    let mut session = boot(&mut rig, &svc);
    let events = EventQueue::new();
    let mut timers = MockTimers::default();
    assert!(events.push(Event::SlowTick));
    session.run(&mut svc, &events, &mut timers, &mut rig.ports(), &mut stop_after(1));

    assert!(svc.queue().is_empty());
    assert_eq!(rig.mqtt.published().len(), 2);
}
