//! Supervisor command flows: command topic → ControlService → replies.

use crate::mock_hw::{RAW_135_DEG, RAW_200_DEG, RecordingBus, RecordingSink, ScriptedSensor};

use rosecompass::app::commands::Command;
use rosecompass::app::events::AppEvent;
use rosecompass::app::protocol::{LoopAction, PONG, PUZZLE_RESET, Topics};
use rosecompass::app::service::ControlService;
use rosecompass::config::SystemConfig;

fn setup() -> (ControlService, Topics, ScriptedSensor, RecordingBus, RecordingSink) {
    let svc = ControlService::new(&SystemConfig::default());
    let topics = svc.protocol().topics().clone();
    (
        svc,
        topics,
        ScriptedSensor::constant(RAW_200_DEG),
        RecordingBus::new(),
        RecordingSink::new(),
    )
}

#[test]
fn topics_follow_room_and_device() {
    let (_, topics, ..) = setup();
    assert_eq!(topics.command, "MermaidsTale/RoseCompass/command");
    assert_eq!(topics.status, "MermaidsTale/RoseCompass/status");
    assert_eq!(topics.log, "MermaidsTale/RoseCompass/log");
    assert_eq!(topics.direction, "MermaidsTale/RoseCompass/direction");
    assert_eq!(topics.solved, "MermaidsTale/RoseCompassSolved");
}

#[test]
fn ping_answers_pong_on_status_and_log() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    bus.clear();

    bus.push(&topics.command, "  ping\n");
    assert_eq!(svc.tick(50, &mut sensor, &mut bus, &mut sink), LoopAction::Continue);

    assert_eq!(bus.payloads_on(&topics.status), vec![PONG]);
    assert_eq!(bus.payloads_on(&topics.log), vec![PONG]);
    assert!(sink.events.contains(&AppEvent::CommandReceived(Command::Ping)));
}

#[test]
fn status_reports_json_snapshot() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    svc.set_ip_address("10.1.10.42".parse().unwrap());
    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    bus.clear();

    bus.push(&topics.command, "STATUS");
    svc.tick(61_000, &mut sensor, &mut bus, &mut sink);

    let replies = bus.payloads_on(&topics.status);
    assert_eq!(replies.len(), 1);
    assert_eq!(
        replies[0],
        concat!(
            r#"{"device":"RoseCompass","version":""#,
            env!("CARGO_PKG_VERSION"),
            r#"","room":"MermaidsTale","angle":200,"direction":"S","#,
            r#""target":"SE","targetAngle":135,"solved":false,"#,
            r#""ip":"10.1.10.42","uptime":61}"#
        )
    );
}

#[test]
fn status_before_network_reports_unspecified_ip() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    bus.push(&topics.command, "status");
    svc.tick(0, &mut sensor, &mut bus, &mut sink);

    let json: serde_json::Value = serde_json::from_str(bus.payloads_on(&topics.status)[1]).unwrap();
    assert_eq!(json["ip"], "0.0.0.0");
    // Commands run before the first sample of the tick.
    assert_eq!(json["angle"], 0);
}

#[test]
fn puzzle_reset_clears_solve_and_announces() {
    let (mut svc, topics, _, mut bus, mut sink) = setup();
    let mut sensor = ScriptedSensor::constant(RAW_135_DEG);
    for t in 0..=10 {
        svc.tick(t * 50, &mut sensor, &mut bus, &mut sink);
    }
    assert!(svc.is_solved());
    bus.clear();

    bus.push(&topics.command, "Puzzle_Reset");
    sensor.set(RAW_200_DEG);
    svc.tick(600, &mut sensor, &mut bus, &mut sink);

    assert!(!svc.is_solved());
    assert_eq!(bus.count(&topics.status, PUZZLE_RESET), 1);
    assert!(bus.payloads_on(&topics.log).contains(&"Puzzle reset - find SE to solve"));
    assert!(sink.events.contains(&AppEvent::PuzzleReset));
}

#[test]
fn reset_requests_shutdown_and_skips_rest_of_tick() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    bus.clear();

    bus.push(&topics.command, "RESET");
    bus.push(&topics.command, "PING");
    let action = svc.tick(50, &mut sensor, &mut bus, &mut sink);

    assert_eq!(action, LoopAction::ShutdownRequested);
    assert_eq!(bus.payloads_on(&topics.log), vec!["Resetting device..."]);
    assert!(bus.payloads_on(&topics.status).is_empty(), "PING after RESET is not handled");
    assert!(sink.events.contains(&AppEvent::RestartRequested));
    assert_eq!(svc.tick_count(), 2);
}

#[test]
fn unknown_command_is_logged_and_ignored() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    bus.clear();

    bus.push(&topics.command, "open sesame");
    assert_eq!(svc.tick(50, &mut sensor, &mut bus, &mut sink), LoopAction::Continue);
    assert_eq!(bus.payloads_on(&topics.log), vec!["Unknown command: OPEN SESAME"]);
    assert!(!svc.is_solved());
}

#[test]
fn messages_on_other_topics_are_ignored() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    svc.tick(0, &mut sensor, &mut bus, &mut sink);
    bus.clear();

    bus.push(&topics.status, "RESET");
    assert_eq!(svc.tick(50, &mut sensor, &mut bus, &mut sink), LoopAction::Continue);
    assert!(
        !sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::CommandReceived(_)))
    );
}

#[test]
fn commands_are_handled_in_arrival_order() {
    let (mut svc, topics, mut sensor, mut bus, mut sink) = setup();
    bus.push(&topics.command, "PING");
    bus.push(&topics.command, "xyz");
    bus.push(&topics.command, "PUZZLE_RESET");
    svc.tick(0, &mut sensor, &mut bus, &mut sink);

    let commands: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::CommandReceived(c) => Some(c.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(
        commands,
        vec![Command::Ping, Command::Unknown("XYZ".into()), Command::PuzzleReset]
    );
}
