//! Integration tests for the ControlService tick pipeline.
//!
//! sensor → angle filter → direction report → puzzle → broker, driven at
//! the real 50 ms loop period against mock adapters.

use crate::mock_hw::{
    RAW_0_DEG, RAW_45_DEG, RAW_135_DEG, RAW_200_DEG, RecordingBus, RecordingSink, ScriptedSensor,
};

use rosecompass::app::events::AppEvent;
use rosecompass::app::protocol::{LoopAction, SOLVED, SOLVED_TRIGGER};
use rosecompass::app::service::ControlService;
use rosecompass::compass::{Angle, Direction};
use rosecompass::config::SystemConfig;
use rosecompass::error::SensorError;
use rosecompass::puzzle::PuzzleState;

const PERIOD_MS: u64 = 50;

fn config_with_target(target: u16) -> SystemConfig {
    SystemConfig {
        target_angle: target,
        tolerance_deg: 10,
        debounce_ms: 500,
        loop_period_ms: PERIOD_MS,
        ..SystemConfig::default()
    }
}

struct Rig {
    svc: ControlService,
    sensor: ScriptedSensor,
    bus: RecordingBus,
    sink: RecordingSink,
    now_ms: u64,
}

impl Rig {
    fn new(config: &SystemConfig, raw: u16) -> Self {
        let mut svc = ControlService::new(config);
        let mut sink = RecordingSink::new();
        svc.start(&mut sink);
        Self {
            svc,
            sensor: ScriptedSensor::constant(raw),
            bus: RecordingBus::new(),
            sink,
            now_ms: 0,
        }
    }

    /// One loop iteration, then advance the clock one period.
    fn tick(&mut self) -> LoopAction {
        let action = self
            .svc
            .tick(self.now_ms, &mut self.sensor, &mut self.bus, &mut self.sink);
        self.now_ms += PERIOD_MS;
        action
    }

    fn run(&mut self, ticks: usize) {
        for _ in 0..ticks {
            assert_eq!(self.tick(), LoopAction::Continue);
        }
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_emits_target() {
    let rig = Rig::new(&SystemConfig::default(), RAW_0_DEG);
    assert_eq!(
        rig.sink.events.first(),
        Some(&AppEvent::Started {
            target: Direction::SE,
            target_angle: Angle::from_degrees(135),
        })
    );
}

#[test]
fn first_tick_announces_presence_and_reports_angle() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_45_DEG);
    rig.run(1);

    let topics = rig.svc.protocol().topics().clone();
    assert_eq!(rig.bus.subscriptions, vec![topics.command.clone()]);
    assert!(rig.bus.published.iter().any(|p| p.topic == topics.status && p.payload == "ONLINE" && p.retain));
    assert_eq!(rig.bus.payloads_on(&topics.log), vec!["RoseCompass controller online"]);
    assert_eq!(rig.bus.payloads_on(&topics.direction), vec!["pre_45"]);
    assert_eq!(rig.svc.direction(), Direction::NE);
}

// ── End-to-end solve ─────────────────────────────────────────

#[test]
fn holding_target_solves_once_after_debounce() {
    let mut rig = Rig::new(&config_with_target(45), RAW_45_DEG);
    let solved_topic = rig.svc.protocol().topics().solved.clone();
    let status_topic = rig.svc.protocol().topics().status.clone();

    // t = 0 arms; t = 450 is still inside the debounce window.
    rig.run(10);
    assert!(!rig.svc.is_solved());
    assert_eq!(rig.sink.solved_count(), 0);

    // t = 500 completes the hold.
    rig.run(1);
    assert!(rig.svc.is_solved());
    assert_eq!(rig.svc.puzzle_state(), PuzzleState::Solved { since_ms: 500 });
    assert_eq!(rig.bus.payloads_on(&solved_topic), vec![SOLVED_TRIGGER]);
    assert_eq!(rig.bus.count(&status_topic, SOLVED), 1);

    // Staying on target does not re-trigger.
    rig.run(20);
    assert_eq!(rig.sink.solved_count(), 1);
    assert_eq!(rig.bus.payloads_on(&solved_topic).len(), 1);
}

#[test]
fn solved_is_sticky_until_puzzle_reset() {
    let mut rig = Rig::new(&config_with_target(45), RAW_45_DEG);
    rig.run(11);
    assert!(rig.svc.is_solved());

    // Walk away from the target: still solved.
    rig.sensor.set(RAW_200_DEG);
    rig.run(20);
    assert!(rig.svc.is_solved());

    // Supervisor resets while the needle is off target.
    let command = rig.svc.protocol().topics().command.clone();
    rig.bus.push(&command, "PUZZLE_RESET");
    rig.run(1);
    assert!(!rig.svc.is_solved());
    assert!(rig.sink.events.contains(&AppEvent::PuzzleReset));

    rig.run(40);
    assert!(!rig.svc.is_solved());
    assert_eq!(rig.sink.solved_count(), 1);
}

#[test]
fn excursion_restarts_debounce() {
    let mut rig = Rig::new(&config_with_target(45), RAW_45_DEG);
    rig.run(8);

    // A single sample at 0° pulls the filter to 22°, off target.
    rig.sensor.set(RAW_0_DEG);
    rig.run(1);
    assert_eq!(rig.svc.puzzle_state(), PuzzleState::Unsolved);

    rig.sensor.set(RAW_45_DEG);
    // The filter needs a few samples to climb back into 35..=55.
    rig.run(5);
    assert!(!rig.svc.is_solved());
    rig.run(15);
    assert!(rig.svc.is_solved());
}

#[test]
fn default_target_is_solvable() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_135_DEG);
    rig.run(11);
    assert!(rig.svc.is_solved());
    assert_eq!(rig.svc.direction(), Direction::SE);
}

// ── Angle reports ────────────────────────────────────────────

#[test]
fn steady_angle_is_reported_once() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_200_DEG);
    rig.run(30);
    let direction = rig.svc.protocol().topics().direction.clone();
    assert_eq!(rig.bus.payloads_on(&direction), vec!["pre_200"]);
}

#[test]
fn moves_below_threshold_are_not_reported() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_200_DEG);
    rig.run(1);
    // 2293 → 201°: filter lands at 2287 → 200°, below the 2° threshold.
    rig.sensor.set(2293);
    rig.run(10);
    let direction = rig.svc.protocol().topics().direction.clone();
    assert_eq!(rig.bus.payloads_on(&direction).len(), 1);
}

#[test]
fn large_move_is_reported_as_filter_converges() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_0_DEG);
    rig.run(1);
    rig.sensor.set(RAW_200_DEG);
    rig.run(20);

    let direction = rig.svc.protocol().topics().direction.clone();
    let reports = rig.bus.payloads_on(&direction);
    assert!(reports.len() > 2, "filter ramp should produce several reports: {reports:?}");
    assert_eq!(reports[0], "pre_0");
    let last: u16 = reports
        .last()
        .and_then(|p| p.strip_prefix("pre_"))
        .and_then(|d| d.parse().ok())
        .expect("angle payload");
    assert!((197..=200).contains(&last), "last report {last}");
}

// ── Sensor faults ────────────────────────────────────────────

#[test]
fn sensor_failure_holds_last_angle() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_0_DEG);
    rig.sensor = ScriptedSensor::script([
        Ok(RAW_135_DEG),
        Err(SensorError::AdcReadFailed),
        Err(SensorError::AdcReadFailed),
        Ok(RAW_135_DEG),
    ]);
    rig.run(2);
    assert_eq!(rig.svc.angle().degrees(), 135);
    rig.run(2);
    assert_eq!(rig.svc.angle().degrees(), 135);
}

#[test]
fn sensor_failure_before_first_read_reports_zero() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_0_DEG);
    rig.sensor = ScriptedSensor::script([Err(SensorError::NotInitialised)]);
    rig.run(3);
    assert_eq!(rig.svc.angle(), Angle::MIN);
}

// ── Heartbeat ────────────────────────────────────────────────

#[test]
fn heartbeat_fires_once_per_interval() {
    let config = SystemConfig {
        heartbeat_interval_ms: 1_000,
        ..SystemConfig::default()
    };
    let mut rig = Rig::new(&config, RAW_135_DEG);

    // 0..=4950 ms
    rig.run(100);
    let beats = rig.sink.heartbeats();
    assert_eq!(beats.len(), 4, "fires at 1000, 2000, 3000, 4000: {beats:?}");
    assert!(beats[0].starts_with("ONLINE | RoseCompass | v"));
    assert!(beats[0].ends_with("Direction:SE | Angle:135 | Uptime:1000ms"));
    assert!(beats[3].contains("Solved:YES"));

    let status = rig.svc.protocol().topics().status.clone();
    let retained_beats = rig
        .bus
        .published
        .iter()
        .filter(|p| p.topic == status && p.retain && p.payload.starts_with("ONLINE |"))
        .count();
    assert_eq!(retained_beats, 4);
}

#[test]
fn default_heartbeat_waits_five_minutes() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_135_DEG);
    rig.run(200);
    assert!(rig.sink.heartbeats().is_empty());
}

// ── Connectivity ─────────────────────────────────────────────

#[test]
fn offline_bus_publishes_nothing_but_puzzle_still_solves() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_135_DEG);
    rig.bus = RecordingBus::offline();
    rig.run(15);
    assert!(rig.bus.published.is_empty());
    assert!(rig.bus.subscriptions.is_empty());
    assert!(rig.svc.is_solved());
    assert_eq!(rig.sink.solved_count(), 1);
}

#[test]
fn reconnect_re_announces_presence() {
    let mut rig = Rig::new(&SystemConfig::default(), RAW_135_DEG);
    rig.run(1);
    rig.bus.connected = false;
    rig.run(3);
    rig.bus.connected = true;
    rig.run(1);

    let online = rig.sink.events.iter().filter(|e| **e == AppEvent::Online).count();
    assert_eq!(online, 2);
    assert_eq!(rig.bus.subscriptions.len(), 2);
}

#[test]
fn publish_errors_do_not_stop_the_loop() {
    let mut rig = Rig::new(&config_with_target(45), RAW_45_DEG);
    rig.bus.fail_publish = true;
    rig.run(11);
    assert!(rig.svc.is_solved());
    assert_eq!(rig.svc.tick_count(), 11);
}
