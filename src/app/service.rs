//! Control service, the hexagonal core.
//!
//! [`ControlService`] owns every piece of mutable puzzle state: the angle
//! filter, the puzzle machine, the last reported angle and the heartbeat
//! timer. `main` calls [`tick`](ControlService::tick) once per loop
//! period; all I/O flows through port traits injected at the call site,
//! so the whole service runs against mocks in tests.
//!
//! ```text
//!   RawSensor ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        ControlService        │
//! MessageBus ◀──▶ │ AngleReader · Puzzle · Proto │
//!                 └──────────────────────────────┘
//! ```
//!
//! One tick: drain commands → sample angle → report change → update
//! puzzle → heartbeat if due.

use core::net::Ipv4Addr;

use log::info;

use crate::compass::{Angle, Direction};
use crate::config::SystemConfig;
use crate::puzzle::{PuzzleMachine, PuzzleState};
use crate::scheduler::IntervalTimer;
use crate::sensors::AngleReader;

use super::commands::Command;
use super::events::AppEvent;
use super::ports::{EventSink, MessageBus, RawSensor};
use super::protocol::{DeviceSnapshot, LoopAction, ProtocolHandler};

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService {
    reader: AngleReader,
    puzzle: PuzzleMachine,
    protocol: ProtocolHandler,
    heartbeat: IntervalTimer,
    angle_change_threshold: u16,
    /// Most recent sample (0 until the first tick).
    angle: Angle,
    last_reported: Option<Angle>,
    ip: Ipv4Addr,
    was_connected: bool,
    tick_count: u64,
}

impl ControlService {
    /// Construct the service from configuration. The heartbeat period
    /// starts counting at uptime 0.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            reader: AngleReader::new(config.adc_max),
            puzzle: PuzzleMachine::new(config.target_spec(), config.debounce_ms),
            protocol: ProtocolHandler::new(config),
            heartbeat: IntervalTimer::new("heartbeat", config.heartbeat_interval_ms, 0),
            angle_change_threshold: config.angle_change_threshold,
            angle: Angle::MIN,
            last_reported: None,
            ip: Ipv4Addr::UNSPECIFIED,
            was_connected: false,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let target = self.puzzle.target();
        sink.emit(&AppEvent::Started {
            target: target.direction(),
            target_angle: target.angle,
        });
        info!(
            "ControlService started. Target: {} ({} degrees)",
            target.direction(),
            target.angle
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle at uptime `now_ms`.
    ///
    /// Returns [`LoopAction::ShutdownRequested`] as soon as a `RESET`
    /// command is seen; the rest of the tick is skipped.
    pub fn tick(
        &mut self,
        now_ms: u64,
        sensor: &mut impl RawSensor,
        bus: &mut impl MessageBus,
        sink: &mut impl EventSink,
    ) -> LoopAction {
        self.tick_count += 1;

        // 1. Presence: re-announce after every reconnect
        let connected = bus.is_connected();
        if connected && !self.was_connected {
            self.protocol.announce_online(bus);
            sink.emit(&AppEvent::Online);
        }
        self.was_connected = connected;

        // 2. Commands queued since the last tick
        while let Some(msg) = bus.try_receive() {
            let Some(cmd) = self.protocol.parse_inbound(&msg) else {
                continue;
            };
            if self.handle_command(cmd, now_ms, bus, sink) == LoopAction::ShutdownRequested {
                return LoopAction::ShutdownRequested;
            }
        }

        // 3. Sample
        self.angle = self.reader.sample(sensor);

        // 4. Direction report, rate-limited by the change threshold
        let moved = self
            .last_reported
            .is_none_or(|last| last.degrees().abs_diff(self.angle.degrees()) >= self.angle_change_threshold);
        if moved {
            let direction = Direction::classify(self.angle);
            self.protocol.publish_angle(self.angle, bus);
            sink.emit(&AppEvent::AngleReported {
                angle: self.angle,
                direction,
            });
            self.last_reported = Some(self.angle);
        }

        // 5. Solve detection
        if self.puzzle.update(self.angle, now_ms).just_solved {
            self.protocol.publish_solved(bus);
            sink.emit(&AppEvent::Solved {
                angle: self.angle,
                direction: Direction::classify(self.angle),
            });
        }

        // 6. Heartbeat
        if self.heartbeat.poll(now_ms) {
            let line = self.protocol.publish_heartbeat(&self.snapshot(now_ms), bus);
            sink.emit(&AppEvent::Heartbeat(line.as_str().into()));
        }

        LoopAction::Continue
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one supervisor command.
    pub fn handle_command(
        &mut self,
        cmd: Command,
        now_ms: u64,
        bus: &mut impl MessageBus,
        sink: &mut impl EventSink,
    ) -> LoopAction {
        sink.emit(&AppEvent::CommandReceived(cmd.clone()));
        let snapshot = self.snapshot(now_ms);
        let action = self.protocol.handle(&cmd, &mut self.puzzle, &snapshot, bus);

        if cmd == Command::PuzzleReset {
            sink.emit(&AppEvent::PuzzleReset);
        }
        if action == LoopAction::ShutdownRequested {
            sink.emit(&AppEvent::RestartRequested);
        }
        action
    }

    // ── Queries ───────────────────────────────────────────────

    /// Values reported by `STATUS` and the heartbeat.
    pub fn snapshot(&self, now_ms: u64) -> DeviceSnapshot {
        DeviceSnapshot {
            angle: self.angle,
            solved: self.puzzle.is_solved(),
            ip: self.ip,
            uptime_ms: now_ms,
        }
    }

    /// Record the station address once the network layer has one.
    pub fn set_ip_address(&mut self, ip: Ipv4Addr) {
        self.ip = ip;
    }

    pub fn angle(&self) -> Angle {
        self.angle
    }

    pub fn direction(&self) -> Direction {
        Direction::classify(self.angle)
    }

    pub fn puzzle_state(&self) -> PuzzleState {
        self.puzzle.state()
    }

    pub fn is_solved(&self) -> bool {
        self.puzzle.is_solved()
    }

    pub fn protocol(&self) -> &ProtocolHandler {
        &self.protocol
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
