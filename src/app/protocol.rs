//! Watchtower messaging protocol.
//!
//! Topic layout for room `R` and device `D`:
//!
//! | Topic            | Dir | Payload                                            |
//! |------------------|-----|----------------------------------------------------|
//! | `R/D/command`    | in  | `PING`, `STATUS`, `RESET`, `PUZZLE_RESET`          |
//! | `R/D/status`     | out | `ONLINE`/`OFFLINE` (retained), `PONG`, JSON status, |
//! |                  |     | `PUZZLE_RESET`, `SOLVED`, heartbeat line (retained) |
//! | `R/D/log`        | out | free-text diagnostics                              |
//! | `R/D/direction`  | out | `pre_{angle}`                                      |
//! | `R/DSolved`      | out | `triggered` (game-master trigger)                  |
//!
//! [`ProtocolHandler`] owns the topic names and every outbound payload
//! format. It never holds puzzle state itself; callers pass in the
//! [`PuzzleMachine`] and a [`DeviceSnapshot`].

use core::fmt::Write;
use core::net::Ipv4Addr;

use log::{debug, info, warn};
use serde::Serialize;

use crate::compass::{Angle, Direction};
use crate::config::{FIRMWARE_VERSION, SystemConfig, TargetSpec};
use crate::puzzle::PuzzleMachine;

use super::commands::Command;
use super::ports::{InboundMessage, MessageBus};

/// Presence payload, published retained on connect.
pub const ONLINE: &str = "ONLINE";
/// Presence payload the broker publishes via last-will on disconnect.
pub const OFFLINE: &str = "OFFLINE";
pub const PONG: &str = "PONG";
pub const SOLVED: &str = "SOLVED";
pub const PUZZLE_RESET: &str = "PUZZLE_RESET";
/// Token the game-master system listens for on the Solved topic.
pub const SOLVED_TRIGGER: &str = "triggered";
/// Prefix of direction reports (`pre_135`).
pub const ANGLE_PREFIX: &str = "pre_";

/// Heartbeat line buffer. Long device names are truncated, not rejected.
pub type HeartbeatLine = heapless::String<256>;

/// What the control loop should do after handling a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    /// The supervisor asked for a restart; the process must exit the loop
    /// and reboot the device.
    ShutdownRequested,
}

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub command: String,
    pub status: String,
    pub log: String,
    pub direction: String,
    /// Sibling of the device namespace: `{room}/{device}Solved`.
    pub solved: String,
}

impl Topics {
    pub fn new(room: &str, device: &str) -> Self {
        let base = format!("{room}/{device}");
        Self {
            command: format!("{base}/command"),
            status: format!("{base}/status"),
            log: format!("{base}/log"),
            direction: format!("{base}/direction"),
            solved: format!("{base}Solved"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Snapshots
// ───────────────────────────────────────────────────────────────

/// Live values the protocol reports but does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub angle: Angle,
    pub solved: bool,
    pub ip: Ipv4Addr,
    pub uptime_ms: u64,
}

/// JSON body of the `STATUS` reply. Field order is part of the wire format.
#[derive(Serialize)]
struct StatusReport<'a> {
    device: &'a str,
    version: &'a str,
    room: &'a str,
    angle: u16,
    direction: &'a str,
    target: &'a str,
    #[serde(rename = "targetAngle")]
    target_angle: u16,
    solved: bool,
    ip: String,
    uptime: u64,
}

// ───────────────────────────────────────────────────────────────
// ProtocolHandler
// ───────────────────────────────────────────────────────────────

pub struct ProtocolHandler {
    topics: Topics,
    device_name: String,
    room_name: String,
    target: TargetSpec,
}

impl ProtocolHandler {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            topics: Topics::new(&config.room_name, &config.device_name),
            device_name: config.device_name.clone(),
            room_name: config.room_name.clone(),
            target: config.target_spec(),
        }
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }

    // ── Presence ──────────────────────────────────────────────

    /// Run after every (re)connection: subscribe to commands and announce
    /// presence. The broker forgets subscriptions on a clean reconnect.
    pub fn announce_online(&self, bus: &mut impl MessageBus) {
        match bus.subscribe(&self.topics.command) {
            Ok(()) => info!("Subscribed to: {}", self.topics.command),
            Err(e) => warn!("Subscribe to {} failed: {}", self.topics.command, e),
        }
        self.publish(bus, &self.topics.status, ONLINE, true);
        self.publish_log(bus, &format!("{} controller online", self.device_name));
    }

    // ── Inbound ───────────────────────────────────────────────

    /// Turn a broker message into a command. Messages on any topic other
    /// than the command topic are ignored.
    pub fn parse_inbound(&self, msg: &InboundMessage) -> Option<Command> {
        let cmd = Command::from_payload(&msg.payload);
        debug!("MQTT: {} -> {}", msg.topic, cmd);
        (msg.topic == self.topics.command).then_some(cmd)
    }

    /// Execute a command. Only `PUZZLE_RESET` mutates state; only `RESET`
    /// ends the loop.
    pub fn handle(
        &self,
        cmd: &Command,
        puzzle: &mut PuzzleMachine,
        snapshot: &DeviceSnapshot,
        bus: &mut impl MessageBus,
    ) -> LoopAction {
        match cmd {
            Command::Ping => {
                self.publish(bus, &self.topics.status, PONG, false);
                self.publish_log(bus, PONG);
            }
            Command::Status => {
                let json = self.status_json(snapshot);
                self.publish(bus, &self.topics.status, &json, false);
                info!("Status published");
            }
            Command::Reset => {
                self.publish_log(bus, "Resetting device...");
                return LoopAction::ShutdownRequested;
            }
            Command::PuzzleReset => {
                puzzle.reset();
                self.publish_log(
                    bus,
                    &format!("Puzzle reset - find {} to solve", self.target.direction()),
                );
                self.publish(bus, &self.topics.status, PUZZLE_RESET, false);
            }
            Command::Unknown(text) => {
                self.publish_log(bus, &format!("Unknown command: {text}"));
            }
        }
        LoopAction::Continue
    }

    // ── Outbound ──────────────────────────────────────────────

    /// Report a new angle on the direction topic.
    pub fn publish_angle(&self, angle: Angle, bus: &mut impl MessageBus) {
        let payload = format!("{ANGLE_PREFIX}{angle}");
        self.publish(bus, &self.topics.direction, &payload, false);
    }

    /// Announce a solve to the game master, the status topic and the log.
    pub fn publish_solved(&self, bus: &mut impl MessageBus) {
        self.publish(bus, &self.topics.solved, SOLVED_TRIGGER, false);
        self.publish(bus, &self.topics.status, SOLVED, false);
        self.publish_log(
            bus,
            &format!(
                "PUZZLE SOLVED - {} aligned to {}",
                self.device_name,
                self.target.direction()
            ),
        );
    }

    /// Publish the retained heartbeat line and return it.
    pub fn publish_heartbeat(&self, snapshot: &DeviceSnapshot, bus: &mut impl MessageBus) -> HeartbeatLine {
        let line = self.heartbeat_line(snapshot);
        self.publish(bus, &self.topics.status, &line, true);
        line
    }

    /// Free-text diagnostic on the log topic, mirrored to the console.
    pub fn publish_log(&self, bus: &mut impl MessageBus, message: &str) {
        self.publish(bus, &self.topics.log, message, false);
        info!("Log: {}", message);
    }

    // ── Formatting ────────────────────────────────────────────

    pub fn status_json(&self, snapshot: &DeviceSnapshot) -> String {
        let report = StatusReport {
            device: &self.device_name,
            version: FIRMWARE_VERSION,
            room: &self.room_name,
            angle: snapshot.angle.degrees(),
            direction: Direction::classify(snapshot.angle).as_str(),
            target: self.target.direction().as_str(),
            target_angle: self.target.angle.degrees(),
            solved: snapshot.solved,
            ip: snapshot.ip.to_string(),
            uptime: snapshot.uptime_ms / 1000,
        };
        serde_json::to_string(&report).unwrap_or_else(|e| {
            warn!("Status serialisation failed: {}", e);
            String::from("{}")
        })
    }

    pub fn heartbeat_line(&self, snapshot: &DeviceSnapshot) -> HeartbeatLine {
        let mut line = HeartbeatLine::new();
        let written = write!(
            line,
            "{} | {} | v{} | Solved:{} | Direction:{} | Angle:{} | Uptime:{}ms",
            ONLINE,
            self.device_name,
            FIRMWARE_VERSION,
            if snapshot.solved { "YES" } else { "NO" },
            Direction::classify(snapshot.angle),
            snapshot.angle,
            snapshot.uptime_ms,
        );
        if written.is_err() {
            warn!("Heartbeat line truncated at {} bytes", line.capacity());
        }
        line
    }

    // ── Internal ──────────────────────────────────────────────

    fn publish(&self, bus: &mut impl MessageBus, topic: &str, payload: &str, retain: bool) {
        if !bus.is_connected() {
            debug!("Broker offline, dropped publish to {}", topic);
            return;
        }
        if let Err(e) = bus.publish(topic, payload, retain) {
            warn!("Publish to {} failed: {}", topic, e);
        }
    }
}
