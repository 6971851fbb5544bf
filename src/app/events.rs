//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port. They mirror
//! what goes over the broker, but are meant for the local serial console.

use crate::compass::{Angle, Direction};

use super::commands::Command;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service was constructed (carries the puzzle target).
    Started { target: Direction, target_angle: Angle },

    /// The broker session came up and presence was announced.
    Online,

    /// The angle moved far enough to be reported.
    AngleReported { angle: Angle, direction: Direction },

    /// A command arrived on the command topic.
    CommandReceived(Command),

    /// The puzzle transitioned to solved.
    Solved { angle: Angle, direction: Direction },

    /// The puzzle was reset to unsolved by the supervisor.
    PuzzleReset,

    /// A retained heartbeat line was published.
    Heartbeat(String),

    /// The supervisor asked for a full device restart.
    RestartRequested,
}
