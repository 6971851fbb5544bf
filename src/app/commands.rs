//! Inbound commands from the game-master supervisor.
//!
//! Commands arrive as plain-text tokens on the `.../command` topic.
//! Parsing trims surrounding whitespace and ignores case, so `" ping \n"`
//! and `"PING"` are the same command.

use core::fmt;

/// Payload bytes beyond this are ignored.
pub const MAX_COMMAND_LEN: usize = 127;

/// Commands that the supervisor can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness probe; answered with `PONG`.
    Ping,

    /// Publish a JSON status snapshot.
    Status,

    /// Restart the whole device.
    Reset,

    /// Put the puzzle back to unsolved.
    PuzzleReset,

    /// Anything else. Carries the normalised (trimmed, uppercased) text.
    Unknown(String),
}

impl Command {
    /// Parse a command token. Never fails; unrecognised text becomes
    /// [`Command::Unknown`].
    pub fn parse(text: &str) -> Self {
        let normalized = text.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "PING" => Self::Ping,
            "STATUS" => Self::Status,
            "RESET" => Self::Reset,
            "PUZZLE_RESET" => Self::PuzzleReset,
            _ => Self::Unknown(normalized),
        }
    }

    /// Parse a raw MQTT payload. Invalid UTF-8 is replaced rather than
    /// rejected, and oversized payloads are truncated.
    pub fn from_payload(payload: &[u8]) -> Self {
        let bytes = &payload[..payload.len().min(MAX_COMMAND_LEN)];
        Self::parse(&String::from_utf8_lossy(bytes))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => f.write_str("PING"),
            Self::Status => f.write_str("STATUS"),
            Self::Reset => f.write_str("RESET"),
            Self::PuzzleReset => f.write_str("PUZZLE_RESET"),
            Self::Unknown(text) => f.write_str(text),
        }
    }
}
