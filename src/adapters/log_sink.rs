//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production). This is the operator's serial
//! console view of the puzzle; the MQTT side has already been handled by
//! the protocol handler by the time an event arrives here.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events written since boot.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started {
                target,
                target_angle,
            } => {
                info!("Setup complete. Target: {} ({} degrees)", target, target_angle);
            }
            AppEvent::Online => {
                info!("NET | broker session up, presence announced");
            }
            AppEvent::AngleReported { angle, direction } => {
                info!("COMPASS | {} deg ({})", angle, direction);
            }
            AppEvent::CommandReceived(cmd) => {
                info!("CMD | {}", cmd);
            }
            AppEvent::Solved { angle, direction } => {
                info!("========================================");
                info!("  PUZZLE SOLVED at {} deg ({})", angle, direction);
                info!("========================================");
            }
            AppEvent::PuzzleReset => {
                info!("PUZZLE | reset to unsolved");
            }
            AppEvent::Heartbeat(line) => {
                info!("HEARTBEAT | {}", line);
            }
            AppEvent::RestartRequested => {
                info!("SYSTEM | restart requested");
            }
        }
    }
}
