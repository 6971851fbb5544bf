//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (potentiometer ADC, MQTT client, serial log) implement
//! these traits. The [`ControlService`](super::service::ControlService)
//! consumes them via generics, so the domain core never touches hardware
//! or the network stack directly.

use crate::error::{CommsError, SensorError};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Source of unitless raw samples (ADC counts on the real board).
pub trait RawSensor {
    /// Take one sample. The domain of the value is fixed by the hardware
    /// (`0..=SystemConfig::adc_max`).
    fn read_raw(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Message bus port (driven adapter: domain ↔ MQTT broker)
// ───────────────────────────────────────────────────────────────

/// A message delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Publish/subscribe link to the game-master broker.
///
/// Connection management (association, reconnect, last-will) belongs to
/// the adapter. The domain only polls [`is_connected`](Self::is_connected)
/// and drains inbound traffic from the control loop.
pub trait MessageBus {
    /// Publish `payload` on `topic`. `retain` asks the broker to keep the
    /// message for late subscribers.
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError>;

    /// Subscribe to `topic`. Must be repeated after every reconnect.
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError>;

    /// Whether the broker session is currently up.
    fn is_connected(&self) -> bool;

    /// Next queued inbound message, if any. Never blocks.
    fn try_receive(&mut self) -> Option<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → serial console)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go (serial log,
/// test recorder, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
