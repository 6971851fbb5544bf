//! MQTT adapter. Implements [`MessageBus`] for the Watchtower broker.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//!   The ESP-IDF client owns reconnection; this adapter only configures
//!   the last-will and tracks the session state.
//! - **all other targets**: an in-memory broker for host-side tests.
//!
//! ## Inbound path
//!
//! ```text
//! ┌──────────────┐  InboundMessage  ┌──────────────┐
//! │  MQTT task   │─────────────────▶│ Control loop │
//! │  (callback)  │   Inbox channel  │ try_receive  │
//! └──────────────┘                  └──────────────┘
//! ```
//!
//! The client callback runs on the ESP-IDF MQTT task, so it never touches
//! domain state. It only queues messages and flips the connection flag;
//! the control loop drains the queue once per tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use crate::app::ports::{InboundMessage, MessageBus};
use crate::error::{self, CommsError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
};

/// Queued inbound messages between two control ticks.
const INBOX_DEPTH: usize = 8;

/// Inbound channel: MQTT task → control loop.
pub type Inbox = Channel<CriticalSectionRawMutex, InboundMessage, INBOX_DEPTH>;

/// Queue a message for the control loop, dropping it if the loop is
/// behind.
fn deliver(inbox: &Inbox, msg: InboundMessage) {
    let topic = msg.topic.clone();
    if inbox.try_send(msg).is_err() {
        warn!("MQTT: inbox full, dropped message on {}", topic);
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation broker
// ───────────────────────────────────────────────────────────────

/// One publish recorded by the simulated broker.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPublish {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimBroker {
    published: Vec<SimPublish>,
    subscriptions: Vec<String>,
}

// ───────────────────────────────────────────────────────────────
// MqttBus
// ───────────────────────────────────────────────────────────────

pub struct MqttBus {
    inbox: Arc<Inbox>,
    connected: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    client: EspMqttClient<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimBroker,
}

/// Connection parameters for [`MqttBus::connect`].
#[derive(Debug, Clone)]
pub struct MqttSettings<'a> {
    pub broker_host: &'a str,
    pub broker_port: u16,
    pub client_id: &'a str,
    pub buffer_size: usize,
    /// Topic that receives the retained last-will payload.
    pub will_topic: &'a str,
    pub will_payload: &'a str,
}

impl MqttSettings<'_> {
    pub fn url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }
}

impl MqttBus {
    /// Start the ESP-IDF MQTT client. Returns immediately; the session
    /// comes up asynchronously and [`is_connected`](MessageBus::is_connected)
    /// flips once the broker acknowledges.
    #[cfg(target_os = "espidf")]
    pub fn connect(settings: &MqttSettings<'_>) -> error::Result<Self> {
        let inbox = Arc::new(Inbox::new());
        let connected = Arc::new(AtomicBool::new(false));

        let conf = MqttClientConfiguration {
            client_id: Some(settings.client_id),
            buffer_size: settings.buffer_size,
            reconnect_timeout: Some(core::time::Duration::from_secs(2)),
            lwt: Some(LwtConfiguration {
                topic: settings.will_topic,
                payload: settings.will_payload.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };

        let cb_inbox = Arc::clone(&inbox);
        let cb_connected = Arc::clone(&connected);
        let url = settings.url();
        let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
            EventPayload::Connected(_) => {
                info!("MQTT: connected");
                cb_connected.store(true, Ordering::Release);
            }
            EventPayload::Disconnected => {
                warn!("MQTT: disconnected, client will retry");
                cb_connected.store(false, Ordering::Release);
            }
            EventPayload::Received {
                topic: Some(topic),
                data,
                ..
            } => deliver(&cb_inbox, InboundMessage::new(topic, data)),
            EventPayload::Error(e) => warn!("MQTT: client error {:?}", e),
            _ => {}
        })
        .map_err(|e| {
            warn!("MQTT: client start failed ({})", e);
            CommsError::MqttConnectFailed
        })?;

        info!("MQTT: client started for {} as {}", url, settings.client_id);
        Ok(Self {
            inbox,
            connected,
            client,
        })
    }

    /// In-memory broker with the same presence semantics as the real one.
    #[cfg(not(target_os = "espidf"))]
    pub fn connect(settings: &MqttSettings<'_>) -> error::Result<Self> {
        info!("MQTT(sim): {} as {}", settings.url(), settings.client_id);
        Ok(Self {
            inbox: Arc::new(Inbox::new()),
            connected: Arc::new(AtomicBool::new(true)),
            sim: SimBroker::default(),
        })
    }

    /// Simulate the session dropping or coming back.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_connected(&mut self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        if !connected {
            // A clean reconnect forgets subscriptions.
            self.sim.subscriptions.clear();
        }
    }

    /// Deliver a message from another client. Dropped unless subscribed.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_inject(&mut self, topic: &str, payload: &[u8]) {
        if self.sim.subscriptions.iter().any(|s| s == topic) {
            deliver(&self.inbox, InboundMessage::new(topic, payload));
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_published(&self) -> &[SimPublish] {
        &self.sim.published
    }
}

impl MessageBus for MqttBus {
    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        self.client
            .publish(topic, QoS::AtMostOnce, retain, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::NotConnected);
        }
        self.sim.published.push(SimPublish {
            topic: topic.into(),
            payload: payload.into(),
            retain,
        });
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        self.client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| CommsError::MqttSubscribeFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.is_connected() {
            return Err(CommsError::NotConnected);
        }
        if !self.sim.subscriptions.iter().any(|s| s == topic) {
            self.sim.subscriptions.push(topic.into());
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn try_receive(&mut self) -> Option<InboundMessage> {
        self.inbox.try_receive().ok()
    }
}
