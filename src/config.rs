//! System configuration parameters
//!
//! All tunable parameters for the RoseCompass controller. Values are fixed
//! at build/deploy time: the defaults below are the commissioned values,
//! and a JSON overlay may be embedded when the firmware is built.

use serde::{Deserialize, Serialize};

use crate::compass::{Angle, Direction, FULL_TURN};
use crate::error::ConfigError;

/// Firmware version reported in status and heartbeat messages.
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest accepted device or room name, in bytes. Keeps the heartbeat
/// line, the STATUS JSON and the MQTT client id inside their buffers.
pub const MAX_IDENTITY_LEN: usize = 64;

/// The puzzle's solution: where the compass must point, and how precisely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSpec {
    pub angle: Angle,
    /// Accepted deviation either side of `angle`, in degrees.
    pub tolerance: u16,
}

impl TargetSpec {
    pub fn direction(&self) -> Direction {
        Direction::classify(self.angle)
    }

    /// Whether `angle` lies within tolerance of the target (wrap-aware).
    pub fn contains(&self, angle: Angle) -> bool {
        angle.distance_to(self.angle) <= self.tolerance
    }
}

/// Network and broker settings used by the bring-up code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Station association attempts before continuing offline.
    pub wifi_connect_attempts: u8,
    pub broker_host: String,
    pub broker_port: u16,
    /// MQTT client buffer size (bytes); must fit the JSON status snapshot.
    pub mqtt_buffer_size: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: "AlchemyGuest".into(),
            wifi_password: String::new(),
            wifi_connect_attempts: 30,
            broker_host: "10.1.10.115".into(),
            broker_port: 1883,
            mqtt_buffer_size: 512,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Identity ---
    pub device_name: String,
    pub room_name: String,

    // --- Puzzle ---
    /// Target bearing in degrees (0-359)
    pub target_angle: u16,
    /// Accepted deviation from the target (degrees)
    pub tolerance_deg: u16,
    /// How long the compass must stay on target before solving (ms)
    pub debounce_ms: u64,

    // --- Reporting ---
    /// Minimum angle change before a new direction report (degrees)
    pub angle_change_threshold: u16,
    /// Retained heartbeat interval (ms)
    pub heartbeat_interval_ms: u64,

    // --- Timing ---
    /// Control loop period (ms)
    pub loop_period_ms: u64,

    // --- Sensor ---
    /// Full-scale ADC count (12-bit ADC = 4095)
    pub adc_max: u16,
    /// GPIO carrying the potentiometer wiper
    pub adc_gpio: u8,

    pub network: NetworkConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Identity
            device_name: "RoseCompass".into(),
            room_name: "MermaidsTale".into(),

            // Puzzle
            target_angle: 135, // SE
            tolerance_deg: 10,
            debounce_ms: 500,

            // Reporting
            angle_change_threshold: 2,
            heartbeat_interval_ms: 300_000, // 5 min

            // Timing
            loop_period_ms: 50, // 20 Hz

            // Sensor
            adc_max: 4095,
            adc_gpio: 4,

            network: NetworkConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Parse a JSON overlay on top of the defaults and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field. Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_topic_segment(&self.device_name) {
            return Err(ConfigError::ValidationFailed("device_name must be a topic segment of 1-64 bytes"));
        }
        if !is_topic_segment(&self.room_name) {
            return Err(ConfigError::ValidationFailed("room_name must be a topic segment of 1-64 bytes"));
        }
        if self.target_angle >= FULL_TURN {
            return Err(ConfigError::ValidationFailed("target_angle must be 0-359"));
        }
        if self.tolerance_deg > FULL_TURN / 2 {
            return Err(ConfigError::ValidationFailed("tolerance_deg must be <= 180"));
        }
        if self.loop_period_ms == 0 {
            return Err(ConfigError::ValidationFailed("loop_period_ms must be > 0"));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("heartbeat_interval_ms must be > 0"));
        }
        if self.adc_max == 0 {
            return Err(ConfigError::ValidationFailed("adc_max must be > 0"));
        }
        if self.network.broker_port == 0 {
            return Err(ConfigError::ValidationFailed("broker_port must be > 0"));
        }
        Ok(())
    }

    pub fn target_spec(&self) -> TargetSpec {
        TargetSpec {
            angle: Angle::from_degrees(self.target_angle),
            tolerance: self.tolerance_deg,
        }
    }

    pub fn target_direction(&self) -> Direction {
        self.target_spec().direction()
    }
}

/// MQTT wildcards and separators would corrupt the topic tree.
fn is_topic_segment(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_IDENTITY_LEN && !s.contains(['/', '+', '#'])
}
