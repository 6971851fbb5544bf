//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements  | Connects to                  |
//! |-------------|-------------|------------------------------|
//! | `hardware`  | RawSensor   | ESP32 ADC1 (potentiometer)   |
//! | `mqtt`      | MessageBus  | Watchtower MQTT broker       |
//! | `log_sink`  | EventSink   | Serial log output            |
//! | `time`      | —           | ESP32 system timer           |
//! | `wifi`      | —           | ESP-IDF WiFi STA             |
//! | `device_id` | —           | eFuse MAC → MQTT client id   |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod time;
pub mod wifi;
