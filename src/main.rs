//! RoseCompass Firmware — Main Entry Point
//!
//! Hexagonal architecture with a fixed-period control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  PotentiometerAdapter   MqttBus        LogEventSink            │
//! │  (RawSensor)            (MessageBus)   (EventSink)             │
//! │  WifiStation            Esp32Time      device_id               │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ControlService (pure logic)                 │    │
//! │  │  AngleReader · PuzzleMachine · ProtocolHandler         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;

use rosecompass::adapters::device_id;
use rosecompass::adapters::hardware::PotentiometerAdapter;
use rosecompass::adapters::log_sink::LogEventSink;
use rosecompass::adapters::mqtt::{MqttBus, MqttSettings};
use rosecompass::adapters::time::Esp32TimeAdapter;
use rosecompass::adapters::wifi::WifiStation;
use rosecompass::app::protocol::{LoopAction, OFFLINE};
use rosecompass::app::service::ControlService;
use rosecompass::config::{FIRMWARE_VERSION, SystemConfig};

/// JSON overlay baked in at build time (`ROSECOMPASS_CONFIG=... cargo build`).
const CONFIG_OVERLAY: Option<&str> = option_env!("ROSECOMPASS_CONFIG");

/// Time for the RESET log line to leave the MQTT buffer before rebooting.
const RESTART_FLUSH_MS: u32 = 100;

fn load_config() -> SystemConfig {
    match CONFIG_OVERLAY {
        Some(json) => match SystemConfig::from_json(json) {
            Ok(cfg) => {
                info!("Config: build-time overlay applied");
                cfg
            }
            Err(e) => {
                warn!("Config: overlay rejected ({}), using defaults", e);
                SystemConfig::default()
            }
        },
        None => SystemConfig::default(),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  RoseCompass v{}                    ║", FIRMWARE_VERSION);
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = load_config();
    info!(
        "{} / {}: target {} ({} deg) +/-{} deg, debounce {} ms",
        config.room_name,
        config.device_name,
        config.target_direction(),
        config.target_angle,
        config.tolerance_deg,
        config.debounce_ms
    );

    // ── 3. Peripherals ────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take().ok();

    let mut pot = PotentiometerAdapter::new(config.adc_gpio)?;
    info!("Potentiometer on GPIO{} (ADC1 CH{})", pot.gpio(), pot.channel());

    let time = Esp32TimeAdapter::new();
    let mut log_sink = LogEventSink::new();

    // ── 4. Control service ────────────────────────────────────
    let mut service = ControlService::new(&config);
    service.start(&mut log_sink);

    // ── 5. WiFi (bounded; offline is acceptable) ──────────────
    // Kept alive for the whole run; dropping it stops the driver.
    let mut wifi = match WifiStation::new(peripherals.modem, sysloop, nvs, &config.network) {
        Ok(mut wifi) => {
            if let Err(e) = wifi.connect(config.network.wifi_connect_attempts) {
                warn!("WiFi unavailable ({}), running offline", e);
            }
            Some(wifi)
        }
        Err(e) => {
            warn!("WiFi setup failed ({}), running offline", e);
            None
        }
    };
    if let Some(ip) = wifi.as_ref().and_then(WifiStation::ip) {
        service.set_ip_address(ip);
    }

    // ── 6. MQTT ───────────────────────────────────────────────
    let mac = device_id::read_mac();
    let client_id = device_id::client_id(&config.device_name, &mac);
    let topics = service.protocol().topics().clone();
    let mut bus = MqttBus::connect(&MqttSettings {
        broker_host: &config.network.broker_host,
        broker_port: config.network.broker_port,
        client_id: &client_id,
        buffer_size: config.network.mqtt_buffer_size,
        will_topic: &topics.status,
        will_payload: OFFLINE,
    })?;

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    let period_ms = config.loop_period_ms.min(u64::from(u32::MAX)) as u32;
    loop {
        let now_ms = time.uptime_ms();
        if let Some(ip) = wifi.as_mut().and_then(|w| w.poll(now_ms)) {
            service.set_ip_address(ip);
        }
        match service.tick(now_ms, &mut pot, &mut bus, &mut log_sink) {
            LoopAction::Continue => {}
            LoopAction::ShutdownRequested => {
                info!("Restarting...");
                FreeRtos::delay_ms(RESTART_FLUSH_MS);
                // SAFETY: plain IDF call; never returns.
                unsafe { esp_idf_svc::sys::esp_restart() };
            }
        }
        FreeRtos::delay_ms(period_ms);
    }
}
