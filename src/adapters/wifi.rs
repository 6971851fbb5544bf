//! WiFi station-mode adapter.
//!
//! Brings the station interface up at boot, watches the link from the
//! control loop and reports the DHCP address whenever it changes. There
//! is no port trait here: only `main` talks to WiFi, and the control
//! service just receives the resulting IP.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi<EspWifi>`.
//! - **all other targets**: simulation with scripted failures for tests.
//!
//! ## Attempt policy
//!
//! Association is tried up to `NetworkConfig::wifi_connect_attempts`
//! times, [`ATTEMPT_PAUSE_MS`] apart. Running out of attempts is not
//! fatal; the caller continues offline and the puzzle stays playable.
//!
//! After boot, [`WifiStation::poll`] runs once per tick. While the link is
//! down it starts one non-blocking association every
//! [`RECONNECT_INTERVAL_MS`] and never waits inside a tick.

use core::fmt;
use core::net::Ipv4Addr;

use log::{debug, info, warn};

use crate::config::NetworkConfig;
use crate::error::CommsError;
use crate::scheduler::IntervalTimer;

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    nvs::EspDefaultNvsPartition,
    wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi},
};

/// Pause between association attempts.
pub const ATTEMPT_PAUSE_MS: u64 = 500;

/// Minimum gap between re-association attempts while the link is down.
pub const RECONNECT_INTERVAL_MS: u64 = 5_000;

/// Address the simulated access point hands out.
#[cfg(not(target_os = "espidf"))]
const SIM_DHCP_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 4, 2);

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

pub fn validate_ssid(ssid: &str) -> Result<(), CredentialError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CredentialError::InvalidSsid);
    }
    Ok(())
}

/// Empty means an open network.
pub fn validate_password(password: &str) -> Result<(), CredentialError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CredentialError::InvalidPassword);
    }
    Ok(())
}

/// Run `attempt` up to `max_attempts` times (at least once), pausing via
/// `pause` between failures. Returns the first address obtained.
pub fn connect_with_attempts(
    max_attempts: u8,
    mut attempt: impl FnMut(u8) -> Result<Ipv4Addr, CommsError>,
    mut pause: impl FnMut(),
) -> Result<Ipv4Addr, CommsError> {
    let max_attempts = max_attempts.max(1);
    for n in 1..=max_attempts {
        match attempt(n) {
            Ok(ip) => {
                info!("WiFi: connected on attempt {}/{}, IP {}", n, max_attempts, ip);
                return Ok(ip);
            }
            Err(e) => {
                warn!("WiFi: attempt {}/{} failed ({})", n, max_attempts, e);
                if n < max_attempts {
                    pause();
                }
            }
        }
    }
    warn!("WiFi: giving up after {} attempts, continuing offline", max_attempts);
    Err(CommsError::WifiConnectFailed)
}

// ───────────────────────────────────────────────────────────────
// Station
// ───────────────────────────────────────────────────────────────

pub struct WifiStation {
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: attempts that fail before association succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures: u8,
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
    ip: Option<Ipv4Addr>,
    retry: IntervalTimer,
}

impl WifiStation {
    /// Configure the station from `network`. Does not associate yet.
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        network: &NetworkConfig,
    ) -> anyhow::Result<Self> {
        validate_ssid(&network.wifi_ssid).map_err(anyhow::Error::msg)?;
        validate_password(&network.wifi_password).map_err(anyhow::Error::msg)?;

        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let auth_method = if network.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let client = ClientConfiguration {
            ssid: network
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow::Error::msg(CredentialError::InvalidSsid))?,
            password: network
                .wifi_password
                .as_str()
                .try_into()
                .map_err(|_| anyhow::Error::msg(CredentialError::InvalidPassword))?,
            auth_method,
            ..Default::default()
        };
        wifi.set_configuration(&Configuration::Client(client))?;
        wifi.start()?;
        info!("WiFi: station started for '{}'", network.wifi_ssid);

        Ok(Self {
            wifi,
            ip: None,
            retry: IntervalTimer::new("wifi-retry", RECONNECT_INTERVAL_MS, 0),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(network: &NetworkConfig) -> anyhow::Result<Self> {
        validate_ssid(&network.wifi_ssid).map_err(anyhow::Error::msg)?;
        validate_password(&network.wifi_password).map_err(anyhow::Error::msg)?;
        info!("WiFi(sim): station configured for '{}'", network.wifi_ssid);
        Ok(Self {
            sim_failures: 0,
            sim_link_up: false,
            ip: None,
            retry: IntervalTimer::new("wifi-retry", RECONNECT_INTERVAL_MS, 0),
        })
    }

    /// Make the next `n` simulated attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u8) {
        self.sim_failures = n;
    }

    /// Simulate the access point going away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim_link_up = false;
    }

    #[cfg(target_os = "espidf")]
    fn try_associate(&mut self) -> Result<Ipv4Addr, CommsError> {
        self.wifi.connect().map_err(|_| CommsError::WifiConnectFailed)?;
        self.wifi
            .wait_netif_up()
            .map_err(|_| CommsError::WifiConnectFailed)?;
        let info = self
            .wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .map_err(|_| CommsError::WifiConnectFailed)?;
        Ok(info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn try_associate(&mut self) -> Result<Ipv4Addr, CommsError> {
        if self.sim_failures > 0 {
            self.sim_failures -= 1;
            return Err(CommsError::WifiConnectFailed);
        }
        self.sim_link_up = true;
        Ok(SIM_DHCP_IP)
    }

    /// Kick off one association without waiting for the result.
    #[cfg(target_os = "espidf")]
    fn start_association(&mut self) {
        if let Err(e) = self.wifi.wifi_mut().connect() {
            warn!("WiFi: re-association request failed ({})", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn start_association(&mut self) {
        if let Err(e) = self.try_associate() {
            warn!("WiFi(sim): re-association failed ({})", e);
        }
    }

    /// DHCP address of a link that is up, if the lease has arrived.
    #[cfg(target_os = "espidf")]
    fn link_ip(&self) -> Option<Ipv4Addr> {
        let netif = self.wifi.wifi().sta_netif();
        if !netif.is_up().unwrap_or(false) {
            return None;
        }
        netif
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
            .filter(|ip| !ip.is_unspecified())
    }

    #[cfg(not(target_os = "espidf"))]
    fn link_ip(&self) -> Option<Ipv4Addr> {
        self.sim_link_up.then_some(SIM_DHCP_IP)
    }

    #[cfg(target_os = "espidf")]
    fn pause() {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ATTEMPT_PAUSE_MS as u32);
    }

    #[cfg(not(target_os = "espidf"))]
    fn pause() {}

    /// Associate with bounded attempts and return the DHCP address.
    pub fn connect(&mut self, max_attempts: u8) -> Result<Ipv4Addr, CommsError> {
        let ip = connect_with_attempts(max_attempts, |_| self.try_associate(), Self::pause)?;
        self.ip = Some(ip);
        Ok(ip)
    }

    /// Watch the link once per tick. Returns the new address when the
    /// station (re)gains a lease, `None` otherwise.
    pub fn poll(&mut self, now_ms: u64) -> Option<Ipv4Addr> {
        if self.is_connected() {
            if self.ip.is_some() {
                return None;
            }
            let ip = self.link_ip()?;
            info!("WiFi: link up, IP {}", ip);
            self.ip = Some(ip);
            return Some(ip);
        }

        if let Some(lost) = self.ip.take() {
            warn!(
                "WiFi: link lost (was {}), retrying every {} ms",
                lost, RECONNECT_INTERVAL_MS
            );
        }
        if self.retry.poll(now_ms) {
            debug!("WiFi: re-association attempt at {} ms", now_ms);
            self.start_association();
        }
        None
    }

    /// Current DHCP address; `None` while the link is down.
    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    #[cfg(target_os = "espidf")]
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn is_connected(&self) -> bool {
        self.sim_link_up
    }
}
