//! Device identity derived from the ESP32 factory MAC address.
//!
//! The MQTT client id must be unique per board on the broker, otherwise
//! two controllers flashed with the same config would keep kicking each
//! other off. We append the low MAC bytes to the configured device name:
//! `RoseCompass_EFCAFE`.

use core::fmt::Write;

/// Client id string: device name (≤ 32) + `_` + 6 hex digits.
pub type ClientIdString = heapless::String<48>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte buffer as the IDF call requires.
    let rc = unsafe { esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr()) };
    if rc != esp_idf_svc::sys::ESP_OK as i32 {
        log::warn!("device_id: eFuse MAC read failed (rc={}), using zeros", rc);
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// `{device}_{XXYYZZ}` from the last 3 MAC bytes. Over-long device names
/// are cut so the suffix always fits.
pub fn client_id(device: &str, mac: &MacAddress) -> ClientIdString {
    const SUFFIX_LEN: usize = 7;
    let mut id = ClientIdString::new();
    for c in device.chars() {
        if id.len() + c.len_utf8() > id.capacity() - SUFFIX_LEN {
            break;
        }
        let _ = id.push(c);
    }
    let _ = write!(id, "_{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}
