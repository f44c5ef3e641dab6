//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable, human-readable device ID in the form `VIPV-XXYYZZ`
//! (last 3 bytes of the 6-byte MAC in uppercase hex).  The full MAC is
//! also rendered as 12 hex digits for the boot log.

/// Fixed-size device ID string: "VIPV-XXYYZZ" (11 chars).
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the short device ID from the last 3 MAC bytes.
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    use core::fmt::Write;
    let mut id = DeviceIdString::new();
    let _ = write!(id, "VIPV-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// `AABBCCDDEEFF`
pub fn mac_hex(mac: &MacAddress) -> heapless::String<12> {
    use core::fmt::Write;
    let mut s = heapless::String::<12>::new();
    for b in mac {
        let _ = write!(s, "{:02X}", b);
    }
    s
}
