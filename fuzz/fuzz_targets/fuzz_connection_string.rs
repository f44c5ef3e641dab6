//! Fuzz target: `DeviceConfig::parse`
//!
//! Provisioned connection strings come from flash and may be truncated or
//! corrupted.  Parsing and the typed accessors must reject garbage without
//! panicking.
//!
//! cargo fuzz run fuzz_connection_string

#![no_main]

use libfuzzer_sys::fuzz_target;
use vipv_node::connection::{DeviceConfig, MAX_CONNECTION_STRING_LEN};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    match DeviceConfig::parse(&text) {
        Ok(device) => {
            assert!(text.len() <= MAX_CONNECTION_STRING_LEN);
            let _ = device.security();
            let _ = device.port();
        }
        Err(_) => assert!(text.len() > MAX_CONNECTION_STRING_LEN),
    }
});
