//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements               | Connects to                 |
//! |-------------|--------------------------|-----------------------------|
//! | `device_id` |                          | eFuse MAC                   |
//! | `gps`       | GpsPort                  | UART1 + NMEA ring           |
//! | `hardware`  | SensorPort, FusionPort   | ADC1, switch GPIOs, I²C0/1  |
//! | `log_sink`  | EventSink                | Serial log output           |
//! | `mqtt`      | MqttPort                 | ESP-IDF MQTT client         |
//! | `nvs`       | ConfigPort               | NVS / in-memory store       |
//! |             | CredentialPort           | encrypted `auth` namespace  |
//! | `power`     | PowerPort                | esp_pm, deep sleep, restart |
//! | `time`      | ClockPort                | RTC-backed system clock     |
//! | `wifi`      | NetworkPort              | ESP-IDF Wi-Fi STA           |

pub mod device_id;
pub mod gps;
pub mod hardware;
pub mod log_sink;
pub mod mqtt;
pub mod nvs;
pub mod power;
pub mod time;
pub mod wifi;
