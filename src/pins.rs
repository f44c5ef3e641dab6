//! GPIO / peripheral pin assignments for the VIPV sensor board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Irradiance front end
// ---------------------------------------------------------------------------

/// Module selector switches, one per PV reference cell.  A closed switch
/// routes that cell's current through the shared Hall sensor.
pub const PV_SWITCH_GPIOS: [i32; crate::telemetry::IRRADIANCE_CHANNELS] = [4, 5, 6, 7, 15];

/// Hall current sensor output.  ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const HALL_ADC_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// I²C buses
// ---------------------------------------------------------------------------

/// I2C0: HTS221 humidity/temperature + LPS22HB pressure.
pub const ENV_I2C_SDA_GPIO: i32 = 8;
pub const ENV_I2C_SCL_GPIO: i32 = 9;

/// I2C1: LSM6DSL inertial unit.
pub const IMU_I2C_SDA_GPIO: i32 = 10;
pub const IMU_I2C_SCL_GPIO: i32 = 11;

/// Both buses run at 400 kHz.
pub const I2C_FREQ_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// GPS receiver (UART1)
// ---------------------------------------------------------------------------

pub const GPS_TX_GPIO: i32 = 17;
pub const GPS_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// Status LEDs (active HIGH)
// ---------------------------------------------------------------------------

/// On while the broker session is up.
pub const LINK_LED_GPIO: i32 = 12;
/// Heartbeat after each delivered publication.
pub const ACTIVITY_LED_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// User button (active-low with external pull-up)
// ---------------------------------------------------------------------------

/// Short press toggles publishing.
pub const BUTTON_GPIO: i32 = 0;
