//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! | Driver        | Part               | Bus                |
//! |---------------|--------------------|--------------------|
//! | `irradiance`  | Hall current + ADC | ADC1, switch GPIOs |
//! | `environment` | HTS221, LPS22HB    | I²C0               |
//! | `imu`         | LSM6DSL            | I²C1               |
//!
//! The IMU has its own bus so the fusion timer never contends with the
//! once-a-second environment read.

pub mod environment;
pub mod imu;
pub mod irradiance;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use environment::EnvironmentSensor;
use irradiance::IrradianceSensor;

/// The read-phase sensors.  The IMU is owned separately by the fusion
/// adapter.
pub struct SensorHub<I2C, D> {
    pub environment: EnvironmentSensor<I2C>,
    pub irradiance: IrradianceSensor<D>,
}

impl<I2C: I2c, D: DelayNs> SensorHub<I2C, D> {
    /// Construct a new hub.  Pass in pre-built drivers (built in main
    /// where peripheral ownership is established).
    pub fn new(environment: EnvironmentSensor<I2C>, irradiance: IrradianceSensor<D>) -> Self {
        Self {
            environment,
            irradiance,
        }
    }

    /// Bring up the I²C parts.  A failure here is retried lazily on the
    /// next read.
    pub fn init(&mut self) {
        if let Err(e) = self.environment.init() {
            log::warn!("Sensors: environment init failed: {}", e);
        }
    }
}
