//! Hardware adapter: bridges the sensor drivers to the domain port traits.
//!
//! Owns the [`SensorHub`] (read phase) and the [`ImuFusion`] (fusion
//! phase) and exposes them through [`SensorPort`] and [`FusionPort`].  On
//! non-espidf targets the underlying drivers use cfg-gated simulation
//! stubs, and any `embedded_hal` bus can stand in for the I²C buses.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::app::ports::{EnvironmentReading, FusionPort, IrradianceLevels, SensorPort};
use crate::error::SensorError;
use crate::sensors::SensorHub;
use crate::sensors::imu::ImuFusion;
use crate::telemetry::Orientation;

/// Read-phase sensors behind [`SensorPort`].
pub struct HardwareAdapter<I2C, D> {
    hub: SensorHub<I2C, D>,
}

impl<I2C: I2c, D: DelayNs> HardwareAdapter<I2C, D> {
    pub fn new(mut hub: SensorHub<I2C, D>) -> Self {
        hub.init();
        Self { hub }
    }
}

impl<I2C: I2c, D: DelayNs> SensorPort for HardwareAdapter<I2C, D> {
    fn read_environment(&mut self) -> Result<EnvironmentReading, SensorError> {
        self.hub.environment.read()
    }

    fn read_irradiance_levels(&mut self) -> Result<IrradianceLevels, SensorError> {
        self.hub.irradiance.read_levels()
    }
}

/// Inertial unit behind [`FusionPort`].
pub struct FusionAdapter<I2C> {
    imu: ImuFusion<I2C>,
}

impl<I2C: I2c> FusionAdapter<I2C> {
    pub fn new(mut imu: ImuFusion<I2C>) -> Self {
        if let Err(e) = imu.init() {
            log::warn!("Fusion: IMU init failed: {}", e);
        }
        Self { imu }
    }
}

impl<I2C: I2c> FusionPort for FusionAdapter<I2C> {
    fn step(&mut self) -> Result<Orientation, SensorError> {
        self.imu.step()
    }
}
