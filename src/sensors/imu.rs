//! LSM6DSL inertial sensor and orientation filter.
//!
//! The fusion timer calls [`ImuFusion::step`] at `fusion_rate_hz`.  Each
//! step reads one gyro + accelerometer sample and advances a
//! complementary filter:
//!
//! ```text
//!  roll  = α (roll  + gx·dt) + (1 − α) atan2(ay, az)
//!  pitch = α (pitch + gy·dt) + (1 − α) atan2(−ax, √(ay² + az²))
//!  yaw   = wrap(yaw + gz·dt)
//! ```
//!
//! There is no magnetometer on the IMU bus, so yaw is integrated gyro
//! rate and drifts slowly.

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::error::SensorError;
use crate::telemetry::Orientation;

const LSM6DSL_ADDR: u8 = 0x6A;
const WHO_AM_I: u8 = 0x0F;
const LSM6DSL_ID: u8 = 0x6A;
const CTRL1_XL: u8 = 0x10;
const CTRL2_G: u8 = 0x11;
const CTRL3_C: u8 = 0x12;
/// 104 Hz, ±2 g.
const CTRL1_XL_ON: u8 = 0x40;
/// 104 Hz, 250 dps.
const CTRL2_G_ON: u8 = 0x40;
/// Block data update, register auto-increment.
const CTRL3_C_BDU_INC: u8 = 0x44;
/// Gyro X low byte; accel follows at 0x28.
const OUTX_L_G: u8 = 0x22;

const ACCEL_G_PER_LSB: f32 = 0.061e-3;
const GYRO_DPS_PER_LSB: f32 = 8.75e-3;

/// Weight of the integrated gyro estimate.
pub const DEFAULT_ALPHA: f32 = 0.98;

/// One inertial sample in g and °/s.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuSample {
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
}

impl ImuSample {
    /// Decode `OUTX_L_G..OUTZ_H_XL`.
    pub fn from_registers(r: &[u8; 12]) -> Self {
        let axis = |i: usize| f32::from(i16::from_le_bytes([r[i], r[i + 1]]));
        Self {
            gyro: [axis(0) * GYRO_DPS_PER_LSB, axis(2) * GYRO_DPS_PER_LSB, axis(4) * GYRO_DPS_PER_LSB],
            accel: [axis(6) * ACCEL_G_PER_LSB, axis(8) * ACCEL_G_PER_LSB, axis(10) * ACCEL_G_PER_LSB],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ComplementaryFilter {
    alpha: f32,
    dt: f32,
    estimate: Orientation,
    primed: bool,
}

impl ComplementaryFilter {
    pub fn new(rate_hz: u32, alpha: f32) -> Self {
        Self {
            alpha,
            dt: 1.0 / rate_hz.max(1) as f32,
            estimate: Orientation::default(),
            primed: false,
        }
    }

    pub fn estimate(&self) -> Orientation {
        self.estimate
    }

    pub fn update(&mut self, s: &ImuSample) -> Orientation {
        let [ax, ay, az] = s.accel;
        let [gx, gy, gz] = s.gyro;
        let roll_acc = ay.atan2(az).to_degrees();
        let pitch_acc = (-ax).atan2((ay * ay + az * az).sqrt()).to_degrees();

        // First sample: start from the gravity vector instead of zero.
        if !self.primed {
            self.estimate.roll = roll_acc;
            self.estimate.pitch = pitch_acc;
            self.primed = true;
        }

        let e = &mut self.estimate;
        e.roll = self.alpha * (e.roll + gx * self.dt) + (1.0 - self.alpha) * roll_acc;
        e.pitch = self.alpha * (e.pitch + gy * self.dt) + (1.0 - self.alpha) * pitch_acc;
        e.yaw = wrap_degrees(e.yaw + gz * self.dt);
        *e
    }
}

/// Wrap to `[0, 360)`.
fn wrap_degrees(deg: f32) -> f32 {
    let w = deg.rem_euclid(360.0);
    if w >= 360.0 { 0.0 } else { w }
}

/// LSM6DSL on its own bus plus the filter state.
pub struct ImuFusion<I2C> {
    i2c: I2C,
    filter: ComplementaryFilter,
    ready: bool,
}

impl<I2C: I2c> ImuFusion<I2C> {
    pub fn new(i2c: I2C, rate_hz: u32) -> Self {
        Self {
            i2c,
            filter: ComplementaryFilter::new(rate_hz, DEFAULT_ALPHA),
            ready: false,
        }
    }

    pub fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.read_regs(WHO_AM_I, &mut id)?;
        if id[0] != LSM6DSL_ID {
            warn!("IMU: unexpected id 0x{:02X}", id[0]);
            return Err(SensorError::ImuUnavailable);
        }
        self.write_reg(CTRL3_C, CTRL3_C_BDU_INC)?;
        self.write_reg(CTRL1_XL, CTRL1_XL_ON)?;
        self.write_reg(CTRL2_G, CTRL2_G_ON)?;
        self.ready = true;
        info!("IMU: LSM6DSL ready");
        Ok(())
    }

    pub fn sample(&mut self) -> Result<ImuSample, SensorError> {
        if !self.ready {
            self.init()?;
        }
        let mut raw = [0u8; 12];
        self.read_regs(OUTX_L_G, &mut raw)?;
        Ok(ImuSample::from_registers(&raw))
    }

    /// Read one sample and advance the filter.
    pub fn step(&mut self) -> Result<Orientation, SensorError> {
        let sample = self.sample()?;
        Ok(self.filter.update(&sample))
    }

    fn write_reg(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(LSM6DSL_ADDR, &[reg, value])
            .map_err(|_| SensorError::ImuUnavailable)
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c.write_read(LSM6DSL_ADDR, &[reg], buf).map_err(|_| {
            self.ready = false;
            SensorError::ImuUnavailable
        })
    }
}
