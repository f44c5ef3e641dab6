//! HTS221 humidity/temperature and LPS22HB pressure sensors.
//!
//! Both parts sit on the environment I²C bus.  The HTS221 is factory
//! calibrated: two reference points per quantity are stored in its
//! register file and raw outputs are interpolated between them.

use embedded_hal::i2c::I2c;
use log::{debug, info, warn};

use crate::app::ports::EnvironmentReading;
use crate::error::SensorError;

// ── HTS221 ────────────────────────────────────────────────────

const HTS221_ADDR: u8 = 0x5F;
const HTS221_WHO_AM_I: u8 = 0x0F;
const HTS221_ID: u8 = 0xBC;
const HTS221_CTRL_REG1: u8 = 0x20;
/// Power on, block data update, 1 Hz.
const HTS221_CTRL_REG1_ON: u8 = 0x85;
const HTS221_HUMIDITY_OUT_L: u8 = 0x28;
const HTS221_CALIB_START: u8 = 0x30;
/// Register auto-increment on multi-byte reads.
const HTS221_AUTO_INC: u8 = 0x80;

// ── LPS22HB ───────────────────────────────────────────────────

const LPS22HB_ADDR: u8 = 0x5D;
const LPS22HB_WHO_AM_I: u8 = 0x0F;
const LPS22HB_ID: u8 = 0xB1;
const LPS22HB_CTRL_REG1: u8 = 0x10;
/// 1 Hz, block data update.
const LPS22HB_CTRL_REG1_ON: u8 = 0x12;
const LPS22HB_PRESS_OUT_XL: u8 = 0x28;
const LPS22HB_LSB_PER_HPA: f32 = 4096.0;

/// HTS221 two-point calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HtsCalibration {
    h0_rh: f32,
    h1_rh: f32,
    h0_out: i16,
    h1_out: i16,
    t0_degc: f32,
    t1_degc: f32,
    t0_out: i16,
    t1_out: i16,
}

impl HtsCalibration {
    /// Decode registers 0x30..=0x3F.
    pub fn from_registers(r: &[u8; 16]) -> Self {
        let le = |i: usize| i16::from_le_bytes([r[i], r[i + 1]]);
        let msb = u16::from(r[5]);
        let t0_x8 = (msb & 0x03) << 8 | u16::from(r[2]);
        let t1_x8 = (msb & 0x0C) << 6 | u16::from(r[3]);
        Self {
            h0_rh: f32::from(r[0]) / 2.0,
            h1_rh: f32::from(r[1]) / 2.0,
            h0_out: le(6),
            h1_out: le(10),
            t0_degc: f32::from(t0_x8) / 8.0,
            t1_degc: f32::from(t1_x8) / 8.0,
            t0_out: le(12),
            t1_out: le(14),
        }
    }

    pub fn humidity(&self, raw: i16) -> Result<f32, SensorError> {
        let rh = interpolate(raw, (self.h0_out, self.h0_rh), (self.h1_out, self.h1_rh))?;
        Ok(rh.clamp(0.0, 100.0))
    }

    pub fn temperature(&self, raw: i16) -> Result<f32, SensorError> {
        interpolate(raw, (self.t0_out, self.t0_degc), (self.t1_out, self.t1_degc))
    }
}

fn interpolate(raw: i16, (x0, y0): (i16, f32), (x1, y1): (i16, f32)) -> Result<f32, SensorError> {
    let span = i32::from(x1) - i32::from(x0);
    if span == 0 {
        return Err(SensorError::EnvironmentInvalid);
    }
    let t = (i32::from(raw) - i32::from(x0)) as f32 / span as f32;
    Ok(y0 + t * (y1 - y0))
}

/// LPS22HB pressure from `PRESS_OUT_XL..H`, in hPa.
pub fn pressure_hpa(raw: [u8; 3]) -> f32 {
    // Sign-extend the 24-bit two's complement sample.
    let value = i32::from_le_bytes([raw[0], raw[1], raw[2], 0]) << 8 >> 8;
    value as f32 / LPS22HB_LSB_PER_HPA
}

/// Environment sensors on a dedicated bus.
pub struct EnvironmentSensor<I2C> {
    i2c: I2C,
    calibration: Option<HtsCalibration>,
}

impl<I2C: I2c> EnvironmentSensor<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            calibration: None,
        }
    }

    /// Identify and power up both parts, then load the HTS221 calibration.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.expect_id(HTS221_ADDR, HTS221_WHO_AM_I, HTS221_ID)?;
        self.expect_id(LPS22HB_ADDR, LPS22HB_WHO_AM_I, LPS22HB_ID)?;
        self.write_reg(HTS221_ADDR, HTS221_CTRL_REG1, HTS221_CTRL_REG1_ON)?;
        self.write_reg(LPS22HB_ADDR, LPS22HB_CTRL_REG1, LPS22HB_CTRL_REG1_ON)?;

        let mut regs = [0u8; 16];
        self.read_regs(HTS221_ADDR, HTS221_CALIB_START | HTS221_AUTO_INC, &mut regs)?;
        self.calibration = Some(HtsCalibration::from_registers(&regs));
        info!("Environment: HTS221 + LPS22HB ready");
        Ok(())
    }

    pub fn read(&mut self) -> Result<EnvironmentReading, SensorError> {
        let calibration = match self.calibration {
            Some(c) => c,
            None => {
                self.init()?;
                self.calibration.ok_or(SensorError::EnvironmentInvalid)?
            }
        };

        let mut hts = [0u8; 4];
        self.read_regs(HTS221_ADDR, HTS221_HUMIDITY_OUT_L | HTS221_AUTO_INC, &mut hts)?;
        let humidity = calibration.humidity(i16::from_le_bytes([hts[0], hts[1]]))?;
        let temperature = calibration.temperature(i16::from_le_bytes([hts[2], hts[3]]))?;

        let mut press = [0u8; 3];
        self.read_regs(LPS22HB_ADDR, LPS22HB_PRESS_OUT_XL, &mut press)?;
        let pressure = pressure_hpa(press);

        debug!(
            "Environment: {:.1}°C {:.1}hPa {:.1}%RH",
            temperature, pressure, humidity
        );
        Ok(EnvironmentReading {
            temperature,
            pressure,
            humidity,
        })
    }

    fn expect_id(&mut self, addr: u8, reg: u8, id: u8) -> Result<(), SensorError> {
        let mut found = [0u8; 1];
        self.read_regs(addr, reg, &mut found)?;
        if found[0] != id {
            warn!("Environment: device 0x{:02X} id 0x{:02X} != 0x{:02X}", addr, found[0], id);
            return Err(SensorError::EnvironmentInvalid);
        }
        Ok(())
    }

    fn write_reg(&mut self, addr: u8, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(addr, &[reg, value])
            .map_err(|_| SensorError::EnvironmentInvalid)
    }

    fn read_regs(&mut self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(addr, &[reg], buf)
            .map_err(|_| SensorError::EnvironmentInvalid)
    }
}
