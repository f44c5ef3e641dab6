//! Photovoltaic irradiance front end.
//!
//! Five reference modules share one Hall-effect current sensor through a
//! bank of switches.  A read closes one switch at a time, lets the analog
//! path settle, and oversamples the ADC.  With every switch open the same
//! path gives the sensor's zero-current offset.  Between reads all switches
//! stay closed so the modules keep charging the node battery.
//!
//! ```text
//!   module current  ──▶ Hall sensor (0.7984 mV/mA) ──▶ op-amp ×4 ──▶ ADC
//!
//!   mV = |level − offset| / 4095 · 3300
//!   W  = mV / (0.7984 · 4) · K[i]
//! ```
//!
//! ## Dual-target design
//!
//! On ESP-IDF: switch GPIOs and the ADC1 oneshot channel set up by hw_init.
//! On host/test: per-switch ADC levels from static atomics.

use core::sync::atomic::AtomicU16;
#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::Ordering;

use embedded_hal::delay::DelayNs;

use crate::app::ports::IrradianceLevels;
use crate::error::SensorError;
use crate::telemetry::IRRADIANCE_CHANNELS;

#[cfg(target_os = "espidf")]
use crate::{drivers::hw_init, pins};

/// Per-module calibration, W per mA of short-circuit current.
pub const CALIBRATION: [f32; IRRADIANCE_CHANNELS] =
    [3.804_324_9, 3.814_272_4, 3.702_795, 3.797_673, 3.666_993_4];

const ADC_LEVELS: f32 = 4095.0;
const VREF_MV: f32 = 3300.0;
const HALL_SENSITIVITY: f32 = 0.7984;
const OPAMP_GAIN: f32 = 4.0;

/// Switch settling time before sampling.
const SETTLE_MS: u32 = 5;
/// ADC samples averaged per switch position.
const OVERSAMPLE: u32 = 32;

// Index 0 is the offset position, 1..=5 the modules.
static SIM_LEVELS: [AtomicU16; IRRADIANCE_CHANNELS + 1] = [const { AtomicU16::new(0) }; IRRADIANCE_CHANNELS + 1];

/// Inject the ADC level seen with `position` selected (0 = offset).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_level(position: usize, raw: u16) {
    if let Some(slot) = SIM_LEVELS.get(position) {
        slot.store(raw, Ordering::Relaxed);
    }
}

/// Convert averaged levels to module irradiance.
pub fn to_watts(levels: &IrradianceLevels) -> [f32; IRRADIANCE_CHANNELS] {
    let mut watts = [0.0; IRRADIANCE_CHANNELS];
    for ((w, level), k) in watts.iter_mut().zip(levels.modules).zip(CALIBRATION) {
        let millivolts = (level - levels.offset).abs() / ADC_LEVELS * VREF_MV;
        *w = millivolts / (HALL_SENSITIVITY * OPAMP_GAIN) * k;
    }
    watts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Switches {
    /// All open: zero-current reference.
    Offset,
    /// Only module `i` closed.
    Module(usize),
    /// All closed: energy harvesting.
    Harvest,
}

impl Switches {
    #[cfg(not(target_os = "espidf"))]
    fn sim_index(self) -> usize {
        match self {
            Self::Offset | Self::Harvest => 0,
            Self::Module(i) => i + 1,
        }
    }
}

pub struct IrradianceSensor<D> {
    delay: D,
}

impl<D: DelayNs> IrradianceSensor<D> {
    pub fn new(delay: D) -> Self {
        Self { delay }
    }

    /// Sweep the offset position and every module, then return to harvesting.
    pub fn read_levels(&mut self) -> Result<IrradianceLevels, SensorError> {
        let sweep = self.sweep();
        select(Switches::Harvest);
        sweep
    }

    fn sweep(&mut self) -> Result<IrradianceLevels, SensorError> {
        let offset = self.measure(Switches::Offset)?;
        let mut modules = [0.0; IRRADIANCE_CHANNELS];
        for (i, level) in modules.iter_mut().enumerate() {
            *level = self.measure(Switches::Module(i))?;
        }
        Ok(IrradianceLevels { offset, modules })
    }

    fn measure(&mut self, switches: Switches) -> Result<f32, SensorError> {
        select(switches);
        self.delay.delay_ms(SETTLE_MS);
        let mut sum: u32 = 0;
        for _ in 0..OVERSAMPLE {
            sum += u32::from(read_raw(switches)?);
        }
        Ok(sum as f32 / OVERSAMPLE as f32)
    }
}

#[cfg(target_os = "espidf")]
fn select(switches: Switches) {
    for (i, &pin) in pins::PV_SWITCH_GPIOS.iter().enumerate() {
        let closed = match switches {
            Switches::Offset => false,
            Switches::Module(m) => m == i,
            Switches::Harvest => true,
        };
        hw_init::gpio_write(pin, closed);
    }
}

#[cfg(not(target_os = "espidf"))]
fn select(_switches: Switches) {}

#[cfg(target_os = "espidf")]
fn read_raw(_switches: Switches) -> Result<u16, SensorError> {
    hw_init::adc1_read(hw_init::ADC1_CH_HALL).ok_or(SensorError::AdcReadFailed)
}

#[cfg(not(target_os = "espidf"))]
fn read_raw(switches: Switches) -> Result<u16, SensorError> {
    Ok(SIM_LEVELS[switches.sim_index()].load(Ordering::Relaxed))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoDelay(u32);

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}

        fn delay_ms(&mut self, ms: u32) {
            self.0 += ms;
        }
    }

    #[test]
    fn zero_current_reads_zero_watts() {
        let levels = IrradianceLevels {
            offset: 2048.0,
            modules: [2048.0; IRRADIANCE_CHANNELS],
        };
        assert_eq!(to_watts(&levels), [0.0; IRRADIANCE_CHANNELS]);
    }

    #[test]
    fn conversion_applies_calibration() {
        let levels = IrradianceLevels {
            offset: 100.0,
            modules: [4095.0 + 100.0, 100.0, 100.0, 100.0, 100.0],
        };
        let w = to_watts(&levels);
        let expected = 3300.0 / (0.7984 * 4.0) * CALIBRATION[0];
        assert!((w[0] - expected).abs() < 0.01, "{}", w[0]);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn offset_difference_is_unsigned() {
        let below = IrradianceLevels {
            offset: 1000.0,
            modules: [900.0; IRRADIANCE_CHANNELS],
        };
        let above = IrradianceLevels {
            offset: 1000.0,
            modules: [1100.0; IRRADIANCE_CHANNELS],
        };
        assert_eq!(to_watts(&below), to_watts(&above));
    }

    #[test]
    fn sweep_reads_every_position() {
        for position in 0..=IRRADIANCE_CHANNELS {
            sim_set_level(position, 1000 + position as u16 * 10);
        }
        let mut sensor = IrradianceSensor::new(NoDelay(0));
        let levels = sensor.read_levels().unwrap();
        assert_eq!(levels.offset, 1000.0);
        assert_eq!(levels.modules, [1010.0, 1020.0, 1030.0, 1040.0, 1050.0]);
        // One settle per position.
        assert_eq!(sensor.delay.0, SETTLE_MS * 6);
    }
}
