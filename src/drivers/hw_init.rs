//! One-shot board bring-up.
//!
//! Configures the Hall ADC channel, the PV switch and LED outputs and the
//! button interrupt through raw ESP-IDF sys calls.  Called once from
//! `main()` before the session starts.  On the host every entry point is
//! a no-op so the drivers above it run unchanged.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// Errors during board bring-up, carrying the ESP-IDF return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "Hall ADC setup failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "pin setup failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "button interrupt setup failed (rc={})", rc),
        }
    }
}

/// ADC1 channel wired to the Hall front end ([`crate::pins::HALL_ADC_GPIO`]).
pub const ADC1_CH_HALL: u32 = 0;

#[cfg(target_os = "espidf")]
fn esp_ok(rc: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if rc == ESP_OK as esp_err_t { Ok(()) } else { Err(err(rc)) }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: runs once from main() before any timer or ISR exists.
    unsafe {
        init_hall_adc()?;
        init_button_input()?;
        init_outputs()?;
    }
    info!("hw_init: board ready");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): nothing to configure");
    Ok(())
}

// ── Hall ADC ──────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut HALL_UNIT: adc_oneshot_unit_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe fn init_hall_adc() -> Result<(), HwInitError> {
    let unit_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: HALL_UNIT is written only here, before any reader runs.
    esp_ok(
        unsafe { adc_oneshot_new_unit(&unit_cfg, &raw mut HALL_UNIT) },
        HwInitError::AdcInitFailed,
    )?;

    // 12 dB attenuation covers the full 0..3.3 V Hall swing.
    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    esp_ok(
        unsafe { adc_oneshot_config_channel(HALL_UNIT, ADC1_CH_HALL, &chan_cfg) },
        HwInitError::AdcInitFailed,
    )?;
    info!("hw_init: Hall ADC on ADC1 CH{}", ADC1_CH_HALL);
    Ok(())
}

/// One 12-bit conversion, `None` if the driver reports an error.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: HALL_UNIT was set by init_hall_adc(); reads happen on the
    // main loop only.
    let rc = unsafe { adc_oneshot_read(HALL_UNIT, channel, &mut raw) };
    (rc == ESP_OK as esp_err_t).then(|| raw.clamp(0, 4095) as u16)
}

// ── Pins ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn configure_pin(pin: i32, mode: gpio_mode_t, pull_up: bool, intr: gpio_int_type_t) -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode,
        pull_up_en: if pull_up {
            gpio_pullup_t_GPIO_PULLUP_ENABLE
        } else {
            gpio_pullup_t_GPIO_PULLUP_DISABLE
        },
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: intr,
    };
    esp_ok(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)
}

/// Active-low button with the internal pull-up.
#[cfg(target_os = "espidf")]
unsafe fn init_button_input() -> Result<(), HwInitError> {
    unsafe {
        configure_pin(
            pins::BUTTON_GPIO,
            gpio_mode_t_GPIO_MODE_INPUT,
            true,
            gpio_int_type_t_GPIO_INTR_NEGEDGE,
        )
    }
}

/// PV switches open and LEDs dark.
#[cfg(target_os = "espidf")]
unsafe fn init_outputs() -> Result<(), HwInitError> {
    let leds = [pins::LINK_LED_GPIO, pins::ACTIVITY_LED_GPIO];
    for &pin in pins::PV_SWITCH_GPIOS.iter().chain(leds.iter()) {
        unsafe {
            configure_pin(pin, gpio_mode_t_GPIO_MODE_OUTPUT, false, gpio_int_type_t_GPIO_INTR_DISABLE)?;
            gpio_set_level(pin, 0);
        }
    }
    info!(
        "hw_init: {} switch and {} LED outputs low",
        pins::PV_SWITCH_GPIOS.len(),
        leds.len()
    );
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: `pin` was configured as an output by init_outputs().
    unsafe {
        gpio_set_level(pin, u32::from(high));
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Button interrupt ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(_arg: *mut core::ffi::c_void) {
    // SAFETY: esp_timer_get_time reads a free-running counter; ISR safe.
    let now_ms = (unsafe { esp_timer_get_time() } / 1_000) as u32;
    crate::drivers::button::button_isr_handler(now_ms);
}

/// Register the button handler with the per-pin ISR service.  Call after
/// [`init_peripherals`].
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: the handler touches only atomics and the lock-free event
    // queue.  ESP_ERR_INVALID_STATE means the service is already up.
    unsafe {
        let rc = gpio_install_isr_service(0);
        if rc != ESP_ERR_INVALID_STATE as esp_err_t {
            esp_ok(rc, HwInitError::IsrInstallFailed)?;
        }
        esp_ok(
            gpio_isr_handler_add(pins::BUTTON_GPIO, Some(button_gpio_isr), core::ptr::null_mut()),
            HwInitError::IsrInstallFailed,
        )?;
        esp_ok(gpio_intr_enable(pins::BUTTON_GPIO), HwInitError::IsrInstallFailed)?;
    }
    info!("hw_init: button interrupt on GPIO{}", pins::BUTTON_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): no button interrupt");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_bring_up_is_a_no_op() {
        assert_eq!(init_peripherals(), Ok(()));
        assert_eq!(init_isr_service(), Ok(()));
    }

    #[test]
    fn errors_name_the_failing_step() {
        assert_eq!(
            HwInitError::IsrInstallFailed(-1).to_string(),
            "button interrupt setup failed (rc=-1)"
        );
    }
}
