//! Raw peripheral access for the I/O pins.
//!
//! Configures GPIO directions and edge interrupts, LEDC timers/channels and
//! the ADC1 oneshot unit using raw ESP-IDF sys calls. On the host the same
//! functions operate on an in-memory simulation that tests drive through the
//! `sim_*` helpers.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

/// Errors from peripheral configuration and access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    AdcReadFailed(i32),
    GpioConfigFailed(i32),
    LedcConfigFailed(i32),
    IsrInstallFailed(i32),
    /// GPIO number or LEDC channel outside the supported range.
    InvalidPin(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc)    => write!(f, "ADC1 init failed (rc={})", rc),
            Self::AdcReadFailed(rc)    => write!(f, "ADC1 read failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::LedcConfigFailed(rc) => write!(f, "LEDC timer/channel config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::InvalidPin(pin)      => write!(f, "pin or channel {} out of range", pin),
        }
    }
}

impl std::error::Error for HwInitError {}

/// GPIO numbers accepted by this layer.
pub const MAX_GPIO: i32 = 48;
/// LEDC channels available for PWM (one timer each).
pub const LEDC_CHANNELS: u32 = 4;

fn check_gpio(pin: i32) -> Result<(), HwInitError> {
    if (0..=MAX_GPIO).contains(&pin) { Ok(()) } else { Err(HwInitError::InvalidPin(pin)) }
}

fn check_ledc(channel: u32) -> Result<(), HwInitError> {
    if channel < LEDC_CHANNELS { Ok(()) } else { Err(HwInitError::InvalidPin(channel as i32)) }
}

#[cfg(target_os = "espidf")]
fn esp_check(ret: esp_err_t, err: fn(i32) -> HwInitError) -> Result<(), HwInitError> {
    if ret == ESP_OK as i32 { Ok(()) } else { Err(err(ret)) }
}

// ── GPIO Inputs ───────────────────────────────────────────────

/// Configure `pin` as a pulled-down input that interrupts on both edges.
#[cfg(target_os = "espidf")]
pub fn init_gpio_input(pin: i32) -> Result<(), HwInitError> {
    check_gpio(pin)?;
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_ANYEDGE,
    };
    // SAFETY: gpio_config only touches the pin named in the bit mask.
    esp_check(unsafe { gpio_config(&cfg) }, HwInitError::GpioConfigFailed)?;
    info!("hw_init: GPIO{} input (pull-down, any edge)", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio_input(pin: i32) -> Result<(), HwInitError> {
    check_gpio(pin)?;
    log::info!("hw_init(sim): GPIO{} input", pin);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access; ISR safe.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(pin: i32) -> bool {
    sim::gpio(pin).is_some_and(|g| g.load(Ordering::Acquire))
}

// ── GPIO Outputs ──────────────────────────────────────────────

/// Configure `pin` as an output whose level can be read back, driven low.
#[cfg(target_os = "espidf")]
pub fn init_gpio_output(pin: i32) -> Result<(), HwInitError> {
    check_gpio(pin)?;
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pin,
        // INPUT_OUTPUT so gpio_get_level reports the driven level.
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    // SAFETY: as above; the pin is then driven low before first use.
    unsafe {
        esp_check(gpio_config(&cfg), HwInitError::GpioConfigFailed)?;
        gpio_set_level(pin, 0);
    }
    info!("hw_init: GPIO{} output", pin);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_gpio_output(pin: i32) -> Result<(), HwInitError> {
    check_gpio(pin)?;
    gpio_write(pin, false);
    log::info!("hw_init(sim): GPIO{} output", pin);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: writes the output latch of a configured pin. Main-loop only.
    unsafe { gpio_set_level(pin, u32::from(high)); }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    if let Some(g) = sim::gpio(pin) {
        g.store(high, Ordering::Release);
    }
}

// ── LEDC PWM ─────────────────────────────────────────────────

/// Duty resolution of every PWM timer.
pub const LEDC_DUTY_BITS: u32 = 14;

/// Scale a 16-bit duty to the timer resolution.
pub const fn ledc_duty(duty: u16) -> u32 {
    (duty as u32) >> (16 - LEDC_DUTY_BITS)
}

/// Route `gpio` to LEDC `channel` (timer = channel) and start it.
#[cfg(target_os = "espidf")]
pub fn ledc_start(channel: u32, gpio: i32, freq_hz: u32, duty: u16) -> Result<(), HwInitError> {
    check_ledc(channel)?;
    check_gpio(gpio)?;
    let timer = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: channel,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_14_BIT,
        freq_hz,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    let chan = ledc_channel_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        channel,
        timer_sel: channel,
        gpio_num: gpio,
        duty: ledc_duty(duty),
        hpoint: 0,
        ..Default::default()
    };
    // SAFETY: each channel owns its own timer; main-loop only.
    unsafe {
        esp_check(ledc_timer_config(&timer), HwInitError::LedcConfigFailed)?;
        esp_check(ledc_channel_config(&chan), HwInitError::LedcConfigFailed)?;
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_start(channel: u32, gpio: i32, freq_hz: u32, duty: u16) -> Result<(), HwInitError> {
    check_ledc(channel)?;
    check_gpio(gpio)?;
    let ch = &sim::LEDC[channel as usize];
    ch.freq_hz.store(freq_hz, Ordering::Release);
    ch.duty.store(duty, Ordering::Release);
    ch.active.store(true, Ordering::Release);
    Ok(())
}

/// Stop LEDC `channel` with its output idle low.
#[cfg(target_os = "espidf")]
pub fn ledc_halt(channel: u32) -> Result<(), HwInitError> {
    check_ledc(channel)?;
    // SAFETY: channel was configured by ledc_start(); main-loop only.
    esp_check(
        unsafe { ledc_stop(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, 0) },
        HwInitError::LedcConfigFailed,
    )
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_halt(channel: u32) -> Result<(), HwInitError> {
    check_ledc(channel)?;
    sim::LEDC[channel as usize].active.store(false, Ordering::Release);
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// Create the ADC1 unit (once) and configure `channel` for 12-bit reads.
#[cfg(target_os = "espidf")]
pub fn init_adc(channel: u32) -> Result<(), HwInitError> {
    // SAFETY: called from the single-threaded bring-up path only; the
    // handle is written once here and only read afterwards.
    unsafe {
        if ADC1_HANDLE.is_null() {
            let init_cfg = adc_oneshot_unit_init_cfg_t {
                unit_id: adc_unit_t_ADC_UNIT_1,
                ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..Default::default()
            };
            esp_check(
                adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE),
                HwInitError::AdcInitFailed,
            )?;
        }
        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        esp_check(
            adc_oneshot_config_channel(ADC1_HANDLE, channel, &chan_cfg),
            HwInitError::AdcInitFailed,
        )?;
    }
    info!("hw_init: ADC1 CH{} configured", channel);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_adc(channel: u32) -> Result<(), HwInitError> {
    sim::adc(channel).ok_or(HwInitError::InvalidPin(channel as i32))?;
    log::info!("hw_init(sim): ADC1 CH{} configured", channel);
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, HwInitError> {
    let mut raw: i32 = 0;
    // SAFETY: ADC1_HANDLE was written by init_adc() before any read.
    let ret = unsafe { adc_oneshot_read(ADC1_HANDLE, channel, &mut raw) };
    esp_check(ret, HwInitError::AdcReadFailed)?;
    Ok(raw.max(0) as u16)
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> Result<u16, HwInitError> {
    sim::adc(channel)
        .map(|a| a.load(Ordering::Acquire))
        .ok_or(HwInitError::AdcReadFailed(-1))
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn input_edge_isr(arg: *mut core::ffi::c_void) {
    // The handler argument carries the port line index, not a pointer.
    crate::adapters::hardware::dispatch_edge(arg as usize as u8);
}

/// Install the GPIO ISR service and route each input pin's edges to
/// `dispatch_edge(line)`, where `line` is the pin's position in `pins`.
#[cfg(target_os = "espidf")]
pub fn init_isr_service(pins: &[i32]) -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed. The registered handler only runs the
    // allocation-free edge chain.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        for (line, &pin) in pins.iter().enumerate() {
            gpio_set_intr_type(pin, gpio_int_type_t_GPIO_INTR_ANYEDGE);
            esp_check(
                gpio_isr_handler_add(pin, Some(input_edge_isr), line as *mut core::ffi::c_void),
                HwInitError::IsrInstallFailed,
            )?;
            gpio_intr_enable(pin);
        }
    }
    info!("hw_init: ISR service installed ({} input lines)", pins.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service(pins: &[i32]) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): ISR routing for {} input lines", pins.len());
    Ok(())
}

// ── Host simulation ───────────────────────────────────────────

/// Per-channel LEDC state as seen by the simulation.
#[cfg(not(target_os = "espidf"))]
pub struct SimLedc {
    pub active: AtomicBool,
    pub freq_hz: AtomicU32,
    pub duty: AtomicU16,
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use super::*;

    static GPIO: [AtomicBool; (MAX_GPIO + 1) as usize] =
        [const { AtomicBool::new(false) }; (MAX_GPIO + 1) as usize];

    pub(super) static LEDC: [SimLedc; LEDC_CHANNELS as usize] = [const {
        SimLedc {
            active: AtomicBool::new(false),
            freq_hz: AtomicU32::new(0),
            duty: AtomicU16::new(0),
        }
    }; LEDC_CHANNELS as usize];

    static ADC: [AtomicU16; 10] = [const { AtomicU16::new(0) }; 10];

    pub(super) fn gpio(pin: i32) -> Option<&'static AtomicBool> {
        usize::try_from(pin).ok().and_then(|i| GPIO.get(i))
    }

    pub(super) fn adc(channel: u32) -> Option<&'static AtomicU16> {
        ADC.get(channel as usize)
    }
}

/// Force the simulated level of a GPIO (inputs: what the pin "sees").
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_gpio(pin: i32, high: bool) {
    gpio_write(pin, high);
}

/// Simulated LEDC channel: `Some((freq_hz, duty_u16))` while running.
#[cfg(not(target_os = "espidf"))]
pub fn sim_ledc(channel: u32) -> Option<(u32, u16)> {
    let ch = sim::LEDC.get(channel as usize)?;
    ch.active
        .load(Ordering::Acquire)
        .then(|| (ch.freq_hz.load(Ordering::Acquire), ch.duty.load(Ordering::Acquire)))
}

/// Set the next value returned by a simulated ADC1 channel.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(channel: u32, value: u16) {
    if let Some(a) = sim::adc(channel) {
        a.store(value, Ordering::Release);
    }
}
