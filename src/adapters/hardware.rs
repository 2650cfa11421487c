//! Hardware adapter: bridges real peripherals to the domain capabilities.
//!
//! [`GpioPin`] implements the embedded-hal digital traits, [`LedcPwm`]
//! implements [`PwmDriver`], and [`Adc1Channel`] implements [`AnalogInput`],
//! all on top of [`hw_init`]. [`bring_up`] builds an [`IoDevice`] from a
//! [`DeviceConfig`] and routes the GPIO interrupts to its edge dispatcher.
//! On non-espidf targets the underlying calls hit the host simulation.

use core::cell::RefCell;
use core::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use embedded_hal::pwm::ErrorKind;
use log::info;

use crate::app::device::{IoDevice, Peripherals};
use crate::app::ports::{AnalogInput, EdgeHandler, PwmDriver, SyncClock};
use crate::config::DeviceConfig;
use crate::drivers::hw_init::{self, HwInitError};
use crate::events::MessageQueue;

// ── GPIO ──────────────────────────────────────────────────────

/// A configured GPIO. Input or output depending on the constructor.
#[derive(Debug)]
pub struct GpioPin {
    gpio: i32,
}

impl GpioPin {
    pub fn input(gpio: i32) -> Result<Self, HwInitError> {
        hw_init::init_gpio_input(gpio)?;
        Ok(Self { gpio })
    }

    pub fn output(gpio: i32) -> Result<Self, HwInitError> {
        hw_init::init_gpio_output(gpio)?;
        Ok(Self { gpio })
    }
}

impl ErrorType for GpioPin {
    type Error = Infallible;
}

impl InputPin for GpioPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(hw_init::gpio_read(self.gpio))
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!hw_init::gpio_read(self.gpio))
    }
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        hw_init::gpio_write(self.gpio, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        hw_init::gpio_write(self.gpio, true);
        Ok(())
    }
}

impl StatefulOutputPin for GpioPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(hw_init::gpio_read(self.gpio))
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!hw_init::gpio_read(self.gpio))
    }
}

// ── PWM ───────────────────────────────────────────────────────

/// One LEDC channel driving one GPIO.
#[derive(Debug)]
pub struct LedcPwm {
    channel: u32,
    gpio: i32,
}

impl LedcPwm {
    pub fn new(channel: u32, gpio: i32) -> Self {
        Self { channel, gpio }
    }
}

impl PwmDriver for LedcPwm {
    type Error = ErrorKind;

    fn activate(&mut self, frequency_hz: u32, duty: u16) -> Result<(), ErrorKind> {
        hw_init::ledc_start(self.channel, self.gpio, frequency_hz, duty).map_err(|e| {
            log::error!("LEDC CH{}: {}", self.channel, e);
            ErrorKind::Other
        })
    }

    fn deactivate(&mut self) -> Result<(), ErrorKind> {
        hw_init::ledc_halt(self.channel).map_err(|e| {
            log::error!("LEDC CH{}: {}", self.channel, e);
            ErrorKind::Other
        })
    }
}

// ── ADC ───────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Adc1Channel {
    channel: u32,
}

impl Adc1Channel {
    pub fn new(channel: u32) -> Result<Self, HwInitError> {
        hw_init::init_adc(channel)?;
        Ok(Self { channel })
    }
}

impl AnalogInput for Adc1Channel {
    type Error = HwInitError;

    fn read_u16(&mut self) -> Result<u16, HwInitError> {
        hw_init::adc1_read(self.channel)
    }
}

// ── Edge routing ──────────────────────────────────────────────

struct EdgeRoute {
    handler: Arc<dyn EdgeHandler>,
    gpios: Vec<i32>,
}

/// Where the GPIO interrupt forwards edges. Replaced on each bring-up.
static EDGE_ROUTE: Mutex<CriticalSectionRawMutex, RefCell<Option<EdgeRoute>>> =
    Mutex::new(RefCell::new(None));

/// Route edges on `gpios` (line `i` = `gpios[i]`) to `handler`.
pub fn install_edge_handler(gpios: &[i32], handler: Arc<dyn EdgeHandler>) -> Result<(), HwInitError> {
    EDGE_ROUTE.lock(|route| {
        *route.borrow_mut() = Some(EdgeRoute {
            handler,
            gpios: gpios.to_vec(),
        });
    });
    hw_init::init_isr_service(gpios)
}

/// Called from the GPIO ISR with the line index of the pin that fired.
pub fn dispatch_edge(line: u8) {
    let handler = EDGE_ROUTE.lock(|route| route.borrow().as_ref().map(|r| r.handler.clone()));
    if let Some(handler) = handler {
        handler.on_edge(line);
    }
}

/// Simulate an input edge: set the pin level, then run the ISR path.
/// Returns `false` if `gpio` is not a routed input.
#[cfg(not(target_os = "espidf"))]
pub fn sim_drive_input(gpio: i32, high: bool) -> bool {
    hw_init::sim_set_gpio(gpio, high);
    let line = EDGE_ROUTE.lock(|route| {
        route
            .borrow()
            .as_ref()
            .and_then(|r| r.gpios.iter().position(|&g| g == gpio))
    });
    match line {
        Some(line) => {
            dispatch_edge(line as u8);
            true
        }
        None => false,
    }
}

// ── Bring-up ──────────────────────────────────────────────────

/// Initialise the log backend (ESP-IDF only; the host uses the test harness).
pub fn init_logging() -> anyhow::Result<()> {
    #[cfg(target_os = "espidf")]
    esp_idf_logger::init().context("logger init")?;
    Ok(())
}

/// Configure every pin named in `config` and build the device on top of it.
///
/// The device starts in Standby with both events disarmed.
pub fn bring_up(
    config: &DeviceConfig,
    sync: Arc<dyn SyncClock>,
    queue: Arc<MessageQueue>,
) -> anyhow::Result<IoDevice<GpioPin, LedcPwm>> {
    config.validate().context("invalid device config")?;

    let inputs = config
        .digital_inputs
        .iter()
        .map(|&g| GpioPin::input(g).with_context(|| format!("input GPIO{g}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let outputs = config
        .digital_outputs
        .iter()
        .map(|&g| GpioPin::output(g).with_context(|| format!("output GPIO{g}")))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let pwm = config
        .pwm_outputs
        .iter()
        .enumerate()
        .map(|(ch, &g)| LedcPwm::new(ch as u32, g))
        .collect::<Vec<_>>();
    let adc = Adc1Channel::new(config.adc_channel)
        .with_context(|| format!("ADC1 CH{}", config.adc_channel))?;

    let peripherals = Peripherals { inputs, outputs, pwm, adc };
    let (device, dispatcher) =
        IoDevice::new(config, peripherals, sync, queue).context("device construction")?;

    install_edge_handler(&config.digital_inputs, dispatcher).context("GPIO ISR install")?;
    info!("hardware: bring-up complete");
    Ok(device)
}
