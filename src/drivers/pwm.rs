//! PWM output channel.
//!
//! ## State machine
//!
//! ```text
//!   Stopped ──start()──▶ Running ──stop()──▶ Stopped
//!                         │  ▲
//!                         └──┘ start() re-applies settings
//! ```
//!
//! Frequency and duty-cycle setters silently ignore out-of-range values and
//! keep the previous setting. New settings take effect on the next `start()`.
//! `stop()` on a stopped channel does nothing.

use log::info;

use crate::app::ports::PwmDriver;
use crate::error::{IoError, Result};

/// Lowest accepted PWM frequency (Hz).
pub const MIN_FREQUENCY_HZ: u32 = 10;
/// Highest accepted duty cycle (%).
pub const MAX_DUTY_PERCENT: u8 = 100;

/// Convert a 0–100 % duty cycle to the generator's 16-bit range, rounding to nearest.
pub const fn duty_to_u16(percent: u8) -> u16 {
    ((percent as u32 * u16::MAX as u32 + 50) / 100) as u16
}

pub struct PwmChannel<D> {
    driver: D,
    frequency_hz: u32,
    duty_percent: u8,
    enabled: bool,
}

impl<D: PwmDriver> PwmChannel<D> {
    /// A stopped channel at the minimum frequency and 0 % duty.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            frequency_hz: MIN_FREQUENCY_HZ,
            duty_percent: 0,
            enabled: false,
        }
    }

    pub fn frequency(&self) -> u32 {
        self.frequency_hz
    }

    /// Returns whether the value was accepted. Below 10 Hz is ignored.
    pub fn set_frequency(&mut self, hz: u32) -> bool {
        let accepted = hz >= MIN_FREQUENCY_HZ;
        if accepted {
            self.frequency_hz = hz;
        }
        accepted
    }

    pub fn duty_cycle(&self) -> u8 {
        self.duty_percent
    }

    /// Returns whether the value was accepted. Above 100 % is ignored.
    pub fn set_duty_cycle(&mut self, percent: u8) -> bool {
        let accepted = percent <= MAX_DUTY_PERCENT;
        if accepted {
            self.duty_percent = percent;
        }
        accepted
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Activate the generator with the current settings.
    pub fn start(&mut self) -> Result<()> {
        let duty = duty_to_u16(self.duty_percent);
        self.driver
            .activate(self.frequency_hz, duty)
            .map_err(IoError::pwm)?;
        self.enabled = true;
        info!(
            "PWM: started at {} Hz, duty {}% ({})",
            self.frequency_hz, self.duty_percent, duty
        );
        Ok(())
    }

    /// Release the generator. No-op when already stopped.
    pub fn stop(&mut self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.driver.deactivate().map_err(IoError::pwm)?;
        self.enabled = false;
        info!("PWM: stopped");
        Ok(())
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }
}
