//! Device configuration parameters
//!
//! Pin assignment and startup values for the I/O layer. Loaded from a JSON
//! document at bring-up; every field falls back to the reference board.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::drivers::MAX_PORT_WIDTH;
use crate::error::ConfigError;

/// Number of PWM channels the register map exposes.
pub const MAX_PWM_CHANNELS: usize = 2;

/// I/O layer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    // --- Digital ports ---
    /// GPIO numbers of the digital-input lines, bit 0 first
    pub digital_inputs: Vec<i32>,
    /// GPIO numbers of the digital-output pins, bit 0 first
    pub digital_outputs: Vec<i32>,

    // --- PWM ---
    /// GPIO numbers driven by PWM channel 0 and 1
    pub pwm_outputs: Vec<i32>,
    /// Frequency applied to every channel at bring-up (Hz)
    pub pwm_frequency_hz: u32,
    /// Duty cycle applied to every channel at bring-up (0-100%)
    pub pwm_duty_percent: u8,

    // --- Analog ---
    /// ADC1 channel sampled by the analog register
    pub adc_channel: u32,
    /// Analog stream period (milliseconds)
    pub analog_period_ms: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            digital_inputs: vec![6, 7, 8, 9],
            digital_outputs: vec![10, 11, 12, 13],

            pwm_outputs: vec![14, 15],
            pwm_frequency_hz: 10,
            pwm_duty_percent: 0,

            adc_channel: 0,
            analog_period_ms: 10,
        }
    }
}

impl DeviceConfig {
    /// Parse a JSON document and validate it. Missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|e| {
            warn!("config: parse failed: {e}");
            ConfigError::Parse
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check the port widths and timing against what the hardware layer supports.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_port_width(self.digital_inputs.len())?;
        check_port_width(self.digital_outputs.len())?;
        if self.pwm_outputs.len() > MAX_PWM_CHANNELS {
            return Err(ConfigError::TooManyPwmChannels {
                requested: self.pwm_outputs.len(),
                max: MAX_PWM_CHANNELS,
            });
        }
        if self.analog_period_ms == 0 {
            return Err(ConfigError::InvalidPeriod);
        }
        Ok(())
    }
}

/// Ports hold between one and [`MAX_PORT_WIDTH`] pins.
pub fn check_port_width(len: usize) -> Result<(), ConfigError> {
    match len {
        0 => Err(ConfigError::NoLines),
        n if n > MAX_PORT_WIDTH => Err(ConfigError::TooManyLines {
            requested: n,
            max: MAX_PORT_WIDTH,
        }),
        _ => Ok(()),
    }
}
