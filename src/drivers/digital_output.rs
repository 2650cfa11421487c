//! Masked digital-output port.
//!
//! Writes touch only the pins selected by the mask, then every pin is read
//! back into `current_state`. Toggling complements the *cached* level, so two
//! toggles without an external change always return to the starting levels.
//! If the cache is stale (the hardware was changed behind this port) a toggle
//! acts on the stale value; this is the documented behaviour.
//!
//! Single writer at a time: callers serialise access (see [`Shared`](super::Shared)).

use embedded_hal::digital::{OutputPin, PinState, StatefulOutputPin};
use heapless::Vec;

use super::{MAX_PORT_WIDTH, selected};
use crate::config::check_port_width;
use crate::error::{IoError, Result};

pub struct DigitalOutputPort<P> {
    pins: Vec<P, MAX_PORT_WIDTH>,
    current_state: Vec<bool, MAX_PORT_WIDTH>,
}

impl<P: OutputPin + StatefulOutputPin> DigitalOutputPort<P> {
    /// Build a port from 1–8 pins and drive them all low.
    pub fn new(pins: std::vec::Vec<P>) -> Result<Self> {
        check_port_width(pins.len())?;

        let mut port = Self {
            pins: Vec::new(),
            current_state: Vec::new(),
        };
        for pin in pins {
            if port.pins.push(pin).is_err() || port.current_state.push(false).is_err() {
                return Err(IoError::InvalidArgument("port width exceeded"));
            }
        }
        port.clear_state(None)?;
        Ok(port)
    }

    /// Write `value` to the pins selected by `mask` (all if `None`), then resync.
    pub fn change_state(&mut self, value: bool, mask: Option<u8>) -> Result<()> {
        let level = PinState::from(value);
        for (i, pin) in self.pins.iter_mut().enumerate() {
            if selected(mask, i) {
                pin.set_state(level).map_err(IoError::gpio)?;
            }
        }
        self.refresh()
    }

    /// Numeric entry point for protocol writes. Only 0 and 1 are levels.
    pub fn change_state_raw(&mut self, value: u8, mask: Option<u8>) -> Result<()> {
        match value {
            0 => self.change_state(false, mask),
            1 => self.change_state(true, mask),
            _ => Err(IoError::InvalidArgument("output level must be 0 or 1")),
        }
    }

    pub fn set_state(&mut self, mask: Option<u8>) -> Result<()> {
        self.change_state(true, mask)
    }

    pub fn clear_state(&mut self, mask: Option<u8>) -> Result<()> {
        self.change_state(false, mask)
    }

    /// Write the complement of each selected pin's cached level, then resync.
    pub fn toggle_state(&mut self, mask: Option<u8>) -> Result<()> {
        for (i, (pin, cached)) in self.pins.iter_mut().zip(&self.current_state).enumerate() {
            if selected(mask, i) {
                pin.set_state(PinState::from(!*cached)).map_err(IoError::gpio)?;
            }
        }
        self.refresh()
    }

    /// Re-read every pin into the cached snapshot.
    pub fn refresh(&mut self) -> Result<()> {
        for (pin, cached) in self.pins.iter_mut().zip(self.current_state.iter_mut()) {
            *cached = pin.is_set_high().map_err(IoError::gpio)?;
        }
        Ok(())
    }

    pub fn current_state(&self) -> &[bool] {
        &self.current_state
    }

    /// Cached snapshot packed with pin `i` at bit `i`.
    pub fn packed_state(&self) -> u8 {
        self.current_state
            .iter()
            .enumerate()
            .fold(0u8, |acc, (i, &high)| acc | (u8::from(high) << i))
    }

    pub fn width(&self) -> usize {
        self.pins.len()
    }
}
