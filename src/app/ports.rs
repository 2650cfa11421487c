//! Port traits: the boundary between the I/O layer and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ IoDevice (domain)
//! ```
//!
//! Digital pins use the `embedded-hal` traits directly. The capabilities
//! below cover what embedded-hal does not: a PWM generator that is started
//! and stopped with a frequency, the analog sample, the device clock used to
//! stamp events, and the transport that receives them.

use core::fmt;

use embedded_hal::pwm;

use crate::events::{DeviceTime, EventMessage};

// ───────────────────────────────────────────────────────────────
// PWM port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// A PWM generator bound to one output pin.
pub trait PwmDriver {
    type Error: pwm::Error;

    /// Start (or retune) the generator. `duty` is in 0..=u16::MAX.
    fn activate(&mut self, frequency_hz: u32, duty: u16) -> Result<(), Self::Error>;

    /// Stop the generator and release the pin.
    fn deactivate(&mut self) -> Result<(), Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Analog port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One ADC channel, sampled on demand.
pub trait AnalogInput {
    type Error: fmt::Debug;

    fn read_u16(&mut self) -> Result<u16, Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Sync clock (driven adapter: device clock → domain)
// ───────────────────────────────────────────────────────────────

/// The device's synchronised clock. Called from interrupt context.
pub trait SyncClock: Send + Sync {
    fn timestamp(&self) -> DeviceTime;
}

// ───────────────────────────────────────────────────────────────
// Message sink (driven adapter: domain → transport)
// ───────────────────────────────────────────────────────────────

/// Receives event messages drained from the outbound queue.
pub trait MessageSink {
    type Error: fmt::Display;

    fn send(&mut self, message: &EventMessage) -> Result<(), Self::Error>;
}

// ───────────────────────────────────────────────────────────────
// Edge handler (driving adapter: GPIO interrupt → domain)
// ───────────────────────────────────────────────────────────────

/// Entry point the platform GPIO interrupt calls with the port line index.
///
/// Implementations must not block and must not allocate.
pub trait EdgeHandler: Send + Sync {
    fn on_edge(&self, line: u8);
}
