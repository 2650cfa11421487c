//! Register bindings between protocol addresses and the I/O drivers.
//!
//! | Address | Register               | Type | Write                       |
//! |---------|------------------------|------|-----------------------------|
//! | 32      | DigitalInput           | U8   | read-only                   |
//! | 33      | AnalogStreamState      | U8   | nonzero arms the stream     |
//! | 38      | DigitalOutputSet       | U8   | set masked pins             |
//! | 39      | DigitalOutputClear     | U8   | clear masked pins           |
//! | 40      | DigitalOutputToggle    | U8   | toggle masked pins          |
//! | 44      | AnalogInput            | U16  | read-only                   |
//! | 60/61   | Pwm0/1Frequency        | U16  | ignored below 10 Hz         |
//! | 64/65   | Pwm0/1DutyCycle        | U8   | ignored above 100 %         |
//! | 68/70   | Pwm0/1Start            | U8   | any write starts            |
//! | 69/71   | Pwm0/1Stop             | U8   | any write stops             |

use embedded_hal::digital::{OutputPin, StatefulOutputPin};

use super::bindings::EventGate;
use super::ports::{AnalogInput, PwmDriver};
use crate::drivers::digital_input::PortState;
use crate::drivers::digital_output::DigitalOutputPort;
use crate::drivers::pwm::PwmChannel;
use crate::drivers::{Shared, with_shared};
use crate::error::{IoError, Result};

/// Register addresses of the device map.
pub mod address {
    pub const DIGITAL_INPUT: u8 = 32;
    pub const ANALOG_STREAM_STATE: u8 = 33;
    pub const DIGITAL_OUTPUT_SET: u8 = 38;
    pub const DIGITAL_OUTPUT_CLEAR: u8 = 39;
    pub const DIGITAL_OUTPUT_TOGGLE: u8 = 40;
    pub const ANALOG_INPUT: u8 = 44;

    pub const PWM_FREQUENCY: [u8; 2] = [60, 61];
    pub const PWM_DUTY_CYCLE: [u8; 2] = [64, 65];
    pub const PWM_START: [u8; 2] = [68, 70];
    pub const PWM_STOP: [u8; 2] = [69, 71];
}

/// A typed register payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterValue {
    U8(u8),
    U16(u16),
}

impl RegisterValue {
    pub fn as_u8(self) -> Result<u8> {
        match self {
            Self::U8(v) => Ok(v),
            Self::U16(_) => Err(IoError::InvalidArgument("register expects a U8 payload")),
        }
    }

    /// U8 payloads widen.
    pub fn as_u16(self) -> Result<u16> {
        match self {
            Self::U8(v) => Ok(u16::from(v)),
            Self::U16(v) => Ok(v),
        }
    }
}

/// A protocol register. Reads may run in interrupt context.
///
/// Read-only registers reject writes with [`IoError::ReadOnly`] carrying
/// their own address.
pub trait Register: Send + Sync {
    fn read(&self) -> Result<RegisterValue>;

    fn write(&self, value: RegisterValue) -> Result<()>;
}

// ── Digital input ─────────────────────────────────────────────

pub struct DigitalInputRegister {
    address: u8,
    state: PortState,
}

impl DigitalInputRegister {
    pub fn new(address: u8, state: PortState) -> Self {
        Self { address, state }
    }
}

impl Register for DigitalInputRegister {
    fn read(&self) -> Result<RegisterValue> {
        Ok(RegisterValue::U8(self.state.get()))
    }

    fn write(&self, _value: RegisterValue) -> Result<()> {
        Err(IoError::ReadOnly(self.address))
    }
}

// ── Digital output ────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputOp {
    Set,
    Clear,
    Toggle,
}

/// One of the set/clear/toggle registers. The payload is the pin mask.
pub struct DigitalOutputRegister<P> {
    port: Shared<DigitalOutputPort<P>>,
    op: OutputOp,
}

impl<P> DigitalOutputRegister<P> {
    pub fn new(port: Shared<DigitalOutputPort<P>>, op: OutputOp) -> Self {
        Self { port, op }
    }
}

impl<P> Register for DigitalOutputRegister<P>
where
    P: OutputPin + StatefulOutputPin + Send,
{
    fn read(&self) -> Result<RegisterValue> {
        Ok(RegisterValue::U8(with_shared(&self.port, |p| p.packed_state())))
    }

    fn write(&self, value: RegisterValue) -> Result<()> {
        let mask = Some(value.as_u8()?);
        with_shared(&self.port, |p| match self.op {
            OutputOp::Set => p.set_state(mask),
            OutputOp::Clear => p.clear_state(mask),
            OutputOp::Toggle => p.toggle_state(mask),
        })
    }
}

// ── Analog ────────────────────────────────────────────────────

pub struct AnalogInputRegister<A> {
    address: u8,
    adc: Shared<A>,
}

impl<A> AnalogInputRegister<A> {
    pub fn new(address: u8, adc: Shared<A>) -> Self {
        Self { address, adc }
    }
}

impl<A: AnalogInput + Send> Register for AnalogInputRegister<A> {
    fn read(&self) -> Result<RegisterValue> {
        let raw = with_shared(&self.adc, |adc| adc.read_u16()).map_err(|_| IoError::Adc)?;
        Ok(RegisterValue::U16(raw))
    }

    fn write(&self, _value: RegisterValue) -> Result<()> {
        Err(IoError::ReadOnly(self.address))
    }
}

/// Arms (nonzero) or disarms (zero) the periodic analog event.
pub struct AnalogStreamRegister {
    gate: EventGate,
}

impl AnalogStreamRegister {
    pub fn new(gate: EventGate) -> Self {
        Self { gate }
    }
}

impl Register for AnalogStreamRegister {
    fn read(&self) -> Result<RegisterValue> {
        Ok(RegisterValue::U8(u8::from(self.gate.is_enabled())))
    }

    fn write(&self, value: RegisterValue) -> Result<()> {
        if value.as_u8()? == 0 {
            self.gate.disable();
        } else {
            self.gate.enable();
        }
        Ok(())
    }
}

// ── PWM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmField {
    Frequency,
    DutyCycle,
    Start,
    Stop,
}

pub struct PwmRegister<D> {
    channel: Shared<PwmChannel<D>>,
    field: PwmField,
}

impl<D> PwmRegister<D> {
    pub fn new(channel: Shared<PwmChannel<D>>, field: PwmField) -> Self {
        Self { channel, field }
    }
}

impl<D: PwmDriver + Send> Register for PwmRegister<D> {
    fn read(&self) -> Result<RegisterValue> {
        Ok(with_shared(&self.channel, |ch| match self.field {
            PwmField::Frequency => RegisterValue::U16(ch.frequency().min(u32::from(u16::MAX)) as u16),
            PwmField::DutyCycle => RegisterValue::U8(ch.duty_cycle()),
            PwmField::Start | PwmField::Stop => RegisterValue::U8(u8::from(ch.is_enabled())),
        }))
    }

    fn write(&self, value: RegisterValue) -> Result<()> {
        match self.field {
            PwmField::Frequency => {
                let hz = u32::from(value.as_u16()?);
                with_shared(&self.channel, |ch| ch.set_frequency(hz));
                Ok(())
            }
            PwmField::DutyCycle => {
                let percent = value.as_u8()?;
                with_shared(&self.channel, |ch| ch.set_duty_cycle(percent));
                Ok(())
            }
            PwmField::Start => with_shared(&self.channel, PwmChannel::start),
            PwmField::Stop => with_shared(&self.channel, PwmChannel::stop),
        }
    }
}
