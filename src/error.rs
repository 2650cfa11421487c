//! Unified error types for the I/O layer.
//!
//! A single `IoError` enum that every port, channel and register converts
//! into, plus the construction-time `ConfigError`. All variants are `Copy`
//! so they can be reported from interrupt context without allocation.

use core::fmt;

use embedded_hal::{digital, pwm};

// ---------------------------------------------------------------------------
// Top-level I/O error
// ---------------------------------------------------------------------------

/// Every fallible operation in the I/O layer funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoError {
    /// Port or device construction was misconfigured. Fatal at bring-up.
    Config(ConfigError),
    /// A caller passed a value the operation cannot act on. Nothing was done.
    InvalidArgument(&'static str),
    /// A GPIO read or write failed.
    Gpio(digital::ErrorKind),
    /// The PWM generator could not be (de)activated.
    Pwm(pwm::ErrorKind),
    /// The ADC sample could not be taken.
    Adc,
    /// No register is bound at this address.
    UnknownRegister(u8),
    /// The register does not accept writes.
    ReadOnly(u8),
    /// Operation-mode byte does not name a known mode.
    InvalidMode(u8),
    /// The observer registry is full.
    ObserverLimit,
}

impl IoError {
    /// Adapter for `map_err` on embedded-hal digital results.
    pub fn gpio<E: digital::Error>(e: E) -> Self {
        Self::Gpio(e.kind())
    }

    /// Adapter for `map_err` on [`PwmDriver`](crate::app::ports::PwmDriver) results.
    pub fn pwm<E: pwm::Error>(e: E) -> Self {
        Self::Pwm(e.kind())
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::Gpio(kind) => write!(f, "gpio: {kind:?}"),
            Self::Pwm(kind) => write!(f, "pwm: {kind:?}"),
            Self::Adc => write!(f, "ADC read failed"),
            Self::UnknownRegister(addr) => write!(f, "no register at address {addr}"),
            Self::ReadOnly(addr) => write!(f, "register {addr} is read-only"),
            Self::InvalidMode(raw) => write!(f, "unknown operation mode {raw}"),
            Self::ObserverLimit => write!(f, "observer registry full"),
        }
    }
}

impl std::error::Error for IoError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A port was constructed with no pins.
    NoLines,
    /// A port was constructed with more pins than fit in its packed byte.
    TooManyLines { requested: usize, max: usize },
    /// More PWM channels than the register map exposes.
    TooManyPwmChannels { requested: usize, max: usize },
    /// The analog stream period must be non-zero.
    InvalidPeriod,
    /// The configuration document could not be parsed.
    Parse,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLines => write!(f, "port needs at least one pin"),
            Self::TooManyLines { requested, max } => {
                write!(f, "{requested} pins requested, port holds at most {max}")
            }
            Self::TooManyPwmChannels { requested, max } => {
                write!(f, "{requested} PWM channels requested, at most {max} supported")
            }
            Self::InvalidPeriod => write!(f, "analog period must be non-zero"),
            Self::Parse => write!(f, "malformed configuration"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for IoError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, IoError>;
