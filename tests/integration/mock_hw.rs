//! Mock hardware for integration tests.
//!
//! Pins share their level with the test through an `Arc`, the PWM driver
//! records every call so tests can assert on the full command history, and
//! the clock and sink are deterministic.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};
use embedded_hal::pwm::ErrorKind;
use picoharp::app::ports::{AnalogInput, MessageSink, PwmDriver, SyncClock};
use picoharp::events::{DeviceTime, EventMessage};

// ── Pins ──────────────────────────────────────────────────────

/// A pin whose level the test controls (inputs) or observes (outputs).
#[derive(Clone, Default)]
pub struct MockPin {
    level: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockPin {
    pub fn new(level: bool) -> Self {
        Self {
            level: Arc::new(AtomicBool::new(level)),
        }
    }

    pub fn set(&self, level: bool) {
        self.level.store(level, Ordering::SeqCst);
    }

    pub fn level(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

/// `n` pins, all low, plus clones the test keeps.
#[allow(dead_code)]
pub fn pins(n: usize) -> (Vec<MockPin>, Vec<MockPin>) {
    let pins: Vec<MockPin> = (0..n).map(|_| MockPin::new(false)).collect();
    (pins.clone(), pins)
}

impl ErrorType for MockPin {
    type Error = Infallible;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

impl StatefulOutputPin for MockPin {
    fn is_set_high(&mut self) -> Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_set_low(&mut self) -> Result<bool, Infallible> {
        Ok(!self.level())
    }
}

// ── PWM ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PwmCall {
    Activate { frequency_hz: u32, duty: u16 },
    Deactivate,
}

/// Records every generator call. Clones share the same history.
#[derive(Clone, Default)]
pub struct MockPwm {
    pub calls: Arc<Mutex<Vec<PwmCall>>>,
}

#[allow(dead_code)]
impl MockPwm {
    pub fn history(&self) -> Vec<PwmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn deactivations(&self) -> usize {
        self.history()
            .iter()
            .filter(|c| **c == PwmCall::Deactivate)
            .count()
    }
}

impl PwmDriver for MockPwm {
    type Error = ErrorKind;

    fn activate(&mut self, frequency_hz: u32, duty: u16) -> Result<(), ErrorKind> {
        self.calls
            .lock()
            .unwrap()
            .push(PwmCall::Activate { frequency_hz, duty });
        Ok(())
    }

    fn deactivate(&mut self) -> Result<(), ErrorKind> {
        self.calls.lock().unwrap().push(PwmCall::Deactivate);
        Ok(())
    }
}

// ── ADC ───────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockAdc {
    pub value: Arc<AtomicU16>,
}

impl AnalogInput for MockAdc {
    type Error = Infallible;

    fn read_u16(&mut self) -> Result<u16, Infallible> {
        Ok(self.value.load(Ordering::SeqCst))
    }
}

// ── Clock ─────────────────────────────────────────────────────

/// Clock the test advances by hand.
#[derive(Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn advance_us(&self, us: u64) {
        self.now_us.fetch_add(us, Ordering::SeqCst);
    }
}

impl SyncClock for ManualClock {
    fn timestamp(&self) -> DeviceTime {
        DeviceTime(self.now_us.load(Ordering::SeqCst))
    }
}

// ── Sink ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub messages: Vec<EventMessage>,
}

impl MessageSink for RecordingSink {
    type Error = Infallible;

    fn send(&mut self, message: &EventMessage) -> Result<(), Infallible> {
        self.messages.push(*message);
        Ok(())
    }
}
