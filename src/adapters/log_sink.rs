//! Log-based message sink adapter.
//!
//! Implements [`MessageSink`] by writing every event message to the logger
//! (UART / USB-CDC in production). A transport adapter that frames Harp
//! messages implements the same trait.

use core::convert::Infallible;

use log::info;

use crate::app::ports::MessageSink;
use crate::app::registers::RegisterValue;
use crate::events::EventMessage;

/// Adapter that logs every [`EventMessage`] to the serial console.
#[derive(Default)]
pub struct LogMessageSink {
    sent: u32,
}

impl LogMessageSink {
    pub fn new() -> Self {
        Self { sent: 0 }
    }

    /// Messages logged so far.
    pub fn sent(&self) -> u32 {
        self.sent
    }
}

impl MessageSink for LogMessageSink {
    type Error = Infallible;

    fn send(&mut self, message: &EventMessage) -> Result<(), Infallible> {
        let t = message.timestamp;
        match message.payload {
            RegisterValue::U8(v) => info!(
                "EVENT | reg={} | t={}.{:06}s | U8=0x{:02x} (0b{:08b})",
                message.address,
                t.seconds(),
                t.subsec_micros(),
                v,
                v
            ),
            RegisterValue::U16(v) => info!(
                "EVENT | reg={} | t={}.{:06}s | U16={}",
                message.address,
                t.seconds(),
                t.subsec_micros(),
                v
            ),
        }
        self.sent += 1;
        Ok(())
    }
}
