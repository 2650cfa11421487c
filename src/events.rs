//! Outbound event messages and the bounded queue that carries them.
//!
//! Producers are the event bindings: on-change bindings enqueue from GPIO
//! interrupt context, periodic bindings from the main loop. The single
//! consumer is the main loop, which drains into a [`MessageSink`].
//!
//! ```text
//!   ISR (input edge) ──┐
//!                      ├──▶ MessageQueue (64, drop-oldest) ──▶ drain_to(sink)
//!   tick (periodic) ───┘
//! ```

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Deque;
use log::warn;

use crate::app::ports::MessageSink;
use crate::app::registers::RegisterValue;

/// Maximum queued messages before the oldest is dropped.
pub const MESSAGE_QUEUE_DEPTH: usize = 64;

/// Device time in microseconds since the clock epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct DeviceTime(pub u64);

impl DeviceTime {
    pub const fn from_micros(us: u64) -> Self {
        Self(us)
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    pub const fn seconds(self) -> u64 {
        self.0 / 1_000_000
    }

    pub const fn subsec_micros(self) -> u32 {
        (self.0 % 1_000_000) as u32
    }
}

/// A register value reported by an event binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventMessage {
    pub address: u8,
    pub timestamp: DeviceTime,
    pub payload: RegisterValue,
}

// ── Bounded queue ─────────────────────────────────────────────

/// Fixed-capacity FIFO shared between interrupt producers and the main loop.
///
/// Each operation holds a critical section only for one deque push or pop.
/// When full, the oldest message is discarded and counted.
pub struct MessageQueue {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Deque<EventMessage, MESSAGE_QUEUE_DEPTH>>>,
    dropped: AtomicU32,
    reported: AtomicU32,
}

impl MessageQueue {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
            dropped: AtomicU32::new(0),
            reported: AtomicU32::new(0),
        }
    }

    /// Append a message. Returns `false` if an older message was dropped to make room.
    /// Safe to call from ISR context (no allocation, no logging).
    pub fn enqueue(&self, message: EventMessage) -> bool {
        let evicted = self.inner.lock(|q| {
            let mut q = q.borrow_mut();
            let evicted = q.is_full() && q.pop_front().is_some();
            // Cannot fail: at least one slot is free here.
            let _ = q.push_back(message);
            evicted
        });
        if evicted {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        !evicted
    }

    /// Pop the oldest message.
    pub fn pop(&self) -> Option<EventMessage> {
        self.inner.lock(|q| q.borrow_mut().pop_front())
    }

    /// Send every pending message to `sink` in FIFO order.
    /// Returns the number of messages taken from the queue.
    pub fn drain_to<S: MessageSink>(&self, sink: &mut S) -> usize {
        self.report_drops();
        let mut count = 0;
        while let Some(message) = self.pop() {
            if let Err(e) = sink.send(&message) {
                warn!("Events: send of register {} failed: {}", message.address, e);
            }
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock(|q| q.borrow().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total messages dropped on overflow since construction.
    pub fn dropped_count(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn report_drops(&self) {
        let dropped = self.dropped.load(Ordering::Relaxed);
        let reported = self.reported.swap(dropped, Ordering::Relaxed);
        if dropped != reported {
            warn!(
                "Events: queue overflow, {} oldest messages dropped ({} total)",
                dropped.wrapping_sub(reported),
                dropped
            );
        }
    }
}

impl Default for MessageQueue {
    fn default() -> Self {
        Self::new()
    }
}
