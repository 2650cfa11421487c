//! Event bindings: turn hardware activity into outbound messages.
//!
//! A binding reads its register, stamps the value with the sync clock and
//! enqueues it. Two trigger sources:
//!
//! - **On-change**: subscribed to a digital-input port at construction, fired
//!   from the port's notification chain (interrupt context). Never
//!   unsubscribed.
//! - **Periodic**: advanced by the main-loop [`EventScheduler`](crate::scheduler::EventScheduler);
//!   its period elapses whether or not it is enabled.
//!
//! The [`EventGate`] only decides whether a trigger produces a message. A
//! suppressed trigger is counted and forgotten, never replayed.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embassy_time::Duration;
use embedded_hal::digital::InputPin;
use log::warn;

use super::ports::SyncClock;
use super::registers::Register;
use crate::drivers::digital_input::DigitalInputPort;
use crate::error::Result;
use crate::events::{EventMessage, MessageQueue};

// ── Gate ──────────────────────────────────────────────────────

/// Shared enable flag of one binding.
#[derive(Clone)]
pub struct EventGate(Arc<AtomicBool>);

impl EventGate {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn enable(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn disable(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Message enqueued.
    Emitted,
    /// Gate closed; nothing produced.
    Suppressed,
    /// Register read failed; nothing produced.
    Failed,
}

/// The read → stamp → enqueue core shared by both variants.
struct Emitter {
    address: u8,
    register: Arc<dyn Register>,
    sync: Arc<dyn SyncClock>,
    queue: Arc<MessageQueue>,
    gate: EventGate,
    suppressed: AtomicU32,
    failed: AtomicU32,
    failed_reported: AtomicU32,
}

impl Emitter {
    fn new(
        address: u8,
        register: Arc<dyn Register>,
        sync: Arc<dyn SyncClock>,
        queue: Arc<MessageQueue>,
        gate: EventGate,
    ) -> Self {
        Self {
            address,
            register,
            sync,
            queue,
            gate,
            suppressed: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            failed_reported: AtomicU32::new(0),
        }
    }

    fn fire(&self) -> FireOutcome {
        if !self.gate.is_enabled() {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return FireOutcome::Suppressed;
        }
        match self.register.read() {
            Ok(payload) => {
                self.queue.enqueue(EventMessage {
                    address: self.address,
                    timestamp: self.sync.timestamp(),
                    payload,
                });
                FireOutcome::Emitted
            }
            Err(_) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                FireOutcome::Failed
            }
        }
    }

    /// Log read failures recorded since the previous call and return how
    /// many there were. Cooperative context only.
    fn report_failures(&self, origin: &str) -> u32 {
        let failed = self.failed.load(Ordering::Relaxed);
        let reported = self.failed_reported.swap(failed, Ordering::Relaxed);
        let new = failed.wrapping_sub(reported);
        if new != 0 {
            warn!(
                "{}: register {} read failed {} times ({} total)",
                origin, self.address, new, failed
            );
        }
        new
    }
}

// ── On-change ─────────────────────────────────────────────────

/// Emits the register each time the subscribed port notifies.
#[derive(Clone)]
pub struct OnChangeEvent {
    emitter: Arc<Emitter>,
}

impl OnChangeEvent {
    /// Subscribe to `port` and start enabled or disabled per `enabled`.
    pub fn attach<P: InputPin>(
        address: u8,
        register: Arc<dyn Register>,
        port: &mut DigitalInputPort<P>,
        sync: Arc<dyn SyncClock>,
        queue: Arc<MessageQueue>,
        enabled: bool,
    ) -> Result<Self> {
        let emitter = Arc::new(Emitter::new(
            address,
            register,
            sync,
            queue,
            EventGate::new(enabled),
        ));
        let subscriber = emitter.clone();
        port.add_observer(move |_state| {
            subscriber.fire();
        })?;
        Ok(Self { emitter })
    }

    pub fn enable(&self) {
        self.emitter.gate.enable();
    }

    pub fn disable(&self) {
        self.emitter.gate.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.emitter.gate.is_enabled()
    }

    /// Notifications that arrived while disabled.
    pub fn suppressed_count(&self) -> u32 {
        self.emitter.suppressed.load(Ordering::Relaxed)
    }

    /// Notifications whose register read failed.
    pub fn failed_count(&self) -> u32 {
        self.emitter.failed.load(Ordering::Relaxed)
    }

    /// Log read failures recorded in interrupt context since the last call.
    /// Returns how many were new.
    pub fn report_failures(&self) -> u32 {
        self.emitter.report_failures("OnChangeEvent")
    }
}

// ── Periodic ──────────────────────────────────────────────────

/// Most fires one [`PeriodicEvent::tick`] runs to catch up on missed periods.
/// A longer stall fires once and skips the rest.
pub const MAX_CATCH_UP: u64 = 4;

/// Emits the register once per elapsed period while enabled.
pub struct PeriodicEvent {
    label: &'static str,
    period: Duration,
    elapsed: Duration,
    skipped: u64,
    emitter: Emitter,
}

impl PeriodicEvent {
    /// A zero period is rejected by the configuration before this point;
    /// it is treated as one tick here so `tick` always terminates.
    pub fn new(
        label: &'static str,
        address: u8,
        register: Arc<dyn Register>,
        period: Duration,
        sync: Arc<dyn SyncClock>,
        queue: Arc<MessageQueue>,
        gate: EventGate,
    ) -> Self {
        let period = if period == Duration::from_ticks(0) {
            Duration::from_ticks(1)
        } else {
            period
        };
        Self {
            label,
            period,
            elapsed: Duration::from_ticks(0),
            skipped: 0,
            emitter: Emitter::new(address, register, sync, queue, gate),
        }
    }

    /// Advance by `delta`; fire once per full period, carrying the remainder.
    /// At most [`MAX_CATCH_UP`] fires run per call. Returns how many fires
    /// emitted a message.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.elapsed += delta;
        let period = self.period.as_ticks();
        let due = self.elapsed.as_ticks() / period;
        if due == 0 {
            return 0;
        }
        self.elapsed = Duration::from_ticks(self.elapsed.as_ticks() % period);

        let fires = if due > MAX_CATCH_UP {
            self.skipped += due - 1;
            warn!(
                "PeriodicEvent: '{}' overran by {} periods, firing once",
                self.label, due
            );
            1
        } else {
            due
        };

        let emitted = (0..fires)
            .filter(|_| self.emitter.fire() == FireOutcome::Emitted)
            .count();
        self.emitter.report_failures(self.label);
        emitted
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn enable(&self) {
        self.emitter.gate.enable();
    }

    pub fn disable(&self) {
        self.emitter.gate.disable();
    }

    pub fn is_enabled(&self) -> bool {
        self.emitter.gate.is_enabled()
    }

    /// Periods that elapsed while disabled.
    pub fn suppressed_count(&self) -> u32 {
        self.emitter.suppressed.load(Ordering::Relaxed)
    }

    /// Fires whose register read failed.
    pub fn failed_count(&self) -> u32 {
        self.emitter.failed.load(Ordering::Relaxed)
    }

    /// Periods dropped because a tick arrived too late to catch up.
    pub fn skipped_count(&self) -> u64 {
        self.skipped
    }
}
