//! Cooperative timer for periodic event bindings.
//!
//! The main loop measures the time since its previous iteration and calls
//! [`EventScheduler::tick`]. Each slot advances its own elapsed time and
//! fires once per full period, so a late tick catches up instead of
//! drifting. A tick more than `MAX_CATCH_UP` periods late fires once and
//! skips the backlog.
//!
//! ```text
//!   main loop ──tick(Δt)──▶ EventScheduler
//!                               │
//!                 ┌─────────────┼─────────────┐
//!                 ▼             ▼             ▼
//!            PeriodicEvent  PeriodicEvent    ...     (≤ 4 slots)
//!                 │
//!                 ▼
//!            MessageQueue
//! ```

use embassy_time::Duration;
use log::info;

use crate::app::bindings::PeriodicEvent;

/// Maximum number of concurrent periodic bindings (stack-allocated).
pub const MAX_PERIODIC_EVENTS: usize = 4;

pub struct EventScheduler {
    slots: [Option<PeriodicEvent>; MAX_PERIODIC_EVENTS],
}

impl EventScheduler {
    pub fn new() -> Self {
        Self {
            slots: [None, None, None, None],
        }
    }

    /// Add a binding.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, event: PeriodicEvent) -> Option<usize> {
        let (i, slot) = self.slots.iter_mut().enumerate().find(|(_, s)| s.is_none())?;
        info!(
            "Scheduler: added '{}' at slot {} (every {} ms)",
            event.label(),
            i,
            event.period().as_millis()
        );
        *slot = Some(event);
        Some(i)
    }

    /// Remove a binding by slot index, returning it.
    pub fn remove(&mut self, slot: usize) -> Option<PeriodicEvent> {
        let event = self.slots.get_mut(slot)?.take()?;
        info!("Scheduler: removed '{}' from slot {}", event.label(), slot);
        Some(event)
    }

    /// Advance every binding by `delta`. Returns the number of messages emitted.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.slots
            .iter_mut()
            .flatten()
            .map(|event| event.tick(delta))
            .sum()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}
