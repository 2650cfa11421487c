//! Device clock adapter.
//!
//! Provides the timestamps stamped onto event messages.
//!
//! - **`target_os = "espidf"`** wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`** uses `std::time::Instant` for
//!   host-side testing and simulation.
//!
//! The Harp sync input realigns device time by writing an offset; the
//! monotonic source itself is never adjusted.

use core::sync::atomic::{AtomicI64, Ordering};

use crate::app::ports::SyncClock;
use crate::events::DeviceTime;

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    /// Signed correction added to the monotonic reading (µs).
    offset_us: AtomicI64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            offset_us: AtomicI64::new(0),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time is a counter read; safe in ISR context.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Align device time so that "now" reads as `now`.
    pub fn sync_to(&self, now: DeviceTime) {
        let offset = now.as_micros() as i64 - self.uptime_us() as i64;
        self.offset_us.store(offset, Ordering::Release);
        log::info!("Clock: synced to {}.{:06}s", now.seconds(), now.subsec_micros());
    }
}

impl SyncClock for MonotonicClock {
    fn timestamp(&self) -> DeviceTime {
        let offset = self.offset_us.load(Ordering::Acquire);
        DeviceTime(self.uptime_us().saturating_add_signed(offset))
    }
}
