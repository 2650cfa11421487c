//! Port drivers, PWM channel state machine, and hardware initialisation.

use std::sync::{Arc, Mutex, PoisonError};

pub mod digital_input;
pub mod digital_output;
pub mod hw_init;
pub mod pwm;

/// Maximum pins in one port (one bit per pin in a packed `u8`).
pub const MAX_PORT_WIDTH: usize = 8;

/// A driver shared between the register map and the mode hook.
///
/// Cooperative context only. ADC conversions and LEDC reconfiguration run
/// under this lock, so it must never be a critical section the edge
/// interrupt also needs. ISR-visible state lives in `digital_input`.
pub type Shared<T> = Arc<Mutex<T>>;

/// Wrap a driver for shared access.
pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Run `f` with exclusive access to a shared driver.
///
/// A poisoned lock is recovered: the driver state is plain data and the
/// panicking caller already lost its operation.
pub fn with_shared<T, R>(cell: &Shared<T>, f: impl FnOnce(&mut T) -> R) -> R {
    let mut guard = cell.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

/// True when bit `index` is selected by `mask`. `None` selects every pin.
pub(crate) fn selected(mask: Option<u8>, index: usize) -> bool {
    mask.is_none_or(|m| (m >> index) & 1 == 1)
}
