//! Interrupt-driven digital inputs aggregated into one packed port value.
//!
//! ## Notification chain
//!
//! ```text
//!   GPIO edge ──▶ EdgeDispatcher::on_edge(line)
//!                    │
//!                    ▼
//!              DigitalInputLine::on_edge()   re-reads pin, notifies (value, index)
//!                    │
//!                    ▼
//!              port bit update               state = (state & !bit) | value << index
//!                    │
//!                    ▼
//!              port observers(state)         e.g. the on-change event binding
//! ```
//!
//! Every step runs synchronously in the interrupt context that captured the
//! edge. Nothing on the chain allocates; the only locks taken are critical
//! sections. Line and port notify on every captured edge, even when the
//! value did not change. Duplicate suppression is left to observers.

use core::cell::RefCell;
use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::digital::InputPin;
use heapless::Vec;
use log::error;

use super::MAX_PORT_WIDTH;
use crate::app::ports::EdgeHandler;
use crate::config::check_port_width;
use crate::error::{IoError, Result};
use crate::observers::{ObserverList, ObserverToken};

// ── Line ──────────────────────────────────────────────────────

/// One input pin with its last captured value.
pub struct DigitalInputLine<P> {
    index: u8,
    pin: P,
    value: bool,
    observers: ObserverList<(bool, u8)>,
}

impl<P: InputPin> DigitalInputLine<P> {
    /// Wrap `pin` as bit `index` of a port. Captures the current level.
    pub fn new(index: u8, mut pin: P) -> Result<Self> {
        let value = pin.is_high().map_err(IoError::gpio)?;
        Ok(Self {
            index,
            pin,
            value,
            observers: ObserverList::new(),
        })
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    /// Last captured value. Does not touch hardware.
    pub fn read(&self) -> bool {
        self.value
    }

    /// Edge handler: re-read the pin, store it, notify `(value, index)`.
    pub fn on_edge(&mut self) -> Result<bool> {
        self.value = self.pin.is_high().map_err(IoError::gpio)?;
        self.observers.notify((self.value, self.index));
        Ok(self.value)
    }

    pub fn add_observer(
        &mut self,
        observer: impl FnMut((bool, u8)) + Send + 'static,
    ) -> Result<ObserverToken> {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, token: ObserverToken) -> bool {
        self.observers.remove(token)
    }
}

// ── Port ──────────────────────────────────────────────────────

/// State the port shares with its line subscriptions.
struct PortShared {
    state: AtomicU8,
    observers: Mutex<CriticalSectionRawMutex, RefCell<ObserverList<u8>>>,
}

impl PortShared {
    /// Single writer of the packed state.
    fn apply(&self, value: bool, index: u8) {
        let bit = 1u8 << index;
        let prev = self.state.load(Ordering::Acquire);
        let next = (prev & !bit) | (u8::from(value) << index);
        self.state.store(next, Ordering::Release);
        self.observers
            .lock(|obs| obs.borrow_mut().notify(next));
    }
}

/// Read-only view of a port's packed state, usable without the port itself.
#[derive(Clone)]
pub struct PortState(Arc<PortShared>);

impl PortState {
    pub fn get(&self) -> u8 {
        self.0.state.load(Ordering::Acquire)
    }
}

/// Up to eight [`DigitalInputLine`]s exposed as one packed `u8`.
pub struct DigitalInputPort<P> {
    lines: Vec<DigitalInputLine<P>, MAX_PORT_WIDTH>,
    shared: Arc<PortShared>,
}

impl<P: InputPin> DigitalInputPort<P> {
    /// Build a port from 1–8 pins. Pin `i` becomes bit `i`.
    ///
    /// The initial state is read from the pins, not assumed zero.
    pub fn new(pins: std::vec::Vec<P>) -> Result<Self> {
        check_port_width(pins.len())?;

        let mut lines = Vec::new();
        for (i, pin) in pins.into_iter().enumerate() {
            let line = DigitalInputLine::new(i as u8, pin)?;
            if lines.push(line).is_err() {
                return Err(IoError::InvalidArgument("port width exceeded"));
            }
        }

        let initial = lines
            .iter()
            .fold(0u8, |acc, l| acc | (u8::from(l.read()) << l.index()));
        let shared = Arc::new(PortShared {
            state: AtomicU8::new(initial),
            observers: Mutex::new(RefCell::new(ObserverList::new())),
        });

        for line in &mut lines {
            let port = shared.clone();
            line.add_observer(move |(value, index)| port.apply(value, index))?;
        }

        Ok(Self { lines, shared })
    }

    pub fn state(&self) -> u8 {
        self.shared.state.load(Ordering::Acquire)
    }

    /// Handle for reading the packed state from elsewhere (registers).
    pub fn state_handle(&self) -> PortState {
        PortState(self.shared.clone())
    }

    pub fn width(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, index: u8) -> Option<&DigitalInputLine<P>> {
        self.lines.get(index as usize)
    }

    /// Forward a captured edge on `index` through the line. Returns the new state.
    pub fn handle_edge(&mut self, index: u8) -> Result<u8> {
        let line = self
            .lines
            .get_mut(index as usize)
            .ok_or(IoError::InvalidArgument("input line out of range"))?;
        line.on_edge()?;
        Ok(self.state())
    }

    /// Register an observer of the packed state.
    ///
    /// Observers run inside the notification chain and must not register
    /// or remove observers on this port.
    pub fn add_observer(&mut self, observer: impl FnMut(u8) + Send + 'static) -> Result<ObserverToken> {
        self.shared.observers.lock(|obs| obs.borrow_mut().add(observer))
    }

    pub fn remove_observer(&mut self, token: ObserverToken) -> bool {
        self.shared.observers.lock(|obs| obs.borrow_mut().remove(token))
    }
}

// ── ISR entry point ───────────────────────────────────────────

/// Owns an input port and accepts edges from interrupt context.
pub struct EdgeDispatcher<P> {
    port: Mutex<CriticalSectionRawMutex, RefCell<DigitalInputPort<P>>>,
    faults: AtomicU32,
}

impl<P: InputPin> EdgeDispatcher<P> {
    pub fn new(port: DigitalInputPort<P>) -> Self {
        Self {
            port: Mutex::new(RefCell::new(port)),
            faults: AtomicU32::new(0),
        }
    }

    /// Run `f` with exclusive access to the port.
    pub fn with_port<R>(&self, f: impl FnOnce(&mut DigitalInputPort<P>) -> R) -> R {
        self.port.lock(|p| f(&mut p.borrow_mut()))
    }

    /// Edges that could not be processed (bad line index or pin read failure).
    pub fn fault_count(&self) -> u32 {
        self.faults.load(Ordering::Relaxed)
    }
}

impl<P: InputPin + Send> EdgeHandler for EdgeDispatcher<P> {
    fn on_edge(&self, line: u8) {
        if let Err(e) = self.with_port(|port| port.handle_edge(line)) {
            self.faults.fetch_add(1, Ordering::Relaxed);
            error!("DigitalInput: edge on line {} dropped: {}", line, e);
        }
    }
}
