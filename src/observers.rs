//! Ordered observer registry with token-based removal.
//!
//! Observers are boxed once at registration; notification walks the list in
//! registration order without allocating, so it is safe on the interrupt path.
//! Removing one observer never shifts the identity of the others.

use heapless::Vec;

use crate::error::{IoError, Result};

/// Maximum observers per registry (stack-allocated slots).
pub const MAX_OBSERVERS: usize = 8;

/// Opaque handle returned by `add`, used to remove that observer later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverToken(u32);

/// A boxed callback receiving one notification argument.
pub type Observer<A> = Box<dyn FnMut(A) + Send>;

pub struct ObserverList<A> {
    next_id: u32,
    entries: Vec<(ObserverToken, Observer<A>), MAX_OBSERVERS>,
}

impl<A: Copy> ObserverList<A> {
    pub const fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    /// Register an observer at the end of the list.
    pub fn add(&mut self, observer: impl FnMut(A) + Send + 'static) -> Result<ObserverToken> {
        let token = ObserverToken(self.next_id);
        self.entries
            .push((token, Box::new(observer)))
            .map_err(|_| IoError::ObserverLimit)?;
        self.next_id = self.next_id.wrapping_add(1);
        Ok(token)
    }

    /// Remove the observer registered under `token`. Returns `false` if unknown.
    pub fn remove(&mut self, token: ObserverToken) -> bool {
        match self.entries.iter().position(|(t, _)| *t == token) {
            Some(pos) => {
                drop(self.entries.remove(pos));
                true
            }
            None => false,
        }
    }

    /// Invoke every observer with `arg`, in registration order.
    pub fn notify(&mut self, arg: A) {
        for (_, observer) in &mut self.entries {
            observer(arg);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: Copy> Default for ObserverList<A> {
    fn default() -> Self {
        Self::new()
    }
}
