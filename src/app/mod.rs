//! Application core: register map, event bindings and the mode hook.
//!
//! Hardware is reached only through the embedded-hal pin traits and the
//! capability traits in [`ports`], so everything here runs on the host
//! against simulated pins.

pub mod bindings;
pub mod device;
pub mod ports;
pub mod registers;
