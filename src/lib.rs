//! PicoHarp I/O layer.
//!
//! Digital-input aggregation, masked digital outputs, PWM channels and the
//! event bindings that turn hardware activity into Harp register messages.
//! All ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module; the host build runs against an in-memory simulation.
//! The ESP-IDF crates come from the `espidf` feature, which is off by default
//! so `cargo test` runs on the host.

#![deny(unused_must_use)]

#[cfg(all(target_os = "espidf", not(feature = "espidf")))]
compile_error!("building for ESP-IDF requires `--features espidf`");

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod observers;
pub mod scheduler;

pub use app::device::{IoDevice, OperationMode, Peripherals};
pub use config::DeviceConfig;
pub use error::{ConfigError, IoError};
