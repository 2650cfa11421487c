//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter    | Implements                      | Connects to              |
//! |------------|---------------------------------|--------------------------|
//! | `hardware` | embedded-hal digital pins       | ESP32 GPIO               |
//! |            | PwmDriver                       | ESP32 LEDC               |
//! |            | AnalogInput                     | ESP32 ADC1 oneshot       |
//! |            | EdgeHandler routing             | GPIO ISR service         |
//! | `log_sink` | MessageSink                     | Serial log output        |
//! | `time`     | SyncClock                       | ESP32 high-res timer     |

pub mod hardware;
pub mod log_sink;
pub mod time;
