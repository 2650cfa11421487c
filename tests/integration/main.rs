//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock pins and drivers.  All tests run on the host (x86_64) with
//! no real hardware required.

mod device_mode_tests;
mod driver_lock_tests;
mod mock_hw;
mod output_port_tests;
mod pwm_tests;
