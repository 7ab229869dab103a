//! Hardware Abstraction Layer for the ESP32 board.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

pub mod gpio;
pub mod timer;

pub use gpio::OpenDrainChannel;
pub use timer::GroupTimer;
