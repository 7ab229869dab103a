//! # fan-locked-rotor
//!
//! Converts PC-style fan tachometer signals into industrial "locked rotor"
//! alarm outputs, one independent channel per fan.
//!
//! ## Architecture
//!
//! Two execution contexts share exactly one piece of state:
//! - The timer overflow interrupt advances the [`OverflowAccumulator`]
//! - The dispatch loop reads [`TickSource::now`] once per iteration and
//!   steps every [`Channel`] with that tick
//!
//! Channel logic ([`LockedRotorFsm`]) is pure and runs on the host; the
//! ESP32 pins and timer live behind [`ChannelIo`] and [`TimerHardware`].

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod jiffies;
pub mod rotor;
pub mod channel;
pub mod dispatch;
pub mod logging;
pub mod fault;
pub mod uart_logger;

#[cfg(target_os = "espidf")]
pub mod hal;

pub use config::{LockedRotorConfig, CONFIG, NUM_CHANNELS};
pub use jiffies::{Jiffies, OverflowAccumulator, TickSource, TimerHardware};
pub use rotor::{LockedRotorFsm, OutputDrive, RotorState};
pub use channel::{Channel, ChannelIo};
pub use dispatch::Dispatcher;
pub use fault::{FaultCode, FaultState};
pub use logging::{LogLevel, LogStream};
