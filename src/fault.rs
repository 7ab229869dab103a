//! Aggregate alarm state for the board.
//!
//! Each channel already signals its own fault on its output line. This
//! keeps a board-wide view for logs and diagnostics: which channels are
//! currently reporting a locked rotor and how many alarm episodes have
//! happened since boot.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Why the alarm is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault (normal operation).
    None = 0,

    /// At least one fan measured below the RPM threshold.
    LockedRotor = 1,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::LockedRotor,
            _ => FaultCode::None,
        }
    }
}

/// Thread-safe fault state.
///
/// Written by the dispatch loop, readable from any context.
///
/// # Usage
///
/// ```ignore
/// static FAULT: FaultState = FaultState::new();
///
/// // In the dispatch loop, when the set of locked channels changes:
/// if mask != 0 {
///     FAULT.set(FaultCode::LockedRotor, mask);
/// } else {
///     FAULT.clear();
/// }
/// ```
pub struct FaultState {
    /// True if fault is active.
    active: AtomicBool,

    /// Fault code (reason for fault).
    code: AtomicU8,

    /// Bitmask of channels reporting a locked rotor.
    channels: AtomicU32,

    /// Total alarm episodes since boot (never cleared).
    count: AtomicU32,
}

impl FaultState {
    /// Create new fault state (no fault).
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            channels: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Set fault state.
    ///
    /// Counts a new episode only on the transition from inactive.
    #[inline]
    pub fn set(&self, code: FaultCode, channels: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.channels.store(channels, Ordering::Release);
        if !self.active.swap(true, Ordering::AcqRel) {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Check if fault is currently active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Get fault code (only meaningful if `is_active()` is true).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    /// Channels in fault, bit `i` for channel `i`.
    #[inline]
    pub fn channels(&self) -> u32 {
        self.channels.load(Ordering::Acquire)
    }

    /// Get total alarm episodes since boot.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear fault state once every channel has recovered.
    ///
    /// The episode counter is preserved for diagnostics.
    #[inline]
    pub fn clear(&self) {
        self.code.store(FaultCode::None as u8, Ordering::Release);
        self.channels.store(0, Ordering::Release);
        self.active.store(false, Ordering::Release);
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}
