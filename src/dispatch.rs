//! Dispatch loop: one tick read, then every channel stepped with it.
//!
//! # Rules
//!
//! - `now` is sampled once per iteration and shared by all channels.
//! - The loop never blocks or sleeps; `idle` work must be bounded.
//! - Channels are owned here and touched by nothing else.

use crate::channel::{Channel, ChannelIo};
use crate::fault::{FaultCode, FaultState};
use crate::jiffies::{Jiffies, TickSource, TimerHardware};
use crate::logging::LogStream;
use crate::{rt_error, rt_info, rt_warn};

/// Owns the channels and the board-level bookkeeping around them.
pub struct Dispatcher<'a, P, const N: usize> {
    channels: [Channel<P>; N],
    log: &'a LogStream,
    fault: &'a FaultState,
    locked_mask: u32,
}

impl<'a, P: ChannelIo, const N: usize> Dispatcher<'a, P, N> {
    /// Take ownership of the channels.
    ///
    /// # Panics
    ///
    /// If there are more channels than bits in the fault mask.
    pub fn new(channels: [Channel<P>; N], log: &'a LogStream, fault: &'a FaultState) -> Self {
        assert!(N <= u32::BITS as usize, "at most 32 channels");

        Self {
            channels,
            log,
            fault,
            locked_mask: 0,
        }
    }

    /// Run one iteration with an already-sampled tick.
    pub fn poll(&mut self, now: Jiffies) {
        let mut locked_mask = 0u32;

        for (idx, channel) in self.channels.iter_mut().enumerate() {
            let before = channel.state();
            let errors = channel.write_errors();
            let drive = channel.step(now);
            let after = channel.state();

            if after != before {
                rt_info!(self.log, now, "ch{} {} -> {}", idx, before.as_str(), after.as_str());
            }
            if channel.write_errors() != errors {
                rt_error!(self.log, now, "ch{} output write failed ({:?})", idx, drive);
            }

            if channel.is_locked() {
                locked_mask |= 1 << idx;
            }
        }

        if locked_mask != self.locked_mask {
            self.report_change(now, locked_mask);
        }
    }

    /// Loop forever: read the clock, step the channels, then run `idle`.
    pub fn run<H: TimerHardware>(mut self, jiffies: &TickSource<H>, mut idle: impl FnMut()) -> ! {
        loop {
            let now = jiffies.now();
            self.poll(now);
            idle();
        }
    }

    /// Channels, for diagnostics.
    pub fn channels(&self) -> &[Channel<P>; N] {
        &self.channels
    }

    /// Bitmask of channels currently reporting a locked rotor.
    #[inline]
    pub fn locked_mask(&self) -> u32 {
        self.locked_mask
    }

    fn report_change(&mut self, now: Jiffies, locked_mask: u32) {
        let newly_locked = locked_mask & !self.locked_mask;
        let recovered = self.locked_mask & !locked_mask;

        for idx in 0..N {
            let bit = 1 << idx;
            if newly_locked & bit != 0 {
                rt_warn!(self.log, now, "ch{} locked rotor", idx);
            } else if recovered & bit != 0 {
                rt_info!(self.log, now, "ch{} rotor ok", idx);
            }
        }

        if locked_mask != 0 {
            self.fault.set(FaultCode::LockedRotor, locked_mask);
        } else {
            self.fault.clear();
        }
        self.locked_mask = locked_mask;
    }
}
