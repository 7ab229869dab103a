//! Monotonic tick source ("jiffies").
//!
//! A free-running counter built from a small hardware timer plus a
//! software accumulator that the overflow interrupt advances by one full
//! counter range.
//!
//! ```text
//! Timer ISR                 OverflowAccumulator            Main loop
//! ─────────                 ───────────────────            ─────────
//!
//! overflow ─────────────▶   hi += RANGE   ◀──────────────  now()
//! (once per RANGE ticks)                                   irqsave, sample
//!                                                          (flag, cnt, flag),
//!                                                          irqrestore
//! ```
//!
//! # Rules
//!
//! - The accumulator is the only state shared with the interrupt.
//! - `now()` runs with interrupts masked, in bounded time, and restores
//!   the previous interrupt mask rather than unconditionally enabling.
//! - All arithmetic on [`Jiffies`] is modular; use [`elapsed`].

use core::sync::atomic::{AtomicU32, Ordering};

/// Tick count. One jiffy is [`crate::config::JIFFY_US`] microseconds.
pub type Jiffies = u32;

/// Wraparound-safe distance from `since` to `now`.
#[inline]
pub const fn elapsed(now: Jiffies, since: Jiffies) -> Jiffies {
    now.wrapping_sub(since)
}

/// Timer peripheral used as the low-order part of the tick count.
///
/// Implemented by the board layer (and by the host simulator in tests).
pub trait TimerHardware {
    /// Number of counts per hardware overflow.
    const RANGE: u32;

    /// Stop the counter, zero it, clear a pending overflow, enable the
    /// overflow interrupt and start counting.
    fn restart(&self);

    /// Raw counter value in `0..RANGE`.
    fn counter(&self) -> u32;

    /// Whether an overflow has happened that the interrupt handler has
    /// not yet folded into the accumulator.
    fn overflow_pending(&self) -> bool;

    /// Run `f` with the overflow interrupt masked, then restore the
    /// interrupt mask that was in effect before the call.
    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// High-order tick accumulator, advanced from the overflow interrupt.
pub struct OverflowAccumulator {
    hi: AtomicU32,
}

impl OverflowAccumulator {
    /// Create a zeroed accumulator (usable in a `static`).
    pub const fn new() -> Self {
        Self {
            hi: AtomicU32::new(0),
        }
    }

    /// Interrupt handler body: account for one hardware overflow.
    #[inline]
    pub fn on_overflow(&self, range: u32) {
        self.hi.fetch_add(range, Ordering::Relaxed);
    }

    #[inline]
    fn load(&self) -> Jiffies {
        self.hi.load(Ordering::Relaxed)
    }

    #[inline]
    fn reset(&self) {
        self.hi.store(0, Ordering::Relaxed);
    }
}

impl Default for OverflowAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

/// Race-free monotonic clock for the main loop.
///
/// # Example
///
/// ```ignore
/// static OVERFLOW: OverflowAccumulator = OverflowAccumulator::new();
///
/// let mut jiffies = TickSource::new(GroupTimer::new(&OVERFLOW)?, &OVERFLOW);
/// jiffies.init();
///
/// loop {
///     let now = jiffies.now();
///     // ...
/// }
/// ```
pub struct TickSource<H: TimerHardware> {
    hw: H,
    hi: &'static OverflowAccumulator,
}

impl<H: TimerHardware> TickSource<H> {
    /// Wrap a timer and the accumulator its overflow interrupt advances.
    ///
    /// Reads before [`init`](Self::init) return whatever the uninitialized
    /// timer reports; they never fault.
    pub fn new(hw: H, hi: &'static OverflowAccumulator) -> Self {
        Self { hw, hi }
    }

    /// Restart the timer from zero. Call exactly once before reading.
    pub fn init(&mut self) {
        let hw = &self.hw;
        let hi = self.hi;
        hw.critical_section(|| {
            hw.restart();
            hi.reset();
        });
    }

    /// Current tick count.
    ///
    /// If the overflow flag changes while the counter is sampled, the
    /// counter may belong to either side of the overflow, so the sample is
    /// retried. A consistently-set flag means the interrupt has not run
    /// yet and one counter range is added here instead.
    pub fn now(&self) -> Jiffies {
        let hw = &self.hw;
        let hi = self.hi;

        let (pending, count, base) = hw.critical_section(|| loop {
            let before = hw.overflow_pending();
            let count = hw.counter();
            let after = hw.overflow_pending();
            if before == after {
                break (before, count, hi.load());
            }
        });

        let ticks = base.wrapping_add(count);
        if pending {
            ticks.wrapping_add(H::RANGE)
        } else {
            ticks
        }
    }

    /// Access the underlying timer.
    #[inline]
    pub fn hardware(&self) -> &H {
        &self.hw
    }
}
