//! Host simulators for the timer and the channel pins.

#![allow(dead_code)]

use std::cell::Cell;
use std::rc::Rc;

use fan_locked_rotor::{
    ChannelIo, Jiffies, OutputDrive, OverflowAccumulator, TickSource, TimerHardware,
};

/// 8-bit timer with an overflow flag and a maskable overflow interrupt.
///
/// While the interrupt is masked an overflow only sets the pending flag;
/// unmasking delivers it. `drift_per_read` advances time on every counter
/// read, which lets a test land an overflow in the middle of a sample.
pub struct SimTimer {
    counter: Cell<u32>,
    pending: Cell<bool>,
    irq_enabled: Cell<bool>,
    drift_per_read: Cell<u32>,
    total: Cell<Jiffies>,
    restarts: Cell<u32>,
    hi: &'static OverflowAccumulator,
}

impl SimTimer {
    pub fn new(hi: &'static OverflowAccumulator) -> Self {
        Self {
            counter: Cell::new(0),
            pending: Cell::new(false),
            irq_enabled: Cell::new(true),
            drift_per_read: Cell::new(0),
            total: Cell::new(0),
            restarts: Cell::new(0),
            hi,
        }
    }

    /// Let `ticks` of real time pass.
    pub fn advance(&self, ticks: u32) {
        let sum = self.counter.get() as u64 + ticks as u64;
        let overflows = sum / Self::RANGE as u64;
        self.counter.set((sum % Self::RANGE as u64) as u32);
        self.total.set(self.total.get().wrapping_add(ticks));

        if overflows > 0 {
            if self.irq_enabled.get() {
                self.hi
                    .on_overflow((overflows as u32).wrapping_mul(Self::RANGE));
            } else {
                // A masked timer can only remember one overflow.
                self.pending.set(true);
            }
        }
    }

    pub fn set_irq_enabled(&self, enabled: bool) {
        self.irq_enabled.set(enabled);
        if enabled && self.pending.replace(false) {
            self.hi.on_overflow(Self::RANGE);
        }
    }

    pub fn irq_enabled(&self) -> bool {
        self.irq_enabled.get()
    }

    pub fn set_drift_per_read(&self, ticks: u32) {
        self.drift_per_read.set(ticks);
    }

    /// Real time elapsed since the last restart.
    pub fn total(&self) -> Jiffies {
        self.total.get()
    }

    pub fn restarts(&self) -> u32 {
        self.restarts.get()
    }
}

impl TimerHardware for SimTimer {
    const RANGE: u32 = 256;

    fn restart(&self) {
        self.counter.set(0);
        self.pending.set(false);
        self.total.set(0);
        self.restarts.set(self.restarts.get() + 1);
    }

    fn counter(&self) -> u32 {
        let value = self.counter.get();
        let drift = self.drift_per_read.get();
        if drift > 0 {
            self.advance(drift);
        }
        value
    }

    fn overflow_pending(&self) -> bool {
        self.pending.get()
    }

    fn critical_section<R>(&self, f: impl FnOnce() -> R) -> R {
        let previous = self.irq_enabled.replace(false);
        let result = f();
        self.set_irq_enabled(previous);
        result
    }
}

/// Initialized tick source over a fresh simulated timer.
pub fn sim_clock() -> TickSource<SimTimer> {
    let hi: &'static OverflowAccumulator = Box::leak(Box::new(OverflowAccumulator::new()));
    let mut clock = TickSource::new(SimTimer::new(hi), hi);
    clock.init();
    clock
}

/// Test-side handle on a [`ScriptedIo`].
#[derive(Clone, Default)]
pub struct FanPins {
    level: Rc<Cell<bool>>,
    output: Rc<Cell<Option<OutputDrive>>>,
    writes: Rc<Cell<u32>>,
    fail_writes: Rc<Cell<bool>>,
}

impl FanPins {
    pub fn set_level(&self, level: bool) {
        self.level.set(level);
    }

    pub fn toggle(&self) {
        self.level.set(!self.level.get());
    }

    /// Last level written to the output pin.
    pub fn output(&self) -> Option<OutputDrive> {
        self.output.get()
    }

    /// Successful output writes.
    pub fn writes(&self) -> u32 {
        self.writes.get()
    }

    /// Make every output write fail until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }
}

/// Output write rejected by a [`ScriptedIo`].
#[derive(Debug)]
pub struct WriteRejected;

/// Channel pins driven by a test through [`FanPins`].
pub struct ScriptedIo {
    pins: FanPins,
}

impl ScriptedIo {
    fn write(&mut self, drive: OutputDrive) -> Result<(), WriteRejected> {
        if self.pins.fail_writes.get() {
            return Err(WriteRejected);
        }
        self.pins.output.set(Some(drive));
        self.pins.writes.set(self.pins.writes.get() + 1);
        Ok(())
    }
}

impl ChannelIo for ScriptedIo {
    type Error = WriteRejected;

    fn read_input(&mut self) -> bool {
        self.pins.level.get()
    }

    fn float_output(&mut self) -> Result<(), WriteRejected> {
        self.write(OutputDrive::Float)
    }

    fn drive_output_low(&mut self) -> Result<(), WriteRejected> {
        self.write(OutputDrive::DriveLow)
    }
}

pub fn scripted() -> (ScriptedIo, FanPins) {
    let pins = FanPins::default();
    (
        ScriptedIo {
            pins: pins.clone(),
        },
        pins,
    )
}
