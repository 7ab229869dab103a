//! One fan channel: tachometer input, locked-rotor output, and the FSM
//! that connects them.

use crate::config::LockedRotorConfig;
use crate::jiffies::Jiffies;
use crate::rotor::{LockedRotorFsm, OutputDrive, RotorState};

/// GPIO capability set for one channel.
///
/// Implemented by the board layer; the FSM never touches registers.
pub trait ChannelIo {
    /// Pin write error.
    type Error;

    /// Current tachometer input level.
    fn read_input(&mut self) -> bool;

    /// Release the output to high impedance (locked rotor).
    fn float_output(&mut self) -> Result<(), Self::Error>;

    /// Pull the output low (rotor OK).
    fn drive_output_low(&mut self) -> Result<(), Self::Error>;
}

/// A channel owns its pins and its detector.
pub struct Channel<P> {
    io: P,
    fsm: LockedRotorFsm,
    applied: Option<OutputDrive>,
    write_errors: u32,
}

impl<P: ChannelIo> Channel<P> {
    /// Create a channel in `Init`. The output is not touched until the
    /// first [`step`](Self::step).
    pub fn new(io: P, config: LockedRotorConfig) -> Self {
        Self {
            io,
            fsm: LockedRotorFsm::new(config),
            applied: None,
            write_errors: 0,
        }
    }

    /// Sample the input, advance the FSM and apply the output.
    ///
    /// The pin is written only when the command changes. A failed write
    /// is counted and retried on the next step.
    #[inline]
    pub fn step(&mut self, now: Jiffies) -> OutputDrive {
        let level = self.io.read_input();
        let drive = self.fsm.step(now, level);

        if self.applied != Some(drive) {
            let written = match drive {
                OutputDrive::Float => self.io.float_output(),
                OutputDrive::DriveLow => self.io.drive_output_low(),
            };
            match written {
                Ok(()) => self.applied = Some(drive),
                Err(_) => {
                    self.applied = None;
                    self.write_errors = self.write_errors.saturating_add(1);
                }
            }
        }

        drive
    }

    /// Output writes that failed since power-on.
    #[inline]
    pub fn write_errors(&self) -> u32 {
        self.write_errors
    }

    /// Current FSM state.
    #[inline]
    pub fn state(&self) -> RotorState {
        self.fsm.state()
    }

    /// True when the channel is reporting a measured locked rotor.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.fsm.is_locked()
    }

    /// Detector state, for diagnostics.
    pub fn fsm(&self) -> &LockedRotorFsm {
        &self.fsm
    }

    /// Pin access (tests and board diagnostics).
    pub fn io(&self) -> &P {
        &self.io
    }
}
