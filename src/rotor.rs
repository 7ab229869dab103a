//! Locked-rotor state machine.
//!
//! Pure logic, no hardware dependencies. Consumes a timestamp and the
//! tachometer input level, produces the output drive command. Fully
//! testable on host.
//!
//! # States
//!
//! ```text
//! Init ──▶ PowerOn ──(power_on elapsed)──▶ SpinUp ──(spin_up elapsed)──▶ Running
//! float     float                          drive low                     float if under
//!                                                                        threshold, else low
//! ```
//!
//! Edges are counted in `SpinUp` and `Running`. Each time a sample window
//! closes, the count is compared to the threshold and reset; that decision
//! drives the output while the next window accumulates.

use crate::config::LockedRotorConfig;
use crate::jiffies::{elapsed, Jiffies};

/// FSM state. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum RotorState {
    /// Not stepped yet.
    Init,
    /// Output floating after power-on.
    PowerOn,
    /// Output held low while the fan settles.
    SpinUp,
    /// Output follows the measured speed.
    Running,
}

impl RotorState {
    /// Short name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            RotorState::Init => "INIT",
            RotorState::PowerOn => "POWER_ON",
            RotorState::SpinUp => "SPIN_UP",
            RotorState::Running => "RUNNING",
        }
    }
}

/// Output line command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputDrive {
    /// High impedance, pulled up externally: rotor locked.
    Float,
    /// Actively low: rotor turning.
    DriveLow,
}

/// Per-channel locked-rotor detector.
///
/// # Example
///
/// ```
/// use fan_locked_rotor::config::LockedRotorConfig;
/// use fan_locked_rotor::rotor::{LockedRotorFsm, OutputDrive, RotorState};
///
/// let mut fsm = LockedRotorFsm::new(LockedRotorConfig::new(0, 1000, 5, 40));
///
/// assert_eq!(fsm.step(0, false), OutputDrive::Float);
/// assert_eq!(fsm.state(), RotorState::PowerOn);
///
/// assert_eq!(fsm.step(1, false), OutputDrive::DriveLow);
/// assert_eq!(fsm.state(), RotorState::SpinUp);
/// ```
#[derive(Clone, Debug)]
pub struct LockedRotorFsm {
    config: LockedRotorConfig,

    state: RotorState,
    state_entry: Jiffies,

    // Current sample window
    window_start: Jiffies,
    toggles: u32,
    prev_level: bool,

    // Decision from the last completed window
    under_threshold: bool,
}

impl LockedRotorFsm {
    /// Create a detector in `Init` with zeroed counters.
    pub const fn new(config: LockedRotorConfig) -> Self {
        Self {
            config,
            state: RotorState::Init,
            state_entry: 0,
            window_start: 0,
            toggles: 0,
            prev_level: false,
            under_threshold: false,
        }
    }

    /// Advance the FSM by one dispatch iteration.
    ///
    /// # Arguments
    ///
    /// * `now` - Tick sampled once for this iteration
    /// * `level` - Current tachometer input level
    ///
    /// # Returns
    ///
    /// The drive command for the state reached by this step.
    #[inline]
    pub fn step(&mut self, now: Jiffies, level: bool) -> OutputDrive {
        match self.state {
            RotorState::Init => {
                self.state = RotorState::PowerOn;
                self.state_entry = now;
            }
            RotorState::PowerOn => {
                if elapsed(now, self.state_entry) > self.config.power_on_jiffies {
                    self.state = RotorState::SpinUp;
                    self.state_entry = now;
                    self.window_start = now;
                }
            }
            RotorState::SpinUp => {
                self.accumulate(now, level);
                if elapsed(now, self.state_entry) > self.config.spin_up_jiffies() {
                    self.state = RotorState::Running;
                }
            }
            RotorState::Running => {
                self.accumulate(now, level);
            }
        }

        self.output()
    }

    /// Drive command implied by the current state.
    #[inline]
    pub fn output(&self) -> OutputDrive {
        match self.state {
            RotorState::Init | RotorState::PowerOn => OutputDrive::Float,
            RotorState::SpinUp => OutputDrive::DriveLow,
            RotorState::Running if self.under_threshold => OutputDrive::Float,
            RotorState::Running => OutputDrive::DriveLow,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> RotorState {
        self.state
    }

    /// Decision from the most recently completed window.
    #[inline]
    pub fn under_threshold(&self) -> bool {
        self.under_threshold
    }

    /// Edges counted so far in the current window.
    #[inline]
    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    /// True when the output is reporting a locked rotor from a measurement.
    ///
    /// The power-on float is not a measurement and does not count.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state == RotorState::Running && self.under_threshold
    }

    /// Active configuration.
    pub fn config(&self) -> &LockedRotorConfig {
        &self.config
    }

    // --- Private methods ---

    fn accumulate(&mut self, now: Jiffies, level: bool) {
        if level != self.prev_level {
            self.toggles = self.toggles.saturating_add(1);
            self.prev_level = level;
        }

        if elapsed(now, self.window_start) > self.config.sample_jiffies {
            self.under_threshold = self.toggles < self.config.toggle_threshold;
            self.toggles = 0;
            self.window_start = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_CONFIG: LockedRotorConfig = LockedRotorConfig::new(10, 100, 2, 4);

    #[test]
    fn test_initial_state() {
        let fsm = LockedRotorFsm::new(TEST_CONFIG);
        assert_eq!(fsm.state(), RotorState::Init);
        assert_eq!(fsm.output(), OutputDrive::Float);
        assert!(!fsm.under_threshold());
        assert_eq!(fsm.toggles(), 0);
    }

    #[test]
    fn test_power_on_delay_is_exclusive() {
        let mut fsm = LockedRotorFsm::new(TEST_CONFIG);

        fsm.step(50, false);
        assert_eq!(fsm.state(), RotorState::PowerOn);

        // elapsed == power_on: not yet
        assert_eq!(fsm.step(60, true), OutputDrive::Float);
        assert_eq!(fsm.state(), RotorState::PowerOn);

        assert_eq!(fsm.step(61, true), OutputDrive::DriveLow);
        assert_eq!(fsm.state(), RotorState::SpinUp);
    }

    #[test]
    fn test_power_on_ignores_input() {
        let mut fsm = LockedRotorFsm::new(TEST_CONFIG);
        fsm.step(0, false);
        for t in 1..=10 {
            fsm.step(t, t % 2 == 0);
        }
        assert_eq!(fsm.toggles(), 0);
    }

    #[test]
    fn test_window_counts_and_resets() {
        let mut fsm = LockedRotorFsm::new(TEST_CONFIG);
        fsm.step(0, false);
        fsm.step(11, false); // SpinUp, window starts at 11

        fsm.step(20, true);
        fsm.step(30, false);
        fsm.step(40, true);
        assert_eq!(fsm.toggles(), 3);

        // elapsed 100 is not past the window
        fsm.step(111, true);
        assert_eq!(fsm.toggles(), 3);

        fsm.step(112, true);
        assert_eq!(fsm.toggles(), 0);
        assert!(fsm.under_threshold());
    }

    #[test]
    fn test_spin_up_to_running() {
        let mut fsm = LockedRotorFsm::new(TEST_CONFIG);
        fsm.step(0, false);
        fsm.step(11, false);

        // spin-up is 200 jiffies, exclusive
        fsm.step(211, false);
        assert_eq!(fsm.state(), RotorState::SpinUp);
        fsm.step(212, false);
        assert_eq!(fsm.state(), RotorState::Running);
        assert!(fsm.is_locked());
        assert_eq!(fsm.output(), OutputDrive::Float);
    }

    #[test]
    fn test_state_names() {
        assert_eq!(RotorState::Init.as_str(), "INIT");
        assert_eq!(RotorState::Running.as_str(), "RUNNING");
        assert!(RotorState::PowerOn < RotorState::SpinUp);
    }
}
