//! Module: config
//!
//! Purpose: Compile-time thresholds for the locked-rotor converter.
//!
//! There is no runtime configuration and nothing is persisted. Values are
//! checked when the constants are evaluated, so an invalid combination
//! fails the build instead of misbehaving on the bench.

use crate::jiffies::Jiffies;

/// Microseconds per jiffy (APB 80 MHz / 640).
pub const JIFFY_US: u32 = 8;

/// Jiffies per second.
pub const JIFFIES_PER_SECOND: Jiffies = 1_000_000 / JIFFY_US;

/// Number of fan channels on the board.
pub const NUM_CHANNELS: usize = 2;

/// Tachometer transitions per revolution (two pulses, both edges).
pub const TRANSITIONS_PER_REV: u32 = 4;

/// Convert milliseconds to jiffies.
#[inline]
pub const fn jiffies_from_ms(ms: u32) -> Jiffies {
    (ms as u64 * JIFFIES_PER_SECOND as u64 / 1000) as Jiffies
}

/// Edge count that a fan turning at `rpm` produces in one sample window.
///
/// With a one second window: 600 RPM → 40, 780 RPM → 52, 960 RPM → 64.
pub const fn toggle_threshold_for_rpm(rpm: u32, sample_jiffies: Jiffies) -> u32 {
    let per_minute = rpm as u64 * TRANSITIONS_PER_REV as u64 * sample_jiffies as u64;
    (per_minute / (60 * JIFFIES_PER_SECOND as u64)) as u32
}

/// Per-channel timing thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockedRotorConfig {
    /// Time the output floats after power-on before it is driven low.
    pub power_on_jiffies: Jiffies,

    /// Length of one edge-counting window.
    pub sample_jiffies: Jiffies,

    /// Spin-up settle time, in whole sample windows.
    pub spin_up_windows: u32,

    /// Minimum edges per window for the fan to count as turning.
    pub toggle_threshold: u32,
}

impl LockedRotorConfig {
    /// Build a config, rejecting combinations the state machine can't honor.
    pub const fn new(
        power_on_jiffies: Jiffies,
        sample_jiffies: Jiffies,
        spin_up_windows: u32,
        toggle_threshold: u32,
    ) -> Self {
        assert!(sample_jiffies > 0, "sample window must be non-empty");
        assert!(
            spin_up_windows >= 1,
            "spin-up must cover at least one full sample window"
        );
        assert!(
            sample_jiffies.checked_mul(spin_up_windows).is_some(),
            "spin-up time overflows the jiffies width"
        );

        Self {
            power_on_jiffies,
            sample_jiffies,
            spin_up_windows,
            toggle_threshold,
        }
    }

    /// Spin-up settle time in jiffies.
    #[inline]
    pub const fn spin_up_jiffies(&self) -> Jiffies {
        self.sample_jiffies * self.spin_up_windows
    }
}

impl Default for LockedRotorConfig {
    fn default() -> Self {
        CONFIG
    }
}

// The San Ace fans being replaced pull their output low ~1.2 µs after
// power-on, so the output does not need to float any longer than that.
const POWER_ON_JIFFIES: Jiffies = 0;

const SAMPLE_JIFFIES: Jiffies = jiffies_from_ms(1000);

/// Board configuration: 1 s windows, 5 s spin-up, alarm below 600 RPM.
pub const CONFIG: LockedRotorConfig = LockedRotorConfig::new(
    POWER_ON_JIFFIES,
    SAMPLE_JIFFIES,
    5,
    toggle_threshold_for_rpm(600, SAMPLE_JIFFIES),
);
