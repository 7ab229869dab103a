//! Locked-rotor FSM scenario tests
//!
//! Timing used throughout: power-on 0, 1000-jiffy windows, 5-window
//! spin-up, threshold 40, one step per jiffy. With that cadence:
//!
//! - t=0    INIT -> POWER_ON
//! - t=1    POWER_ON -> SPIN_UP, first window starts
//! - windows close at 1002, 2003, 3004, 4005, 5006, 6007, 7008, ...
//! - t=5002 SPIN_UP -> RUNNING

use fan_locked_rotor::jiffies::Jiffies;
use fan_locked_rotor::{LockedRotorConfig, LockedRotorFsm, OutputDrive, RotorState};

const CONFIG: LockedRotorConfig = LockedRotorConfig::new(0, 1000, 5, 40);

const RUNNING_AT: Jiffies = 5002;
const WINDOW_6007: Jiffies = 6007;
const WINDOW_7008: Jiffies = 7008;

/// Step once per jiffy over `from..to`, offset by `base`, recording outputs.
fn run(
    fsm: &mut LockedRotorFsm,
    base: Jiffies,
    from: Jiffies,
    to: Jiffies,
    input: impl Fn(Jiffies) -> bool,
) -> Vec<(Jiffies, OutputDrive)> {
    (from..to)
        .map(|t| (t, fsm.step(base.wrapping_add(t), input(t))))
        .collect()
}

/// `edges` transitions, 22 jiffies apart, starting after `start`.
fn burst(start: Jiffies, edges: u32) -> impl Fn(Jiffies) -> bool {
    move |t| {
        if t < start {
            return false;
        }
        let k = ((t - start) / 22).min(edges);
        k % 2 == 1
    }
}

fn output_at(trace: &[(Jiffies, OutputDrive)], t: Jiffies) -> OutputDrive {
    trace.iter().find(|(at, _)| *at == t).map(|(_, out)| *out).unwrap()
}

#[test]
fn test_stalled_fan_reports_locked_then_recovers() {
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let trace = run(&mut fsm, 0, 0, 7100, burst(WINDOW_6007, 45));

    // Stalled through spin-up: float as soon as RUNNING begins
    assert_eq!(output_at(&trace, RUNNING_AT - 1), OutputDrive::DriveLow);
    assert_eq!(output_at(&trace, RUNNING_AT), OutputDrive::Float);

    // 45 edges in the 6007..7008 window: still float until it closes
    for &(t, out) in trace.iter().filter(|(t, _)| (RUNNING_AT..WINDOW_7008).contains(t)) {
        assert_eq!(out, OutputDrive::Float, "t={}", t);
    }
    assert_eq!(output_at(&trace, WINDOW_7008), OutputDrive::DriveLow);
    assert_eq!(output_at(&trace, 7099), OutputDrive::DriveLow);
}

#[test]
fn test_threshold_is_exclusive_below() {
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let trace = run(&mut fsm, 0, 0, 7100, burst(WINDOW_6007, 39));

    assert_eq!(output_at(&trace, WINDOW_7008), OutputDrive::Float);
    assert!(fsm.under_threshold());
}

#[test]
fn test_exactly_threshold_is_ok() {
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let trace = run(&mut fsm, 0, 0, 7100, burst(WINDOW_6007, 40));

    assert_eq!(output_at(&trace, WINDOW_7008), OutputDrive::DriveLow);
}

#[test]
fn test_healthy_fan_never_reports_locked() {
    // Toggle every 16 jiffies: ~62 edges per window
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let trace = run(&mut fsm, 0, 0, 20_000, |t| (t / 16) % 2 == 1);

    for &(t, out) in &trace[1..] {
        assert_eq!(out, OutputDrive::DriveLow, "t={}", t);
    }
    assert_eq!(fsm.state(), RotorState::Running);
}

#[test]
fn test_slow_fan_floats_at_first_running_boundary() {
    // Toggle every 50 jiffies: ~20 edges per window, below threshold
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let trace = run(&mut fsm, 0, 0, 8000, |t| (t / 50) % 2 == 1);

    // Spin-up windows already saw the slow fan
    assert_eq!(output_at(&trace, RUNNING_AT), OutputDrive::Float);
    assert!(trace[RUNNING_AT as usize..].iter().all(|(_, out)| *out == OutputDrive::Float));
}

#[test]
fn test_edges_do_not_carry_between_windows() {
    // 30 edges in each of two consecutive windows: 60 total, but each
    // window alone is under the threshold.
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let input = |t: Jiffies| {
        let in_window = |start: Jiffies| t >= start && t < start + 30 * 30;
        if in_window(WINDOW_6007) || in_window(5006) {
            (t / 30) % 2 == 1
        } else {
            false
        }
    };
    let trace = run(&mut fsm, 0, 0, 7100, input);

    assert_eq!(output_at(&trace, WINDOW_6007), OutputDrive::Float);
    assert_eq!(output_at(&trace, WINDOW_7008), OutputDrive::Float);
}

#[test]
fn test_output_ignores_input_before_running() {
    let config = LockedRotorConfig::new(500, 1000, 2, 40);
    let mut fsm = LockedRotorFsm::new(config);

    let mut seed: u32 = 7;
    let mut states = Vec::new();
    for t in 0..6000 {
        seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        let out = fsm.step(t, seed & 0x100 != 0);
        match fsm.state() {
            RotorState::Init | RotorState::PowerOn => assert_eq!(out, OutputDrive::Float),
            RotorState::SpinUp => assert_eq!(out, OutputDrive::DriveLow),
            RotorState::Running => {}
        }
        states.push(fsm.state());
    }

    // Strictly forward
    assert!(states.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(states.first(), Some(&RotorState::PowerOn));
    assert_eq!(states.last(), Some(&RotorState::Running));
}

#[test]
fn test_dead_fan_output_sequence() {
    // Dead fan with a long power-on delay: output goes float, low, float.
    let config = LockedRotorConfig::new(500, 1000, 1, 40);
    let mut fsm = LockedRotorFsm::new(config);
    let trace = run(&mut fsm, 0, 0, 4000, |_| false);

    let mut changes: Vec<OutputDrive> = Vec::new();
    for (_, out) in &trace {
        if changes.last() != Some(out) {
            changes.push(*out);
        }
    }
    assert_eq!(
        changes,
        vec![OutputDrive::Float, OutputDrive::DriveLow, OutputDrive::Float]
    );
}

#[test]
fn test_counter_wraparound_is_not_a_timeout() {
    // Same scenario as above, but the clock wraps during spin-up.
    let base = u32::MAX - 3000;
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let trace = run(&mut fsm, base, 0, 7100, burst(WINDOW_6007, 45));

    assert_eq!(output_at(&trace, RUNNING_AT - 1), OutputDrive::DriveLow);
    assert_eq!(output_at(&trace, RUNNING_AT), OutputDrive::Float);
    assert_eq!(output_at(&trace, WINDOW_7008 - 1), OutputDrive::Float);
    assert_eq!(output_at(&trace, WINDOW_7008), OutputDrive::DriveLow);
}

#[test]
fn test_coarse_stepping_still_closes_windows() {
    // The loop may be slower than one jiffy per iteration.
    let mut fsm = LockedRotorFsm::new(CONFIG);
    let mut t = 0;
    while t < 20_000 {
        fsm.step(t, false);
        t += 333;
    }
    assert_eq!(fsm.state(), RotorState::Running);
    assert!(fsm.is_locked());
}
