// Tests for the cooldown gate's check/commit split and its monotonic
// deadline invariant.

use echo_core::cooldown::CooldownGate;

#[test]
fn fresh_gate_is_eligible() {
    let gate = CooldownGate::new();
    assert!(gate.is_eligible(0.0));
    let (granted, wait) = gate.try_consume(0.0);
    assert!(granted);
    assert_eq!(wait, 0.0);
}

#[test]
fn try_consume_twice_at_same_instant_is_granted_twice() {
    // The gate only updates on explicit commit; a repeated check before
    // set_next_eligible must still be granted.
    let gate = CooldownGate::new();
    let (first, _) = gate.try_consume(1.0);
    let (second, _) = gate.try_consume(1.0);
    assert!(first && second, "check must not consume");
}

#[test]
fn committed_busy_window_rejects_until_it_elapses() {
    let mut gate = CooldownGate::new();
    gate.set_next_eligible(10.0, 2.0);

    let eps = 0.01;
    let (granted, wait) = gate.try_consume(12.0 - eps);
    assert!(!granted);
    assert!(
        (wait - eps).abs() < 1e-9,
        "remaining wait should be ~{eps}, got {wait}"
    );

    let (granted, wait) = gate.try_consume(12.0);
    assert!(granted, "gate must open exactly at the deadline");
    assert_eq!(wait, 0.0);
}

#[test]
fn deadline_never_moves_backwards() {
    let mut gate = CooldownGate::new();
    gate.set_next_eligible(0.0, 5.0);
    // A later commit with a shorter window must not shrink the deadline.
    gate.set_next_eligible(1.0, 1.0);
    assert!(!gate.is_eligible(4.9));
    assert!(gate.is_eligible(5.0));
}

#[test]
fn reset_reopens_the_gate() {
    let mut gate = CooldownGate::new();
    gate.set_next_eligible(0.0, 100.0);
    assert!(!gate.is_eligible(50.0));
    gate.reset();
    assert!(gate.is_eligible(50.0));
}

#[test]
fn wait_remaining_is_clamped_to_zero() {
    let mut gate = CooldownGate::new();
    gate.set_next_eligible(0.0, 1.0);
    assert_eq!(gate.wait_remaining(10.0), 0.0);
}

#[test]
fn negative_busy_duration_is_treated_as_zero() {
    let mut gate = CooldownGate::new();
    gate.set_next_eligible(3.0, -2.0);
    assert!(gate.is_eligible(3.0));
}
