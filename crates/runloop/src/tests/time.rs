use crate::time::{Clock, ManualClock, Millis, SystemClock};

#[test]
fn ordering_survives_wraparound() {
    let before_wrap = Millis(u32::MAX - 5);
    let after_wrap = Millis(10);

    assert!(before_wrap.is_before(after_wrap));
    assert!(!after_wrap.is_before(before_wrap));
    assert_eq!(after_wrap.since(before_wrap), 16);
    assert_eq!(before_wrap.since(after_wrap), -16);
}

#[test]
fn until_saturates_at_zero() {
    let now = Millis(200);
    assert_eq!(now.until(Millis(250)), 50);
    assert_eq!(now.until(Millis(200)), 0);
    assert_eq!(now.until(Millis(150)), 0);
    assert!(now.has_reached(Millis(200)));
    assert!(!now.has_reached(Millis(201)));
}

#[test]
fn manual_clock_wraps_and_is_shared() {
    let clock = ManualClock::new(Millis(u32::MAX));
    let probe = clock.clone();

    clock.advance(2);
    assert_eq!(probe.now_ms(), Millis(1));

    probe.set(Millis(42));
    assert_eq!(clock.now_ms(), Millis(42));
}

#[test]
fn system_clock_starts_at_offset() {
    let clock = SystemClock::starting_at(Millis(u32::MAX - 1_000));
    let now = clock.now_ms();
    assert!(now.since(Millis(u32::MAX - 1_000)) >= 0);
    assert!(now.since(Millis(u32::MAX - 1_000)) < 1_000);
}
