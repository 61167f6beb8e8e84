use crate::time::{Millis, MAX_DELAY_MS};
use crate::timer::{Timer, TimerError, TimerRegistry};

fn timer_at(name: &'static str, deadline: u32) -> Timer {
    let timer = Timer::named(name, |_, _| {});
    timer.set_deadline(Millis(deadline));
    timer
}

fn names(registry: &TimerRegistry) -> Vec<&'static str> {
    registry.iter().map(|(_, timer)| timer.name()).collect()
}

#[test]
fn keeps_timers_sorted_by_deadline() {
    let mut registry = TimerRegistry::with_capacity(8);
    registry.add(&timer_at("c", 300)).unwrap();
    registry.add(&timer_at("a", 100)).unwrap();
    registry.add(&timer_at("b", 200)).unwrap();

    assert_eq!(names(&registry), ["a", "b", "c"]);
    let (deadline, earliest) = registry.peek_earliest().unwrap();
    assert_eq!(deadline, Millis(100));
    assert_eq!(earliest.name(), "a");
}

#[test]
fn equal_deadlines_keep_insertion_order() {
    let mut registry = TimerRegistry::with_capacity(8);
    registry.add(&timer_at("first", 100)).unwrap();
    registry.add(&timer_at("later", 150)).unwrap();
    registry.add(&timer_at("second", 100)).unwrap();
    registry.add(&timer_at("third", 100)).unwrap();

    assert_eq!(names(&registry), ["first", "second", "third", "later"]);
}

#[test]
fn duplicate_add_is_a_no_op() {
    let mut registry = TimerRegistry::with_capacity(8);
    let timer = timer_at("dup", 100);

    registry.add(&timer).unwrap();
    assert_eq!(registry.add(&timer), Err(TimerError::AlreadyQueued));
    assert_eq!(registry.len(), 1);

    // A clone is the same timer.
    assert_eq!(registry.add(&timer.clone()), Err(TimerError::AlreadyQueued));
    assert_eq!(registry.len(), 1);
}

#[test]
fn duplicate_is_found_past_the_insertion_point() {
    let mut registry = TimerRegistry::with_capacity(8);
    let early = timer_at("early", 50);
    let moved = timer_at("moved", 500);
    registry.add(&early).unwrap();
    registry.add(&moved).unwrap();

    // Would insert before the existing entry; still the same timer.
    moved.set_deadline(Millis(10));
    assert_eq!(registry.add(&moved), Err(TimerError::AlreadyQueued));
    assert_eq!(names(&registry), ["early", "moved"]);
}

#[test]
fn queued_deadline_is_fixed_until_reinserted() {
    let mut registry = TimerRegistry::with_capacity(8);
    let timer = timer_at("t", 100);
    registry.add(&timer).unwrap();

    timer.set_deadline(Millis(900));
    assert_eq!(registry.next_deadline(), Some(Millis(100)));

    assert!(registry.remove(&timer));
    registry.add(&timer).unwrap();
    assert_eq!(registry.next_deadline(), Some(Millis(900)));
}

#[test]
fn remove_reports_missing_timer() {
    let mut registry = TimerRegistry::with_capacity(8);
    let queued = timer_at("queued", 100);
    let stranger = timer_at("stranger", 100);
    registry.add(&queued).unwrap();

    assert!(!registry.remove(&stranger));
    assert!(registry.remove(&queued));
    assert!(!registry.remove(&queued));
    assert!(registry.is_empty());
    assert!(registry.peek_earliest().is_none());
}

#[test]
fn refuses_to_grow_past_capacity() {
    let mut registry = TimerRegistry::with_capacity(2);
    registry.add(&timer_at("a", 1)).unwrap();
    registry.add(&timer_at("b", 2)).unwrap();

    assert_eq!(
        registry.add(&timer_at("c", 3)),
        Err(TimerError::RegistryFull { capacity: 2 })
    );
    assert_eq!(registry.len(), 2);
}

#[test]
fn pop_due_only_returns_expired_timers() {
    let mut registry = TimerRegistry::with_capacity(4);
    registry.add(&timer_at("a", 100)).unwrap();
    registry.add(&timer_at("b", 200)).unwrap();

    assert!(registry.pop_due(Millis(99)).is_none());
    assert_eq!(registry.pop_due(Millis(100)).unwrap().name(), "a");
    assert!(registry.pop_due(Millis(150)).is_none());
    assert!(!registry.is_due(Millis(150)));
    assert!(registry.is_due(Millis(250)));
}

#[test]
fn sorts_across_the_wrap() {
    let mut registry = TimerRegistry::with_capacity(4);
    registry.add(&timer_at("after", 20)).unwrap();
    registry.add(&timer_at("before", u32::MAX - 20)).unwrap();

    assert_eq!(names(&registry), ["before", "after"]);
    assert!(registry.pop_due(Millis(u32::MAX - 30)).is_none());
    assert_eq!(registry.pop_due(Millis(u32::MAX)).unwrap().name(), "before");
    assert!(registry.pop_due(Millis(u32::MAX)).is_none());
    assert_eq!(registry.pop_due(Millis(25)).unwrap().name(), "after");
}

#[test]
fn set_rounds_up_and_clamps() {
    let timer = Timer::new(|_, _| {});

    timer.set(Millis(1_000), 250);
    assert_eq!(timer.deadline(), Millis(1_251));

    timer.set(Millis(u32::MAX), 0);
    assert_eq!(timer.deadline(), Millis(0));

    timer.set(Millis(0), u32::MAX);
    assert_eq!(timer.deadline(), Millis(MAX_DELAY_MS));
    assert!(Millis(0).is_before(timer.deadline()));
}
