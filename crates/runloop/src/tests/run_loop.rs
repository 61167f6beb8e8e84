use std::sync::{Arc, Mutex};

use crate::dispatch::DispatchOutcome;
use crate::dump::Direction;
use crate::packet::PacketKind;
use crate::run_loop::{RunLoop, RunLoopConfig, RunLoopState, Step};
use crate::time::{ManualClock, Millis};
use crate::timer::{Timer, TimerError};

type Log = Arc<Mutex<Vec<String>>>;

fn manual_loop(start: u32) -> (RunLoop, ManualClock) {
    let clock = ManualClock::new(Millis(start));
    let run_loop = RunLoop::builder().with_clock(Arc::new(clock.clone())).build();
    (run_loop, clock)
}

fn recording_timer(name: &'static str, log: &Log) -> Timer {
    let log = Arc::clone(log);
    Timer::named(name, move |timer, _ctx| {
        log.lock().unwrap().push(timer.name().to_string());
    })
}

fn recording_handler(run_loop: &mut RunLoop, log: &Log) {
    let log = Arc::clone(log);
    run_loop.register_handler(move |kind, bytes, _ctx| {
        log.lock().unwrap().push(format!("{kind}:{bytes:02x?}"));
    });
}

#[test]
fn idle_loop_dispatches_nothing() {
    let (mut run_loop, _clock) = manual_loop(0);
    assert_eq!(run_loop.run_until_idle(), 0);
    assert_eq!(run_loop.state(), RunLoopState::Idle);
}

#[test]
fn timer_is_absent_while_its_callback_runs() {
    let (mut run_loop, clock) = manual_loop(0);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let probe = Arc::clone(&seen);

    let timer = Timer::named("rearm", move |timer, ctx| {
        let queued = ctx.timers().contains(timer);
        ctx.set_timer(timer, 50);
        let rearmed = ctx.add_timer(timer);
        probe.lock().unwrap().push((queued, rearmed));
    });
    timer.set_deadline(Millis(10));
    run_loop.add_timer(&timer).unwrap();

    clock.set(Millis(10));
    assert_eq!(run_loop.run_until_idle(), 1);

    assert_eq!(seen.lock().unwrap().as_slice(), &[(false, Ok(()))]);
    assert!(run_loop.timers().contains(&timer));
    assert_eq!(run_loop.timers().next_deadline(), Some(Millis(61)));
    assert_eq!(run_loop.state(), RunLoopState::Waiting);
}

#[test]
fn periodic_timer_rearms_itself() {
    let (mut run_loop, clock) = manual_loop(0);
    let count = Arc::new(Mutex::new(0u32));
    let probe = Arc::clone(&count);

    let timer = Timer::new(move |timer, ctx| {
        *probe.lock().unwrap() += 1;
        ctx.set_timer(timer, 99);
        ctx.add_timer(timer).unwrap();
    });
    run_loop.set_timer(&timer, 99);
    run_loop.add_timer(&timer).unwrap();
    assert_eq!(run_loop.timers().next_deadline(), Some(Millis(100)));

    for _ in 0..3 {
        clock.advance(100);
        assert_eq!(run_loop.run_until_idle(), 1);
    }
    assert_eq!(*count.lock().unwrap(), 3);
    assert_eq!(run_loop.timers().next_deadline(), Some(Millis(400)));
}

#[test]
fn catches_up_on_overdue_timers_in_order() {
    let (mut run_loop, clock) = manual_loop(0);
    let log: Log = Arc::default();
    for (name, deadline) in [("late", 30), ("early", 10), ("middle", 20)] {
        let timer = recording_timer(name, &log);
        timer.set_deadline(Millis(deadline));
        run_loop.add_timer(&timer).unwrap();
    }

    clock.set(Millis(25));
    assert_eq!(run_loop.run_until_idle(), 2);
    clock.set(Millis(30));
    assert_eq!(run_loop.run_until_idle(), 1);

    assert_eq!(*log.lock().unwrap(), ["early", "middle", "late"]);
}

#[test]
fn cancelled_timer_never_fires() {
    let (mut run_loop, clock) = manual_loop(0);
    let log: Log = Arc::default();
    let timer = recording_timer("cancelled", &log);
    timer.set_deadline(Millis(5));
    run_loop.add_timer(&timer).unwrap();

    assert!(run_loop.remove_timer(&timer));
    clock.set(Millis(50));
    assert_eq!(run_loop.run_until_idle(), 0);
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn packet_wins_over_due_timer_then_timer_runs_next() {
    let (mut run_loop, clock) = manual_loop(0);
    let log: Log = Arc::default();
    recording_handler(&mut run_loop, &log);

    let timer = recording_timer("due", &log);
    timer.set_deadline(Millis(10));
    run_loop.add_timer(&timer).unwrap();

    let sender = run_loop.sender();
    sender.deliver(PacketKind::Event, [0x0e, 0x00]);
    sender.deliver(PacketKind::Event, [0x0f, 0x00]);
    clock.set(Millis(10));

    assert_eq!(run_loop.run_once(), Step::Packet(DispatchOutcome::Delivered));
    assert_eq!(run_loop.run_once(), Step::TimerFired);
    assert_eq!(run_loop.run_once(), Step::Packet(DispatchOutcome::Delivered));

    assert_eq!(*log.lock().unwrap(), ["EVT:[0e, 00]", "due", "EVT:[0f, 00]"]);
}

#[test]
fn handler_can_schedule_timers() {
    let (mut run_loop, clock) = manual_loop(0);
    let log: Log = Arc::default();
    let follow_up = recording_timer("follow-up", &log);
    let armed = follow_up.clone();
    run_loop.register_handler(move |_, _, ctx| {
        ctx.set_timer(&armed, 9);
        ctx.add_timer(&armed).unwrap();
    });

    run_loop.sender().deliver(PacketKind::AclData, vec![1, 2, 3]);
    assert_eq!(run_loop.run_until_idle(), 1);
    assert!(run_loop.timers().contains(&follow_up));

    clock.set(Millis(10));
    assert_eq!(run_loop.run_until_idle(), 1);
    assert_eq!(*log.lock().unwrap(), ["follow-up"]);
}

#[test]
fn replacing_the_handler_drops_the_old_one() {
    let (mut run_loop, _clock) = manual_loop(0);
    let first: Log = Arc::default();
    let second: Log = Arc::default();
    recording_handler(&mut run_loop, &first);
    recording_handler(&mut run_loop, &second);

    run_loop.sender().deliver(PacketKind::Event, [0x05]);
    run_loop.run_until_idle();

    assert!(first.lock().unwrap().is_empty());
    assert_eq!(second.lock().unwrap().len(), 1);
}

#[test]
fn drops_packets_it_cannot_dispatch() {
    let (mut run_loop, _clock) = manual_loop(0);
    let sender = run_loop.sender();

    sender.deliver(PacketKind::Event, [0x01]);
    assert_eq!(run_loop.run_once(), Step::Packet(DispatchOutcome::NoHandler));

    let log: Log = Arc::default();
    recording_handler(&mut run_loop, &log);
    sender.deliver(PacketKind::Command, [0x03, 0x0c, 0x00]);
    assert_eq!(
        run_loop.run_once(),
        Step::Packet(DispatchOutcome::Rejected(PacketKind::Command))
    );

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(run_loop.dispatcher().dropped(), 2);
    assert_eq!(run_loop.dispatcher().delivered(), 0);
}

#[test]
fn dump_hook_sees_inbound_packets() {
    let dumped = Arc::new(Mutex::new(Vec::new()));
    let probe = Arc::clone(&dumped);
    let mut run_loop = RunLoop::builder()
        .with_clock(Arc::new(ManualClock::default()))
        .with_dump_hook(Arc::new(move |direction, kind, bytes: &[u8]| {
            probe.lock().unwrap().push((direction, kind, bytes.to_vec()));
        }))
        .build();
    run_loop.register_handler(|_, _, _| {});

    run_loop.sender().deliver(PacketKind::Event, [0x3e, 0x01]);
    run_loop.run_until_idle();

    assert_eq!(
        dumped.lock().unwrap().as_slice(),
        &[(Direction::Inbound, PacketKind::Event, vec![0x3e, 0x01])]
    );
}

#[test]
fn init_clears_timers_but_keeps_packets() {
    let (mut run_loop, _clock) = manual_loop(0);
    let timer = Timer::new(|_, _| {});
    run_loop.add_timer(&timer).unwrap();
    run_loop.sender().deliver(PacketKind::Event, [0x00]);

    run_loop.init();

    assert!(run_loop.timers().is_empty());
    assert_eq!(run_loop.pending_packets(), 1);
    assert_eq!(run_loop.state(), RunLoopState::Idle);
}

#[test]
fn registry_capacity_comes_from_config() {
    let mut run_loop = RunLoop::with_config(RunLoopConfig::default().name("tiny").max_timers(1))
        .with_clock(Arc::new(ManualClock::default()))
        .build();

    run_loop.add_timer(&Timer::new(|_, _| {})).unwrap();
    assert_eq!(
        run_loop.add_timer(&Timer::new(|_, _| {})),
        Err(TimerError::RegistryFull { capacity: 1 })
    );
    assert_eq!(run_loop.config().name, "tiny");
}
