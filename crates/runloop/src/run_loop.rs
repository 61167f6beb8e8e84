//! The cooperative run loop.
//!
//! Each iteration waits for the earlier of the next timer deadline and the
//! next inbound packet, then runs exactly one callback to completion. Nothing
//! is preempted: the only suspension point is the wait on the inbound queue.

use std::time::Duration;

use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::dump::DumpHook;
use crate::packet::PacketKind;
use crate::queue::{InboundQueue, InboundSender};
use crate::sync::Arc;
use crate::time::{Clock, Millis, SystemClock};
use crate::timer::{Timer, TimerRegistry, TimerResult};

/// Configuration for a [`RunLoop`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct RunLoopConfig {
    pub name: String,
    /// Timers the registry reserves room for.
    pub max_timers: usize,
}

impl Default for RunLoopConfig {
    fn default() -> Self {
        Self {
            name: "runloop".into(),
            max_timers: 32,
        }
    }
}

impl RunLoopConfig {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_timers(mut self, max: usize) -> Self {
        self.max_timers = max;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLoopState {
    /// No timer queued and no packet pending.
    Idle,
    /// Blocked on the inbound queue, or about to be.
    Waiting,
    /// Running a timer callback or the packet handler.
    Dispatching,
}

/// What a single iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    TimerFired,
    Packet(DispatchOutcome),
    /// The wait ended with nothing ready.
    Idle,
}

/// View of the run loop handed to callbacks.
///
/// Gives timer callbacks and the packet handler access to the timer registry
/// while the loop itself is busy dispatching them.
pub struct Context<'a> {
    timers: &'a mut TimerRegistry,
    clock: &'a dyn Clock,
}

impl<'a> Context<'a> {
    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn set_timer(&self, timer: &Timer, delay_ms: u32) {
        timer.set(self.clock.now_ms(), delay_ms);
    }

    pub fn add_timer(&mut self, timer: &Timer) -> TimerResult {
        self.timers.add(timer)
    }

    pub fn remove_timer(&mut self, timer: &Timer) -> bool {
        self.timers.remove(timer)
    }

    pub fn timers(&self) -> &TimerRegistry {
        &*self.timers
    }
}

pub struct RunLoopBuilder {
    config: RunLoopConfig,
    clock: Option<Arc<dyn Clock>>,
    dump: Option<DumpHook>,
}

impl RunLoopBuilder {
    pub fn new(config: RunLoopConfig) -> Self {
        Self {
            config,
            clock: None,
            dump: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_dump_hook(mut self, hook: DumpHook) -> Self {
        self.dump = Some(hook);
        self
    }

    pub fn build(self) -> RunLoop {
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);
        let mut dispatcher = Dispatcher::new();
        dispatcher.set_dump_hook(self.dump);
        RunLoop {
            timers: TimerRegistry::with_capacity(self.config.max_timers),
            config: self.config,
            clock,
            inbound: InboundQueue::new(),
            dispatcher,
            state: RunLoopState::Idle,
            timer_deferred: false,
        }
    }
}

pub struct RunLoop {
    config: RunLoopConfig,
    clock: Arc<dyn Clock>,
    timers: TimerRegistry,
    inbound: InboundQueue,
    dispatcher: Dispatcher,
    state: RunLoopState,
    /// Set when a packet won over a due timer; the timer goes first next time.
    timer_deferred: bool,
}

impl RunLoop {
    pub fn builder() -> RunLoopBuilder {
        RunLoopBuilder::new(RunLoopConfig::default())
    }

    pub fn with_config(config: RunLoopConfig) -> RunLoopBuilder {
        RunLoopBuilder::new(config)
    }

    /// Drops every queued timer and returns the loop to `Idle`.
    ///
    /// Packets already in the inbound queue are kept; they belong to the
    /// controller until dispatched.
    pub fn init(&mut self) {
        self.timers.clear();
        self.timer_deferred = false;
        self.state = RunLoopState::Idle;
    }

    pub fn config(&self) -> &RunLoopConfig {
        &self.config
    }

    pub fn state(&self) -> RunLoopState {
        self.state
    }

    /// Producer handle for the controller side.
    pub fn sender(&self) -> InboundSender {
        self.inbound.sender()
    }

    pub fn pending_packets(&self) -> usize {
        self.inbound.len()
    }

    pub fn register_handler<F>(&mut self, handler: F)
    where
        F: FnMut(PacketKind, &[u8], &mut Context<'_>) + Send + 'static,
    {
        self.dispatcher.register_handler(handler);
    }

    pub fn set_dump_hook(&mut self, hook: Option<DumpHook>) {
        self.dispatcher.set_dump_hook(hook);
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn set_timer(&self, timer: &Timer, delay_ms: u32) {
        timer.set(self.clock.now_ms(), delay_ms);
    }

    pub fn add_timer(&mut self, timer: &Timer) -> TimerResult {
        self.timers.add(timer)
    }

    pub fn remove_timer(&mut self, timer: &Timer) -> bool {
        self.timers.remove(timer)
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn dump_timers(&self) {
        self.timers.dump();
    }

    /// Runs one iteration, blocking until a packet arrives or a timer is due.
    pub fn run_once(&mut self) -> Step {
        self.iterate(true)
    }

    /// Services every due timer and queued packet without blocking.
    ///
    /// Returns the number of callbacks dispatched.
    pub fn run_until_idle(&mut self) -> usize {
        let mut dispatched = 0;
        while self.iterate(false) != Step::Idle {
            dispatched += 1;
        }
        dispatched
    }

    /// Runs the loop for the lifetime of the process.
    pub fn execute(&mut self) -> ! {
        log::info!("{}: entering run loop", self.config.name);
        loop {
            self.iterate(true);
        }
    }

    fn iterate(&mut self, blocking: bool) -> Step {
        if self.timer_deferred {
            self.timer_deferred = false;
            let now = self.clock.now_ms();
            if let Some(timer) = self.timers.pop_due(now) {
                return self.fire(timer);
            }
        }

        let budget = if blocking {
            let now = self.clock.now_ms();
            self.timers
                .next_deadline()
                .map(|deadline| Duration::from_millis(u64::from(now.until(deadline))))
        } else {
            Some(Duration::ZERO)
        };

        self.state = RunLoopState::Waiting;
        let packet = self.inbound.recv_timeout(budget);
        let now = self.clock.now_ms();

        let step = match packet {
            Some(packet) => {
                // Packet and due timer in the same wake: packet first, the
                // timer is serviced at the top of the next iteration.
                self.timer_deferred = self.timers.is_due(now);
                self.state = RunLoopState::Dispatching;
                let mut ctx = Context {
                    timers: &mut self.timers,
                    clock: &*self.clock,
                };
                Step::Packet(self.dispatcher.dispatch(packet, &mut ctx))
            }
            None => match self.timers.pop_due(now) {
                Some(timer) => return self.fire(timer),
                None => Step::Idle,
            },
        };
        self.settle();
        step
    }

    fn fire(&mut self, timer: Timer) -> Step {
        log::trace!("{}: timer {} fired", self.config.name, timer.name());
        self.state = RunLoopState::Dispatching;
        let mut ctx = Context {
            timers: &mut self.timers,
            clock: &*self.clock,
        };
        timer.fire(&mut ctx);
        self.settle();
        Step::TimerFired
    }

    fn settle(&mut self) {
        self.state = if self.timers.is_empty() && self.inbound.is_empty() {
            RunLoopState::Idle
        } else {
            RunLoopState::Waiting
        };
    }
}
