//! Software timers and the deadline-sorted timer registry.

use core::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

use crate::run_loop::Context;
use crate::sync::{Arc, Mutex};
use crate::time::{Millis, MAX_DELAY_MS};

/// Callback run when a timer expires.
///
/// The timer is already out of the registry when this runs, so the callback
/// may re-arm it (or any other timer) through the context.
pub type TimerCallback = Box<dyn FnMut(&Timer, &mut Context<'_>) + Send>;

/// Errors reported by [`TimerRegistry::add`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("timer is already queued")]
    AlreadyQueued,
    #[error("timer registry is full ({capacity} timers)")]
    RegistryFull { capacity: usize },
}

pub type TimerResult<T = ()> = Result<T, TimerError>;

struct TimerInner {
    name: &'static str,
    deadline: AtomicU32,
    callback: Mutex<Option<TimerCallback>>,
}

/// Handle to a software timer.
///
/// Clones refer to the same timer; the registry tracks timers by identity,
/// not by deadline.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

impl Timer {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&Timer, &mut Context<'_>) + Send + 'static,
    {
        Self::named("timer", callback)
    }

    pub fn named<F>(name: &'static str, callback: F) -> Self
    where
        F: FnMut(&Timer, &mut Context<'_>) + Send + 'static,
    {
        Self {
            inner: Arc::new(TimerInner {
                name,
                deadline: AtomicU32::new(0),
                callback: Mutex::new(Some(Box::new(callback))),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Deadline the next [`TimerRegistry::add`] will queue the timer at.
    pub fn deadline(&self) -> Millis {
        Millis(self.inner.deadline.load(Ordering::Relaxed))
    }

    /// Sets an absolute deadline. Has no effect on an already queued entry.
    pub fn set_deadline(&self, deadline: Millis) {
        self.inner.deadline.store(deadline.raw(), Ordering::Relaxed);
    }

    /// Arms the deadline `delay_ms` after `now`.
    ///
    /// One extra millisecond is added to cover the part of the current
    /// millisecond that has already elapsed, so a timer never fires early.
    pub fn set(&self, now: Millis, delay_ms: u32) {
        let delay = if delay_ms >= MAX_DELAY_MS {
            log::warn!(
                "{}: delay {}ms exceeds {}ms, clamping",
                self.name(),
                delay_ms,
                MAX_DELAY_MS - 1
            );
            MAX_DELAY_MS - 1
        } else {
            delay_ms
        };
        self.set_deadline(now.wrapping_add(1).wrapping_add(delay));
    }

    /// Replaces the callback.
    pub fn set_callback<F>(&self, callback: F)
    where
        F: FnMut(&Timer, &mut Context<'_>) + Send + 'static,
    {
        *self.inner.callback.lock() = Some(Box::new(callback));
    }

    pub fn same(&self, other: &Timer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn fire(&self, ctx: &mut Context<'_>) {
        // The callback is taken out for the duration of the call so it can
        // call back into this handle without deadlocking on its own slot.
        let taken = self.inner.callback.lock().take();
        if let Some(mut callback) = taken {
            callback(self, ctx);
            let mut slot = self.inner.callback.lock();
            if slot.is_none() {
                *slot = Some(callback);
            }
        }
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.inner.name)
            .field("at", &Arc::as_ptr(&self.inner))
            .field("deadline", &self.deadline())
            .finish()
    }
}

struct Entry {
    deadline: Millis,
    timer: Timer,
}

/// Pending timers, kept sorted ascending by deadline.
///
/// Entries with equal deadlines stay in insertion order. Storage is reserved
/// up front; the registry refuses to grow past its capacity.
pub struct TimerRegistry {
    entries: Vec<Entry>,
    capacity: usize,
}

impl TimerRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Queues `timer` at its current deadline.
    pub fn add(&mut self, timer: &Timer) -> TimerResult {
        let deadline = timer.deadline();
        let mut index = None;
        // Scan the whole list: a duplicate may sit after the insertion point.
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.timer.same(timer) {
                log::error!("timer add: {} already queued", timer.name());
                return Err(TimerError::AlreadyQueued);
            }
            if index.is_none() && deadline.is_before(entry.deadline) {
                index = Some(i);
            }
        }

        if self.entries.len() >= self.capacity {
            log::error!(
                "timer add: registry full ({} timers), dropping {}",
                self.capacity,
                timer.name()
            );
            return Err(TimerError::RegistryFull {
                capacity: self.capacity,
            });
        }

        let index = index.unwrap_or(self.entries.len());
        self.entries.insert(
            index,
            Entry {
                deadline,
                timer: timer.clone(),
            },
        );
        Ok(())
    }

    /// Removes `timer`. Returns false if it was not queued.
    pub fn remove(&mut self, timer: &Timer) -> bool {
        match self.entries.iter().position(|entry| entry.timer.same(timer)) {
            Some(index) => {
                self.entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// Earliest timer together with the deadline it was queued at.
    pub fn peek_earliest(&self) -> Option<(Millis, &Timer)> {
        self.entries
            .first()
            .map(|entry| (entry.deadline, &entry.timer))
    }

    pub fn next_deadline(&self) -> Option<Millis> {
        self.entries.first().map(|entry| entry.deadline)
    }

    /// Removes and returns the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Millis) -> Option<Timer> {
        match self.entries.first() {
            Some(entry) if now.has_reached(entry.deadline) => Some(self.entries.remove(0).timer),
            _ => None,
        }
    }

    pub fn is_due(&self, now: Millis) -> bool {
        self.next_deadline()
            .map_or(false, |deadline| now.has_reached(deadline))
    }

    pub fn contains(&self, timer: &Timer) -> bool {
        self.entries.iter().any(|entry| entry.timer.same(timer))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Queued timers in firing order.
    pub fn iter(&self) -> impl Iterator<Item = (Millis, &Timer)> + '_ {
        self.entries.iter().map(|entry| (entry.deadline, &entry.timer))
    }

    /// Logs every queued timer at debug level.
    pub fn dump(&self) {
        for (i, entry) in self.entries.iter().enumerate() {
            log::debug!(
                "timer {}: {} deadline {}",
                i,
                entry.timer.name(),
                entry.deadline
            );
        }
    }
}

impl fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|(deadline, timer)| (timer.name(), deadline)))
            .finish()
    }
}
