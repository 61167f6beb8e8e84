//! # runloop
//!
//! A single-threaded cooperative scheduler for HCI host ports. One logical
//! thread owns a [`RunLoop`], which multiplexes two event sources into ordered
//! callback dispatch:
//!
//! - a deadline-sorted software [`TimerRegistry`], and
//! - an [`InboundQueue`] fed by a controller running on another thread.
//!
//! ## Module Overview
//! - [`time`]     – Wraparound-safe millisecond timestamps and clocks.
//! - [`timer`]    – Timer handles and the sorted timer registry.
//! - [`packet`]   – Typed opaque packets exchanged with a controller.
//! - [`queue`]    – Inbound hand-off queue between controller and run loop.
//! - [`dispatch`] – Single-handler packet dispatcher.
//! - [`dump`]     – Packet dump hook for tracing traffic.
//! - [`run_loop`] – The scheduler itself.
//!
//! Nothing here is global: every piece of state lives in a `RunLoop` instance,
//! so tests can run several loops side by side.

pub mod dispatch;
pub mod dump;
pub mod packet;
pub mod queue;
pub mod run_loop;
pub mod time;
pub mod timer;

mod sync;

pub use dispatch::{DispatchOutcome, Dispatcher, PacketHandler};
pub use dump::{hexdump, log_dump, Direction, DumpHook};
pub use packet::{
    Packet, PacketKind, UnknownPacketKind, HARDWARE_ERROR_INVALID_PACKET, HCI_EVENT_HARDWARE_ERROR,
};
pub use queue::{InboundQueue, InboundSender};
pub use run_loop::{Context, RunLoop, RunLoopBuilder, RunLoopConfig, RunLoopState, Step};
pub use time::{Clock, ManualClock, Millis, SystemClock, MAX_DELAY_MS};
pub use timer::{Timer, TimerCallback, TimerError, TimerRegistry, TimerResult};

#[cfg(test)]
mod tests;
