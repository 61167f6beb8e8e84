//! Inbound packet dispatcher.
//!
//! Exactly one handler (the host stack) receives inbound packets. Registering
//! a new handler replaces the previous one; there is no fan-out.

use crate::dump::{Direction, DumpHook};
use crate::packet::{Packet, PacketKind};
use crate::run_loop::Context;

/// Receives each inbound packet. The byte slice is only valid for the call.
pub type PacketHandler = Box<dyn FnMut(PacketKind, &[u8], &mut Context<'_>) + Send>;

/// What happened to a packet handed to [`Dispatcher::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// No handler registered; the packet was dropped.
    NoHandler,
    /// The kind never travels controller to host; the packet was dropped.
    Rejected(PacketKind),
}

#[derive(Default)]
pub struct Dispatcher {
    handler: Option<PacketHandler>,
    dump: Option<DumpHook>,
    delivered: u64,
    dropped: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler<F>(&mut self, handler: F)
    where
        F: FnMut(PacketKind, &[u8], &mut Context<'_>) + Send + 'static,
    {
        if self.handler.is_some() {
            log::debug!("dispatcher: replacing packet handler");
        }
        self.handler = Some(Box::new(handler));
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    pub fn set_dump_hook(&mut self, hook: Option<DumpHook>) {
        self.dump = hook;
    }

    pub fn dispatch(&mut self, packet: Packet, ctx: &mut Context<'_>) -> DispatchOutcome {
        let kind = packet.kind();
        match kind {
            PacketKind::Event | PacketKind::AclData => {}
            PacketKind::Command => {
                log::error!("dispatch: unknown inbound packet type {:#04x}", kind.indicator());
                self.dropped += 1;
                return DispatchOutcome::Rejected(kind);
            }
        }

        if let Some(dump) = &self.dump {
            dump(Direction::Inbound, kind, packet.as_bytes());
        }

        match self.handler.as_mut() {
            Some(handler) => {
                handler(kind, packet.as_bytes(), ctx);
                self.delivered += 1;
                DispatchOutcome::Delivered
            }
            None => {
                log::warn!("dispatch: no packet handler, dropping {} ({} bytes)", kind, packet.len());
                self.dropped += 1;
                DispatchOutcome::NoHandler
            }
        }
    }

    /// Packets handed to the handler so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Packets dropped for lack of a handler or an invalid kind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}
