//! Controller side of the transport boundary.

use std::sync::Arc;

use runloop::{InboundSender, PacketKind};

use crate::pool::PoolBuffer;

/// A packet handed to the controller. Dropping it returns the buffer to its
/// pool, so a controller keeps it exactly as long as it needs the bytes.
#[derive(Debug)]
pub struct OutboundPacket {
    kind: PacketKind,
    buffer: PoolBuffer,
}

impl OutboundPacket {
    pub(crate) fn new(kind: PacketKind, buffer: PoolBuffer) -> Self {
        Self { kind, buffer }
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// The link-layer controller as seen from the host.
///
/// Implementations typically run on their own thread or in interrupt
/// context; they push controller-to-host traffic through the
/// [`InboundSender`] received in [`Controller::enable`].
pub trait Controller: Send + Sync {
    /// Starts the controller.
    fn enable(&self, inbound: InboundSender);

    /// Accepts one host-to-controller packet.
    fn send(&self, packet: OutboundPacket);

    /// The host produced something the controller cannot accept.
    fn hardware_error(&self, code: u8) {
        log::error!("controller: hardware error {code:#04x}");
    }
}

impl<C: Controller + ?Sized> Controller for Arc<C> {
    fn enable(&self, inbound: InboundSender) {
        (**self).enable(inbound);
    }

    fn send(&self, packet: OutboundPacket) {
        (**self).send(packet);
    }

    fn hardware_error(&self, code: u8) {
        (**self).hardware_error(code);
    }
}
