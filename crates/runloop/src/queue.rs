//! Inbound packet queue.
//!
//! This is the one place where the run loop shares state with another
//! execution context: controller threads push through [`InboundSender`], the
//! run loop thread pops through [`InboundQueue`]. A mutex guards the FIFO and
//! a condition variable wakes the run loop when it is blocked waiting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::packet::{Packet, PacketKind};
use crate::sync::{Arc, Condvar, Mutex};

struct Shared {
    packets: Mutex<VecDeque<Packet>>,
    ready: Condvar,
}

/// Consumer side, owned by the run loop.
pub struct InboundQueue {
    shared: Arc<Shared>,
}

/// Producer side. Cheap to clone and safe to use from any thread.
#[derive(Clone)]
pub struct InboundSender {
    shared: Arc<Shared>,
}

impl InboundQueue {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                packets: Mutex::new(VecDeque::new()),
                ready: Condvar::new(),
            }),
        }
    }

    pub fn sender(&self) -> InboundSender {
        InboundSender {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Pops the next packet, blocking for at most `timeout`.
    ///
    /// `None` waits until a packet arrives; a zero timeout only polls.
    pub fn recv_timeout(&self, timeout: Option<Duration>) -> Option<Packet> {
        let mut packets = self.shared.packets.lock();
        match timeout {
            None => {
                while packets.is_empty() {
                    self.shared.ready.wait(&mut packets);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while packets.is_empty() {
                    if self.shared.ready.wait_until(&mut packets, deadline).timed_out() {
                        break;
                    }
                }
            }
        }
        packets.pop_front()
    }

    pub fn try_recv(&self) -> Option<Packet> {
        self.shared.packets.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.shared.packets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.packets.lock().is_empty()
    }

    /// Drops every queued packet, returning how many were discarded.
    pub fn clear(&self) -> usize {
        let mut packets = self.shared.packets.lock();
        let dropped = packets.len();
        packets.clear();
        dropped
    }
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundSender {
    /// Enqueues one packet of `kind` for dispatch on the run loop thread.
    pub fn deliver(&self, kind: PacketKind, payload: impl Into<Vec<u8>>) {
        self.deliver_packet(Packet::new(kind, payload));
    }

    pub fn deliver_packet(&self, packet: Packet) {
        self.shared.packets.lock().push_back(packet);
        self.shared.ready.notify_one();
    }
}
