//! Host side of the transport boundary.
//!
//! [`HciTransport`] classifies outbound packets by kind, copies them into a
//! buffer from the matching pool and forwards them to the controller.
//! Inbound traffic does not pass through here: the controller delivers it
//! straight into the run loop's inbound queue.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use runloop::{
    Direction, DumpHook, InboundSender, Packet, PacketKind, HARDWARE_ERROR_INVALID_PACKET,
};

use crate::controller::{Controller, OutboundPacket};
use crate::pool::{BufferPool, PoolStats};

/// Largest HCI command: 3-byte header plus 255 parameter bytes.
pub const COMMAND_BUFFER_SIZE: usize = 3 + 255;

/// ACL buffer for a 65-byte L2CAP MTU (64-byte public key plus opcode),
/// with room for the L2CAP and ACL headers.
pub const ACL_BUFFER_SIZE: usize = 65 + 4 + 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("no {kind} buffer available")]
    NoBufferAvailable { kind: PacketKind },
    #[error("unsupported packet kind {0:#04x}")]
    UnsupportedKind(u8),
    #[error("{kind} payload of {len} bytes exceeds {max}-byte buffers")]
    PayloadTooLarge {
        kind: PacketKind,
        len: usize,
        max: usize,
    },
    #[error("transport is not initialised")]
    NotInitialized,
}

pub type TransportResult<T = ()> = Result<T, TransportError>;

/// Sizing for the outbound pools.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub name: String,
    pub command_buffers: usize,
    pub command_buffer_size: usize,
    pub acl_buffers: usize,
    pub acl_buffer_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            name: "hci".into(),
            command_buffers: 2,
            command_buffer_size: COMMAND_BUFFER_SIZE,
            acl_buffers: 6,
            acl_buffer_size: ACL_BUFFER_SIZE,
        }
    }
}

impl TransportConfig {
    pub fn builder() -> TransportConfigBuilder {
        TransportConfigBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransportConfigBuilder {
    config: TransportConfig,
}

impl TransportConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Number and size of command buffers.
    pub fn command_buffers(mut self, count: usize, size: usize) -> Self {
        self.config.command_buffers = count;
        self.config.command_buffer_size = size;
        self
    }

    /// Number and size of ACL buffers.
    pub fn acl_buffers(mut self, count: usize, size: usize) -> Self {
        self.config.acl_buffers = count;
        self.config.acl_buffer_size = size;
        self
    }

    pub fn build(self) -> TransportConfig {
        self.config
    }
}

pub struct HciTransport<C: Controller> {
    config: TransportConfig,
    controller: C,
    command_pool: BufferPool,
    acl_pool: BufferPool,
    inbound: Mutex<Option<InboundSender>>,
    open: AtomicBool,
    dump: Option<DumpHook>,
}

impl<C: Controller> HciTransport<C> {
    pub fn new(config: TransportConfig, controller: C) -> Self {
        let command_pool =
            BufferPool::new("command", config.command_buffers, config.command_buffer_size);
        let acl_pool = BufferPool::new("acl", config.acl_buffers, config.acl_buffer_size);
        Self {
            config,
            controller,
            command_pool,
            acl_pool,
            inbound: Mutex::new(None),
            open: AtomicBool::new(false),
            dump: None,
        }
    }

    pub fn with_dump_hook(mut self, hook: DumpHook) -> Self {
        self.dump = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// Starts the controller, wiring its inbound traffic to `inbound`.
    pub fn init(&self, inbound: InboundSender) {
        *self.inbound.lock() = Some(inbound.clone());
        self.controller.enable(inbound);
        log::info!("{}: controller enabled", self.config.name);
    }

    pub fn open(&self) -> TransportResult {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn close(&self) -> TransportResult {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// True if a buffer for `kind` is free right now.
    pub fn can_send_packet_now(&self, kind: PacketKind) -> bool {
        self.pool_for(kind).map_or(false, |pool| pool.available() > 0)
    }

    /// Copies `bytes` into a pool buffer and hands it to the controller.
    pub fn send(&self, kind: PacketKind, bytes: &[u8]) -> TransportResult {
        if self.inbound.lock().is_none() {
            log::error!("{}: send before init", self.config.name);
            return Err(TransportError::NotInitialized);
        }

        let Some(pool) = self.pool_for(kind) else {
            self.signal_hardware_error(HARDWARE_ERROR_INVALID_PACKET);
            return Err(TransportError::UnsupportedKind(kind.indicator()));
        };

        if bytes.len() > pool.buffer_size() {
            log::error!(
                "{}: {} payload of {} bytes does not fit {}-byte buffers",
                self.config.name,
                kind,
                bytes.len(),
                pool.buffer_size()
            );
            return Err(TransportError::PayloadTooLarge {
                kind,
                len: bytes.len(),
                max: pool.buffer_size(),
            });
        }

        let Some(mut buffer) = pool.try_alloc() else {
            log::error!("{}: no available {} buffers", self.config.name, pool.name());
            return Err(TransportError::NoBufferAvailable { kind });
        };
        buffer.append(bytes);

        if let Some(dump) = &self.dump {
            dump(Direction::Outbound, kind, buffer.as_bytes());
        }
        self.controller.send(OutboundPacket::new(kind, buffer));
        Ok(())
    }

    /// Like [`send`](Self::send), keyed by the raw H4 packet indicator.
    pub fn send_raw(&self, indicator: u8, bytes: &[u8]) -> TransportResult {
        match PacketKind::try_from(indicator) {
            Ok(kind) => self.send(kind, bytes),
            Err(err) => {
                log::error!("{}: {}", self.config.name, err);
                self.signal_hardware_error(HARDWARE_ERROR_INVALID_PACKET);
                Err(TransportError::UnsupportedKind(indicator))
            }
        }
    }

    pub fn command_pool(&self) -> PoolStats {
        self.command_pool.stats()
    }

    pub fn acl_pool(&self) -> PoolStats {
        self.acl_pool.stats()
    }

    fn pool_for(&self, kind: PacketKind) -> Option<&BufferPool> {
        match kind {
            PacketKind::Command => Some(&self.command_pool),
            PacketKind::AclData => Some(&self.acl_pool),
            PacketKind::Event => None,
        }
    }

    /// Tells the controller, and queues a Hardware Error event so the host
    /// stack sees it on its next run loop iteration.
    fn signal_hardware_error(&self, code: u8) {
        log::error!("{}: hardware error {:#04x}", self.config.name, code);
        self.controller.hardware_error(code);
        if let Some(inbound) = self.inbound.lock().as_ref() {
            inbound.deliver_packet(Packet::hardware_error(code));
        }
    }
}
