//! # hci
//!
//! The transport boundary between a [`runloop::RunLoop`] and an HCI
//! controller.
//!
//! - [`pool`]       – Preallocated outbound buffer pools.
//! - [`controller`] – The trait a controller implements.
//! - [`transport`]  – Outbound classification, backpressure and the
//!   hardware-error path.
//!
//! Inbound packets bypass this crate entirely: [`HciTransport::init`] hands
//! the controller the run loop's inbound sender.

pub mod controller;
pub mod pool;
pub mod transport;

pub use controller::{Controller, OutboundPacket};
pub use pool::{BufferPool, PoolBuffer, PoolStats};
pub use transport::{
    HciTransport, TransportConfig, TransportConfigBuilder, TransportError, TransportResult,
    ACL_BUFFER_SIZE, COMMAND_BUFFER_SIZE,
};

#[cfg(test)]
mod tests;
