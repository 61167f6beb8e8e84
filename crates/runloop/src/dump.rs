//! Packet dump hook.
//!
//! Every packet dispatched to the host stack and every packet sent to the
//! controller can be mirrored to a hook, the same way a port enables full HCI
//! logging while it is being brought up.

use core::fmt::Write;

use crate::packet::PacketKind;
use crate::sync::Arc;

/// Which way a dumped packet travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Controller to host.
    Inbound,
    /// Host to controller.
    Outbound,
}

pub type DumpHook = Arc<dyn Fn(Direction, PacketKind, &[u8]) + Send + Sync>;

/// Hook that writes a hex dump of every packet through `log` at debug level.
pub fn log_dump() -> DumpHook {
    Arc::new(|direction, kind, bytes| {
        let arrow = match direction {
            Direction::Inbound => "<=",
            Direction::Outbound => "=>",
        };
        log::debug!("{} {} {}", kind, arrow, hexdump(bytes));
    })
}

/// Space separated lowercase hex.
pub fn hexdump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}
