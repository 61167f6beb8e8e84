//! Typed opaque packets crossing the controller boundary.
//!
//! The run loop never looks inside a packet. It only needs the kind to route
//! it; the byte layout belongs to the host stack.

use core::fmt;

use thiserror::Error;

/// HCI event code for Hardware Error.
pub const HCI_EVENT_HARDWARE_ERROR: u8 = 0x10;

/// Hardware error code reported for a packet of an unknown kind.
pub const HARDWARE_ERROR_INVALID_PACKET: u8 = 0x01;

/// Packet kind, numbered like the H4 packet indicator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    /// Host-to-controller command.
    Command = 0x01,
    /// Bulk ACL link data, either direction.
    AclData = 0x02,
    /// Controller-to-host event.
    Event = 0x04,
}

impl PacketKind {
    pub const fn indicator(self) -> u8 {
        self as u8
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown packet indicator {0:#04x}")]
pub struct UnknownPacketKind(pub u8);

impl TryFrom<u8> for PacketKind {
    type Error = UnknownPacketKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::AclData),
            0x04 => Ok(Self::Event),
            other => Err(UnknownPacketKind(other)),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Command => "CMD",
            Self::AclData => "ACL",
            Self::Event => "EVT",
        };
        f.write_str(name)
    }
}

/// An owned packet waiting in the inbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    kind: PacketKind,
    payload: Vec<u8>,
}

impl Packet {
    pub fn new(kind: PacketKind, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Hardware Error event carrying `code`.
    pub fn hardware_error(code: u8) -> Self {
        Self::new(PacketKind::Event, [HCI_EVENT_HARDWARE_ERROR, 1, code])
    }

    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }
}
