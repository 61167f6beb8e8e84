//! A software controller for hosts without Bluetooth hardware.
//!
//! Commands are answered with a successful Command Complete. While LE
//! scanning is enabled an advertiser thread reports a fake peripheral at a
//! fixed interval.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use hci::{Controller, OutboundPacket};
use runloop::{InboundSender, PacketKind};

use crate::commands::{self, AdvertisingReport};

/// Behaviour of the simulated peripheral.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub advertising_interval: Duration,
    /// Reported address, most significant byte first.
    pub address: [u8; 6],
    pub rssi: i8,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            advertising_interval: Duration::from_millis(500),
            address: [0xC0, 0xFF, 0xEE, 0x00, 0x00, 0x01],
            rssi: -60,
        }
    }
}

#[derive(Default)]
struct Shared {
    inbound: Mutex<Option<InboundSender>>,
    scanning: AtomicBool,
    stop: Mutex<bool>,
    wake: Condvar,
    commands: AtomicU64,
    acl_packets: AtomicU64,
    hardware_errors: AtomicU64,
}

impl Shared {
    fn deliver(&self, kind: PacketKind, bytes: Vec<u8>) {
        match self.inbound.lock().as_ref() {
            Some(inbound) => inbound.deliver(kind, bytes),
            None => log::warn!("simulator: dropping {kind} packet, not enabled"),
        }
    }
}

pub struct SimulatedController {
    config: SimulatorConfig,
    shared: Arc<Shared>,
    advertiser: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedController {
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            advertiser: Mutex::new(None),
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.shared.scanning.load(Ordering::SeqCst)
    }

    pub fn commands_received(&self) -> u64 {
        self.shared.commands.load(Ordering::Relaxed)
    }

    pub fn acl_packets_received(&self) -> u64 {
        self.shared.acl_packets.load(Ordering::Relaxed)
    }

    pub fn hardware_errors(&self) -> u64 {
        self.shared.hardware_errors.load(Ordering::Relaxed)
    }

    fn handle_command(&self, bytes: &[u8]) {
        self.shared.commands.fetch_add(1, Ordering::Relaxed);
        let Some((opcode, params)) = commands::parse_command(bytes) else {
            log::error!("simulator: truncated command {:02x?}", bytes);
            return;
        };
        if opcode == commands::OPCODE_LE_SET_SCAN_ENABLE {
            let enable = params.first().copied().unwrap_or(0) != 0;
            self.shared.scanning.store(enable, Ordering::SeqCst);
            log::info!("simulator: scanning {}", if enable { "on" } else { "off" });
        }
        self.shared
            .deliver(PacketKind::Event, commands::command_complete(opcode, 0x00));
    }

    fn spawn_advertiser(&self) {
        let mut slot = self.advertiser.lock();
        if slot.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let report = AdvertisingReport {
            event_type: 0x00,
            address_type: 0x00,
            address: self.config.address,
            // Flags, then a complete local name.
            data: vec![0x02, 0x01, 0x06, 0x05, 0x09, b's', b'i', b'm', b'0'],
            rssi: self.config.rssi,
        };
        // Legacy advertising carries at most 31 bytes.
        crate::controller_assert!(report.data.len() <= 31);
        let interval = self.config.advertising_interval;

        let spawned = thread::Builder::new()
            .name("hci-sim-advertiser".into())
            .spawn(move || loop {
                {
                    let mut stop = shared.stop.lock();
                    if !*stop {
                        shared.wake.wait_for(&mut stop, interval);
                    }
                    if *stop {
                        break;
                    }
                }
                if shared.scanning.load(Ordering::SeqCst) {
                    shared.deliver(PacketKind::Event, report.to_event());
                }
            });
        match spawned {
            Ok(handle) => *slot = Some(handle),
            Err(err) => log::error!("simulator: failed to start advertiser: {err}"),
        }
    }
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}

impl Controller for SimulatedController {
    fn enable(&self, inbound: InboundSender) {
        *self.shared.inbound.lock() = Some(inbound);
        self.spawn_advertiser();
    }

    fn send(&self, packet: OutboundPacket) {
        match packet.kind() {
            PacketKind::Command => self.handle_command(packet.as_bytes()),
            PacketKind::AclData => {
                self.shared.acl_packets.fetch_add(1, Ordering::Relaxed);
                log::debug!("simulator: sinking {} ACL bytes", packet.len());
            }
            PacketKind::Event => log::error!("simulator: host sent an event"),
        }
    }

    fn hardware_error(&self, code: u8) {
        self.shared.hardware_errors.fetch_add(1, Ordering::Relaxed);
        log::error!("simulator: hardware error {code:#04x}");
    }
}

impl Drop for SimulatedController {
    fn drop(&mut self) {
        *self.shared.stop.lock() = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.advertiser.lock().take() {
            let _ = handle.join();
        }
    }
}
