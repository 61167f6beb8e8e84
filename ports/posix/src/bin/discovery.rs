//! Scans for LE advertisers through the simulated controller and prints
//! every report.

use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use runloop::{hexdump, PacketKind, RunLoopConfig};
use runloop_posix::commands::{self, AdvertisingReport};
use runloop_posix::{PortConfig, PosixPort, SimulatorConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "LE device discovery on the simulated controller")]
struct Args {
    /// Log every HCI packet.
    #[arg(short, long)]
    verbose: bool,

    /// Advertising interval of the simulated peripheral.
    #[arg(long = "interval", default_value_t = 500, value_name = "MS")]
    interval_ms: u64,

    /// Period of the heartbeat timer.
    #[arg(
        long = "heartbeat",
        default_value_t = 1000,
        value_name = "MS",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    heartbeat_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resetting,
    Configuring,
    Enabling,
    Scanning,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    let mut port = PosixPort::new(PortConfig {
        run_loop: RunLoopConfig::default().name("discovery"),
        simulator: SimulatorConfig {
            advertising_interval: std::time::Duration::from_millis(args.interval_ms),
            ..SimulatorConfig::default()
        },
        dump_packets: args.verbose,
        ..PortConfig::default()
    })?;

    let transport = port.transport();
    let mut phase = Phase::Resetting;
    port.run_loop_mut().register_handler(move |kind, bytes, _ctx| {
        if kind != PacketKind::Event {
            return;
        }
        if let Some(report) = AdvertisingReport::parse(bytes) {
            println!(
                "Advertisement event: evt-type {}, addr-type {}, addr {}, rssi {}, data[{}] {}",
                report.event_type,
                report.address_type,
                report.address_string(),
                report.rssi,
                report.data.len(),
                hexdump(&report.data)
            );
            return;
        }
        let Some((opcode, status)) = commands::parse_command_complete(bytes) else {
            return;
        };
        if status != 0 {
            error!("command {opcode:#06x} failed with status {status:#04x}");
            return;
        }
        let next = match (phase, opcode) {
            (Phase::Resetting, commands::OPCODE_RESET) => {
                println!("HCI up and running");
                Some((
                    Phase::Configuring,
                    commands::le_set_scan_parameters(true, 0x0030, 0x0030),
                ))
            }
            (Phase::Configuring, commands::OPCODE_LE_SET_SCAN_PARAMETERS) => Some((
                Phase::Enabling,
                commands::le_set_scan_enable(true, false),
            )),
            (Phase::Enabling, commands::OPCODE_LE_SET_SCAN_ENABLE) => {
                info!("scanning");
                phase = Phase::Scanning;
                None
            }
            _ => None,
        };
        if let Some((following, command)) = next {
            match transport.send(PacketKind::Command, &command) {
                Ok(()) => phase = following,
                Err(err) => error!("cannot send {following:?} command: {err}"),
            }
        }
    });

    port.add_periodic("heartbeat", args.heartbeat_ms, |ctx| {
        info!("heartbeat at {}", ctx.now_ms());
    })?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        r.store(false, Ordering::SeqCst);
    })?;

    port.power_on()?;
    // The heartbeat guarantees the loop wakes to notice the shutdown flag.
    while running.load(Ordering::SeqCst) {
        port.run_loop_mut().run_once();
    }

    let stats = port.transport().command_pool();
    info!(
        "{} packets dispatched, command pool low-water mark {}/{}",
        port.run_loop().dispatcher().delivered(),
        stats.min_free,
        stats.total
    );
    Ok(())
}
