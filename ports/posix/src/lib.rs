//! Hosted port of the run loop and HCI transport.
//!
//! [`PosixPort`] wires a [`RunLoop`] to an [`HciTransport`] driving the
//! [`SimulatedController`], so host stack code can be exercised on a
//! workstation without a radio.

pub mod commands;
pub mod controller;
pub mod fault;

use std::sync::Arc;

use thiserror::Error;

use hci::{HciTransport, TransportConfig, TransportError};
use runloop::{log_dump, Context, PacketKind, RunLoop, RunLoopConfig, Timer, TimerError};

pub use controller::{SimulatedController, SimulatorConfig};

pub type PosixTransport = HciTransport<Arc<SimulatedController>>;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Timer(#[from] TimerError),
}

#[derive(Debug, Clone, Default)]
pub struct PortConfig {
    pub run_loop: RunLoopConfig,
    pub transport: TransportConfig,
    pub simulator: SimulatorConfig,
    /// Log every packet crossing the boundary at debug level.
    pub dump_packets: bool,
}

pub struct PosixPort {
    run_loop: RunLoop,
    transport: Arc<PosixTransport>,
}

impl PosixPort {
    /// Builds the loop and transport, enables the controller and opens the
    /// transport.
    pub fn new(config: PortConfig) -> Result<Self, PortError> {
        let mut builder = RunLoop::with_config(config.run_loop);
        let mut transport = HciTransport::new(
            config.transport,
            Arc::new(SimulatedController::new(config.simulator)),
        );
        if config.dump_packets {
            builder = builder.with_dump_hook(log_dump());
            transport = transport.with_dump_hook(log_dump());
        }

        let run_loop = builder.build();
        let transport = Arc::new(transport);
        transport.init(run_loop.sender());
        transport.open()?;
        log::info!(
            "{}: port ready on transport {}",
            run_loop.config().name,
            transport.name()
        );

        Ok(Self {
            run_loop,
            transport,
        })
    }

    pub fn run_loop(&self) -> &RunLoop {
        &self.run_loop
    }

    pub fn run_loop_mut(&mut self) -> &mut RunLoop {
        &mut self.run_loop
    }

    /// Shared handle for packet handlers that need to send.
    pub fn transport(&self) -> Arc<PosixTransport> {
        Arc::clone(&self.transport)
    }

    pub fn controller(&self) -> &SimulatedController {
        self.transport.controller()
    }

    /// Resets the controller; its Command Complete is the first inbound event.
    pub fn power_on(&self) -> Result<(), PortError> {
        self.transport.send(PacketKind::Command, &commands::reset())?;
        Ok(())
    }

    /// Queues a timer that calls `callback` every `period_ms`.
    pub fn add_periodic<F>(
        &mut self,
        name: &'static str,
        period_ms: u32,
        mut callback: F,
    ) -> Result<Timer, PortError>
    where
        F: FnMut(&mut Context<'_>) + Send + 'static,
    {
        let timer = Timer::named(name, move |timer, ctx| {
            callback(ctx);
            ctx.set_timer(timer, period_ms);
            if let Err(err) = ctx.add_timer(timer) {
                log::error!("{}: cannot re-arm: {}", timer.name(), err);
            }
        });
        self.run_loop.set_timer(&timer, period_ms);
        self.run_loop.add_timer(&timer)?;
        Ok(timer)
    }

    pub fn execute(&mut self) -> ! {
        self.run_loop.execute()
    }
}
