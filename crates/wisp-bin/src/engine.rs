// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The cyclic exchange engine.
//!
//! [`CycleEngine`] owns the Modbus client and the process image and drives
//! the bridge through its life cycle:
//!
//! ```text
//! Fresh --init--> Initialized --run--> Running --flag/error--> Draining --> Closed
//! ```
//!
//! Each cycle fetches all input segments into the image, sends all output
//! segments from the image, and then paces itself to the configured period.
//! A late cycle adds 10 to a fail counter, an on-time cycle subtracts 1;
//! when the counter passes 100 the engine gives up. One long stall therefore
//! terminates nothing, a permanently overloaded link does.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tracing::{error, info, warn};

use wisp_coupler::{probe, ClampRoster, ImageLayout};
use wisp_image::{CreateMode, ImageError, ProcessImage, SharedRegionFactory};
use wisp_modbus::{ModbusClient, ModbusError, RegisterKind};

use crate::cli::Cli;
use crate::error::{AppError, AppResult};
use crate::shutdown::ShutdownFlag;

/// A late cycle adds 10, an on-time cycle subtracts 1, above this the engine
/// terminates.
const MAX_CYCLE_FAIL: u32 = 100;

// =============================================================================
// Options
// =============================================================================

/// Runtime options for the engine, derived from the CLI.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Shared-memory name prefix.
    pub prefix: String,
    /// Adopt existing shared-memory objects instead of failing.
    pub force: bool,
    /// Cycle period; zero means free-running.
    pub cycle: Duration,
    /// Terminate when the cycle time is repeatedly exceeded.
    pub cycle_time_fail: bool,
    /// Warn when a cycle misses its deadline.
    pub cycle_time_warn: bool,
    /// Prime the image from the coupler instead of starting from zeros.
    pub read_start_image: bool,
    /// Suppress startup output.
    pub quiet: bool,
}

impl EngineOptions {
    /// Builds options from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            prefix: cli.prefix.clone(),
            force: cli.force,
            cycle: Duration::from_millis(cli.cycle),
            cycle_time_fail: !cli.no_cycle_time_fail,
            cycle_time_warn: !cli.no_cycle_time_warn,
            read_start_image: cli.read_start_image,
            quiet: cli.quiet,
        }
    }
}

// =============================================================================
// Exchange errors
// =============================================================================

/// A failure while moving data between the image and the coupler.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The Modbus transaction failed.
    #[error(transparent)]
    Modbus(#[from] ModbusError),

    /// The image rejected the transfer.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// The engine was used before `init` completed.
    #[error("engine not initialized")]
    NotInitialized,

    /// `init` was called twice.
    #[error("engine already initialized")]
    AlreadyInitialized,
}

// =============================================================================
// EngineState
// =============================================================================

/// Life-cycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Constructed, nothing connected.
    Fresh,
    /// Probe, layout and image are ready.
    Initialized,
    /// The cycle loop is executing.
    Running,
    /// Shutting down, releasing resources.
    Draining,
    /// All resources released.
    Closed,
}

// =============================================================================
// CycleEngine
// =============================================================================

/// Orchestrates init, the exchange loop, and orderly shutdown.
#[derive(Debug)]
pub struct CycleEngine {
    client: ModbusClient,
    options: EngineOptions,
    state: EngineState,
    roster: ClampRoster,
    layout: ImageLayout,
    image: Option<ProcessImage>,
}

impl CycleEngine {
    /// Creates a fresh engine around an unconnected client.
    pub fn new(client: ModbusClient, options: EngineOptions) -> Self {
        Self {
            client,
            options,
            state: EngineState::Fresh,
            roster: ClampRoster::default(),
            layout: ImageLayout::default(),
            image: None,
        }
    }

    /// The engine's current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// The discovered clamp roster. Empty before init.
    pub fn roster(&self) -> &ClampRoster {
        &self.roster
    }

    /// The computed image layout. Empty before init.
    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }

    /// The process image, once initialized.
    pub fn image(&self) -> Option<&ProcessImage> {
        self.image.as_ref()
    }

    /// The process image, writable, once initialized.
    pub fn image_mut(&mut self) -> Option<&mut ProcessImage> {
        self.image.as_mut()
    }

    // =========================================================================
    // Init
    // =========================================================================

    /// Connects, probes the coupler, computes the layout, and creates the
    /// shared-memory regions.
    ///
    /// Any failure after the TCP connect tears the connection down again so
    /// no partial resources outlive the error.
    pub async fn init(&mut self, factory: &dyn SharedRegionFactory) -> AppResult<()> {
        if self.state != EngineState::Fresh {
            return Err(AppError::cycle(
                "init called twice",
                ExchangeError::AlreadyInitialized,
            ));
        }

        self.client.connect().await.map_err(AppError::unavailable)?;

        match self.init_connected(factory).await {
            Ok(()) => {
                self.state = EngineState::Initialized;
                Ok(())
            }
            Err(e) => {
                let _ = self.client.disconnect().await;
                self.image = None;
                Err(e)
            }
        }
    }

    async fn init_connected(&mut self, factory: &dyn SharedRegionFactory) -> AppResult<()> {
        probe::verify_identity(&mut self.client)
            .await
            .map_err(AppError::unavailable)?;

        let roster = probe::read_roster(&mut self.client)
            .await
            .map_err(AppError::unavailable)?;

        let counts = roster.channel_counts();
        let layout = ImageLayout::for_counts(counts).map_err(AppError::unavailable)?;

        if !self.options.quiet {
            self.log_discovery(&roster).await?;
        }

        let mode = if self.options.force {
            CreateMode::Adopt
        } else {
            CreateMode::Exclusive
        };
        let image = ProcessImage::create(factory, &self.options.prefix, counts, mode)
            .map_err(|e| AppError::os("failed to create shared memory image", e))?;

        self.roster = roster;
        self.layout = layout;
        self.image = Some(image);
        Ok(())
    }

    async fn log_discovery(&mut self, roster: &ClampRoster) -> AppResult<()> {
        let coupler_info = probe::read_coupler_info(&mut self.client)
            .await
            .map_err(AppError::unavailable)?;

        info!("found WAGO coupler");
        for line in &coupler_info {
            info!("    {line}");
        }

        info!("found {} clamps:", roster.len());
        for clamp in roster.iter() {
            info!("    {clamp}");
        }
        Ok(())
    }

    // =========================================================================
    // Exchange
    // =========================================================================

    /// Reads the input segments (and optionally the output segments) from
    /// the coupler into the image.
    pub async fn fetch_image(&mut self, include_outputs: bool) -> Result<(), ExchangeError> {
        let image = self.image.as_mut().ok_or(ExchangeError::NotInitialized)?;
        let client = &mut self.client;

        for segment in self.layout.segments(RegisterKind::Di) {
            let bits = client
                .read_discrete_inputs(segment.address, segment.length as u16)
                .await?;
            image.store_bits(RegisterKind::Di, segment.offset, &bits)?;
        }

        for segment in self.layout.segments(RegisterKind::Ai) {
            let words = client
                .read_input_registers(segment.address, segment.length as u16)
                .await?;
            image.store_words(RegisterKind::Ai, segment.offset, &words)?;
        }

        if include_outputs {
            for segment in self.layout.segments(RegisterKind::Do) {
                let bits = client
                    .read_coils(segment.address, segment.length as u16)
                    .await?;
                image.store_bits(RegisterKind::Do, segment.offset, &bits)?;
            }

            for segment in self.layout.segments(RegisterKind::Ao) {
                let words = client
                    .read_holding_registers(segment.address, segment.length as u16)
                    .await?;
                image.store_words(RegisterKind::Ao, segment.offset, &words)?;
            }
        }

        Ok(())
    }

    /// Writes the output segments from the image to the coupler.
    pub async fn send_image(&mut self) -> Result<(), ExchangeError> {
        let image = self.image.as_mut().ok_or(ExchangeError::NotInitialized)?;
        let client = &mut self.client;

        for segment in self.layout.segments(RegisterKind::Do) {
            let bits = image.load_bits(RegisterKind::Do, segment.offset, segment.length)?;
            client.write_coils(segment.address, &bits).await?;
        }

        for segment in self.layout.segments(RegisterKind::Ao) {
            let words = image.load_words(RegisterKind::Ao, segment.offset, segment.length)?;
            client.write_registers(segment.address, &words).await?;
        }

        Ok(())
    }

    // =========================================================================
    // Run loop
    // =========================================================================

    /// Runs the exchange loop until the shutdown flag is raised or a fatal
    /// error occurs, then drains and closes.
    pub async fn run(&mut self, shutdown: &ShutdownFlag) -> AppResult<()> {
        if self.state != EngineState::Initialized {
            return Err(AppError::cycle(
                "engine not initialized",
                ExchangeError::NotInitialized,
            ));
        }

        self.state = EngineState::Running;
        let result = self.run_inner(shutdown).await;

        self.state = EngineState::Draining;
        self.close().await;
        self.state = EngineState::Closed;

        info!("terminating");
        result
    }

    async fn run_inner(&mut self, shutdown: &ShutdownFlag) -> AppResult<()> {
        if self.options.read_start_image {
            self.fetch_image(true)
                .await
                .map_err(|e| AppError::cycle("failed to fetch start image", e))?;
        }

        let period = self.options.cycle;
        let mut fail_counter: u32 = 0;
        let mut next = Instant::now();

        while !shutdown.is_raised() {
            self.fetch_image(false)
                .await
                .map_err(|e| AppError::cycle("failed to fetch input image", e))?;

            self.send_image()
                .await
                .map_err(|e| AppError::cycle("failed to send output image", e))?;

            if period.is_zero() {
                continue;
            }

            next += period;
            let now = Instant::now();

            if now > next {
                let overrun = now - next;
                if self.options.cycle_time_warn {
                    warn!(overrun_us = overrun.as_micros() as u64, "cycle time exceeded");
                }

                if self.options.cycle_time_fail {
                    fail_counter += 10;
                    if fail_counter > MAX_CYCLE_FAIL {
                        error!("cycle time repeatedly exceeded");
                        return Err(AppError::CycleOverrun);
                    }
                }

                // One long stall must not cascade into the following cycles.
                next = now;
            } else {
                if fail_counter > 0 {
                    fail_counter -= 1;
                }
                tokio::time::sleep_until(next).await;
            }
        }

        Ok(())
    }

    /// Disconnects the client and releases the image handles. The
    /// shared-memory objects themselves stay in place.
    async fn close(&mut self) {
        if self.client.state().is_connected() {
            if let Err(e) = self.client.disconnect().await {
                warn!(error = %e, "error disconnecting from coupler");
            }
        }
        self.image = None;
    }
}

// =============================================================================
// Tests
// =============================================================================
