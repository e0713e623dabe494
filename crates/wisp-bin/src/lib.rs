// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # wisp-bin
//!
//! The WISP binary: CLI, logging, signal handling, and the cyclic exchange
//! engine that ties the Modbus client, the coupler probe, and the
//! shared-memory image together.

#![warn(missing_docs)]

pub mod cli;
pub mod engine;
pub mod error;
pub mod license;
pub mod logging;
pub mod shutdown;

use tracing::warn;

use wisp_image::ShmFactory;
use wisp_modbus::{ModbusClient, ModbusTcpConfig};

use crate::cli::Cli;
use crate::engine::{CycleEngine, EngineOptions};
use crate::error::{AppError, AppResult};
use crate::shutdown::ShutdownFlag;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Runs the bridge to completion.
///
/// Expects logging to be initialized and a current-thread tokio runtime to
/// be driving the call.
pub async fn run(cli: Cli) -> AppResult<()> {
    let host = cli
        .host
        .clone()
        .ok_or_else(|| AppError::usage("no host specified"))?;

    // SAFETY: geteuid is always safe to call.
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        warn!("!!!! You should not execute this program with root privileges !!!!");
    }

    let shutdown = ShutdownFlag::new();
    shutdown::install_handlers(&shutdown)
        .map_err(|e| AppError::os("failed to establish signal handler", e))?;

    let config = ModbusTcpConfig::builder()
        .host(host)
        .service(cli.service.clone())
        .debug(cli.modbus_debug())
        .build()
        .map_err(|e| AppError::usage(e.to_string()))?;
    let client = ModbusClient::new(config).map_err(|e| AppError::usage(e.to_string()))?;

    let mut engine = CycleEngine::new(client, EngineOptions::from_cli(&cli));
    engine.init(&ShmFactory::new()).await?;
    engine.run(&shutdown).await
}
