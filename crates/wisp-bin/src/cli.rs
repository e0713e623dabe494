// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing.
//!
//! The surface is flat (no subcommands): one positional coupler endpoint
//! plus behavior flags. `--help` and `--version` come from clap; parse
//! failures exit with the usage code.

use clap::Parser;

// =============================================================================
// Cli
// =============================================================================

/// WISP - WAGO I/O Shared-memory Proxy.
///
/// Connects to a WAGO Modbus TCP fieldbus coupler, discovers the installed
/// I/O clamps, and exchanges their process data with four named
/// shared-memory regions on a configurable cycle.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "wisp",
    version = crate::VERSION,
    about = "Bridges a WAGO Modbus TCP fieldbus coupler to shared memory"
)]
pub struct Cli {
    /// Host or address of the WAGO Modbus TCP coupler
    pub host: Option<String>,

    /// Service or port of the WAGO Modbus TCP coupler
    #[arg(default_value = "502")]
    pub service: String,

    /// Use the shared memory even if it already exists.
    ///
    /// Only intended for adopting the orphan of an improperly terminated
    /// instance; never use it while another instance is running.
    #[arg(long)]
    pub force: bool,

    /// Disable output
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable modbus debug output (wire-level hex trace)
    #[arg(short, long)]
    pub debug: bool,

    /// Cycle time in ms (0: as fast as possible)
    #[arg(short, long, value_name = "MS", default_value_t = 0)]
    pub cycle: u64,

    /// Do not fail if the cycle time is repeatedly exceeded
    #[arg(long)]
    pub no_cycle_time_fail: bool,

    /// Do not print a warning if the cycle time is exceeded
    #[arg(long)]
    pub no_cycle_time_warn: bool,

    /// Do not initialize output registers with zero, but read values from
    /// the coupler
    #[arg(long)]
    pub read_start_image: bool,

    /// Name prefix for the shared memories
    #[arg(short, long, default_value = "wago_")]
    pub prefix: String,

    /// Show licenses
    #[arg(long)]
    pub license: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Compact format for minimal output
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Cli {
    /// The effective log level from the quiet/debug flags.
    pub fn effective_log_level(&self) -> &str {
        if self.quiet {
            "warn"
        } else if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Whether the modbus wire trace is active. Quiet wins over debug.
    pub fn modbus_debug(&self) -> bool {
        self.debug && !self.quiet
    }
}

// =============================================================================
// Tests
// =============================================================================
